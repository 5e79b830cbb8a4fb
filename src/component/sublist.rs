use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use log::{error, info};
use ratatui::{
    layout::{Constraint, Layout, Position},
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, List, ListState, Paragraph, StatefulWidget, Widget},
};
use tokio::sync::mpsc::Sender;
use tui_input::{Input, backend::crossterm::EventHandler};

use crate::{
    app::AppEvent, component::Component, config::Config, reddit_api::Feed,
    snoobrowse_error::SnoobrowseError,
};

pub struct SublistComponent {
    app_event_sender: Sender<AppEvent>,
    config: Config,
    feeds: Vec<Feed>,
    list_state: ListState,
    /// Set while the user types a new entry.
    input: Option<Input>,
}

impl SublistComponent {
    pub fn new(config: Config, app_event_sender: Sender<AppEvent>) -> Self {
        let feeds = config.feeds();
        SublistComponent {
            app_event_sender,
            config,
            feeds,
            list_state: ListState::default().with_selected(Some(0)),
            input: None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.input.is_some()
    }

    fn add_entry(&mut self, entry: &str) {
        match self.config.add_sub(entry) {
            Some(feed) => {
                info!("Added {}", feed);
                self.feeds.push(feed);
                self.list_state.select(Some(self.feeds.len() - 1));
                if let Err(e) = self.config.save() {
                    error!("Could not save config: {}", e);
                }
            }
            None => info!("Ignoring entry {:?}", entry),
        }
    }

    async fn handle_input_event(&mut self, event: &Event) -> Result<(), SnoobrowseError> {
        let Some(input) = self.input.as_mut() else {
            return Ok(());
        };
        match event {
            Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                code: KeyCode::Enter,
                ..
            }) => {
                let entry = input.value().to_string();
                self.input = None;
                self.add_entry(&entry);
            }
            Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                code: KeyCode::Esc,
                ..
            }) => self.input = None,
            _ => {
                input.handle_event(event);
            }
        }
        self.app_event_sender.send(AppEvent::Draw).await?;
        Ok(())
    }
}

impl Component for SublistComponent {
    async fn handle_event(&mut self, event: &Event) -> Result<(), SnoobrowseError> {
        if self.is_editing() {
            return self.handle_input_event(event).await;
        }
        let Event::Key(KeyEvent {
            kind: KeyEventKind::Press,
            code,
            ..
        }) = event
        else {
            return Ok(());
        };
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.list_state.select_next();
                self.app_event_sender.send(AppEvent::Draw).await?;
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.list_state.select_previous();
                self.app_event_sender.send(AppEvent::Draw).await?;
            }
            KeyCode::Char('l') | KeyCode::Enter => {
                let selected = self
                    .list_state
                    .selected()
                    .and_then(|index| self.feeds.get(index.min(self.feeds.len().saturating_sub(1))));
                if let Some(feed) = selected {
                    self.app_event_sender
                        .send(AppEvent::OpenPostList(feed.clone()))
                        .await?;
                }
            }
            KeyCode::Char('a') => {
                self.input = Some(Input::default());
                self.app_event_sender.send(AppEvent::Draw).await?;
            }
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let [list_area, input_area] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(if self.is_editing() { 3 } else { 0 }),
        ])
        .areas(area);

        let buf = frame.buffer_mut();
        let selected_style = Style::new().bg(Color::Blue).add_modifier(Modifier::BOLD);
        let list = List::new(self.feeds.iter().map(|feed| feed.to_string()))
            .highlight_style(selected_style)
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .title("Feeds")
                    .title_bottom("a: add  l: open  q: quit"),
            );
        StatefulWidget::render(list, list_area, buf, &mut self.list_state);

        if let Some(input) = &self.input {
            let inner_width = input_area.width.saturating_sub(2);
            let scroll = input.visual_scroll(inner_width as usize);
            Paragraph::new(input.value())
                .scroll((0, scroll as u16))
                .block(
                    Block::bordered()
                        .border_type(BorderType::Rounded)
                        .title("Add r/sub or u/user"),
                )
                .render(input_area, buf);
            let cursor = input.visual_cursor().max(scroll) - scroll;
            frame.set_cursor_position(Position::new(
                input_area.x + 1 + cursor as u16,
                input_area.y + 1,
            ));
        }
    }
}
