use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use log::{Level, LevelFilter, debug};
use ratatui::{
    Frame,
    style::{Color, Style},
    text::{Line, Span},
};
use tui_logger::{LogFormatter, TuiLoggerLevelOutput, TuiWidgetEvent, TuiWidgetState};

use crate::{component::Component, snoobrowse_error::SnoobrowseError};

pub struct DebugFormatter;

impl LogFormatter for DebugFormatter {
    fn min_width(&self) -> u16 {
        4
    }

    fn format(&'_ self, _width: usize, evt: &tui_logger::ExtLogRecord) -> Vec<Line<'_>> {
        let color = match evt.level {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug | Level::Trace => Color::Gray,
        };
        vec![Line::from(vec![
            Span::raw(format!("{} ", evt.timestamp.format("%H:%M:%S"))),
            Span::styled(format!("{:<5} ", evt.level), Style::new().fg(color)),
            Span::raw(format!("{}: {}", evt.file().unwrap_or(""), evt.msg())),
        ])]
    }
}

pub struct DebugComponent {
    state: TuiWidgetState,
}

impl DebugComponent {
    pub fn new() -> Self {
        DebugComponent {
            state: TuiWidgetState::new().set_default_display_level(LevelFilter::Debug),
        }
    }
}

impl Component for DebugComponent {
    async fn handle_event(&mut self, event: &Event) -> Result<(), SnoobrowseError> {
        if let Event::Key(KeyEvent {
            kind: KeyEventKind::Press,
            code,
            ..
        }) = event
        {
            match code {
                KeyCode::Char('j') => self.state.transition(TuiWidgetEvent::NextPageKey),
                KeyCode::Char('k') => self.state.transition(TuiWidgetEvent::PrevPageKey),
                KeyCode::Esc => self.state.transition(TuiWidgetEvent::EscapeKey),
                _ => debug!("{}", code),
            }
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        use ratatui::widgets::{Block, Widget};
        use tui_logger::TuiLoggerWidget;

        let area = frame.area();
        let buf = frame.buffer_mut();
        TuiLoggerWidget::default()
            .block(Block::bordered().title("Log"))
            .formatter(Box::new(DebugFormatter))
            .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
            .state(&self.state)
            .render(area, buf);
    }
}
