use std::sync::Arc;
#[cfg(debug_assertions)]
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use log::{debug, warn};
use ratatui::{DefaultTerminal, Frame};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_stream::StreamExt;

#[cfg(debug_assertions)]
use crate::component::debug::DebugComponent;

use crate::{
    component::{
        Component, postdetail::PostDetailComponent, postlist::PostlistComponent,
        sublist::SublistComponent,
    },
    config::Config,
    model::post::Post,
    reddit_api::{Feed, RedditApi},
    snoobrowse_error::SnoobrowseError,
    state::{AppState, Store},
};

pub enum AppEvent {
    Quit,
    Draw,
    OpenPostList(Feed),
    ClosePostList,
    OpenPostDetail(Post),
    ClosePostDetail,
    #[cfg(debug_assertions)]
    ToggleShowDebug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Sublist,
    Postlist,
    PostDetail,
}

pub struct App {
    #[cfg(debug_assertions)]
    show_debug: bool,
    #[cfg(debug_assertions)]
    debug_component: DebugComponent,
    running: bool,
    view: View,
    store: Store<AppState>,
    app_event_sender: Sender<AppEvent>,
    app_event_receiver: Receiver<AppEvent>,
    sublist: SublistComponent,
    postlist: PostlistComponent,
    postdetail: PostDetailComponent,
}

impl App {
    /// Must run after the terminal entered raw mode, the image picker queries it.
    pub fn new(config: Config) -> Result<Self, SnoobrowseError> {
        let (sender, receiver) = mpsc::channel(100);
        let store = Store::new(AppState::default());
        let reddit_api = Arc::new(RedditApi::new(
            config.user_agent.as_deref(),
            config.access_token.clone(),
        )?);
        let picker = Picker::from_query_stdio().unwrap_or_else(|e| {
            warn!("Terminal image query failed, using a fixed font size: {:?}", e);
            Picker::from_fontsize((8, 16))
        });
        let picker = Arc::new(picker);

        Ok(Self {
            #[cfg(debug_assertions)]
            debug_component: DebugComponent::new(),
            #[cfg(debug_assertions)]
            show_debug: false,
            running: true,
            view: View::Sublist,
            postlist: PostlistComponent::new(
                reddit_api.clone(),
                store.clone(),
                config.sort.clone(),
                config.embeds,
                sender.clone(),
            ),
            postdetail: PostDetailComponent::new(
                reddit_api,
                store.clone(),
                picker,
                config.embeds,
                sender.clone(),
            ),
            sublist: SublistComponent::new(config, sender.clone()),
            store,
            app_event_sender: sender,
            app_event_receiver: receiver,
        })
    }

    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<(), SnoobrowseError> {
        let mut events = EventStream::new();
        let mut state_changes = self.store.subscribe();
        terminal.draw(|f| self.draw(f))?;

        #[cfg(debug_assertions)]
        let mut interval = {
            let period = Duration::from_secs_f32(1.0 / 30.0);
            tokio::time::interval(period)
        };

        #[cfg(debug_assertions)]
        while self.running {
            tokio::select! {
                Some(Ok(event)) = events.next() => self.handle_event(&event).await?,
                Some(app_event) = self.app_event_receiver.recv() => self.handle_app_event(app_event, terminal).await?,
                Ok(()) = state_changes.changed() => {
                    terminal.draw(|f| self.draw(f))?;
                }
                _ = interval.tick() => {
                    if self.show_debug {
                        terminal.draw(|f| self.debug_component.draw(f))?;
                    }
                }
            }
        }

        #[cfg(not(debug_assertions))]
        while self.running {
            tokio::select! {
                Some(Ok(event)) = events.next() => self.handle_event(&event).await?,
                Some(app_event) = self.app_event_receiver.recv() => self.handle_app_event(app_event, terminal).await?,
                Ok(()) = state_changes.changed() => {
                    terminal.draw(|f| self.draw(f))?;
                }
            }
        }
        Ok(())
    }

    async fn handle_app_event(
        &mut self,
        app_event: AppEvent,
        terminal: &mut DefaultTerminal,
    ) -> Result<(), SnoobrowseError> {
        match app_event {
            AppEvent::Quit => self.running = false,
            AppEvent::Draw => {
                terminal.draw(|frame| self.draw(frame))?;
            }
            AppEvent::OpenPostList(feed) => {
                debug!("Opening {}", feed);
                self.postlist.load(feed);
                self.view = View::Postlist;
                terminal.draw(|frame| self.draw(frame))?;
            }
            AppEvent::ClosePostList => {
                self.view = View::Sublist;
                terminal.draw(|frame| self.draw(frame))?;
            }
            AppEvent::OpenPostDetail(post) => {
                debug!("Opening post {}", post.id);
                self.postdetail.load(post);
                self.view = View::PostDetail;
                terminal.draw(|frame| self.draw(frame))?;
            }
            AppEvent::ClosePostDetail => {
                self.postdetail.close();
                self.view = View::Postlist;
                terminal.draw(|frame| self.draw(frame))?;
            }
            #[cfg(debug_assertions)]
            AppEvent::ToggleShowDebug => {
                self.show_debug = !self.show_debug;
                self.app_event_sender.send(AppEvent::Draw).await?;
            }
        };
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        #[cfg(debug_assertions)]
        if self.show_debug {
            self.debug_component.draw(frame);
            return;
        }
        match self.view {
            View::Sublist => self.sublist.draw(frame),
            View::Postlist => self.postlist.draw(frame),
            View::PostDetail => self.postdetail.draw(frame),
        }
    }

    /// Typing into the sublist prompt must not trigger global keys.
    fn captures_input(&self) -> bool {
        self.view == View::Sublist && self.sublist.is_editing()
    }

    async fn handle_event(&mut self, event: &Event) -> Result<(), SnoobrowseError> {
        if self.captures_input() {
            return self.sublist.handle_event(event).await;
        }
        match event {
            Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                code: KeyCode::Char('q'),
                ..
            }) => self.app_event_sender.send(AppEvent::Quit).await?,
            #[cfg(debug_assertions)]
            Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                code: KeyCode::Char('`'),
                ..
            }) => {
                self.app_event_sender
                    .send(AppEvent::ToggleShowDebug)
                    .await?
            }
            Event::Resize(..) => self.app_event_sender.send(AppEvent::Draw).await?,
            _ => {
                #[cfg(debug_assertions)]
                if self.show_debug {
                    return self.debug_component.handle_event(event).await;
                }
                match self.view {
                    View::Sublist => self.sublist.handle_event(event).await?,
                    View::Postlist => self.postlist.handle_event(event).await?,
                    View::PostDetail => self.postdetail.handle_event(event).await?,
                }
            }
        }
        Ok(())
    }
}
