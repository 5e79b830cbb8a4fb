use std::{borrow::Cow, sync::Arc};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use log::{debug, error, warn};
use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout},
    style::{Color, Modifier, Stylize},
    text::{Line, Text},
    widgets::{Block, BorderType, Paragraph, StatefulWidget, Widget},
};
use tokio::sync::mpsc::Sender;
use tui_widget_list::{ListBuilder, ListState, ListView};

use crate::{
    app::AppEvent,
    component::{Component, Vote},
    model::{
        media::{EmbedHtml, EmbedProviders},
        post::{Post, PrimaryMedia, normalize_listing},
    },
    reddit_api::{Feed, Listing, RawPost, RedditApi},
    snoobrowse_error::SnoobrowseError,
    state::{AppState, Store},
};

const BODY_PREVIEW_LINES: usize = 4;

pub struct PostlistComponent {
    reddit_api: Arc<RedditApi>,
    store: Store<AppState>,
    app_event_sender: Sender<AppEvent>,
    sort: String,
    embeds: bool,
    list_state: ListState,
}

impl PostlistComponent {
    pub fn new(
        reddit_api: Arc<RedditApi>,
        store: Store<AppState>,
        sort: String,
        embeds: bool,
        app_event_sender: Sender<AppEvent>,
    ) -> Self {
        Self {
            reddit_api,
            store,
            app_event_sender,
            sort,
            embeds,
            list_state: ListState::default(),
        }
    }

    pub fn load(&mut self, feed: Feed) {
        let mut started = false;
        self.store.update(|state| started = state.begin_feed(&feed));
        if !started {
            return;
        }
        self.list_state.select(Some(0));

        tokio::spawn({
            let store = self.store.clone();
            let reddit_api = self.reddit_api.clone();
            let sort = self.sort.clone();
            let embeds = self.embeds;
            async move {
                match reddit_api.get_posts(&feed, &sort).await {
                    Ok(listing) => {
                        let posts = normalize(&listing, embeds);
                        debug!("Loaded {} posts from {}", posts.len(), feed);
                        store.update(|state| {
                            state.commit_posts(&feed, posts);
                        });
                    }
                    Err(e) => {
                        error!("Could not load {}: {}", feed, e);
                        store.update(|state| {
                            state.commit_posts(&feed, Vec::new());
                        });
                    }
                }
            }
        });
    }

    fn reload(&mut self) {
        let feed = self.store.read(|state| state.feed.clone());
        if let Some(feed) = feed {
            self.store.update(|state| state.posts.clear());
            self.load(feed);
        }
    }

    fn selected_post(&self) -> Option<Post> {
        let index = self.list_state.selected?;
        self.store.read(|state| state.posts.get(index).cloned())
    }
}

fn normalize(listing: &Listing<RawPost>, embeds: bool) -> Vec<Post> {
    let embed: Option<&dyn EmbedHtml> = if embeds { Some(&EmbedProviders) } else { None };
    normalize_listing(listing, embed)
}

impl Component for PostlistComponent {
    async fn handle_event(&mut self, event: &Event) -> Result<(), SnoobrowseError> {
        let Event::Key(KeyEvent {
            code: KeyCode::Char(char),
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return Ok(());
        };
        match char {
            'h' => {
                self.list_state.select(Some(0));
                self.app_event_sender.send(AppEvent::ClosePostList).await?;
            }
            'j' => {
                self.list_state.next();
                self.app_event_sender.send(AppEvent::Draw).await?
            }
            'k' => {
                self.list_state.previous();
                self.app_event_sender.send(AppEvent::Draw).await?
            }
            'l' => {
                if let Some(post) = self.selected_post() {
                    self.app_event_sender
                        .send(AppEvent::OpenPostDetail(post))
                        .await?
                }
            }
            'u' => {
                if let Some(post) = self.selected_post() {
                    Vote::post(&post).spawn(self.reddit_api.clone(), self.store.clone());
                }
            }
            'o' => {
                if let Some(post) = self.selected_post() {
                    let target = post.open_target();
                    if let Err(e) = open::that(&target) {
                        warn!("Could not open {}: {}", target, e);
                    }
                }
            }
            'r' => self.reload(),
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let buf = frame.buffer_mut();
        let (title, loading, posts) = self.store.read(|state| {
            (
                state.feed.as_ref().map(Feed::to_string).unwrap_or_default(),
                state.posts_loading,
                state.posts.clone(),
            )
        });
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(title)
            .title_bottom("l: open  u: vote  o: link  r: reload  h: back");
        if loading {
            block.render(area, buf);
            let text = Text::raw("Loading...");
            let [area] = Layout::vertical([Constraint::Length(text.height() as u16)])
                .flex(Flex::Center)
                .areas(area);
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .render(area, buf);
        } else {
            let item_len = posts.len();
            let builder = ListBuilder::new(move |ctx| {
                let width = ctx.cross_axis_size as usize;
                let mut post_item = match posts.get(ctx.index) {
                    Some(post) => PostItem::new(post, width),
                    None => PostItem::default(),
                };
                if ctx.is_selected {
                    post_item.set_background(Color::DarkGray);
                }
                let height = post_item.height();
                (post_item, height as u16)
            });
            let list = ListView::new(builder, item_len).block(block);
            StatefulWidget::render(list, area, buf, &mut self.list_state);
        }
    }
}

/// Short tag for what the post leads with.
fn media_label(post: &Post) -> Option<String> {
    match post.primary_media() {
        PrimaryMedia::Iframe(_) => Some("embed".to_string()),
        PrimaryMedia::Gallery(images) => Some(format!("gallery ({})", images.len())),
        PrimaryMedia::Video(video) if video.is_gif => Some("gif".to_string()),
        PrimaryMedia::Video(_) => Some("video".to_string()),
        PrimaryMedia::Image(_) => Some("image".to_string()),
        PrimaryMedia::Link(link) => Some(format!("link {}", link)),
        PrimaryMedia::None => None,
    }
}

#[derive(Default)]
pub struct PostItem {
    pub username: String,
    pub title_lines: Vec<String>,
    pub media: Option<String>,
    pub body_lines: Vec<String>,
    pub background: Option<Color>,
    pub score: i64,
    pub is_upvoted: bool,
    pub num_comments: u64,
}

impl PostItem {
    pub fn new(post: &Post, width: usize) -> Self {
        let width = width.max(1);
        let username = post.author.clone();
        let title_lines = textwrap::wrap(&post.title, width)
            .iter()
            .map(|i| i.to_string())
            .collect();
        let body = post.self_text.as_deref().unwrap_or_default();
        let mut body_wrap = textwrap::wrap(body, width);
        if body_wrap.len() > BODY_PREVIEW_LINES {
            body_wrap.truncate(BODY_PREVIEW_LINES);
            let last = BODY_PREVIEW_LINES - 1;
            let mut new_last = body_wrap[last].to_string();
            if new_last.chars().count() > 3 {
                let keep = new_last.chars().count() - 3;
                new_last = new_last.chars().take(keep).collect::<String>() + "...";
            } else {
                new_last = "...".to_string();
            }
            body_wrap[last] = Cow::Owned(new_last);
        }
        let body_lines = body_wrap.iter().map(|i| i.to_string()).collect();

        Self {
            username,
            title_lines,
            media: media_label(post),
            body_lines,
            background: None,
            score: post.upvotes,
            is_upvoted: post.is_upvoted,
            num_comments: post.num_comments,
        }
    }

    pub fn height(&self) -> usize {
        self.title_lines.len()
         + self.media.is_some() as usize
         + 1 //Spacing
         + self.body_lines.len()
         + 2 //block border
    }

    fn set_background(&mut self, background: Color) {
        self.background = Some(background);
    }
}

impl Widget for PostItem {
    fn render(self, area: ratatui::prelude::Rect, buf: &mut ratatui::prelude::Buffer)
    where
        Self: Sized,
    {
        let score = if self.is_upvoted {
            format!("▲{}", self.score).fg(Color::LightRed)
        } else {
            format!("▲{}", self.score).into()
        };
        let mut block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(format!("u/{}", self.username).italic())
            .title_bottom(Line::from(score))
            .title_bottom(format!("💬{}", self.num_comments));

        if let Some(background) = self.background {
            block = block.bg(background);
        }

        let media_height = self.media.is_some() as u16;
        let [title_area, media_area, body_area] = Layout::vertical([
            Constraint::Length(self.title_lines.len() as u16),
            Constraint::Length(media_height),
            Constraint::Fill(1),
        ])
        .areas(block.inner(area));
        block.render(area, buf);

        Paragraph::new(
            self.title_lines
                .into_iter()
                .map(Line::from)
                .collect::<Vec<Line>>(),
        )
        .add_modifier(Modifier::BOLD)
        .render(title_area, buf);
        if let Some(media) = self.media {
            Paragraph::new(format!("[{}]", media))
                .fg(Color::Cyan)
                .render(media_area, buf);
        }
        let [_, body_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(body_area);
        Paragraph::new(
            self.body_lines
                .into_iter()
                .map(Line::from)
                .collect::<Vec<Line>>(),
        )
        .render(body_area, buf);
    }
}
