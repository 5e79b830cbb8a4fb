use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use chrono_humanize::HumanTime;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use log::{debug, error, warn};
use ratatui::{
    layout::{Constraint, Flex, Layout, Position, Rect, Size},
    style::{Color, Modifier, Stylize},
    text::Line,
    widgets::{Block, BorderType, Paragraph, StatefulWidget, Widget},
};
use ratatui_image::{Resize, StatefulImage, picker::Picker, protocol::StatefulProtocol};
use tokio::sync::mpsc::Sender;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::{
    app::AppEvent,
    component::{Component, Vote},
    model::{
        comment::{Comment, convert_listing},
        datetime_from_secs,
        media::{EmbedHtml, EmbedProviders},
        post::{Post, PrimaryMedia, normalize_post},
    },
    reddit_api::{RawPost, RedditApi},
    snoobrowse_error::SnoobrowseError,
    state::{AppState, Store},
    widget::comment_widget::CommentWidget,
};

struct DetailImage {
    url: String,
    /// `None` until the download finished.
    protocol: Option<StatefulProtocol>,
}

pub struct PostDetailComponent {
    reddit_api: Arc<RedditApi>,
    store: Store<AppState>,
    app_event_sender: Sender<AppEvent>,
    picker: Arc<Picker>,
    embeds: bool,
    scroll_state: ScrollViewState,
    image: Arc<Mutex<Option<DetailImage>>>,
    selected: usize,
    follow_selection: bool,
    gallery_index: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PostDetailComponent {
    pub fn new(
        reddit_api: Arc<RedditApi>,
        store: Store<AppState>,
        picker: Arc<Picker>,
        embeds: bool,
        app_event_sender: Sender<AppEvent>,
    ) -> Self {
        Self {
            reddit_api,
            store,
            app_event_sender,
            picker,
            embeds,
            scroll_state: ScrollViewState::default(),
            image: Arc::new(Mutex::new(None)),
            selected: 0,
            follow_selection: false,
            gallery_index: 0,
        }
    }

    pub fn load(&mut self, post: Post) {
        let mut started = false;
        self.store.update(|state| started = state.begin_post(post.clone()));
        if !started {
            return;
        }
        self.scroll_state.scroll_to_top();
        self.selected = 0;
        self.gallery_index = 0;
        self.load_image(&post);

        tokio::spawn({
            let store = self.store.clone();
            let reddit_api = self.reddit_api.clone();
            let embeds = self.embeds;
            async move {
                match reddit_api.get_post_comments(&post.subreddit, &post.id).await {
                    Ok((raw_post, listing)) => {
                        let fresh = raw_post.and_then(|raw| normalize(&raw, embeds));
                        let comments = convert_listing(&listing);
                        debug!("Loaded {} top-level comments for {}", comments.len(), post.id);
                        store.update(|state| {
                            state.commit_comments(&post.id, fresh, comments);
                        });
                    }
                    Err(e) => {
                        error!("Could not load comments for {}: {}", post.id, e);
                        store.update(|state| {
                            state.commit_comments(&post.id, None, Vec::new());
                        });
                    }
                }
            }
        });
    }

    pub fn close(&mut self) {
        self.store.update(AppState::close_post);
        *lock(&self.image) = None;
    }

    fn load_image(&mut self, post: &Post) {
        let Some(url) = display_image(post, self.gallery_index) else {
            *lock(&self.image) = None;
            return;
        };
        {
            let mut image = lock(&self.image);
            if image.as_ref().is_some_and(|i| i.url == url) {
                return;
            }
            *image = Some(DetailImage {
                url: url.clone(),
                protocol: None,
            });
        }

        tokio::spawn({
            let image = self.image.clone();
            let reddit_api = self.reddit_api.clone();
            let picker = self.picker.clone();
            let app_event_sender = self.app_event_sender.clone();
            async move {
                let protocol = match fetch_image(&reddit_api, &picker, &url).await {
                    Ok(protocol) => protocol,
                    Err(e) => {
                        warn!("Could not load image {}: {}", url, e);
                        return;
                    }
                };
                {
                    let mut image = lock(&image);
                    match image.as_mut() {
                        Some(current) if current.url == url => current.protocol = Some(protocol),
                        _ => return,
                    }
                }
                if let Err(e) = app_event_sender.send(AppEvent::Draw).await {
                    error!("Could not request redraw: {}", e);
                }
            }
        });
    }

    fn current_post(&self) -> Option<Post> {
        self.store.read(|state| state.post.clone())
    }

    fn selected_comment(&self) -> Option<Comment> {
        self.store.read(|state| {
            state
                .comments
                .iter()
                .flat_map(|c| c.flatten())
                .nth(self.selected)
                .map(|(_, c)| c.clone())
        })
    }

    fn comment_count(&self) -> usize {
        self.store
            .read(|state| state.comments.iter().map(|c| c.flatten().len()).sum())
    }

    fn step_gallery(&mut self, forward: bool) {
        let Some(post) = self.current_post() else {
            return;
        };
        let len = post.image_list.len();
        if len < 2 {
            return;
        }
        self.gallery_index = if forward {
            (self.gallery_index + 1) % len
        } else {
            (self.gallery_index + len - 1) % len
        };
        self.load_image(&post);
    }
}

fn normalize(raw: &RawPost, embeds: bool) -> Option<Post> {
    let embed: Option<&dyn EmbedHtml> = if embeds { Some(&EmbedProviders) } else { None };
    normalize_post(raw, embed)
}

async fn fetch_image(
    reddit_api: &RedditApi,
    picker: &Picker,
    url: &str,
) -> Result<StatefulProtocol, SnoobrowseError> {
    let bytes = reddit_api.fetch_bytes(url).await?;
    let image_source = image::load_from_memory(&bytes)?;
    Ok(picker.new_resize_protocol(image_source))
}

/// The picture shown above the body: the current gallery image, the single
/// image, or the thumbnail for videos and links.
fn display_image(post: &Post, gallery_index: usize) -> Option<String> {
    if !post.image_list.is_empty() {
        return post.image_list.get(gallery_index % post.image_list.len()).cloned();
    }
    post.image_source.clone().or_else(|| post.thumbnail.clone())
}

fn media_line(post: &Post, gallery_index: usize) -> Option<String> {
    match post.primary_media() {
        PrimaryMedia::Iframe(_) => post
            .fallback_source
            .as_ref()
            .map(|url| format!("[embed] {} (o to open)", url)),
        PrimaryMedia::Gallery(images) => Some(format!(
            "[gallery {}/{}] n/p to browse",
            gallery_index % images.len() + 1,
            images.len()
        )),
        PrimaryMedia::Video(video) => Some(format!("[video] {} (o to open)", video.fallback_url)),
        PrimaryMedia::Image(_) | PrimaryMedia::None => None,
        PrimaryMedia::Link(url) => Some(format!("[link] {} (o to open)", url)),
    }
}

/// Scroll content is addressed in `u16` rows, anything past that is cut off.
fn clamp_rows(rows: usize) -> u16 {
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn meta_line(post: &Post) -> Line<'static> {
    let created = datetime_from_secs(post.created);
    let score = if post.is_upvoted {
        format!("▲{}", post.upvotes).fg(Color::LightRed)
    } else {
        format!("▲{}", post.upvotes).into()
    };
    Line::from(vec![
        format!("r/{} • u/{} • ", post.subreddit, post.author).italic(),
        score,
        format!(" • 💬{} • {}", post.num_comments, HumanTime::from(created - Utc::now())).italic(),
    ])
}

fn wrap_lines(text: &str, width: u16) -> Vec<Line<'static>> {
    textwrap::wrap(text, (width as usize).max(1))
        .into_iter()
        .map(|line| Line::from(line.into_owned()))
        .collect()
}

impl Component for PostDetailComponent {
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
                self.app_event_sender
                    .send(AppEvent::ClosePostDetail)
                    .await?;
            }
            'j' => {
                if self.selected + 1 < self.comment_count() {
                    self.selected += 1;
                    self.follow_selection = true;
                } else {
                    self.scroll_state.scroll_down();
                }
                self.app_event_sender.send(AppEvent::Draw).await?;
            }
            'k' => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.follow_selection = true;
                } else {
                    self.scroll_state.scroll_up();
                }
                self.app_event_sender.send(AppEvent::Draw).await?;
            }
            'n' => self.step_gallery(true),
            'p' => self.step_gallery(false),
            'u' => {
                if let Some(comment) = self.selected_comment() {
                    Vote::comment(&comment).spawn(self.reddit_api.clone(), self.store.clone());
                }
            }
            'U' => {
                if let Some(post) = self.current_post() {
                    Vote::post(&post).spawn(self.reddit_api.clone(), self.store.clone());
                }
            }
            'o' => {
                if let Some(post) = self.current_post() {
                    let target = post.open_target();
                    if let Err(e) = open::that(&target) {
                        warn!("Could not open {}: {}", target, e);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let root_area = frame.area();
        let root_buf = frame.buffer_mut();
        let (post, loading, comments) = self.store.read(|state| {
            (
                state.post.clone(),
                state.comments_loading,
                state.comments.clone(),
            )
        });

        let root_block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title_bottom("j/k: move  u/U: vote comment/post  o: open  h: back");
        let root_block_inner = root_block.inner(root_area);
        root_block.render(root_area, root_buf);

        let Some(post) = post else {
            return;
        };

        let [content_area, _] = Layout::horizontal([Constraint::Fill(1), Constraint::Length(1)])
            .areas(root_block_inner);
        let width = content_area.width;

        let title_lines = wrap_lines(&post.title, width);
        let media_lines = media_line(&post, self.gallery_index)
            .map(|line| wrap_lines(&line, width))
            .unwrap_or_default();
        let body_lines = wrap_lines(post.self_text.as_deref().unwrap_or_default(), width);

        let mut image_guard = lock(&self.image);
        let image_size = match image_guard.as_ref().and_then(|i| i.protocol.as_ref()) {
            Some(protocol) => {
                let bound = Rect::new(0, 0, width, root_block_inner.height / 2);
                protocol.size_for(Resize::Scale(None), bound)
            }
            None => Rect::ZERO,
        };

        let flattened: Vec<(usize, &Comment)> = comments.iter().flat_map(|c| c.flatten()).collect();
        let widgets: Vec<CommentWidget> = flattened
            .iter()
            .enumerate()
            .map(|(index, (depth, comment))| {
                CommentWidget::new(*depth, comment, index == self.selected, width)
            })
            .collect();

        let header_height = title_lines.len()
            + 1
            + media_lines.len()
            + usize::from(image_size.height)
            + 1
            + body_lines.len()
            + 1;
        let comments_height: usize = if loading || widgets.is_empty() {
            1
        } else {
            widgets.iter().map(CommentWidget::height).sum()
        };
        let content_height = clamp_rows(header_height.saturating_add(comments_height));

        let mut scrollview = ScrollView::new(Size::new(root_block_inner.width, content_height))
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);
        let scrollview_buf = scrollview.buf_mut();

        let mut y = 0u16;
        let mut next_area = |height: usize| {
            let height = clamp_rows(height).min(content_height - y);
            let area = Rect::new(0, y, width, height);
            y += height;
            area
        };

        let title_area = next_area(title_lines.len());
        Paragraph::new(title_lines)
            .add_modifier(Modifier::BOLD)
            .render(title_area, scrollview_buf);
        Paragraph::new(meta_line(&post)).render(next_area(1), scrollview_buf);
        let media_area = next_area(media_lines.len());
        Paragraph::new(media_lines)
            .fg(Color::Cyan)
            .render(media_area, scrollview_buf);

        let image_area = next_area(image_size.height.into());
        if let Some(protocol) = image_guard.as_mut().and_then(|i| i.protocol.as_mut()) {
            let [image_center] = Layout::horizontal([Constraint::Length(image_size.width)])
                .flex(Flex::Center)
                .areas(image_area);
            StatefulImage::new()
                .resize(Resize::Scale(None))
                .render(image_center, scrollview_buf, protocol);
        }
        drop(image_guard);

        next_area(1);
        let body_area = next_area(body_lines.len());
        Paragraph::new(body_lines).render(body_area, scrollview_buf);
        let separator = next_area(1);
        Paragraph::new("─".repeat(width as usize))
            .fg(Color::DarkGray)
            .render(separator, scrollview_buf);

        if loading {
            Paragraph::new("Loading comments...").render(next_area(1), scrollview_buf);
        } else if widgets.is_empty() {
            Paragraph::new("No comments").render(next_area(1), scrollview_buf);
        } else {
            for (index, widget) in widgets.into_iter().enumerate() {
                let area = next_area(widget.height());
                if area.height == 0 {
                    break;
                }
                if index == self.selected && self.follow_selection {
                    self.scroll_state
                        .set_offset(Position::new(0, area.y.saturating_sub(2)));
                    self.follow_selection = false;
                }
                widget.render(area, scrollview_buf);
            }
        }

        scrollview.render(root_block_inner, root_buf, &mut self.scroll_state);
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::mpsc;

    use super::*;
    use crate::model::media::VideoSource;

    #[test]
    fn test_clamp_rows() {
        assert_eq!(clamp_rows(12), 12);
        assert_eq!(clamp_rows(usize::from(u16::MAX)), u16::MAX);
        assert_eq!(clamp_rows(usize::MAX), u16::MAX);
    }

    #[test]
    fn test_draw_thread_taller_than_scroll_buffer() {
        let store = Store::new(AppState::default());
        let (sender, _receiver) = mpsc::channel(1);
        let mut detail = PostDetailComponent::new(
            Arc::new(RedditApi::new(None, None).unwrap()),
            store.clone(),
            Arc::new(Picker::from_fontsize((8, 16))),
            false,
            sender,
        );
        let comments: Vec<Comment> = (0..400)
            .map(|i| Comment {
                id: i.to_string(),
                author: "someone".into(),
                body: "word ".repeat(200),
                ..Comment::default()
            })
            .collect();
        store.update(|state| {
            state.post = Some(Post {
                id: "p".into(),
                title: "a long thread".into(),
                ..Post::default()
            });
            state.comments = comments;
        });

        let mut terminal = Terminal::new(TestBackend::new(12, 20)).unwrap();
        terminal.draw(|frame| detail.draw(frame)).unwrap();
    }

    #[test]
    fn test_display_image_prefers_gallery() {
        let mut post = Post {
            image_list: vec!["a".into(), "b".into(), "c".into()],
            image_source: Some("a".into()),
            thumbnail: Some("thumb".into()),
            ..Post::default()
        };
        assert_eq!(display_image(&post, 0).as_deref(), Some("a"));
        assert_eq!(display_image(&post, 4).as_deref(), Some("b"));

        post.image_list.clear();
        assert_eq!(display_image(&post, 4).as_deref(), Some("a"));
        post.image_source = None;
        assert_eq!(display_image(&post, 0).as_deref(), Some("thumb"));
        post.thumbnail = None;
        assert_eq!(display_image(&post, 0), None);
    }

    #[test]
    fn test_media_line() {
        let mut post = Post {
            fallback_source: Some("https://v.redd.it/x".into()),
            video_source: Some(VideoSource::from_url("https://v.redd.it/x".into())),
            ..Post::default()
        };
        assert_eq!(
            media_line(&post, 0).as_deref(),
            Some("[video] https://v.redd.it/x (o to open)")
        );
        post.image_list = vec!["a".into(), "b".into()];
        assert_eq!(media_line(&post, 3).as_deref(), Some("[gallery 2/2] n/p to browse"));
        post.image_list.clear();
        post.video_source = None;
        post.image_source = Some("https://i.redd.it/a.png".into());
        assert_eq!(media_line(&post, 0), None);
    }
}
