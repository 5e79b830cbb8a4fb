use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Stylize},
    text::Line,
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::model::comment::Comment;

const DELETED_AUTHOR: &str = "[deleted]";
const MAX_INDENT_DEPTH: u16 = 12;

pub struct CommentWidget {
    depth: u16,
    body_texts: Vec<String>,
    is_selected: bool,
    author: Option<String>,
    score: i64,
    is_upvoted: bool,
    created: DateTime<Utc>,
}

impl CommentWidget {
    pub fn new(depth: usize, comment: &Comment, is_selected: bool, container_width: u16) -> Self {
        let depth = depth.min(usize::from(MAX_INDENT_DEPTH)) as u16;
        let width = container_width.saturating_sub(depth * 2 + 1).max(8);
        let text_wrap = textwrap::wrap(&comment.body, textwrap::Options::new(width as usize));
        Self {
            depth,
            body_texts: text_wrap.into_iter().map(|v| v.into_owned()).collect(),
            is_selected,
            author: (!comment.is_deleted()).then(|| comment.author.clone()),
            score: comment.upvotes,
            is_upvoted: comment.is_upvoted,
            created: comment.created_at(),
        }
    }

    pub fn height(&self) -> usize {
        self.body_texts.len() + 2
    }
}

impl Widget for CommentWidget {
    fn render(self, area: ratatui::prelude::Rect, buf: &mut ratatui::prelude::Buffer)
    where
        Self: Sized,
    {
        let [_, area] =
            Layout::horizontal([Constraint::Length(self.depth * 2), Constraint::Fill(1)])
                .areas(area);
        let lines: Vec<Line> = self.body_texts.into_iter().map(Line::from).collect();
        let author = match self.author {
            Some(author) => author.bold(),
            None => DELETED_AUTHOR.dark_gray().italic(),
        };
        let score = if self.is_upvoted {
            format!("▲{}", self.score).fg(Color::LightRed)
        } else {
            format!("▲{}", self.score).into()
        };
        let mut item = Paragraph::new(lines).block(
            Block::new()
                .borders(Borders::LEFT | Borders::BOTTOM)
                .border_type(BorderType::Rounded)
                .title(Line::from(vec![
                    author,
                    format!(" • {}", HumanTime::from(self.created - Utc::now())).italic(),
                ]))
                .title_bottom(Line::from(score)),
        );
        if self.is_selected {
            item = item.fg(Color::Green);
        }
        item.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{buffer::Buffer, layout::Rect};

    use super::*;

    fn render(comment: &Comment) -> String {
        let widget = CommentWidget::new(0, comment, false, 40);
        let area = Rect::new(0, 0, 40, widget.height() as u16);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_deleted_comment_placeholder() {
        let text = render(&Comment {
            body: "[removed]".to_string(),
            ..Comment::default()
        });
        assert!(text.contains(DELETED_AUTHOR));
        assert!(text.contains("[removed]"));
    }

    #[test]
    fn test_author_and_wrapping() {
        let comment = Comment {
            author: "ferris".to_string(),
            body: "word ".repeat(20),
            upvotes: 42,
            ..Comment::default()
        };
        let widget = CommentWidget::new(3, &comment, true, 40);
        assert!(widget.height() > 3);
        let text = render(&comment);
        assert!(text.contains("ferris"));
        assert!(text.contains("▲42"));
    }

    #[test]
    fn test_narrow_container_does_not_underflow() {
        let comment = Comment {
            author: "a".to_string(),
            body: "text".to_string(),
            ..Comment::default()
        };
        let widget = CommentWidget::new(40, &comment, false, 4);
        assert_eq!(widget.depth, MAX_INDENT_DEPTH);
        assert!(widget.height() >= 3);

        let widget = CommentWidget::new(usize::from(u16::MAX) + 1, &comment, false, 40);
        assert_eq!(widget.depth, MAX_INDENT_DEPTH);
    }
}
