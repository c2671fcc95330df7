use std::time::{Duration, Instant};

use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::Paragraph,
    Frame,
};

const NOTICE_TTL: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient status-bar message
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    shown_at: Instant,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    /// Error notice from an error chain, outermost context first.
    pub fn error(err: &anyhow::Error) -> Self {
        Self::error_message(format!("{err:#}"))
    }

    pub fn error_message(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    /// Errors stay until replaced; successes fade.
    pub fn is_expired(&self) -> bool {
        self.kind == NoticeKind::Success && self.shown_at.elapsed() >= NOTICE_TTL
    }
}

/// Drop `notice` once it has expired.
pub fn expire(notice: &mut Option<Notice>) {
    if notice.as_ref().is_some_and(Notice::is_expired) {
        *notice = None;
    }
}

pub fn notice_spans(notice: &Notice) -> Spans<'_> {
    let (label, color) = match notice.kind {
        NoticeKind::Success => ("OK ", Color::Green),
        NoticeKind::Error => ("ERROR ", Color::Red),
    };
    Spans::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(notice.message.as_str(), Style::default().fg(color)),
    ])
}

pub fn render_notice<B: Backend>(frame: &mut Frame<B>, area: Rect, notice: Option<&Notice>) {
    let line = notice.map(notice_spans).unwrap_or_default();
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_keep_their_context() {
        let err = anyhow::anyhow!("connection refused").context("Failed to load Fuel Bills");
        let notice = Notice::error(&err);
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Failed to load Fuel Bills: connection refused");
        assert!(!notice.is_expired());
    }

    #[test]
    fn fresh_success_is_kept() {
        let mut notice = Some(Notice::success("Saved"));
        expire(&mut notice);
        assert!(notice.is_some());
    }
}
