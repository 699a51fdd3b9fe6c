//! Title block for the media currently previewed: title, optional AD/LIVE
//! badge and a "secondary • tertiary" subtitle.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaTitleKind {
    Ad,
    Live,
    #[default]
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaTitle {
    pub title: Option<String>,
    pub secondary: String,
    pub tertiary: String,
    pub kind: MediaTitleKind,
}

impl MediaTitleKind {
    /// Badge for a focused entry: trailers are promotional, a running preview is live
    pub fn for_entry(file_name: &str, playing: bool) -> Self {
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem)
            .to_lowercase();
        if stem.ends_with("trailer") || stem.contains("-trailer") {
            MediaTitleKind::Ad
        } else if playing {
            MediaTitleKind::Live
        } else {
            MediaTitleKind::Default
        }
    }
}

impl MediaTitle {
    pub fn new(title: Option<String>, secondary: impl Into<String>, tertiary: impl Into<String>) -> Self {
        Self {
            title,
            secondary: secondary.into(),
            tertiary: tertiary.into(),
            kind: MediaTitleKind::Default,
        }
    }

    pub fn with_kind(mut self, kind: MediaTitleKind) -> Self {
        self.kind = kind;
        self
    }

    /// Secondary and tertiary text, joined by a bullet only when both are present
    pub fn subtitle(&self) -> String {
        let mut subtitle = self.secondary.clone();
        if !self.secondary.is_empty() && !self.tertiary.is_empty() {
            subtitle.push_str(" • ");
        }
        subtitle.push_str(&self.tertiary);
        subtitle
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::with_capacity(3);

        if let Some(title) = &self.title {
            lines.push(Line::styled(
                title.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ));
        }
        lines.push(Line::from(""));

        let mut spans = Vec::new();
        if let Some(badge) = self.badge() {
            spans.push(badge);
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(self.subtitle(), Style::default().fg(Color::Gray)));
        lines.push(Line::from(spans));

        lines
    }

    fn badge(&self) -> Option<Span<'static>> {
        match self.kind {
            MediaTitleKind::Ad => Some(Span::styled(
                " AD ",
                Style::default().fg(Color::White).bg(Color::Rgb(0xFB, 0xC0, 0x2D)),
            )),
            MediaTitleKind::Live => Some(Span::styled(
                " LIVE ",
                Style::default().fg(Color::Black).bg(Color::Rgb(0xCC, 0x00, 0x00)),
            )),
            MediaTitleKind::Default => None,
        }
    }
}
