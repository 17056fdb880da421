use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaKey {
    pub kind: MediaKind,
    pub text: String,
}

impl MediaKey {
    pub fn audio(text: &str, lang: &str) -> Self {
        Self {
            kind: MediaKind::Audio,
            text: format!("{}:{}", lang.to_lowercase(), normalize_search_text(text)),
        }
    }

    pub fn image(term: &str) -> Self {
        Self {
            kind: MediaKind::Image,
            text: normalize_search_text(term),
        }
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.text)
    }
}

pub fn normalize_search_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
