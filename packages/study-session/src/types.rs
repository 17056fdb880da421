use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::CardId;

pub const MIN_CARD_COUNT: usize = 5;
pub const MAX_CARD_COUNT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterSet {
    #[default]
    Simplified,
    Traditional,
}

impl CharacterSet {
    pub fn audio_lang(&self) -> &'static str {
        match self {
            Self::Simplified => "zh-CN",
            Self::Traditional => "zh-TW",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "traditional" | "trad" | "zh-tw" => Self::Traditional,
            _ => Self::Simplified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayForms {
    pub simplified: String,
    pub traditional: String,
    pub pinyin: String,
}

impl DisplayForms {
    pub fn form(&self, charset: CharacterSet) -> &str {
        match charset {
            CharacterSet::Simplified => &self.simplified,
            CharacterSet::Traditional => &self.traditional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueMetadata {
    pub overdue_days: i64,
    pub streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyItem {
    pub card_id: CardId,
    pub level: u8,
    pub display_forms: DisplayForms,
    pub english: Vec<String>,
    pub is_new: bool,
    pub is_due: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_metadata: Option<DueMetadata>,
}

impl StudyItem {
    pub fn display_text(&self, charset: CharacterSet) -> &str {
        self.display_forms.form(charset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub card_id: CardId,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistics {
    pub total_cards: usize,
    pub cards_reviewed: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub new_cards_studied: usize,
    pub review_cards_studied: usize,
}

impl SessionStatistics {
    pub fn new(total_cards: usize) -> Self {
        Self { total_cards, ..Default::default() }
    }

    pub fn is_consistent(&self) -> bool {
        self.correct_count + self.incorrect_count == self.cards_reviewed
            && self.cards_reviewed <= self.total_cards
            && self.new_cards_studied + self.review_cards_studied == self.cards_reviewed
    }

    pub fn accuracy(&self) -> f64 {
        if self.cards_reviewed == 0 {
            return 0.0;
        }
        self.correct_count as f64 / self.cards_reviewed as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityFlags {
    pub scheduling_available: bool,
    pub audio_available: bool,
    pub image_available: bool,
    pub progress_available: bool,
}

impl CapabilityFlags {
    pub fn all() -> Self {
        Self {
            scheduling_available: true,
            audio_available: true,
            image_available: true,
            progress_available: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPreferences {
    pub level: u8,
    #[serde(default)]
    pub character_set: CharacterSet,
    pub card_count: usize,
    #[serde(default)]
    pub prefetch_enabled: Option<bool>,
}

impl SessionPreferences {
    pub fn new(level: u8, character_set: CharacterSet, card_count: usize) -> Self {
        Self { level, character_set, card_count, prefetch_enabled: None }
    }

    pub fn requested_count(&self) -> usize {
        self.card_count.clamp(MIN_CARD_COUNT, MAX_CARD_COUNT)
    }

    pub fn deck_id(&self) -> String {
        let charset = match self.character_set {
            CharacterSet::Simplified => "simplified",
            CharacterSet::Traditional => "traditional",
        };
        format!("hsk{}-{}", self.level, charset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
    First,
    Jump(usize),
}
