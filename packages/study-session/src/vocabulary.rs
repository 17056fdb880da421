use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::CardId;
use crate::types::{CharacterSet, DisplayForms, StudyItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub simplified: String,
    #[serde(default)]
    pub traditional: String,
    #[serde(default)]
    pub pinyin: String,
    #[serde(default)]
    pub english: Vec<String>,
    pub level: u8,
}

impl VocabularyEntry {
    pub fn card_id(&self, charset: CharacterSet) -> CardId {
        CardId::for_entry(self.level, &self.simplified, self.traditional_or_simplified(), charset)
    }

    fn traditional_or_simplified(&self) -> &str {
        if self.traditional.trim().is_empty() {
            &self.simplified
        } else {
            &self.traditional
        }
    }

    pub fn display_forms(&self) -> DisplayForms {
        DisplayForms {
            simplified: self.simplified.clone(),
            traditional: self.traditional_or_simplified().to_string(),
            pinyin: self.pinyin.clone(),
        }
    }

    pub fn to_study_item(&self, charset: CharacterSet) -> StudyItem {
        StudyItem {
            card_id: self.card_id(charset),
            level: self.level,
            display_forms: self.display_forms(),
            english: self.english.clone(),
            is_new: true,
            is_due: false,
            due_metadata: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read vocabulary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid vocabulary JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-level vocabulary lists as supplied by the static data loader.
#[derive(Debug, Clone, Default)]
pub struct VocabularyIndex {
    levels: BTreeMap<u8, Vec<VocabularyEntry>>,
}

impl VocabularyIndex {
    pub fn from_entries(entries: impl IntoIterator<Item = VocabularyEntry>) -> Self {
        let mut levels: BTreeMap<u8, Vec<VocabularyEntry>> = BTreeMap::new();
        let mut seen: HashSet<(u8, String)> = HashSet::new();

        for entry in entries {
            let simplified = entry.simplified.trim();
            if simplified.is_empty() {
                continue;
            }
            if !seen.insert((entry.level, simplified.to_string())) {
                tracing::debug!(level = entry.level, word = %simplified, "duplicate vocabulary entry dropped");
                continue;
            }
            levels.entry(entry.level).or_default().push(entry);
        }

        Self { levels }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, VocabularyError> {
        let entries: Vec<VocabularyEntry> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries))
    }

    pub async fn load(path: &Path) -> Result<Self, VocabularyError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let index = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), levels = index.levels.len(), words = index.len(), "vocabulary loaded");
        Ok(index)
    }

    pub fn entries_for_level(&self, level: u8) -> &[VocabularyEntry] {
        self.levels.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.levels.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
