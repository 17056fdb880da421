use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::CharacterSet;

/// Idempotency key shared by every collaborator: `L{level}_{form}` where
/// `form` is the entry's display text under the active character set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn derive(level: u8, form: &str) -> Self {
        Self(format!("L{}_{}", level, form.trim()))
    }

    pub fn for_entry(level: u8, simplified: &str, traditional: &str, charset: CharacterSet) -> Self {
        let form = match charset {
            CharacterSet::Simplified => simplified,
            CharacterSet::Traditional => traditional,
        };
        Self::derive(level, form)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Level encoded in the key, `None` for keys not produced by [`CardId::derive`].
    pub fn level(&self) -> Option<u8> {
        let (level, form) = self.0.strip_prefix('L')?.split_once('_')?;
        if form.is_empty() {
            return None;
        }
        level.parse().ok()
    }

    pub fn form(&self) -> Option<&str> {
        self.level()?;
        self.0.split_once('_').map(|(_, form)| form)
    }

    pub fn belongs_to_level(&self, level: u8) -> bool {
        self.level() == Some(level)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CardId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(CardId::derive(1, "水"), CardId::derive(1, "水"));
        assert_eq!(CardId::derive(1, "水").as_str(), "L1_水");
        assert_ne!(CardId::derive(1, "水"), CardId::derive(2, "水"));
    }

    #[test]
    fn character_set_selects_form() {
        let simplified = CardId::for_entry(3, "汉语", "漢語", CharacterSet::Simplified);
        let traditional = CardId::for_entry(3, "汉语", "漢語", CharacterSet::Traditional);
        assert_eq!(simplified.as_str(), "L3_汉语");
        assert_eq!(traditional.as_str(), "L3_漢語");
    }

    #[test]
    fn level_parsing() {
        let id = CardId::from("L12_朋友");
        assert_eq!(id.level(), Some(12));
        assert_eq!(id.form(), Some("朋友"));
        assert!(id.belongs_to_level(12));
        assert!(!id.belongs_to_level(1));

        assert_eq!(CardId::from("word_123").level(), None);
        assert_eq!(CardId::from("L1_").level(), None);
        assert_eq!(CardId::from("Lx_水").level(), None);
    }
}
