use crate::types::{CharacterSet, StudyItem};

const MIN_TERM_CHARS: usize = 3;

const POS_MARKERS: &[&str] = &[
    "to ", "n. ", "v. ", "vt. ", "vi. ", "adj. ", "adv. ", "prep. ", "conj. ", "pron. ", "num. ",
    "interj. ", "part. ", "abbr. ", "mw ", "cl:", "classifier:", "measure word:",
];

const ARTICLES: &[&str] = &["a ", "an ", "the "];

const GENERIC_TERMS: &[&str] = &[
    "one", "thing", "things", "person", "people", "something", "someone", "used", "particle",
    "surname", "measure word", "classifier", "etc", "sth", "sb", "kind", "type",
];

/// Strips a dictionary gloss down to a short searchable phrase: bracketed
/// notes, everything after the first `;` or `,`, and leading part-of-speech
/// markers and articles are removed.
pub fn clean_gloss(gloss: &str) -> String {
    let mut depth = 0usize;
    let mut unbracketed = String::with_capacity(gloss.len());
    for c in gloss.chars() {
        match c {
            '(' | '[' | '（' | '【' => depth += 1,
            ')' | ']' | '）' | '】' => depth = depth.saturating_sub(1),
            _ if depth == 0 => unbracketed.push(c),
            _ => {}
        }
    }

    let head = unbracketed
        .split([';', ',', '；', '，'])
        .next()
        .unwrap_or_default();

    let mut term = collapse_whitespace(head);
    loop {
        let lower = term.to_lowercase();
        let prefix = POS_MARKERS
            .iter()
            .chain(ARTICLES.iter())
            .find(|marker| lower.starts_with(*marker));
        match prefix {
            Some(marker) => term = term[marker.len()..].trim_start().to_string(),
            None => break,
        }
    }

    term.trim_matches(|c: char| !c.is_alphanumeric()).to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_usable_term(term: &str) -> bool {
    if term.chars().count() < MIN_TERM_CHARS {
        return false;
    }
    let lower = term.to_lowercase();
    !GENERIC_TERMS.contains(&lower.as_str())
}

/// Image search term: first usable cleaned gloss among the primary and
/// secondary glosses, else a qualified fallback built from pinyin (or the
/// simplified form when pinyin is missing).
pub fn image_search_term(item: &StudyItem) -> String {
    for gloss in item.english.iter().take(2) {
        let cleaned = clean_gloss(gloss);
        if is_usable_term(&cleaned) {
            return cleaned;
        }
    }

    let base = if item.display_forms.pinyin.trim().is_empty() {
        item.display_forms.simplified.trim()
    } else {
        item.display_forms.pinyin.trim()
    };
    format!("{base} chinese character")
}

/// Audio lookup text and language for the active character set.
pub fn audio_search_term(item: &StudyItem, charset: CharacterSet) -> (String, &'static str) {
    (item.display_text(charset).trim().to_string(), charset.audio_lang())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CardId;
    use crate::types::DisplayForms;

    fn item(english: &[&str], pinyin: &str) -> StudyItem {
        StudyItem {
            card_id: CardId::derive(1, "一"),
            level: 1,
            display_forms: DisplayForms {
                simplified: "一".to_string(),
                traditional: "一".to_string(),
                pinyin: pinyin.to_string(),
            },
            english: english.iter().map(|s| s.to_string()).collect(),
            is_new: true,
            is_due: false,
            due_metadata: None,
        }
    }

    #[test]
    fn measure_word_gloss_is_stripped() {
        let cleaned = clean_gloss("(measure word) a; one");
        assert_eq!(cleaned, "a");
        assert!(!cleaned.contains('('));
        assert!(!cleaned.contains("one"));
        assert!(!is_usable_term(&cleaned));
    }

    #[test]
    fn removes_pos_markers_and_trailing_senses() {
        assert_eq!(clean_gloss("to love, to be fond of"), "love");
        assert_eq!(clean_gloss("n. water [liquid]"), "water");
        assert_eq!(clean_gloss("the sun; day"), "sun");
        assert_eq!(clean_gloss("  big   dog. "), "big dog");
    }

    #[test]
    fn secondary_gloss_is_tried() {
        let term = image_search_term(&item(&["(measure word) a; one", "single item"], "yī"));
        assert_eq!(term, "single item");
    }

    #[test]
    fn generic_terms_fall_back_to_qualified_term() {
        let term = image_search_term(&item(&["(measure word) a; one", "one"], "yī"));
        assert_eq!(term, "yī chinese character");

        let no_pinyin = image_search_term(&item(&[], ""));
        assert_eq!(no_pinyin, "一 chinese character");
    }

    #[test]
    fn audio_term_follows_character_set() {
        let mut it = item(&["one"], "yī");
        it.display_forms.traditional = "壹".to_string();
        assert_eq!(audio_search_term(&it, CharacterSet::Traditional), ("壹".to_string(), "zh-TW"));
        assert_eq!(audio_search_term(&it, CharacterSet::Simplified), ("一".to_string(), "zh-CN"));
    }
}
