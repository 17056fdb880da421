use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::identity::CardId;
use crate::types::{GradeOutcome, SessionStatistics, StudyItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeChange {
    /// First verdict for the card in this session.
    First,
    /// Verdict flipped between correct and incorrect.
    Changed,
    /// Same verdict as recorded, re-sent because the last delivery failed.
    Resubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    InFlight,
    Unchanged,
    Submit(GradeChange),
}

/// In-session grading state: one active outcome per card, delivery markers
/// per `(card, verdict)` pair, the in-flight set and the running statistics.
/// Every mutation keeps `correct + incorrect == reviewed <= total`.
#[derive(Debug, Clone)]
pub struct GradeLedger {
    is_new: HashMap<CardId, bool>,
    graded: HashMap<CardId, GradeOutcome>,
    sent: HashSet<(CardId, bool)>,
    in_flight: HashSet<CardId>,
    stats: SessionStatistics,
}

impl GradeLedger {
    pub fn new(items: &[StudyItem]) -> Self {
        let is_new: HashMap<CardId, bool> = items
            .iter()
            .map(|item| (item.card_id.clone(), item.is_new))
            .collect();
        let stats = SessionStatistics::new(is_new.len());

        Self {
            is_new,
            graded: HashMap::new(),
            sent: HashSet::new(),
            in_flight: HashSet::new(),
            stats,
        }
    }

    pub fn contains_card(&self, card_id: &CardId) -> bool {
        self.is_new.contains_key(card_id)
    }

    /// Admits a verdict. Returns `None` for cards outside the session.
    /// `Submit` applies the statistics delta immediately and marks the card
    /// in flight until [`GradeLedger::complete`] is called.
    pub fn begin(&mut self, card_id: &CardId, is_correct: bool, at: DateTime<Utc>) -> Option<Admission> {
        let is_new = *self.is_new.get(card_id)?;

        if self.in_flight.contains(card_id) {
            return Some(Admission::InFlight);
        }

        let change = match self.graded.get(card_id).map(|o| o.is_correct) {
            Some(prev) if prev == is_correct => {
                if self.sent.contains(&(card_id.clone(), is_correct)) {
                    return Some(Admission::Unchanged);
                }
                GradeChange::Resubmitted
            }
            Some(_) => {
                if is_correct {
                    self.stats.incorrect_count -= 1;
                    self.stats.correct_count += 1;
                } else {
                    self.stats.correct_count -= 1;
                    self.stats.incorrect_count += 1;
                }
                self.sent.remove(&(card_id.clone(), !is_correct));
                GradeChange::Changed
            }
            None => {
                self.stats.cards_reviewed += 1;
                if is_correct {
                    self.stats.correct_count += 1;
                } else {
                    self.stats.incorrect_count += 1;
                }
                if is_new {
                    self.stats.new_cards_studied += 1;
                } else {
                    self.stats.review_cards_studied += 1;
                }
                GradeChange::First
            }
        };

        if change != GradeChange::Resubmitted {
            self.graded.insert(
                card_id.clone(),
                GradeOutcome {
                    card_id: card_id.clone(),
                    is_correct,
                    timestamp: at,
                },
            );
        }
        self.in_flight.insert(card_id.clone());
        Some(Admission::Submit(change))
    }

    /// Releases the in-flight mark. A delivered pair is marked sent; an
    /// undelivered one has its marker cleared so a later call retries it.
    pub fn complete(&mut self, card_id: &CardId, is_correct: bool, delivered: bool) {
        self.in_flight.remove(card_id);
        let key = (card_id.clone(), is_correct);
        if delivered {
            self.sent.insert(key);
        } else {
            self.sent.remove(&key);
        }
    }

    /// Marks the card in flight for a non-grading request such as a reset.
    /// `None` for cards outside the session, `Some(false)` when busy.
    pub fn reserve(&mut self, card_id: &CardId) -> Option<bool> {
        if !self.contains_card(card_id) {
            return None;
        }
        Some(self.in_flight.insert(card_id.clone()))
    }

    pub fn release(&mut self, card_id: &CardId) {
        self.in_flight.remove(card_id);
    }

    /// Drops the card's outcome and reverses its contribution to the
    /// statistics. Returns the withdrawn outcome.
    pub fn withdraw(&mut self, card_id: &CardId) -> Option<GradeOutcome> {
        let outcome = self.graded.remove(card_id)?;
        let is_new = self.is_new.get(card_id).copied().unwrap_or(true);

        self.stats.cards_reviewed -= 1;
        if outcome.is_correct {
            self.stats.correct_count -= 1;
        } else {
            self.stats.incorrect_count -= 1;
        }
        if is_new {
            self.stats.new_cards_studied -= 1;
        } else {
            self.stats.review_cards_studied -= 1;
        }

        self.sent.remove(&(card_id.clone(), true));
        self.sent.remove(&(card_id.clone(), false));
        Some(outcome)
    }

    pub fn is_in_flight(&self, card_id: &CardId) -> bool {
        self.in_flight.contains(card_id)
    }

    pub fn is_sent(&self, card_id: &CardId, is_correct: bool) -> bool {
        self.sent.contains(&(card_id.clone(), is_correct))
    }

    pub fn outcome(&self, card_id: &CardId) -> Option<&GradeOutcome> {
        self.graded.get(card_id)
    }

    /// Recorded outcomes that were never delivered and are not in flight.
    pub fn unsent(&self) -> Vec<GradeOutcome> {
        let mut pending: Vec<GradeOutcome> = self
            .graded
            .values()
            .filter(|o| !self.in_flight.contains(&o.card_id))
            .filter(|o| !self.sent.contains(&(o.card_id.clone(), o.is_correct)))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        pending
    }

    pub fn outcomes(&self) -> Vec<GradeOutcome> {
        let mut outcomes: Vec<GradeOutcome> = self.graded.values().cloned().collect();
        outcomes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.card_id.cmp(&b.card_id)));
        outcomes
    }

    pub fn statistics(&self) -> SessionStatistics {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyEntry;
    use crate::types::CharacterSet;

    fn items() -> Vec<StudyItem> {
        let mut due = VocabularyEntry {
            simplified: "水".to_string(),
            traditional: "水".to_string(),
            pinyin: "shuǐ".to_string(),
            english: vec!["water".to_string()],
            level: 1,
        }
        .to_study_item(CharacterSet::Simplified);
        due.is_new = false;
        due.is_due = true;

        let fresh = VocabularyEntry {
            simplified: "火".to_string(),
            traditional: "火".to_string(),
            pinyin: "huǒ".to_string(),
            english: vec!["fire".to_string()],
            level: 1,
        }
        .to_study_item(CharacterSet::Simplified);

        vec![due, fresh]
    }

    fn submit(ledger: &mut GradeLedger, id: &str, v: bool, delivered: bool) -> Option<Admission> {
        let card = CardId::from(id);
        let admission = ledger.begin(&card, v, Utc::now());
        if let Some(Admission::Submit(_)) = admission {
            ledger.complete(&card, v, delivered);
        }
        admission
    }

    #[test]
    fn first_grade_counts_review_and_kind() {
        let mut ledger = GradeLedger::new(&items());
        assert_eq!(submit(&mut ledger, "L1_水", true, true), Some(Admission::Submit(GradeChange::First)));
        assert_eq!(submit(&mut ledger, "L1_火", false, true), Some(Admission::Submit(GradeChange::First)));

        let stats = ledger.statistics();
        assert_eq!(stats.total_cards, 2);
        assert_eq!(stats.cards_reviewed, 2);
        assert_eq!(stats.correct_count, 1);
        assert_eq!(stats.incorrect_count, 1);
        assert_eq!(stats.review_cards_studied, 1);
        assert_eq!(stats.new_cards_studied, 1);
    }

    #[test]
    fn same_verdict_twice_is_noop() {
        let mut ledger = GradeLedger::new(&items());
        submit(&mut ledger, "L1_水", true, true);
        let before = ledger.statistics();
        assert_eq!(submit(&mut ledger, "L1_水", true, true), Some(Admission::Unchanged));
        assert_eq!(ledger.statistics(), before);
    }

    #[test]
    fn flipped_verdict_shifts_one_unit() {
        let mut ledger = GradeLedger::new(&items());
        submit(&mut ledger, "L1_水", true, true);
        assert_eq!(submit(&mut ledger, "L1_水", false, true), Some(Admission::Submit(GradeChange::Changed)));

        let stats = ledger.statistics();
        assert_eq!(stats.cards_reviewed, 1);
        assert_eq!(stats.correct_count, 0);
        assert_eq!(stats.incorrect_count, 1);
        assert!(!ledger.is_sent(&CardId::from("L1_水"), true));
        assert!(ledger.is_sent(&CardId::from("L1_水"), false));
    }

    #[test]
    fn failed_delivery_allows_resubmission_without_recount() {
        let mut ledger = GradeLedger::new(&items());
        submit(&mut ledger, "L1_水", true, false);
        assert_eq!(ledger.unsent().len(), 1);

        assert_eq!(
            submit(&mut ledger, "L1_水", true, true),
            Some(Admission::Submit(GradeChange::Resubmitted))
        );
        assert_eq!(ledger.statistics().cards_reviewed, 1);
        assert!(ledger.unsent().is_empty());
    }

    #[test]
    fn in_flight_card_rejects_second_request() {
        let mut ledger = GradeLedger::new(&items());
        let card = CardId::from("L1_水");
        assert!(matches!(ledger.begin(&card, true, Utc::now()), Some(Admission::Submit(_))));
        assert_eq!(ledger.begin(&card, false, Utc::now()), Some(Admission::InFlight));
        ledger.complete(&card, true, true);
        assert!(!ledger.is_in_flight(&card));
    }

    #[test]
    fn unknown_card_is_not_admitted() {
        let mut ledger = GradeLedger::new(&items());
        assert_eq!(ledger.begin(&CardId::from("L9_无"), true, Utc::now()), None);
        assert_eq!(ledger.statistics().cards_reviewed, 0);
    }

    #[test]
    fn reserved_card_blocks_grading_until_released() {
        let mut ledger = GradeLedger::new(&items());
        let card = CardId::from("L1_火");

        assert_eq!(ledger.reserve(&card), Some(true));
        assert_eq!(ledger.reserve(&card), Some(false));
        assert_eq!(ledger.begin(&card, true, Utc::now()), Some(Admission::InFlight));
        assert_eq!(ledger.statistics().cards_reviewed, 0);

        ledger.release(&card);
        assert_eq!(ledger.begin(&card, true, Utc::now()), Some(Admission::Submit(GradeChange::First)));
        assert_eq!(ledger.reserve(&CardId::from("L9_无")), None);
    }

    #[test]
    fn withdraw_reverses_statistics() {
        let mut ledger = GradeLedger::new(&items());
        submit(&mut ledger, "L1_水", false, true);
        let withdrawn = ledger.withdraw(&CardId::from("L1_水")).unwrap();
        assert!(!withdrawn.is_correct);
        assert_eq!(ledger.statistics(), SessionStatistics::new(2));
        assert!(ledger.withdraw(&CardId::from("L1_水")).is_none());
    }
}
