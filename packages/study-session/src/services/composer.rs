use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::clients::http::with_timeout;
use crate::clients::{DueCard, SchedulingService, ServiceKind};
use crate::identity::CardId;
use crate::types::{CapabilityFlags, DueMetadata, SessionPreferences, StudyItem};
use crate::vocabulary::{VocabularyEntry, VocabularyIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSource {
    /// Due cards from the Scheduling Service, topped up with random new cards.
    Scheduled { due_count: usize },
    /// Scheduling was not available for this session.
    Random,
    /// Scheduling was available but the due list could not be fetched.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ComposedQueue {
    pub items: Vec<StudyItem>,
    pub source: QueueSource,
}

pub struct SessionComposer {
    scheduling: Arc<dyn SchedulingService>,
    timeout: Duration,
}

impl SessionComposer {
    pub fn new(scheduling: Arc<dyn SchedulingService>, timeout: Duration) -> Self {
        Self { scheduling, timeout }
    }

    pub async fn compose(
        &self,
        vocabulary: &VocabularyIndex,
        prefs: &SessionPreferences,
        flags: &CapabilityFlags,
    ) -> ComposedQueue {
        let entries = vocabulary.entries_for_level(prefs.level);
        if entries.is_empty() {
            info!(level = prefs.level, "no vocabulary for level");
            return ComposedQueue { items: Vec::new(), source: QueueSource::Random };
        }

        let (due, source) = if flags.scheduling_available {
            match with_timeout(ServiceKind::Scheduling, self.timeout, self.scheduling.due_items()).await {
                Ok(due) => (Some(due), None),
                Err(err) => {
                    warn!(error = %err, "due list unavailable, falling back to random selection");
                    (None, Some(QueueSource::Fallback))
                }
            }
        } else {
            (None, Some(QueueSource::Random))
        };

        let mut rng = rand::rng();
        let items = compose_queue(entries, prefs, due.as_deref(), &mut rng);
        let source = source.unwrap_or_else(|| QueueSource::Scheduled {
            due_count: items.iter().filter(|i| i.is_due).count(),
        });

        info!(level = prefs.level, queued = items.len(), ?source, "session queue composed");
        ComposedQueue { items, source }
    }
}

/// Builds the queue: resolvable due cards of the level first (shuffled),
/// then distinct random entries of the level until the requested count or
/// the vocabulary is exhausted.
pub fn compose_queue<R>(
    entries: &[VocabularyEntry],
    prefs: &SessionPreferences,
    due: Option<&[DueCard]>,
    rng: &mut R,
) -> Vec<StudyItem>
where
    R: Rng + ?Sized,
{
    let requested = prefs.requested_count();
    let charset = prefs.character_set;

    let by_id: HashMap<CardId, &VocabularyEntry> = entries
        .iter()
        .map(|entry| (entry.card_id(charset), entry))
        .collect();

    let mut selected: HashSet<CardId> = HashSet::new();
    let mut due_items: Vec<StudyItem> = Vec::new();

    for card in due.unwrap_or_default() {
        if !card.card_id.belongs_to_level(prefs.level) {
            continue;
        }
        let Some(entry) = by_id.get(&card.card_id) else {
            debug!(card_id = %card.card_id, "due card not found in vocabulary, skipped");
            continue;
        };
        if !selected.insert(card.card_id.clone()) {
            continue;
        }

        let mut item = entry.to_study_item(charset);
        item.is_new = false;
        item.is_due = true;
        item.due_metadata = Some(DueMetadata {
            overdue_days: card.overdue_days,
            streak: card.streak,
        });
        due_items.push(item);
    }

    due_items.shuffle(rng);
    if due_items.len() > requested {
        for dropped in due_items.drain(requested..) {
            selected.remove(&dropped.card_id);
        }
    }

    let mut candidates: Vec<&VocabularyEntry> = Vec::new();
    let mut candidate_ids: HashSet<CardId> = HashSet::new();
    for entry in entries {
        let id = entry.card_id(charset);
        if !selected.contains(&id) && candidate_ids.insert(id) {
            candidates.push(entry);
        }
    }
    candidates.shuffle(rng);

    let remaining = requested - due_items.len();
    let new_items = candidates
        .into_iter()
        .take(remaining)
        .map(|entry| entry.to_study_item(charset));

    due_items.extend(new_items);
    due_items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CharacterSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entries(level: u8, n: usize) -> Vec<VocabularyEntry> {
        (0..n)
            .map(|i| VocabularyEntry {
                simplified: format!("字{i}"),
                traditional: format!("字{i}"),
                pinyin: format!("zi{i}"),
                english: vec![format!("word {i}")],
                level,
            })
            .collect()
    }

    fn due(id: &str, overdue_days: i64) -> DueCard {
        DueCard {
            card_id: CardId::from(id),
            streak: 2,
            total_reviews: 4,
            correct_reviews: 3,
            next_review_date: None,
            overdue_days,
        }
    }

    fn unique(items: &[StudyItem]) -> bool {
        let ids: HashSet<_> = items.iter().map(|i| i.card_id.clone()).collect();
        ids.len() == items.len()
    }

    #[test]
    fn small_level_yields_all_entries() {
        let vocab = entries(1, 10);
        let prefs = SessionPreferences::new(1, CharacterSet::Simplified, 20);
        let mut rng = StdRng::seed_from_u64(7);
        let queue = compose_queue(&vocab, &prefs, None, &mut rng);
        assert_eq!(queue.len(), 10);
        assert!(unique(&queue));
        assert!(queue.iter().all(|i| i.is_new && !i.is_due));
    }

    #[test]
    fn due_cards_come_first_and_unresolvable_are_skipped() {
        let vocab = entries(1, 30);
        let prefs = SessionPreferences::new(1, CharacterSet::Simplified, 10);
        let due_list = vec![
            due("L1_字3", 2),
            due("L1_不存在", 5),
            due("L2_字4", 1),
            due("L1_字5", 0),
            due("L1_字3", 2),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        let queue = compose_queue(&vocab, &prefs, Some(&due_list), &mut rng);

        assert_eq!(queue.len(), 10);
        assert!(unique(&queue));
        assert!(queue[0].is_due && queue[1].is_due);
        assert!(queue[2..].iter().all(|i| !i.is_due && i.is_new));
        let due_ids: HashSet<&str> = queue[..2].iter().map(|i| i.card_id.as_str()).collect();
        assert_eq!(due_ids, HashSet::from(["L1_字3", "L1_字5"]));
        assert!(queue[0].due_metadata.is_some());
    }

    #[test]
    fn due_overflow_is_truncated_to_requested_count() {
        let vocab = entries(1, 40);
        let prefs = SessionPreferences::new(1, CharacterSet::Simplified, 5);
        let due_list: Vec<DueCard> = (0..20).map(|i| due(&format!("L1_字{i}"), 1)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let queue = compose_queue(&vocab, &prefs, Some(&due_list), &mut rng);
        assert_eq!(queue.len(), 5);
        assert!(queue.iter().all(|i| i.is_due));
        assert!(unique(&queue));
    }

    #[test]
    fn empty_vocabulary_gives_empty_queue() {
        let prefs = SessionPreferences::new(4, CharacterSet::Simplified, 10);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(compose_queue(&[], &prefs, None, &mut rng).is_empty());
    }

    #[test]
    fn traditional_identity_collisions_are_not_duplicated() {
        let mut vocab = entries(1, 6);
        vocab.push(VocabularyEntry {
            simplified: "系".to_string(),
            traditional: "係".to_string(),
            pinyin: "xi".to_string(),
            english: vec![],
            level: 1,
        });
        vocab.push(VocabularyEntry {
            simplified: "系2".to_string(),
            traditional: "係".to_string(),
            pinyin: "xi".to_string(),
            english: vec![],
            level: 1,
        });
        let prefs = SessionPreferences::new(1, CharacterSet::Traditional, 50);
        let mut rng = StdRng::seed_from_u64(5);
        let queue = compose_queue(&vocab, &prefs, None, &mut rng);
        assert_eq!(queue.len(), 7);
        assert!(unique(&queue));
    }
}
