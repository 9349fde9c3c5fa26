use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use super::{Card, CardStore, DatabaseError};
use crate::queue::QueueState;
use crate::record::{FieldRecord, SearchTerm};

/// Card store kept in memory. Used by tests and one-shot CLI lookups.
#[derive(Default)]
pub struct MemoryStore {
    cards: RwLock<HashMap<SearchTerm, Card>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_card<T>(
        &self,
        phrase: &SearchTerm,
        f: impl FnOnce(&mut Card) -> T,
    ) -> Result<T, DatabaseError> {
        let mut cards = self.cards.write().map_err(|_| DatabaseError::LockPoisoned)?;
        let card = cards
            .get_mut(phrase)
            .ok_or_else(|| DatabaseError::NotFound(phrase.to_string()))?;
        Ok(f(card))
    }
}

impl CardStore for MemoryStore {
    fn get_card(&self, phrase: &SearchTerm) -> Result<Option<Card>, DatabaseError> {
        let cards = self.cards.read().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(cards.get(phrase).cloned())
    }

    fn add_card(&self, phrase: &SearchTerm) -> Result<Card, DatabaseError> {
        let mut cards = self.cards.write().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(cards
            .entry(phrase.clone())
            .or_insert_with(|| Card::new(phrase.clone()))
            .clone())
    }

    fn set_state(&self, phrase: &SearchTerm, state: QueueState) -> Result<(), DatabaseError> {
        self.with_card(phrase, |card| card.state = state)
    }

    fn set_base_data(
        &self,
        phrase: &SearchTerm,
        data: &FieldRecord,
    ) -> Result<(), DatabaseError> {
        self.with_card(phrase, |card| {
            card.base_data = Some(data.clone());
            card.queried_at = Some(Utc::now());
            card.state = QueueState::Ready;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryStore::new();
        let casa = SearchTerm::new("casa");
        assert!(!store.contains(&casa).unwrap());

        store.add_card(&casa).unwrap();
        store.add_card(&casa).unwrap();
        assert_eq!(store.len(), 1);

        let mut record = FieldRecord::new();
        record.set_list(Field::Translation, ["Haus"]);
        store.set_base_data(&casa, &record).unwrap();

        let card = store.get_card(&casa).unwrap().unwrap();
        assert_eq!(card.state, QueueState::Ready);
        assert!(card.queried_at.is_some());
        assert_eq!(card.base_data, Some(record));
    }

    #[test]
    fn test_missing_card_updates_fail() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_state(&SearchTerm::new("x"), QueueState::Queued),
            Err(DatabaseError::NotFound(_))
        ));
    }
}
