//! Card repository: `CardStore` on top of the `cards` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Card, CardStore, Database, DatabaseError};
use crate::queue::QueueState;
use crate::record::{FieldRecord, SearchTerm};

/// A raw card row from the database.
#[derive(Debug, Clone)]
struct CardRow {
    phrase: String,
    state: String,
    base_data: Option<String>,
    queried_at: Option<String>,
}

impl CardRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            phrase: row.get("phrase")?,
            state: row.get("state")?,
            base_data: row.get("base_data")?,
            queried_at: row.get("queried_at")?,
        })
    }

    fn into_card(self) -> Result<Card, DatabaseError> {
        let state = QueueState::parse(&self.state).unwrap_or_else(|| {
            log::warn!(
                "Unknown card state '{}' for '{}', defaulting to waiting",
                self.state,
                self.phrase
            );
            QueueState::Waiting
        });
        let base_data = self
            .base_data
            .as_deref()
            .map(serde_json::from_str::<FieldRecord>)
            .transpose()
            .map_err(|e| DatabaseError::BaseData {
                phrase: self.phrase.clone(),
                source: e,
            })?;
        let queried_at = self.queried_at.as_deref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| log::warn!("Failed to parse queried_at '{}': {}", s, e))
                .ok()
        });

        Ok(Card {
            phrase: SearchTerm::new(&self.phrase),
            state,
            base_data,
            queried_at,
        })
    }
}

fn find(db: &Database, phrase: &SearchTerm) -> Result<Option<CardRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT phrase, state, base_data, queried_at FROM cards WHERE phrase = ?1",
                params![phrase.as_str()],
                CardRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Phrases stored with the given state, alphabetically.
pub fn phrases_with_state(
    db: &Database,
    state: QueueState,
) -> Result<Vec<SearchTerm>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT phrase FROM cards WHERE state = ?1 ORDER BY phrase")?;
        let phrases = stmt
            .query_map(params![state.as_str()], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(phrases.iter().map(|p| SearchTerm::new(p)).collect())
    })
}

impl CardStore for Database {
    fn get_card(&self, phrase: &SearchTerm) -> Result<Option<Card>, DatabaseError> {
        find(self, phrase)?.map(CardRow::into_card).transpose()
    }

    fn add_card(&self, phrase: &SearchTerm) -> Result<Card, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO cards (phrase, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![phrase.as_str(), QueueState::Waiting.as_str(), now],
            )?;
            Ok(())
        })?;
        self.get_card(phrase)?
            .ok_or_else(|| DatabaseError::NotFound(phrase.to_string()))
    }

    fn set_state(&self, phrase: &SearchTerm, state: QueueState) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE cards SET state = ?2, updated_at = ?3 WHERE phrase = ?1",
                params![phrase.as_str(), state.as_str(), now],
            )?)
        })?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(phrase.to_string()));
        }
        Ok(())
    }

    fn set_base_data(
        &self,
        phrase: &SearchTerm,
        data: &FieldRecord,
    ) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(data).map_err(|e| DatabaseError::BaseData {
            phrase: phrase.to_string(),
            source: e,
        })?;
        let now = Utc::now().to_rfc3339();
        let updated = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE cards SET base_data = ?2, queried_at = ?3, state = ?4, updated_at = ?3
                 WHERE phrase = ?1",
                params![phrase.as_str(), json, now, QueueState::Ready.as_str()],
            )?)
        })?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(phrase.to_string()));
        }
        log::debug!("Stored base data for '{}'", phrase);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, FieldValue};

    fn record() -> FieldRecord {
        let mut record = FieldRecord::new();
        record.set_list(Field::Translation, ["Haus"]);
        record.set_text(Field::Gender, "f");
        record.set_untranslated_list(Field::Synonym, vec!["lar".into()]);
        record
    }

    #[test]
    fn test_add_card_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let casa = SearchTerm::new("casa");

        let card = db.add_card(&casa).unwrap();
        assert_eq!(card.state, QueueState::Waiting);
        assert!(!card.has_base_data());

        db.set_state(&casa, QueueState::Queued).unwrap();
        let again = db.add_card(&casa).unwrap();
        assert_eq!(again.state, QueueState::Queued);
    }

    #[test]
    fn test_set_base_data_marks_ready() {
        let db = Database::open_in_memory().unwrap();
        let casa = SearchTerm::new("casa");
        db.add_card(&casa).unwrap();

        db.set_base_data(&casa, &record()).unwrap();

        let card = db.get_card(&casa).unwrap().unwrap();
        assert_eq!(card.state, QueueState::Ready);
        assert!(card.queried_at.is_some());
        let data = card.base_data.unwrap();
        assert_eq!(data, record());
        assert_eq!(
            data.field(Field::SynonymTrans),
            Some(&FieldValue::List(vec![None]))
        );
    }

    #[test]
    fn test_updates_on_missing_card_fail() {
        let db = Database::open_in_memory().unwrap();
        let ghost = SearchTerm::new("fantasma");

        assert!(matches!(
            db.set_state(&ghost, QueueState::Ready),
            Err(DatabaseError::NotFound(_))
        ));
        assert!(matches!(
            db.set_base_data(&ghost, &record()),
            Err(DatabaseError::NotFound(_))
        ));
        assert_eq!(db.get_card(&ghost).unwrap(), None);
    }

    #[test]
    fn test_phrases_with_state() {
        let db = Database::open_in_memory().unwrap();
        for word in ["mesa", "casa", "livro"] {
            let term = SearchTerm::new(word);
            db.add_card(&term).unwrap();
            db.set_state(&term, QueueState::Queued).unwrap();
        }
        db.set_state(&SearchTerm::new("livro"), QueueState::Error)
            .unwrap();

        assert_eq!(
            phrases_with_state(&db, QueueState::Queued).unwrap(),
            vec![SearchTerm::new("casa"), SearchTerm::new("mesa")]
        );
    }
}
