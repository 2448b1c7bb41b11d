//! Question Mapper
//!
//! Assigns stable `q<index>` keys to generated questions so answers can be
//! exchanged by key and translated back to question text before refinement.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::QuestionSet;

/// One key → question entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedQuestion {
    pub key: String,
    pub text: String,
    #[serde(default = "required_by_default")]
    pub required: bool,
}

fn required_by_default() -> bool {
    true
}

/// Accepted JSON forms: the ordered entry array, or a `{key: text}` object
#[derive(Deserialize)]
#[serde(untagged)]
enum MappingWire {
    Entries(Vec<MappedQuestion>),
    Texts(BTreeMap<String, String>),
}

/// Ordered mapping from question key to question text
///
/// Keys are unique and entries stay in question order. Serialized as a JSON
/// array of `{key, text, required}` objects; `required` defaults to true.
/// A plain `{key: text}` object is also accepted, ordered by question index,
/// with every question required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MappingWire", into = "Vec<MappedQuestion>")]
pub struct QuestionKeyMapping {
    entries: Vec<MappedQuestion>,
}

impl QuestionKeyMapping {
    /// Key for the question at `index`
    pub fn key_for(index: usize) -> String {
        format!("q{}", index)
    }

    /// Build the mapping for a question set, in order
    pub fn from_questions(set: &QuestionSet) -> Self {
        debug!(question_count = set.len(), "QuestionKeyMapping::from_questions: called");
        let entries = set
            .iter()
            .enumerate()
            .map(|(i, q)| MappedQuestion {
                key: Self::key_for(i),
                text: q.text.clone(),
                required: q.required,
            })
            .collect();
        Self { entries }
    }

    /// Original question text for `key`
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.get(key).map(|e| e.text.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&MappedQuestion> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MappedQuestion> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<MappedQuestion>> for QuestionKeyMapping {
    type Error = String;

    fn try_from(entries: Vec<MappedQuestion>) -> Result<Self, Self::Error> {
        for (i, entry) in entries.iter().enumerate() {
            if entry.key.trim().is_empty() {
                return Err(format!("mapping entry {} has an empty key", i));
            }
            if entries[..i].iter().any(|e| e.key == entry.key) {
                return Err(format!("duplicate question key '{}'", entry.key));
            }
        }
        Ok(Self { entries })
    }
}

impl TryFrom<MappingWire> for QuestionKeyMapping {
    type Error = String;

    fn try_from(wire: MappingWire) -> Result<Self, Self::Error> {
        match wire {
            MappingWire::Entries(entries) => Self::try_from(entries),
            MappingWire::Texts(texts) => {
                let mut entries: Vec<MappedQuestion> = texts
                    .into_iter()
                    .map(|(key, text)| MappedQuestion {
                        key,
                        text,
                        required: true,
                    })
                    .collect();
                entries.sort_by_key(|e| question_index(&e.key));
                Self::try_from(entries)
            }
        }
    }
}

/// Numeric index of a `q<index>` key; other keys sort after, by name
fn question_index(key: &str) -> (usize, String) {
    let index = key.strip_prefix('q').and_then(|n| n.parse().ok()).unwrap_or(usize::MAX);
    (index, key.to_string())
}

impl From<QuestionKeyMapping> for Vec<MappedQuestion> {
    fn from(mapping: QuestionKeyMapping) -> Self {
        mapping.entries
    }
}
