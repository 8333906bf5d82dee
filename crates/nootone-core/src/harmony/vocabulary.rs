//! Named chord collections, one per harmonic style

use serde::{Deserialize, Serialize};

use crate::error::{NootoneError, Result};

type Collection = &'static [&'static [u8]];

/// Interval sets per style; the first interval of each set is its root-relative bass.
const COLLECTIONS: &[(&str, Collection)] = &[
    ("traditional", &[&[0, 7, 3], &[0, 7, 4], &[0, 7, 4, 10]]),
    (
        "pop",
        &[
            &[0, 7, 3, 5],
            &[0, 7, 4, 5],
            &[0, 7, 4, 10],
            &[0, 7, 3, 10],
            &[0, 7, 4, 10],
            &[0, 7, 4, 9],
            &[0, 7, 2, 4],
            &[0, 7, 2, 3],
        ],
    ),
    ("medieval", &[&[5, 0], &[0, 7]]),
    ("ethereal", &[&[0, 7, 5], &[0, 7, 2], &[0, 5, 10]]),
    ("upbeat", &[&[4, 0, 7], &[4, 7, 0], &[0, 4, 7], &[0, 7, 4], &[7, 4, 0], &[7, 0, 4]]),
    ("dramatic", &[&[3, 0, 7], &[3, 7, 0], &[0, 3, 7], &[0, 7, 3], &[7, 3, 0], &[7, 0, 3]]),
    ("mysterious", &[&[4, 0, 8], &[2, 0, 8], &[6, 0, 8], &[6, 0, 10]]),
    (
        "classical",
        &[
            &[0, 7, 4],
            &[0, 7, 3],
            &[0, 7, 4, 10],
            &[0, 7, 3, 10],
            &[3, 0, 6],
            &[3, 0, 6, 9],
            &[3, 0, 6, 10],
            &[2, 0, 6, 9],
            &[2, 0, 6],
            &[2, 0, 6, 8],
        ],
    ),
    ("blues", &[&[0, 4, 7, 10], &[3, 6, 0, 9]]),
    (
        "impressionistic",
        &[&[0, 4, 7], &[0, 7, 3], &[0, 8, 4], &[2, 0, 6], &[2, 0, 6, 8], &[3, 0, 6, 10], &[9, 3, 0, 6]],
    ),
    (
        "jazz",
        &[
            &[11, 4, 0, 7],
            &[10, 4, 0, 7],
            &[10, 3, 0, 7],
            &[10, 3, 6, 0],
            &[6, 4, 0, 7, 10],
            &[6, 4, 0, 7, 11],
            &[2, 4, 0, 7, 11],
            &[2, 4, 0, 7, 10],
        ],
    ),
    ("bittersweet", &[&[0, 7, 4, 5], &[0, 7, 2, 3], &[0, 7, 3, 5], &[0, 7, 4, 6], &[0, 7, 3, 8]]),
    ("dissonant", &[&[6, 0, 1], &[0, 5, 6], &[7, 0, 1], &[0, 6, 7], &[4, 0, 1, 6], &[0, 3, 4, 6]]),
    (
        "mystical",
        &[
            &[11, 0, 4, 7, 6],
            &[3, 0, 4, 7, 6],
            &[3, 0, 6, 2, 10],
            &[0, 4, 7, 9],
            &[10, 0, 4, 7, 6],
            &[3, 0, 4, 7, 11],
            &[3, 0, 4, 7, 6],
        ],
    ),
];

/// Names of the built-in collections.
pub fn collection_names() -> impl Iterator<Item = &'static str> {
    COLLECTIONS.iter().map(|(name, _)| *name)
}

/// Either a built-in style name or a caller-supplied list of interval sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChordVocabulary {
    Named(String),
    Custom(Vec<Vec<u8>>),
}

impl ChordVocabulary {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The interval sets of this vocabulary, each reduced to pitch classes.
    pub fn interval_sets(&self) -> Result<Vec<Vec<u8>>> {
        match self {
            Self::Named(name) => COLLECTIONS
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, sets)| sets.iter().map(|s| s.to_vec()).collect())
                .ok_or_else(|| NootoneError::UnknownVocabulary(name.clone())),
            Self::Custom(sets) => {
                if sets.is_empty() || sets.iter().any(Vec::is_empty) {
                    return Err(NootoneError::UnknownVocabulary("<empty custom collection>".into()));
                }
                Ok(sets.iter().map(|s| s.iter().map(|i| i % 12).collect()).collect())
            }
        }
    }
}

impl Default for ChordVocabulary {
    fn default() -> Self {
        Self::Named("classical".into())
    }
}

impl From<&str> for ChordVocabulary {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}
