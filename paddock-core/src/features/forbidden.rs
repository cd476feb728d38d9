//! Registry of column names that are only knowable after a race has run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome columns produced by the results parser. Offered as the
/// configuration default; the verifier itself only sees what it is given.
pub const DEFAULT_OUTCOME_COLUMNS: &[&str] = &[
    "finish_position",
    "finish_time_seconds",
    "finish_time_str",
    "margin_str",
    "passing_order",
    "last_3f_time",
    "prize_money",
    "is_win",
    "is_place",
    "odds",
    "popularity",
    "payout",
];

/// Set of forbidden (label/outcome) column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForbiddenNames(BTreeSet<String>);

impl ForbiddenNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn outcome_defaults() -> Self {
        Self::new(DEFAULT_OUTCOME_COLUMNS.iter().copied())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(names.into_iter().map(Into::into));
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ForbiddenNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
