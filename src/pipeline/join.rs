//! Keyed lookups with row-loss accounting.
//!
//! Every join in the pipeline goes through a [`Lookup`] and records each probe
//! in a [`JoinReport`], so unmatched and ambiguous rows are always counted.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{info, warn};

use crate::error::{PrepError, Result};

/// What happens to a row without a unique match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Unmatched and ambiguous rows are dropped
    Inner,
    /// Unmatched rows are kept with empty values
    Left,
}

/// Outcome of probing a lookup with one key
#[derive(Debug, PartialEq)]
pub enum Match<'a, V> {
    One(&'a V),
    Missing,
    Ambiguous(usize),
}

impl<'a, V> Match<'a, V> {
    pub fn one(self) -> Option<&'a V> {
        match self {
            Match::One(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lookup<K, V> {
    map: HashMap<K, Vec<V>>,
}

impl<K: Hash + Eq, V> Lookup<K, V> {
    pub fn build(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut map: HashMap<K, Vec<V>> = HashMap::new();
        for (k, v) in entries {
            map.entry(k).or_default().push(v);
        }
        Self { map }
    }

    /// Like [`Lookup::build`], but equal values under one key collapse into one
    pub fn build_distinct(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        V: PartialEq,
    {
        let mut map: HashMap<K, Vec<V>> = HashMap::new();
        for (k, v) in entries {
            let slot = map.entry(k).or_default();
            if !slot.contains(&v) {
                slot.push(v);
            }
        }
        Self { map }
    }

    pub fn get<Q>(&self, key: &Q) -> Match<'_, V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key).map(Vec::as_slice) {
            None | Some([]) => Match::Missing,
            Some([one]) => Match::One(one),
            Some(many) => Match::Ambiguous(many.len()),
        }
    }

    pub fn get_all<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys that map to more than one value
    pub fn duplicate_keys(&self) -> usize {
        self.map.values().filter(|v| v.len() > 1).count()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Row accounting for one named join
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinReport {
    pub name: String,
    pub kind: JoinKind,
    pub left_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
    /// Right-side keys carried by more than one row
    pub duplicate_keys: usize,
}

impl JoinReport {
    pub fn new(name: impl Into<String>, kind: JoinKind) -> Self {
        Self {
            name: name.into(),
            kind,
            left_rows: 0,
            matched: 0,
            unmatched: 0,
            ambiguous: 0,
            duplicate_keys: 0,
        }
    }

    pub fn with_duplicate_keys(mut self, duplicate_keys: usize) -> Self {
        self.duplicate_keys = duplicate_keys;
        self
    }

    pub fn record<V>(&mut self, outcome: &Match<'_, V>) {
        self.left_rows += 1;
        match outcome {
            Match::One(_) => self.matched += 1,
            Match::Missing => self.unmatched += 1,
            Match::Ambiguous(_) => self.ambiguous += 1,
        }
    }

    /// One-to-many probe: zero matches counts as unmatched
    pub fn record_expansion(&mut self, matches: usize) {
        self.left_rows += 1;
        if matches == 0 {
            self.unmatched += 1;
        } else {
            self.matched += 1;
        }
    }

    pub fn rows_lost(&self) -> usize {
        match self.kind {
            JoinKind::Inner => self.unmatched + self.ambiguous,
            JoinKind::Left => 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.unmatched == 0 && self.ambiguous == 0 && self.duplicate_keys == 0
    }

    pub fn merge(&mut self, other: &JoinReport) {
        self.left_rows += other.left_rows;
        self.matched += other.matched;
        self.unmatched += other.unmatched;
        self.ambiguous += other.ambiguous;
        self.duplicate_keys = self.duplicate_keys.max(other.duplicate_keys);
    }

    pub fn log(&self) {
        if self.is_clean() {
            info!(join = %self.name, rows = self.left_rows, "Join complete");
        } else {
            warn!(
                join = %self.name,
                kind = ?self.kind,
                rows = self.left_rows,
                matched = self.matched,
                unmatched = self.unmatched,
                ambiguous = self.ambiguous,
                duplicate_keys = self.duplicate_keys,
                rows_lost = self.rows_lost(),
                "Join lost or could not resolve rows"
            );
        }
    }

    /// Ambiguity is always counted; with `fail_on_ambiguous` it is also fatal
    pub fn check(&self, fail_on_ambiguous: bool) -> Result<()> {
        if fail_on_ambiguous && (self.ambiguous > 0 || self.duplicate_keys > 0) {
            return Err(PrepError::JoinIntegrity {
                join: self.name.clone(),
                detail: format!(
                    "{} ambiguous rows, {} duplicated keys",
                    self.ambiguous, self.duplicate_keys
                ),
            });
        }
        Ok(())
    }
}
