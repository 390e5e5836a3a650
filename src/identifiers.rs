//! Identifier schemes used across the pipeline.
//!
//! Bins have been numbered two ways over the life of the study. The
//! design-matrix builder assigns the canonical ("new") numbering; the master
//! feature table carries the older one. Every EEG-side bin is resolved to the
//! canonical id once, at ingestion, through [`BinMap`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{PrepError, Result};
use crate::types::WordRecord;

static PASSAGE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)([A-Za-z]*)\s*$").expect("valid passage code regex"));

/// Bin numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinScheme {
    New,
    Old,
}

impl fmt::Display for BinScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinScheme::New => write!(f, "new"),
            BinScheme::Old => write!(f, "old"),
        }
    }
}

/// Passage code such as `12S`: numeric passage id plus a trailing condition tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageCode {
    pub number: u32,
    pub tag: String,
}

impl PassageCode {
    pub fn parse(code: &str) -> Result<Self> {
        let caps = PASSAGE_CODE
            .captures(code)
            .ok_or_else(|| PrepError::InvalidIdentifier(format!("passage code '{}'", code)))?;
        let number = caps[1]
            .parse::<u32>()
            .map_err(|e| PrepError::InvalidIdentifier(format!("passage code '{}': {}", code, e)))?;
        Ok(Self {
            number,
            tag: caps[2].to_string(),
        })
    }
}

/// Passage id carried by a hardware trigger code; row-local arithmetic only.
/// `None` when the code is too far out of range to carry a passage.
pub fn passage_id_from_trigger(code: i64, trigger_base: i64) -> Option<i64> {
    code.checked_sub(trigger_base)
}

/// Render a participant label from a template such as `part{index}`
pub fn participant_label(template: &str, index: u32) -> String {
    template.replace("{index}", &index.to_string())
}

/// Explicit mapping between the canonical bin ids and the older numbering
#[derive(Debug, Clone, Default)]
pub struct BinMap {
    canonical: HashSet<u32>,
    new_to_old: HashMap<u32, u32>,
    old_to_new: HashMap<u32, u32>,
    ambiguous_old: HashSet<u32>,
}

impl BinMap {
    pub fn from_words(words: &[WordRecord]) -> Self {
        let mut map = BinMap::default();
        let mut old_counts: HashMap<u32, usize> = HashMap::new();

        for word in words {
            map.canonical.insert(word.bin_id);
            if let Some(old) = word.bin_id_old {
                *old_counts.entry(old).or_default() += 1;
            }
        }

        for word in words {
            let Some(old) = word.bin_id_old else { continue };
            if old_counts.get(&old).copied().unwrap_or(0) > 1 {
                map.ambiguous_old.insert(old);
                continue;
            }
            map.new_to_old.insert(word.bin_id, old);
            map.old_to_new.insert(old, word.bin_id);
        }

        map
    }

    /// Resolve a bin id in `scheme` to the canonical id
    pub fn to_canonical(&self, scheme: BinScheme, id: u32) -> Option<u32> {
        match scheme {
            BinScheme::New => self.canonical.contains(&id).then_some(id),
            BinScheme::Old => self.old_to_new.get(&id).copied(),
        }
    }

    /// Express a canonical bin id in `scheme`
    pub fn from_canonical(&self, scheme: BinScheme, id: u32) -> Option<u32> {
        match scheme {
            BinScheme::New => self.canonical.contains(&id).then_some(id),
            BinScheme::Old => self.new_to_old.get(&id).copied(),
        }
    }

    /// Old ids shared by several design-matrix rows, left out of the mapping
    pub fn ambiguous_old_ids(&self) -> usize {
        self.ambiguous_old.len()
    }

    pub fn is_ambiguous_old(&self, id: u32) -> bool {
        self.ambiguous_old.contains(&id)
    }
}
