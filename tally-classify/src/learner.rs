//! Learn (counterparty, item) → category associations from labelled history.
//!
//! A key is admitted once it has been observed `min_frequency` times. If a
//! later observation at or above the threshold disagrees with the admitted
//! category, the key is removed and tombstoned for good.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tally_core::{
    AssociationKey, CHANNEL_WECHAT_PAY, CanonicalRecord, Category, Result, TallyError,
};
use tally_ingest::read_canonical_file;
use tracing::{debug, info};

pub const DEFAULT_MIN_FREQUENCY: u32 = 3;

/// Item placeholder WeChat Pay uses for peer-to-peer transfers and red packets
const TRANSFER_ITEM_PLACEHOLDER: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub category: Category,
    /// Observations of the key when last updated
    pub observations: u32,
}

/// Learned associations plus the keys that may never be used again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationTable {
    entries: BTreeMap<AssociationKey, Association>,
    #[serde(default)]
    tombstones: BTreeSet<AssociationKey>,
}

impl AssociationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AssociationKey) -> Option<Category> {
        if self.tombstones.contains(key) {
            return None;
        }
        self.entries.get(key).map(|a| a.category)
    }

    pub fn association(&self, key: &AssociationKey) -> Option<&Association> {
        self.entries.get(key)
    }

    pub fn is_tombstoned(&self, key: &AssociationKey) -> bool {
        self.tombstones.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Record an eligible observation (count already at/above threshold).
    fn observe_eligible(&mut self, key: AssociationKey, category: Category, observations: u32) {
        if self.tombstones.contains(&key) {
            return;
        }
        match self.entries.get(&key).map(|a| a.category) {
            None => {
                self.entries.insert(key, Association { category, observations });
            }
            Some(admitted) if admitted == category => {
                if let Some(existing) = self.entries.get_mut(&key) {
                    existing.observations = observations;
                }
            }
            Some(admitted) => {
                debug!("conflict on '{}': {} vs {}; key retired", key, admitted, category);
                self.entries.remove(&key);
                self.tombstones.insert(key);
            }
        }
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TallyError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TallyError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| TallyError::io(path, e))
    }
}

/// Mines an [`AssociationTable`] from historical records.
#[derive(Debug, Clone, Copy)]
pub struct HistoricalLearner {
    min_frequency: u32,
}

impl Default for HistoricalLearner {
    fn default() -> Self {
        Self {
            min_frequency: DEFAULT_MIN_FREQUENCY,
        }
    }
}

impl HistoricalLearner {
    pub fn new(min_frequency: u32) -> Result<Self> {
        if min_frequency == 0 {
            return Err(TallyError::Config(
                "minimum frequency must be at least 1".to_string(),
            ));
        }
        Ok(Self { min_frequency })
    }

    pub fn min_frequency(&self) -> u32 {
        self.min_frequency
    }

    /// Whether a historical record carries a usable category signal.
    pub fn is_signal(record: &CanonicalRecord) -> bool {
        if record.channel == CHANNEL_WECHAT_PAY && record.item == TRANSFER_ITEM_PLACEHOLDER {
            return false;
        }
        // A note marks an atypical transaction.
        if !record.note.is_empty() {
            return false;
        }
        if !record.is_labelled() {
            return false;
        }
        !(record.counterparty.is_empty() && record.item.is_empty())
    }

    pub fn learn(&self, history: &[CanonicalRecord]) -> AssociationTable {
        self.learn_into(AssociationTable::new(), history)
    }

    /// Continue learning on top of an existing table, keeping its tombstones.
    pub fn learn_into(&self, mut table: AssociationTable, history: &[CanonicalRecord]) -> AssociationTable {
        let mut frequency: HashMap<AssociationKey, u32> = HashMap::new();
        let mut used = 0usize;

        for record in history.iter().filter(|r| Self::is_signal(r)) {
            let Some(category) = record.category() else {
                continue;
            };
            used += 1;
            let key = record.association_key();
            if table.is_tombstoned(&key) {
                continue;
            }
            let count = frequency.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count >= self.min_frequency {
                let observations = *count;
                table.observe_eligible(key, category, observations);
            }
        }

        info!(
            "learned {} associations from {} of {} historical records ({} retired)",
            table.len(),
            used,
            history.len(),
            table.tombstone_count()
        );
        table
    }

    /// Learn from a canonical CSV dataset; no path means an empty table.
    pub fn learn_from_file(&self, path: Option<&Path>) -> Result<AssociationTable> {
        let Some(path) = path else {
            debug!("no historical dataset configured");
            return Ok(AssociationTable::new());
        };
        let history = read_canonical_file(path)?;
        Ok(self.learn(&history))
    }
}
