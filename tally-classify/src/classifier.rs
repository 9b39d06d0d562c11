//! Per-record category resolution.
//!
//! Order: keep a source label → drop uncounted noise → keyword rule →
//! learned association → leave unassigned.

use tally_core::{CanonicalRecord, Category, Direction};
use tracing::{debug, info};

use crate::keywords::KeywordDictionary;
use crate::learner::AssociationTable;

/// Substring marking an uncounted record as a refund
pub const DEFAULT_REFUND_INDICATOR: &str = "退款";

/// Which stage of the chain decided a record's fate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Label came with the record
    Preset,
    /// Uncounted and not a refund; removed from output
    Dropped,
    Keyword(Category),
    Learned(Category),
    Unresolved,
}

/// Counts of each resolution outcome for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    pub preset: usize,
    pub dropped: usize,
    pub keyword: usize,
    pub learned: usize,
    pub unresolved: usize,
}

impl ClassifySummary {
    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Preset => self.preset += 1,
            Resolution::Dropped => self.dropped += 1,
            Resolution::Keyword(_) => self.keyword += 1,
            Resolution::Learned(_) => self.learned += 1,
            Resolution::Unresolved => self.unresolved += 1,
        }
    }

    /// Records kept in the output
    pub fn emitted(&self) -> usize {
        self.preset + self.keyword + self.learned + self.unresolved
    }
}

pub struct Classifier<'a> {
    keywords: &'a KeywordDictionary,
    associations: &'a AssociationTable,
    refund_indicator: String,
}

impl<'a> Classifier<'a> {
    pub fn new(keywords: &'a KeywordDictionary, associations: &'a AssociationTable) -> Self {
        Self {
            keywords,
            associations,
            refund_indicator: DEFAULT_REFUND_INDICATOR.to_string(),
        }
    }

    pub fn with_refund_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.refund_indicator = indicator.into();
        self
    }

    fn is_noise(&self, record: &CanonicalRecord) -> bool {
        record.direction == Direction::NotApplicable && !record.item.contains(self.refund_indicator.as_str())
    }

    /// Run the chain on one record, assigning a category when a stage yields one.
    pub fn resolve(&self, record: &mut CanonicalRecord) -> Resolution {
        if record.is_labelled() {
            return Resolution::Preset;
        }
        if self.is_noise(record) {
            return Resolution::Dropped;
        }
        if let Some(category) = self.keywords.lookup(&record.item) {
            record.assign_category(category);
            return Resolution::Keyword(category);
        }
        if let Some(category) = self.associations.get(&record.association_key()) {
            record.assign_category(category);
            return Resolution::Learned(category);
        }
        Resolution::Unresolved
    }

    /// Classify a merged stream, removing dropped records and keeping order.
    pub fn classify(&self, records: Vec<CanonicalRecord>) -> (Vec<CanonicalRecord>, ClassifySummary) {
        let mut summary = ClassifySummary::default();
        let mut out = Vec::with_capacity(records.len());

        for mut record in records {
            let resolution = self.resolve(&mut record);
            summary.record(resolution);
            if resolution == Resolution::Dropped {
                debug!(
                    "dropped uncounted {} {} '{}'",
                    record.timestamp, record.counterparty, record.item
                );
                continue;
            }
            out.push(record);
        }

        info!(
            "classified {} records: {} preset, {} keyword, {} learned, {} unassigned, {} dropped",
            summary.emitted(),
            summary.preset,
            summary.keyword,
            summary.learned,
            summary.unresolved,
            summary.dropped
        );
        (out, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::HistoricalLearner;
    use tally_core::{CHANNEL_ALIPAY, time::parse_timestamp};

    fn rec(direction: Direction, counterparty: &str, item: &str) -> CanonicalRecord {
        CanonicalRecord::new(
            parse_timestamp("2024-03-01 12:00:00").unwrap(),
            "10.00",
            direction,
            CHANNEL_ALIPAY,
            counterparty,
            item,
            "",
        )
    }

    fn table() -> AssociationTable {
        let history = vec![rec(Direction::Expense, "滴滴出行", "快车").with_category(Some(Category::Transport)); 3];
        HistoricalLearner::new(3).unwrap().learn(&history)
    }

    #[test]
    fn test_keyword_beats_association() {
        let keywords: KeywordDictionary = [("快车", "travel")].into_iter().collect();
        let table = table();
        let classifier = Classifier::new(&keywords, &table);

        let mut record = rec(Direction::Expense, "滴滴出行", "快车");
        assert_eq!(classifier.resolve(&mut record), Resolution::Keyword(Category::Travel));
        assert_eq!(record.category(), Some(Category::Travel));
    }

    #[test]
    fn test_association_fallback_and_unresolved() {
        let keywords = KeywordDictionary::new();
        let table = table();
        let classifier = Classifier::new(&keywords, &table);

        let mut known = rec(Direction::Expense, "滴滴出行", "快车");
        assert_eq!(classifier.resolve(&mut known), Resolution::Learned(Category::Transport));

        let mut unknown = rec(Direction::Expense, "滴滴出行", "专车");
        assert_eq!(classifier.resolve(&mut unknown), Resolution::Unresolved);
        assert_eq!(unknown.category(), None);
    }

    #[test]
    fn test_invalid_keyword_label_falls_through_to_association() {
        let history = vec![rec(Direction::Expense, "滴滴出行", "滴滴快车").with_category(Some(Category::Transport)); 3];
        let table = HistoricalLearner::new(3).unwrap().learn(&history);
        let keywords: KeywordDictionary = [("滴滴", "rides"), ("快车", "travel")].into_iter().collect();
        let classifier = Classifier::new(&keywords, &table);

        let mut record = rec(Direction::Expense, "滴滴出行", "滴滴快车");
        assert_eq!(classifier.resolve(&mut record), Resolution::Learned(Category::Transport));
        assert_eq!(record.category(), Some(Category::Transport));
    }

    #[test]
    fn test_never_overwrites_existing_label() {
        let keywords: KeywordDictionary = [("超市", "living")].into_iter().collect();
        let table = AssociationTable::new();
        let classifier = Classifier::new(&keywords, &table);

        let mut record = rec(Direction::NotApplicable, "", "超市").with_category(Some(Category::Gifts));
        assert_eq!(classifier.resolve(&mut record), Resolution::Preset);
        assert_eq!(record.category(), Some(Category::Gifts));
    }

    #[test]
    fn test_uncounted_noise_dropped_but_refunds_kept() {
        let keywords: KeywordDictionary = [("订单", "living")].into_iter().collect();
        let table = AssociationTable::new();
        let classifier = Classifier::new(&keywords, &table);

        let records = vec![
            rec(Direction::NotApplicable, "淘宝", "订单退款"),
            rec(Direction::NotApplicable, "余额宝", "充值"),
            rec(Direction::Expense, "淘宝", "普通订单"),
        ];
        let (out, summary) = classifier.classify(records);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].item, "订单退款");
        assert_eq!(out[0].category(), Some(Category::Living));
        assert_eq!(out[1].item, "普通订单");
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.keyword, 2);
        assert_eq!(summary.emitted(), 2);
    }

    #[test]
    fn test_refund_indicator_is_configurable() {
        let keywords = KeywordDictionary::new();
        let table = AssociationTable::new();
        let classifier = Classifier::new(&keywords, &table).with_refund_indicator("refund");

        let mut refund = rec(Direction::NotApplicable, "shop", "order refund");
        assert_eq!(classifier.resolve(&mut refund), Resolution::Unresolved);
        let mut cn = rec(Direction::NotApplicable, "淘宝", "订单退款");
        assert_eq!(classifier.resolve(&mut cn), Resolution::Dropped);
    }
}
