//! Merge per-provider record streams into one chronological sequence.

use tally_core::CanonicalRecord;

/// Concatenates streams in the order given and sorts by timestamp.
///
/// The sort is stable, so records sharing a timestamp keep stream order and
/// then file order. Identical records are all kept.
pub struct RecordMerger;

impl RecordMerger {
    pub fn merge<I>(streams: I) -> Vec<CanonicalRecord>
    where
        I: IntoIterator<Item = Vec<CanonicalRecord>>,
    {
        let mut merged: Vec<CanonicalRecord> = streams.into_iter().flatten().collect();
        merged.sort_by_key(|r| r.timestamp);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{CHANNEL_ALIPAY, CHANNEL_WECHAT_PAY, Direction, time::parse_timestamp};

    fn rec(ts: &str, channel: &str, item: &str) -> CanonicalRecord {
        CanonicalRecord::new(
            parse_timestamp(ts).unwrap(),
            "1.00",
            Direction::Expense,
            channel,
            "",
            item,
            "",
        )
    }

    #[test]
    fn test_sorted_ascending() {
        let alipay = vec![
            rec("2024-03-03 10:00:00", CHANNEL_ALIPAY, "c"),
            rec("2024-03-01 10:00:00", CHANNEL_ALIPAY, "a"),
        ];
        let wechat = vec![rec("2024-03-02 10:00:00", CHANNEL_WECHAT_PAY, "b")];
        let merged = RecordMerger::merge([alipay, wechat]);
        let items: Vec<_> = merged.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, ["a", "b", "c"]);
        assert!(merged.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        let ts = "2024-03-01 10:00:00";
        let alipay = vec![rec(ts, CHANNEL_ALIPAY, "a1"), rec(ts, CHANNEL_ALIPAY, "a2")];
        let wechat = vec![rec(ts, CHANNEL_WECHAT_PAY, "w1"), rec("2024-03-01 09:00:00", CHANNEL_WECHAT_PAY, "w0")];
        let merged = RecordMerger::merge([alipay, wechat]);
        let items: Vec<_> = merged.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, ["w0", "a1", "a2", "w1"]);
    }

    #[test]
    fn test_duplicates_and_empty_streams() {
        let ts = "2024-03-01 10:00:00";
        let merged = RecordMerger::merge([
            Vec::new(),
            vec![rec(ts, CHANNEL_WECHAT_PAY, "x"), rec(ts, CHANNEL_WECHAT_PAY, "x")],
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], merged[1]);
    }
}
