//! Alipay export parser
//!
//! Exports are GBK encoded. A free-text preamble and summary footer surround
//! the table, which sits between two divider lines:
//!
//!   支付宝交易记录明细查询
//!   账号:[someone@example.com]
//!   ---------------------------------交易记录明细列表------------------------------------
//!   交易号                  ,商家订单号               ,交易创建时间              ,...
//!   2024030122001...        ,T200P...                 ,2024-03-01 12:30:05 ,...
//!   ------------------------------------------------------------------------------------
//!   共2笔记录

use std::sync::LazyLock;

use encoding_rs::GBK;
use regex::Regex;
use tally_core::{CanonicalRecord, Direction, Result, TallyError};
use tracing::debug;

use crate::mapper::{normalize_amount, parse_row_timestamp};
use crate::types::{AlipayRow, Provider};

static WHITESPACE_BEFORE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+,").expect("valid regex"));

/// Decode raw export bytes and cut out the divider-framed table.
pub fn decode_table(bytes: &[u8], divider_marker: &str, source_name: &str) -> Result<String> {
    let text = GBK
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| TallyError::Decode {
            source_name: source_name.to_string(),
            reason: "content is not valid GBK".to_string(),
        })?;

    let mut in_table = false;
    let mut seen_divider = false;
    let mut lines = Vec::new();

    for line in text.lines() {
        let is_divider = line.starts_with(divider_marker);
        if !in_table {
            if is_divider {
                in_table = true;
                seen_divider = true;
            }
            continue;
        }
        // The closing divider ends the table; anything after it is footer.
        if is_divider {
            break;
        }
        let cleaned = WHITESPACE_BEFORE_SEPARATOR.replace_all(line, ",");
        lines.push(cleaned.trim_end().to_string());
    }

    if !seen_divider {
        return Err(TallyError::Decode {
            source_name: source_name.to_string(),
            reason: format!("no table framed by lines starting with '{divider_marker}'"),
        });
    }

    Ok(lines.join("\n"))
}

/// Map one Alipay row. Errors carry a reason only; the caller adds file/row.
pub fn map_row(row: AlipayRow) -> std::result::Result<CanonicalRecord, String> {
    let timestamp = parse_row_timestamp(&row.created_at)?;
    let amount = normalize_amount(&row.amount)?;

    // A blank marker is how Alipay leaves uncounted rows in some exports.
    let direction = if row.direction.trim().is_empty() {
        debug!(
            "blank direction on {} '{}' '{}'; treated as uncounted",
            row.created_at, row.counterparty, row.item
        );
        Direction::NotApplicable
    } else {
        Direction::from_marker(&row.direction)
            .ok_or_else(|| format!("unknown direction marker '{}'", row.direction))?
    };

    Ok(CanonicalRecord::new(
        timestamp,
        amount,
        direction,
        Provider::Alipay.brand(),
        row.counterparty,
        row.item,
        row.note,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::CHANNEL_ALIPAY;

    fn gbk(text: &str) -> Vec<u8> {
        GBK.encode(text).0.into_owned()
    }

    fn row(direction: &str) -> AlipayRow {
        AlipayRow {
            created_at: "2024-03-01 12:30:05".to_string(),
            status: "交易成功".to_string(),
            counterparty: "盒马".to_string(),
            item: "生鲜订单".to_string(),
            amount: "58.20".to_string(),
            direction: direction.to_string(),
            fee: "0.00".to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn test_keeps_only_rows_between_dividers() {
        let text = "支付宝交易记录明细查询\r\n\
                    账号:[someone]\r\n\
                    --------交易记录明细列表--------\r\n\
                    交易创建时间      ,金额（元）  ,\r\n\
                    2024-03-01 12:30:05 ,58.20 ,\r\n\
                    --------------------------------\r\n\
                    共1笔记录\r\n\
                    --------------------------------\r\n\
                    stray,line\r\n";
        let table = decode_table(&gbk(text), "--------", "alipay.csv").unwrap();
        assert_eq!(table, "交易创建时间,金额（元）,\n2024-03-01 12:30:05,58.20,");
    }

    #[test]
    fn test_missing_divider_is_decode_error() {
        let err = decode_table(&gbk("交易创建时间,金额（元）\n"), "--------", "alipay.csv").unwrap_err();
        assert!(matches!(err, TallyError::Decode { .. }));
    }

    #[test]
    fn test_invalid_bytes_is_decode_error() {
        let err = decode_table(&[0x81, 0x20, 0xff], "--------", "alipay.csv").unwrap_err();
        assert!(matches!(err, TallyError::Decode { .. }));
    }

    #[test]
    fn test_not_counted_maps_to_not_applicable() {
        let record = map_row(row("不计收支")).unwrap();
        assert_eq!(record.direction, Direction::NotApplicable);
        assert_eq!(record.channel, CHANNEL_ALIPAY);
        assert_eq!(record.category(), None);

        assert_eq!(map_row(row("支出")).unwrap().direction, Direction::Expense);
        assert!(map_row(row("转出")).is_err());
    }

    #[test]
    fn test_blank_direction_is_uncounted() {
        for blank in ["", "   "] {
            let record = map_row(row(blank)).unwrap();
            assert_eq!(record.direction, Direction::NotApplicable);
            assert_eq!(record.item, "生鲜订单");
        }
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let mut bad = row("支出");
        bad.created_at = "not a time".to_string();
        assert!(map_row(bad).unwrap_err().contains("not a time"));
    }
}
