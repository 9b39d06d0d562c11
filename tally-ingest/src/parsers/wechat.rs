//! WeChat Pay export parser
//!
//! Exports are UTF-8 with a fixed block of metadata lines before the header:
//!
//!   微信支付账单明细,,,,,,,,
//!   微信昵称：[someone],,,,,,,,
//!   ... (metadata lines) ...
//!   交易时间,交易类型,交易对方,商品,收/支,金额(元),支付方式,当前状态,交易单号,商户单号,备注
//!   2024-03-01 08:15:00,商户消费,瑞幸咖啡,生椰拿铁,支出,¥9.90,零钱,支付成功,4200...,1001...,/

use tally_core::{CHANNEL_FAMILY_CARD, CanonicalRecord, Direction, Result, TallyError};

use crate::mapper::{normalize_amount, parse_row_timestamp};
use crate::types::{Provider, WechatRow};

/// Placeholder the export uses for "no value"
pub const PLACEHOLDER: &str = "/";

/// Decode export bytes and drop the metadata preamble.
pub fn decode_table(bytes: &[u8], skip_lines: usize, source_name: &str) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| TallyError::Decode {
        source_name: source_name.to_string(),
        reason: format!("content is not valid UTF-8: {e}"),
    })?;

    let lines: Vec<&str> = text.lines().skip(skip_lines).collect();
    if lines.is_empty() {
        return Err(TallyError::Decode {
            source_name: source_name.to_string(),
            reason: format!("no header row after {skip_lines} metadata lines"),
        });
    }

    Ok(lines.join("\n"))
}

/// Map one WeChat Pay row. Errors carry a reason only; the caller adds file/row.
pub fn map_row(row: WechatRow) -> std::result::Result<CanonicalRecord, String> {
    let timestamp = parse_row_timestamp(&row.traded_at)?;
    let amount = normalize_amount(&row.amount)?;
    let direction = Direction::from_marker(&row.direction)
        .ok_or_else(|| format!("unknown direction marker '{}'", row.direction))?;

    let channel = if row.channel == CHANNEL_FAMILY_CARD {
        CHANNEL_FAMILY_CARD
    } else {
        Provider::Wechat.brand()
    };
    let note = if row.note == PLACEHOLDER {
        String::new()
    } else {
        row.note
    };

    Ok(CanonicalRecord::new(
        timestamp,
        amount,
        direction,
        channel,
        row.counterparty,
        row.item,
        note,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::CHANNEL_WECHAT_PAY;

    fn row(channel: &str, amount: &str, note: &str) -> WechatRow {
        WechatRow {
            traded_at: "2024-03-01 08:15:00".to_string(),
            kind: "商户消费".to_string(),
            counterparty: "瑞幸咖啡".to_string(),
            item: "生椰拿铁".to_string(),
            direction: "支出".to_string(),
            amount: amount.to_string(),
            channel: channel.to_string(),
            status: "支付成功".to_string(),
            transaction_id: "4200001".to_string(),
            merchant_id: "1001".to_string(),
            note: note.to_string(),
        }
    }

    #[test]
    fn test_skips_metadata_lines() {
        let text = "\u{feff}微信支付账单明细\nmeta\n交易时间,金额(元)\n2024-03-01 08:15:00,¥9.90\n";
        let table = decode_table(text.as_bytes(), 2, "wechat.csv").unwrap();
        assert_eq!(table, "交易时间,金额(元)\n2024-03-01 08:15:00,¥9.90");
    }

    #[test]
    fn test_short_file_is_decode_error() {
        let err = decode_table("only\nmeta\n".as_bytes(), 16, "wechat.csv").unwrap_err();
        assert!(matches!(err, TallyError::Decode { .. }));
        let err = decode_table(&[0xC3, 0x28], 0, "wechat.csv").unwrap_err();
        assert!(matches!(err, TallyError::Decode { .. }));
    }

    #[test]
    fn test_amount_glyph_and_note_placeholder() {
        let record = map_row(row("零钱", "¥9.90", "/")).unwrap();
        assert_eq!(record.amount, "9.90");
        assert_eq!(record.note, "");
        assert_eq!(record.channel, CHANNEL_WECHAT_PAY);
        assert_eq!(record.category(), None);
    }

    #[test]
    fn test_family_card_channel() {
        let record = map_row(row("亲属卡", "¥120.00", "生日")).unwrap();
        assert_eq!(record.channel, CHANNEL_FAMILY_CARD);
        assert_eq!(record.note, "生日");
    }

    #[test]
    fn test_not_applicable_direction() {
        let mut r = row("零钱", "¥100.00", "/");
        r.direction = "/".to_string();
        assert_eq!(map_row(r).unwrap().direction, Direction::NotApplicable);
    }
}
