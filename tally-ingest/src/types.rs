use std::fmt;

use serde::{Deserialize, Serialize};
use tally_core::{CHANNEL_ALIPAY, CHANNEL_WECHAT_PAY};

/// Payment providers whose exports can be ingested.
///
/// Variant order is merge order: Alipay streams precede WeChat Pay streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Alipay,
    #[serde(alias = "wechatpay", alias = "wechat-pay")]
    Wechat,
}

impl Provider {
    pub fn code(&self) -> &'static str {
        match self {
            Provider::Alipay => "alipay",
            Provider::Wechat => "wechat",
        }
    }

    /// The provider's own payment brand, used as the default channel
    pub fn brand(&self) -> &'static str {
        match self {
            Provider::Alipay => CHANNEL_ALIPAY,
            Provider::Wechat => CHANNEL_WECHAT_PAY,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One table row of an Alipay export. Columns not listed are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlipayRow {
    #[serde(rename = "交易创建时间")]
    pub created_at: String,
    #[serde(rename = "交易状态", default)]
    pub status: String,
    #[serde(rename = "交易对方", default)]
    pub counterparty: String,
    #[serde(rename = "商品名称", default)]
    pub item: String,
    #[serde(rename = "金额（元）")]
    pub amount: String,
    #[serde(rename = "收/支", default)]
    pub direction: String,
    #[serde(rename = "服务费（元）", default)]
    pub fee: String,
    #[serde(rename = "备注", default)]
    pub note: String,
}

/// One table row of a WeChat Pay export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WechatRow {
    #[serde(rename = "交易时间")]
    pub traded_at: String,
    #[serde(rename = "交易类型", default)]
    pub kind: String,
    #[serde(rename = "交易对方", default)]
    pub counterparty: String,
    #[serde(rename = "商品", default)]
    pub item: String,
    #[serde(rename = "收/支", default)]
    pub direction: String,
    #[serde(rename = "金额(元)")]
    pub amount: String,
    #[serde(rename = "支付方式", default)]
    pub channel: String,
    #[serde(rename = "当前状态", default)]
    pub status: String,
    #[serde(rename = "交易单号", default)]
    pub transaction_id: String,
    #[serde(rename = "商户单号", default)]
    pub merchant_id: String,
    #[serde(rename = "备注", default)]
    pub note: String,
}

/// A decoded provider row, before mapping
#[derive(Debug, Clone, PartialEq)]
pub enum RawProviderRow {
    Alipay(AlipayRow),
    Wechat(WechatRow),
}

/// An input file tagged with the provider that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub provider: Provider,
    pub path: std::path::PathBuf,
}

impl SourceFile {
    pub fn new(provider: Provider, path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
        }
    }

    /// Short name used in logs and error messages
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
