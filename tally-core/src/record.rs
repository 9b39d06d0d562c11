//! Canonical transaction record shared by every provider

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::TallyError;

/// Channel label for Alipay payments
pub const CHANNEL_ALIPAY: &str = "支付宝";
/// Channel label for WeChat Pay payments
pub const CHANNEL_WECHAT_PAY: &str = "微信支付";
/// Channel label for a linked WeChat family-card payment
pub const CHANNEL_FAMILY_CARD: &str = "亲属卡";

/// Spending categories. The set is closed: adding one is a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "餐饮", alias = "dining")]
    Dining,
    #[serde(rename = "住房", alias = "housing")]
    Housing,
    #[serde(rename = "交通", alias = "transport")]
    Transport,
    #[serde(rename = "生活", alias = "living")]
    Living,
    #[serde(rename = "娱乐", alias = "entertainment")]
    Entertainment,
    #[serde(rename = "人情", alias = "social-obligations")]
    SocialObligations,
    #[serde(rename = "交易", alias = "transactions")]
    Transactions,
    #[serde(rename = "礼物", alias = "gifts")]
    Gifts,
    #[serde(rename = "旅行", alias = "travel")]
    Travel,
    #[serde(rename = "工资", alias = "salary")]
    Salary,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Dining,
        Category::Housing,
        Category::Transport,
        Category::Living,
        Category::Entertainment,
        Category::SocialObligations,
        Category::Transactions,
        Category::Gifts,
        Category::Travel,
        Category::Salary,
    ];

    /// Label written to output files
    pub fn label(&self) -> &'static str {
        match self {
            Category::Dining => "餐饮",
            Category::Housing => "住房",
            Category::Transport => "交通",
            Category::Living => "生活",
            Category::Entertainment => "娱乐",
            Category::SocialObligations => "人情",
            Category::Transactions => "交易",
            Category::Gifts => "礼物",
            Category::Travel => "旅行",
            Category::Salary => "工资",
        }
    }

    /// English slug accepted in settings files
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Dining => "dining",
            Category::Housing => "housing",
            Category::Transport => "transport",
            Category::Living => "living",
            Category::Entertainment => "entertainment",
            Category::SocialObligations => "social-obligations",
            Category::Transactions => "transactions",
            Category::Gifts => "gifts",
            Category::Travel => "travel",
            Category::Salary => "salary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s || c.slug() == s)
            .ok_or_else(|| TallyError::Config(format!("unknown category: {s}")))
    }
}

/// Whether a transaction counts as income, expense, or neither
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "支出", alias = "expense")]
    Expense,
    #[serde(rename = "收入", alias = "income")]
    Income,
    #[serde(rename = "/", alias = "不计收支", alias = "not-applicable")]
    NotApplicable,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Expense => "支出",
            Direction::Income => "收入",
            Direction::NotApplicable => "/",
        }
    }

    /// Parse a provider direction marker. `None` for unknown markers.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim() {
            "支出" | "expense" => Some(Direction::Expense),
            "收入" | "income" => Some(Direction::Income),
            "/" | "不计收支" | "not-applicable" => Some(Direction::NotApplicable),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One normalized transaction.
///
/// Everything but `category` is fixed once a provider row has been mapped.
/// The category starts empty and can be assigned at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub timestamp: NaiveDateTime,
    category: Option<Category>,
    /// Decimal amount, currency glyphs stripped
    pub amount: String,
    pub direction: Direction,
    /// Payment channel (provider brand or sub-channel such as a family card)
    pub channel: String,
    pub counterparty: String,
    pub item: String,
    pub note: String,
}

impl CanonicalRecord {
    /// Create an unlabelled record
    pub fn new(
        timestamp: NaiveDateTime,
        amount: impl Into<String>,
        direction: Direction,
        channel: impl Into<String>,
        counterparty: impl Into<String>,
        item: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            category: None,
            amount: amount.into(),
            direction,
            channel: channel.into(),
            counterparty: counterparty.into(),
            item: item.into(),
            note: note.into(),
        }
    }

    /// Builder for records that arrive already labelled (historical data)
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn is_labelled(&self) -> bool {
        self.category.is_some()
    }

    /// Set the category if none is set yet. Returns whether it was applied.
    pub fn assign_category(&mut self, category: Category) -> bool {
        if self.category.is_some() {
            return false;
        }
        self.category = Some(category);
        true
    }

    /// Key used by the association table
    pub fn association_key(&self) -> AssociationKey {
        AssociationKey::new(&self.counterparty, &self.item)
    }
}

/// Composite (counterparty, item) key for learned associations
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationKey(String);

impl AssociationKey {
    /// ASCII unit separator; never present in exported text fields.
    pub const SEPARATOR: char = '\u{1f}';

    pub fn new(counterparty: &str, item: &str) -> Self {
        Self(format!("{counterparty}{}{item}", Self::SEPARATOR))
    }

    /// Split back into (counterparty, item)
    pub fn parts(&self) -> (&str, &str) {
        self.0
            .split_once(Self::SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for AssociationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (counterparty, item) = self.parts();
        write!(f, "{counterparty} | {item}")
    }
}
