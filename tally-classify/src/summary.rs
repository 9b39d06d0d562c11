//! Spending totals per category, split by direction.

use std::collections::BTreeMap;

use tally_core::{CanonicalRecord, Category, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryTotal {
    /// `None` collects unassigned records
    pub category: Option<Category>,
    pub expense_cents: i64,
    pub income_cents: i64,
    /// Uncounted records that survived classification (refunds)
    pub other_cents: i64,
    pub count: usize,
}

impl CategoryTotal {
    pub fn label(&self) -> &'static str {
        self.category.map(|c| c.label()).unwrap_or("未分类")
    }
}

/// Amount text → integer cents. `None` when the text is not a number.
pub fn parse_cents(amount: &str) -> Option<i64> {
    let value: f64 = amount.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some((value * 100.0).round() as i64)
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Totals in category order, unassigned last. Unparseable amounts count as zero.
pub fn summarize(records: &[CanonicalRecord]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<Option<Category>, CategoryTotal> = BTreeMap::new();

    for record in records {
        let entry = totals
            .entry(record.category())
            .or_insert_with(|| CategoryTotal {
                category: record.category(),
                ..CategoryTotal::default()
            });
        let cents = parse_cents(&record.amount).unwrap_or(0);
        match record.direction {
            Direction::Expense => entry.expense_cents += cents,
            Direction::Income => entry.income_cents += cents,
            Direction::NotApplicable => entry.other_cents += cents,
        }
        entry.count += 1;
    }

    let mut out: Vec<CategoryTotal> = totals.into_values().collect();
    // None sorts first in the map; move it to the end.
    if out.first().is_some_and(|t| t.category.is_none()) {
        out.rotate_left(1);
    }
    out
}
