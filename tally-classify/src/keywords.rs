//! User-authored keyword rules: substring of the item text → category.
//!
//! Rules are checked in authored order and the first keyword found in the
//! item decides. No scoring, no longest-match preference.

use tally_core::Category;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct KeywordRule {
    keyword: String,
    /// Label as authored; resolved against the category set at lookup time
    label: String,
    category: Option<Category>,
}

#[derive(Debug, Clone, Default)]
pub struct KeywordDictionary {
    rules: Vec<KeywordRule>,
}

impl KeywordDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. An empty keyword is kept in place and matches every item.
    pub fn push(&mut self, keyword: impl Into<String>, label: impl Into<String>) {
        let keyword = keyword.into();
        let label = label.into();
        if keyword.is_empty() {
            warn!("empty keyword matches every item; later keywords are unreachable");
        }
        let category = label.parse::<Category>().ok();
        if category.is_none() {
            warn!("keyword '{}' maps to unknown category '{}'; it will never label a record", keyword, label);
        }
        self.rules.push(KeywordRule {
            keyword,
            label,
            category,
        });
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Keywords with their authored labels, in match order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|r| (r.keyword.as_str(), r.label.as_str()))
    }

    /// Category for `item`, decided by the first keyword it contains.
    ///
    /// If that keyword's label is not a known category the lookup yields
    /// nothing; later keywords are not consulted.
    pub fn lookup(&self, item: &str) -> Option<Category> {
        let rule = self.rules.iter().find(|r| item.contains(r.keyword.as_str()))?;
        if rule.category.is_none() {
            debug!("'{}' matched keyword '{}' with invalid label '{}'", item, rule.keyword, rule.label);
        }
        rule.category
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeywordDictionary {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut dict = KeywordDictionary::new();
        for (keyword, label) in iter {
            dict.push(keyword, label);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match() {
        let dict: KeywordDictionary = [("超市", "living")].into_iter().collect();
        assert_eq!(dict.lookup("本地超市"), Some(Category::Living));
        assert_eq!(dict.lookup("地铁"), None);
    }

    #[test]
    fn test_first_authored_keyword_wins() {
        let dict: KeywordDictionary = [("咖啡", "餐饮"), ("星巴克咖啡", "entertainment")]
            .into_iter()
            .collect();
        assert_eq!(dict.lookup("星巴克咖啡"), Some(Category::Dining));
    }

    #[test]
    fn test_invalid_label_stops_the_scan() {
        let dict: KeywordDictionary = [("滴滴", "rides"), ("快车", "transport")]
            .into_iter()
            .collect();
        assert_eq!(dict.lookup("滴滴快车"), None);
        assert_eq!(dict.lookup("快车"), Some(Category::Transport));
    }

    #[test]
    fn test_empty_keyword_matches_in_authored_order() {
        let dict: KeywordDictionary = [("", "living"), ("超市", "dining")].into_iter().collect();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.lookup("本地超市"), Some(Category::Living));
        assert_eq!(dict.lookup(""), Some(Category::Living));

        let later: KeywordDictionary = [("超市", "dining"), ("", "living")].into_iter().collect();
        assert_eq!(later.lookup("本地超市"), Some(Category::Dining));
        assert_eq!(later.lookup("地铁"), Some(Category::Living));
    }
}
