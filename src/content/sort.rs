//! `orderby` parsing and deterministic comparators.
//!
//! An order is `"<key> [asc|desc]"`, e.g. `date desc`, `weight`, `count desc`,
//! or any metadata field name. Every comparator ends with a total tie-break,
//! so sorted output never depends on insertion order.

use super::{Page, TaxonomyTerm};
use crate::meta::Meta;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Modified,
    Title,
    Weight,
    Name,
    Count,
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub key: SortKey,
    pub desc: bool,
}

impl OrderBy {
    /// Parse `"<key> [asc|desc]"`. An empty string means `name`.
    pub fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let key = match words.next().map(str::to_lowercase).as_deref() {
            None | Some("name") => SortKey::Name,
            Some("date") => SortKey::Date,
            Some("modified") => SortKey::Modified,
            Some("title") => SortKey::Title,
            Some("weight") => SortKey::Weight,
            Some("count") => SortKey::Count,
            Some(field) => SortKey::Field(field.to_owned()),
        };
        let desc = words.next().is_some_and(|w| w.eq_ignore_ascii_case("desc"));
        Self { key, desc }
    }

    /// Read the order stored under `key`, falling back to `default`.
    pub fn from_meta(meta: &Meta, key: &str, default: &str) -> Self {
        Self::parse(meta.get_str(key).as_deref().unwrap_or(default))
    }

    fn direct(&self, ordering: Ordering) -> Ordering {
        if self.desc { ordering.reverse() } else { ordering }
    }

    /// Compare pages. Ties fall back to title, then identifier.
    pub fn compare_pages(&self, a: &Page, b: &Page) -> Ordering {
        let primary = match &self.key {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Modified => a.modified.cmp(&b.modified),
            SortKey::Title | SortKey::Name => a.title.cmp(&b.title),
            SortKey::Weight => weight(&a.meta).cmp(&weight(&b.meta)),
            SortKey::Count => Ordering::Equal,
            SortKey::Field(field) => compare_values(a.meta.get(field), b.meta.get(field)),
        };
        self.direct(primary)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Compare terms. Ties fall back to the full term path.
    pub fn compare_terms(&self, a: &TaxonomyTerm, b: &TaxonomyTerm) -> Ordering {
        let primary = match &self.key {
            SortKey::Name | SortKey::Date | SortKey::Modified => a.full.cmp(&b.full),
            SortKey::Title => term_title(a).cmp(&term_title(b)),
            SortKey::Count => a.pages.len().cmp(&b.pages.len()),
            SortKey::Weight => weight(&a.meta).cmp(&weight(&b.meta)),
            SortKey::Field(field) => compare_values(a.meta.get(field), b.meta.get(field)),
        };
        self.direct(primary).then_with(|| a.full.cmp(&b.full))
    }
}

fn weight(meta: &Meta) -> i64 {
    meta.get_i64("weight").unwrap_or(0)
}

fn term_title(term: &TaxonomyTerm) -> String {
    term.meta.get_str("title").unwrap_or_else(|| term.name.clone())
}

/// Numbers compare numerically, everything else by its text. Missing values sort last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => value_text(x).cmp(&value_text(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::page::tests::page_at;
    use serde_json::json;

    #[test]
    fn test_parse() {
        assert_eq!(OrderBy::parse("date desc"), OrderBy { key: SortKey::Date, desc: true });
        assert_eq!(OrderBy::parse("Weight"), OrderBy { key: SortKey::Weight, desc: false });
        assert_eq!(OrderBy::parse(""), OrderBy { key: SortKey::Name, desc: false });
        assert_eq!(
            OrderBy::parse("rating DESC"),
            OrderBy { key: SortKey::Field("rating".into()), desc: true }
        );
    }

    #[test]
    fn test_date_desc_with_tie_break() {
        let mut pages = vec![
            page_at("c.md", "C", "2024-01-01"),
            page_at("a.md", "A", "2024-01-01"),
            page_at("b.md", "B", "2024-02-01"),
        ];
        let order = OrderBy::parse("date desc");
        pages.sort_by(|a, b| order.compare_pages(a, b));

        let titles: Vec<_> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_field_order_numeric() {
        let mut a = page_at("a.md", "A", "2024-01-01");
        let mut b = page_at("b.md", "B", "2024-01-01");
        let c = page_at("c.md", "C", "2024-01-01");
        a.meta.insert("rating", json!(10));
        b.meta.insert("rating", json!(9));

        let mut pages = vec![c, a, b];
        let order = OrderBy::parse("rating");
        pages.sort_by(|x, y| order.compare_pages(x, y));

        let titles: Vec<_> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }
}
