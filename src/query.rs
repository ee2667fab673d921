//! # Catalog search
//!
//! Builds the product listing filter from query-string parameters:
//! keyword search as a case-insensitive partial match on `name`, any
//! remaining parameter as an equality or range filter, and fixed-size
//! page windowing. The un-paginated total is counted separately so the
//! client can compute page numbers.
//!
//! Range filters use the `field[op]=value` key form, e.g.
//! `price[gte]=100&price[lt]=500`. Numeric values compare as numbers;
//! anything unparseable compares as a string.

use std::collections::HashMap;

use bson::{doc, Bson, Document};

pub const PAGE_SIZE: i64 = 8;

const RESERVED: [&str; 3] = ["keyword", "page", "limit"];
const RANGE_OPS: [&str; 4] = ["gt", "gte", "lt", "lte"];

pub fn build_filter(params: &HashMap<String, String>) -> Document {
    let mut filter = Document::new();

    if let Some(keyword) = params.get("keyword").filter(|k| !k.is_empty()) {
        filter.insert("name", doc! { "$regex": keyword.as_str(), "$options": "i" });
    }

    let mut ranges: HashMap<String, Document> = HashMap::new();

    for (key, value) in params {
        if RESERVED.contains(&key.as_str()) {
            continue;
        }
        match parse_ranged(key) {
            Some((field, op)) => {
                ranges
                    .entry(field.to_string())
                    .or_default()
                    .insert(format!("${op}"), scalar(value));
            }
            None => {
                filter.insert(key.as_str(), scalar(value));
            }
        }
    }

    for (field, ops) in ranges {
        filter.insert(field, ops);
    }

    filter
}

/// Zero-based skip and page length for a 1-based page number.
pub fn page_bounds(page: Option<u64>) -> (u64, i64) {
    let page = page.unwrap_or(1).max(1);
    ((page - 1) * PAGE_SIZE as u64, PAGE_SIZE)
}

fn parse_ranged(key: &str) -> Option<(&str, &str)> {
    let (field, rest) = key.split_once('[')?;
    let op = rest.strip_suffix(']')?;
    RANGE_OPS.contains(&op).then_some((field, op))
}

fn scalar(value: &str) -> Bson {
    value
        .parse::<f64>()
        .map(Bson::Double)
        .unwrap_or_else(|_| Bson::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn keyword_becomes_case_insensitive_partial_match() {
        let filter = build_filter(&params(&[("keyword", "maize")]));

        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), "maize");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn range_keys_fold_into_one_operator_document() {
        let filter = build_filter(&params(&[("price[gte]", "100"), ("price[lt]", "500")]));

        let price = filter.get_document("price").unwrap();
        assert_eq!(price.get_f64("$gte").unwrap(), 100.0);
        assert_eq!(price.get_f64("$lt").unwrap(), 500.0);
    }

    #[test]
    fn plain_keys_filter_by_equality() {
        let filter = build_filter(&params(&[("stock", "0")]));
        assert_eq!(filter.get_f64("stock").unwrap(), 0.0);
    }

    #[test]
    fn reserved_keys_never_reach_the_filter() {
        let filter = build_filter(&params(&[("keyword", ""), ("page", "3")]));
        assert!(filter.is_empty());
    }

    #[test]
    fn non_numeric_values_compare_as_strings() {
        let filter = build_filter(&params(&[("name", "yam")]));
        assert_eq!(filter.get_str("name").unwrap(), "yam");
    }

    #[test]
    fn pages_are_fixed_size_windows() {
        assert_eq!(page_bounds(None), (0, PAGE_SIZE));
        assert_eq!(page_bounds(Some(1)), (0, PAGE_SIZE));
        assert_eq!(page_bounds(Some(3)), (16, PAGE_SIZE));
        assert_eq!(page_bounds(Some(0)), (0, PAGE_SIZE));
    }
}
