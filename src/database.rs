use std::cmp::Ordering;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, trace, warn};
use reqwest::Url;
use serde_json::Value;

use crate::firebase::{FirebaseClient, FirebaseConfig};
use crate::types::DateEntry;

pub const SQUADRONS: &str = "squadrons";

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Read access to the squadron schedule tree.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// The last `limit` date entries under `squadrons/{squadron}`, in key order.
    async fn last_dates(&self, squadron: &str, limit: u32) -> Result<Vec<DateEntry>>;
}

pub struct RealtimeDatabase {
    firebase: FirebaseClient,
    database_url: String,
}

impl RealtimeDatabase {
    pub fn new(firebase: FirebaseClient, config: &FirebaseConfig) -> Self {
        Self {
            firebase,
            database_url: config.database_url.clone(),
        }
    }
}

fn squadron_url(database_url: &str, squadron: &str, limit: u32) -> Result<Url> {
    let mut url = Url::parse(database_url)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Invalid database URL: {database_url}"))?
        .pop_if_empty()
        .push(SQUADRONS)
        .push(&format!("{squadron}.json"));
    url.query_pairs_mut()
        .append_pair("orderBy", "\"$key\"")
        .append_pair("limitToLast", &limit.to_string());
    Ok(url)
}

#[async_trait]
impl ScheduleStore for RealtimeDatabase {
    async fn last_dates(&self, squadron: &str, limit: u32) -> Result<Vec<DateEntry>> {
        let url = squadron_url(&self.database_url, squadron, limit)?;
        debug!("Fetching last {limit} dates for {squadron}");

        let body: Value = self
            .firebase
            .send_authenticated(self.firebase.http().get(url), SCOPES)
            .await?
            .json()
            .await?;
        trace!("{body}");

        Ok(date_entries(body))
    }
}

/// Only canonical integers count: no `+`, no leading zeros, no `-0`.
fn key_as_int(key: &str) -> Option<i32> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    let canonical = key == "0"
        || (!digits.is_empty()
            && !digits.starts_with('0')
            && digits.bytes().all(|b| b.is_ascii_digit()));

    if canonical { key.parse().ok() } else { None }
}

/// Key order of the database: integer-like keys ascending, then everything
/// else lexicographically.
fn compare_keys(a: &str, b: &str) -> Ordering {
    match (key_as_int(a), key_as_int(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Query results arrive as an unordered object (or an array when the keys are
/// sequential integers), so key order is restored here.
fn date_entries(body: Value) -> Vec<DateEntry> {
    let mut nodes: Vec<(String, Value)> = match body {
        Value::Null => Vec::new(),
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, node)| !node.is_null())
            .map(|(i, node)| (i.to_string(), node))
            .collect(),
        other => {
            warn!("Unexpected squadron node: {other}");
            Vec::new()
        }
    };

    nodes.sort_by(|(a, _), (b, _)| compare_keys(a, b));

    nodes
        .into_iter()
        .map(|(date, node)| DateEntry::from_node(date, node))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    const EXAMPLE_SQUADRON_RESPONSE: &str = include_str!("../tests/fixtures/squadron.json");

    #[test]
    fn test_squadron_url() -> Result<()> {
        assert_eq!(
            squadron_url("https://example.firebaseio.com", "VT-10", 7)?.as_str(),
            "https://example.firebaseio.com/squadrons/VT-10.json?orderBy=%22%24key%22&limitToLast=7"
        );
        Ok(())
    }

    #[test]
    fn test_squadron_url_escapes_segment() -> Result<()> {
        let url = squadron_url("https://example.firebaseio.com/", "VT 10", 1)?;
        assert_eq!(url.path(), "/squadrons/VT%2010.json");
        Ok(())
    }

    #[test]
    fn test_compare_keys_dates() {
        assert_eq!(compare_keys("2023-03-04", "2023-03-05"), Ordering::Less);
        assert_eq!(compare_keys("2023-12-31", "2023-03-05"), Ordering::Greater);
    }

    #[test]
    fn test_compare_keys_integers_first() {
        assert_eq!(compare_keys("10", "9"), Ordering::Greater);
        assert_eq!(compare_keys("10", "2023-03-04"), Ordering::Less);
        assert_eq!(compare_keys("2023-03-04", "7"), Ordering::Greater);
    }

    #[test]
    fn test_key_as_int_canonical_only() {
        assert_eq!(key_as_int("0"), Some(0));
        assert_eq!(key_as_int("42"), Some(42));
        assert_eq!(key_as_int("-3"), Some(-3));
        assert_eq!(key_as_int("+5"), None);
        assert_eq!(key_as_int("007"), None);
        assert_eq!(key_as_int("-0"), None);
        assert_eq!(key_as_int("-"), None);
        assert_eq!(key_as_int("2147483648"), None);
    }

    #[test]
    fn test_compare_keys_non_canonical_are_strings() {
        assert_eq!(compare_keys("+5", "10"), Ordering::Greater);
        assert_eq!(compare_keys("007", "7"), Ordering::Greater);
        assert_eq!(compare_keys("007", "2023-03-04"), Ordering::Less);
        assert_eq!(compare_keys("-3", "5"), Ordering::Less);
    }

    #[test]
    fn test_date_entries_fixture_in_key_order() -> Result<()> {
        let body: Value = serde_json::from_str(EXAMPLE_SQUADRON_RESPONSE)?;
        let entries = date_entries(body);

        let dates: Vec<_> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-03-04", "2023-03-05", "2023-03-06"]);
        assert_eq!(entries[0].events.len(), 3);
        assert_eq!(entries[1].events.len(), 2);
        assert!(entries[2].events.is_empty());

        Ok(())
    }

    #[test]
    fn test_date_entries_null() {
        assert!(date_entries(Value::Null).is_empty());
    }

    #[test]
    fn test_date_entries_array() {
        let entries = date_entries(json!([null, { "events": {} }, { "events": {} }]));
        let dates: Vec<_> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["1", "2"]);
    }

    #[test]
    fn test_date_entries_scalar() {
        assert!(date_entries(json!(42)).is_empty());
    }
}
