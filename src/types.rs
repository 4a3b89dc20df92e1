use log::warn;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::sanitize::contains_case_insensitive;

/// A single scheduled event under `squadrons/{squadron}/{date}/events/{id}`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "text_or_number")]
    pub student: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub instructor: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub hrs: Option<String>,
}

impl Event {
    /// True when `name` appears in either the student or the instructor field.
    pub fn involves(&self, name: &str) -> bool {
        let matches = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| contains_case_insensitive(value, name))
        };
        matches(&self.student) || matches(&self.instructor)
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn decode_event(date: &str, id: &str, child: Value) -> Option<Event> {
    if !child.is_object() {
        warn!("Skipping event {id} on {date}: not an object");
        return None;
    }
    serde_json::from_value(child)
        .map_err(|e| warn!("Skipping event {id} on {date}: {e}"))
        .ok()
}

/// Children come back as an object keyed by push id, or as an array when the
/// keys happen to be sequential integers. Each child is read on its own.
fn decode_events(date: &str, events: Value) -> Vec<Event> {
    let children: Vec<(String, Value)> = match events {
        Value::Null => return Vec::new(),
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, child)| (i.to_string(), child))
            .collect(),
        other => {
            warn!("Unreadable events for {date}: {other}");
            return Vec::new();
        }
    };

    children
        .into_iter()
        .filter(|(_, child)| !child.is_null())
        .filter_map(|(id, child)| decode_event(date, &id, child))
        .collect()
}

/// One date-keyed node of a squadron's schedule.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DateEntry {
    pub date: String,
    pub events: Vec<Event>,
}

impl DateEntry {
    pub fn new(date: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            date: date.into(),
            events,
        }
    }

    /// Builds an entry from a raw database node. Children that can't be read
    /// as events are skipped.
    pub fn from_node(date: impl Into<String>, node: Value) -> Self {
        let date = date.into();
        let events = match node {
            Value::Object(mut fields) => fields.remove("events").unwrap_or(Value::Null),
            Value::Null => Value::Null,
            other => {
                warn!("Unreadable schedule node for {date}: {other}");
                Value::Null
            }
        };

        let events = decode_events(&date, events);
        Self { date, events }
    }
}

/// Hours per date, kept in the order the dates were read.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HoursByDate(Vec<(String, f64)>);

impl HoursByDate {
    pub fn push(&mut self, date: impl Into<String>, hours: f64) {
        self.0.push((date.into(), hours));
    }

    pub fn get(&self, date: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(d, _)| d == date)
            .map(|(_, hours)| *hours)
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(d, _)| d.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for HoursByDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (date, hours) in &self.0 {
            map.serialize_entry(date, hours)?;
        }
        map.end()
    }
}
