//! Flight hours per day for one person.

use log::{debug, error, warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::callable::{CallableError, CallableRequest, CallableResponse, ErrorStatus};
use crate::database::ScheduleStore;
use crate::types::{DateEntry, HoursByDate};

/// Characters that can't appear in a database key.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

#[derive(Debug, Error)]
pub enum HoursError {
    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("schedule unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> HoursError {
    HoursError::InvalidArgument {
        field,
        reason: reason.into(),
    }
}

impl From<HoursError> for CallableError {
    fn from(e: HoursError) -> Self {
        let status = match e {
            HoursError::InvalidArgument { .. } => ErrorStatus::InvalidArgument,
            HoursError::Unavailable(_) => ErrorStatus::Unavailable,
        };
        CallableError::new(status, e.to_string())
    }
}

/// Arguments exactly as the client sent them.
#[derive(Debug, Default, Deserialize)]
pub struct HoursArgs {
    #[serde(default)]
    pub squadron: Option<Value>,
    #[serde(default)]
    pub days: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoursRequest {
    pub squadron: String,
    pub days: u32,
    pub name: String,
}

fn positive_days(days: &Value) -> Option<u32> {
    let days = match days {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|d| d.fract() == 0.0 && *d >= 1.0)
                .map(|d| d as u64)
        }),
        _ => None,
    }?;

    u32::try_from(days).ok().filter(|d| *d > 0)
}

impl TryFrom<HoursArgs> for HoursRequest {
    type Error = HoursError;

    fn try_from(args: HoursArgs) -> Result<Self, Self::Error> {
        let squadron = match args.squadron {
            Some(Value::String(s)) if s.is_empty() => return Err(invalid("squadron", "is empty")),
            Some(Value::String(s)) if s.contains(FORBIDDEN_KEY_CHARS) => {
                return Err(invalid("squadron", "contains a character not allowed in keys"));
            }
            Some(Value::String(s)) => s,
            Some(_) => return Err(invalid("squadron", "must be a string")),
            None => return Err(invalid("squadron", "is required")),
        };

        let days = match &args.days {
            Some(days) => {
                positive_days(days).ok_or_else(|| invalid("days", "must be a positive integer"))?
            }
            None => return Err(invalid("days", "is required")),
        };

        let name = match args.name {
            Some(Value::String(s)) => s,
            Some(_) => return Err(invalid("name", "must be a string")),
            None => return Err(invalid("name", "is required")),
        };

        Ok(Self {
            squadron,
            days,
            name,
        })
    }
}

fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        digits += frac_end - (end + 1);
        end = frac_end;
    }

    if digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_start = end + 1 + sign;
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    end
}

/// Parses the leading number of a trimmed `hrs` value; anything unreadable is 0.
pub fn parse_hours(hrs: &str) -> f64 {
    let hrs = hrs.trim();
    hrs[..numeric_prefix_len(hrs)]
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite())
        .unwrap_or(0.0)
}

pub fn hours_per_day(name: &str, entry: &DateEntry) -> f64 {
    entry
        .events
        .iter()
        .filter(|event| event.involves(name))
        .map(|event| event.hrs.as_deref().map(parse_hours).unwrap_or(0.0))
        .fold(0.0, |total, hours| total + hours)
}

/// One total per entry, in the entries' order, including zero totals.
pub fn hours_by_date(name: &str, entries: &[DateEntry]) -> HoursByDate {
    let mut hours = HoursByDate::default();
    for entry in entries {
        hours.push(entry.date.clone(), hours_per_day(name, entry));
    }
    hours
}

pub async fn download_chart_data(
    store: &dyn ScheduleStore,
    args: HoursArgs,
) -> Result<HoursByDate, HoursError> {
    let request = HoursRequest::try_from(args)?;
    debug!("{request:?}");

    let entries = store
        .last_dates(&request.squadron, request.days)
        .await
        .map_err(HoursError::Unavailable)?;
    debug!("Read {} date(s) for {}", entries.len(), request.squadron);

    Ok(hours_by_date(&request.name, &entries))
}

/// Handles a raw callable request body.
pub async fn handle_call(
    store: &dyn ScheduleStore,
    payload: Value,
) -> CallableResponse<HoursByDate> {
    let request: CallableRequest<HoursArgs> = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            return CallableResponse::Error(CallableError::new(
                ErrorStatus::InvalidArgument,
                format!("malformed request: {e}"),
            ));
        }
    };

    let result = download_chart_data(store, request.data).await;
    match &result {
        Err(e @ HoursError::InvalidArgument { .. }) => warn!("Rejected hours request: {e}"),
        Err(e @ HoursError::Unavailable(source)) => error!("{e}: {source:#}"),
        Ok(_) => {}
    }
    result.into()
}
