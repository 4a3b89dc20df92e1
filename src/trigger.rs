//! Database change feed.
//!
//! Handlers register against a path pattern such as
//! `/squadrons/{squadron}/{date}` and a change kind. Each incoming
//! [`ChangeEvent`] is dispatched to every trigger whose pattern and kind
//! match, with the pattern's placeholders bound to the path's segments.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Error, Result, anyhow, bail};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A change to a node of the database, as delivered to the notify Lambda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl FromStr for PathPattern {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Self> {
        let segments = path_segments(pattern)
            .map(|segment| {
                if let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                {
                    if name.is_empty() || name.contains(['{', '}']) {
                        bail!("Invalid placeholder '{segment}' in {pattern}");
                    }
                    Ok(Segment::Param(name.to_owned()))
                } else if segment.contains(['{', '}']) {
                    Err(anyhow!("Invalid segment '{segment}' in {pattern}"))
                } else {
                    Ok(Segment::Literal(segment.to_owned()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        if segments.is_empty() {
            bail!("Empty path pattern: '{pattern}'");
        }

        Ok(Self { segments })
    }
}

impl PathPattern {
    /// Binds placeholders when `path` has the same shape as this pattern.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path_segments(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_owned());
                }
            }
        }

        Some(PathParams(params))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Reacts to a matched change. Handlers own their failures; nothing is
/// reported back to the feed.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn on_change(&self, params: &PathParams);
}

struct Trigger {
    pattern: PathPattern,
    kind: ChangeKind,
    handler: Arc<dyn ChangeHandler>,
}

#[derive(Default)]
pub struct ChangeFeed {
    triggers: Vec<Trigger>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        &mut self,
        pattern: PathPattern,
        kind: ChangeKind,
        handler: Arc<dyn ChangeHandler>,
    ) -> &mut Self {
        self.triggers.push(Trigger {
            pattern,
            kind,
            handler,
        });
        self
    }

    /// Runs every matching handler, returning how many ran.
    pub async fn dispatch(&self, event: &ChangeEvent) -> usize {
        let mut handled = 0;

        for trigger in &self.triggers {
            if trigger.kind != event.kind {
                continue;
            }
            if let Some(params) = trigger.pattern.matches(&event.path) {
                debug!("{:?} {} matched {:?}", event.kind, event.path, params);
                trigger.handler.on_change(&params).await;
                handled += 1;
            }
        }

        if handled == 0 {
            debug!("No trigger for {:?} {}", event.kind, event.path);
        }

        handled
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PathParams>>,
    }

    #[async_trait]
    impl ChangeHandler for Recorder {
        async fn on_change(&self, params: &PathParams) {
            self.seen.lock().unwrap().push(params.clone());
        }
    }

    fn event(kind: ChangeKind, path: &str) -> ChangeEvent {
        ChangeEvent {
            kind,
            path: path.to_owned(),
        }
    }

    // --- PathPattern ---

    #[test]
    fn test_pattern_matches() -> Result<()> {
        let pattern: PathPattern = "/squadrons/{squadron}/{date}".parse()?;
        let params = pattern
            .matches("/squadrons/VT+10/2023-03-04")
            .ok_or_else(|| anyhow!("no match"))?;

        assert_eq!(params.get("squadron"), Some("VT+10"));
        assert_eq!(params.get("date"), Some("2023-03-04"));
        assert_eq!(params.get("events"), None);

        Ok(())
    }

    #[test]
    fn test_pattern_ignores_extra_slashes() -> Result<()> {
        let pattern: PathPattern = "squadrons/{squadron}/{date}/".parse()?;
        assert!(pattern.matches("squadrons/VT-10/2023-03-04").is_some());
        Ok(())
    }

    #[test]
    fn test_pattern_rejects_deeper_path() -> Result<()> {
        let pattern: PathPattern = "/squadrons/{squadron}/{date}".parse()?;
        assert!(pattern.matches("/squadrons/VT-10/2023-03-04/events/abc").is_none());
        assert!(pattern.matches("/squadrons/VT-10").is_none());
        Ok(())
    }

    #[test]
    fn test_pattern_rejects_other_literal() -> Result<()> {
        let pattern: PathPattern = "/squadrons/{squadron}/{date}".parse()?;
        assert!(pattern.matches("/users/VT-10/2023-03-04").is_none());
        Ok(())
    }

    #[test]
    fn test_pattern_parse_errors() {
        assert!("".parse::<PathPattern>().is_err());
        assert!("/".parse::<PathPattern>().is_err());
        assert!("/squadrons/{}".parse::<PathPattern>().is_err());
        assert!("/squadrons/{squadron".parse::<PathPattern>().is_err());
        assert!("/squadrons/x{y}".parse::<PathPattern>().is_err());
    }

    // --- ChangeEvent ---

    #[test]
    fn test_change_event_deserialize() -> Result<()> {
        let event: ChangeEvent =
            serde_json::from_str(r#"{"kind":"created","path":"/squadrons/VT-10/2023-03-04"}"#)?;
        assert_eq!(event, self::event(ChangeKind::Created, "/squadrons/VT-10/2023-03-04"));
        Ok(())
    }

    // --- ChangeFeed ---

    #[tokio::test]
    async fn test_dispatch_matching_kind() -> Result<()> {
        let recorder = Arc::new(Recorder::default());
        let mut feed = ChangeFeed::new();
        feed.on(
            "/squadrons/{squadron}/{date}".parse()?,
            ChangeKind::Created,
            recorder.clone(),
        );

        let handled = feed
            .dispatch(&event(ChangeKind::Created, "/squadrons/VT-10/2023-03-04"))
            .await;

        assert_eq!(handled, 1);
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("date"), Some("2023-03-04"));

        Ok(())
    }

    #[tokio::test]
    async fn test_dispatch_skips_other_kinds() -> Result<()> {
        let recorder = Arc::new(Recorder::default());
        let mut feed = ChangeFeed::new();
        feed.on(
            "/squadrons/{squadron}/{date}".parse()?,
            ChangeKind::Created,
            recorder.clone(),
        );

        for kind in [ChangeKind::Updated, ChangeKind::Deleted] {
            assert_eq!(
                feed.dispatch(&event(kind, "/squadrons/VT-10/2023-03-04")).await,
                0
            );
        }
        assert!(recorder.seen.lock().unwrap().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_dispatch_multiple_triggers() -> Result<()> {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut feed = ChangeFeed::new();
        feed.on("/squadrons/{squadron}/{date}".parse()?, ChangeKind::Created, first.clone())
            .on("/squadrons/{squadron}/{day}".parse()?, ChangeKind::Created, second.clone());

        let handled = feed
            .dispatch(&event(ChangeKind::Created, "/squadrons/VT-10/2023-03-04"))
            .await;

        assert_eq!(handled, 2);
        assert_eq!(second.seen.lock().unwrap()[0].get("day"), Some("2023-03-04"));

        Ok(())
    }
}
