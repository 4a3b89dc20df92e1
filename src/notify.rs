use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::messaging::{Message, Messenger, Notification};
use crate::sanitize::{sanitize_date, sanitize_squadron};
use crate::trigger::{ChangeFeed, ChangeHandler, ChangeKind, PathParams};

pub const SCHEDULE_PATH: &str = "/squadrons/{squadron}/{date}";

pub fn schedule_message(squadron: &str, date: &str) -> Message {
    Message {
        notification: Notification {
            body: format!("Schedule for {}", sanitize_date(date)),
        },
        topic: sanitize_squadron(squadron),
    }
}

/// Announces newly added schedule dates to the squadron's topic.
#[derive(Clone)]
pub struct ScheduleNotifier {
    messenger: Arc<dyn Messenger>,
}

impl ScheduleNotifier {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Sends the notification. Failures are logged and never returned.
    pub async fn notify(&self, squadron: &str, date: &str) {
        let message = schedule_message(squadron, date);
        info!("topic: {}", message.topic);

        match self.messenger.send(&message).await {
            Ok(name) => info!("Successfully sent message: {name}"),
            Err(e) => error!("Error sending message to {}: {e:#}", message.topic),
        }
    }

    /// Fire-and-forget: the task never yields an error, only a log line.
    pub fn spawn(&self, squadron: String, date: String) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.notify(&squadron, &date).await })
    }

    /// Registers this notifier for newly created schedule dates.
    pub fn register(self, feed: &mut ChangeFeed) -> Result<()> {
        feed.on(SCHEDULE_PATH.parse()?, ChangeKind::Created, Arc::new(self));
        Ok(())
    }
}

#[async_trait]
impl ChangeHandler for ScheduleNotifier {
    async fn on_change(&self, params: &PathParams) {
        let (Some(squadron), Some(date)) = (params.get("squadron"), params.get("date")) else {
            warn!("Schedule change without squadron and date: {params:?}");
            return;
        };

        // Awaited so the send completes before the invocation is frozen.
        if let Err(e) = self.spawn(squadron.to_owned(), date.to_owned()).await {
            error!("Notification task failed: {e}");
        }
    }
}
