use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::firebase::{FirebaseClient, FirebaseConfig};

const FCM_API: &str = "https://fcm.googleapis.com/v1/projects";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/firebase.messaging"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub body: String,
}

/// A push notification addressed to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub notification: Notification,
    pub topic: String,
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends `message`, returning the id assigned by the messaging service.
    async fn send(&self, message: &Message) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

pub struct CloudMessaging {
    firebase: FirebaseClient,
    project_id: String,
}

impl CloudMessaging {
    pub fn new(firebase: FirebaseClient, config: &FirebaseConfig) -> Self {
        Self {
            firebase,
            project_id: config.project_id.clone(),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/{}/messages:send", FCM_API, &self.project_id)
    }
}

fn send_body(message: &Message) -> serde_json::Value {
    json!({ "message": message })
}

#[async_trait]
impl Messenger for CloudMessaging {
    async fn send(&self, message: &Message) -> Result<String> {
        debug!("Sending to topic {}: {}", message.topic, message.notification.body);

        let response: SendResponse = self
            .firebase
            .send_authenticated(
                self.firebase.http().post(self.send_url()).json(&send_body(message)),
                SCOPES,
            )
            .await?
            .json()
            .await?;

        Ok(response.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_send_body() {
        let message = Message {
            notification: Notification {
                body: "Schedule for Saturday, Mar 4th 2023".to_owned(),
            },
            topic: "VT-10".to_owned(),
        };

        assert_eq!(
            send_body(&message),
            json!({
                "message": {
                    "notification": { "body": "Schedule for Saturday, Mar 4th 2023" },
                    "topic": "VT-10"
                }
            })
        );
    }

    #[test]
    fn test_send_response() -> Result<()> {
        const RESPONSE: &str =
            r#"{"name":"projects/squadrons-app/messages/0:1500415314455276%31bd1c9631bd1c96"}"#;
        let response: SendResponse = serde_json::from_str(RESPONSE)?;
        assert!(response.name.starts_with("projects/squadrons-app/messages/"));
        Ok(())
    }
}
