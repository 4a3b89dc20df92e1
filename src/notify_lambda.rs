use std::sync::Arc;

use jluszcz_rust_utils::lambda;
use lambda_runtime::{LambdaEvent, service_fn};
use log::debug;
use serde_json::{Value, json};
use squadron_schedule::APP_NAME;
use squadron_schedule::firebase::{FirebaseClient, FirebaseConfig};
use squadron_schedule::messaging::CloudMessaging;
use squadron_schedule::notify::ScheduleNotifier;
use squadron_schedule::trigger::{ChangeEvent, ChangeFeed};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    lambda::init(APP_NAME, module_path!(), false).await?;

    let config = FirebaseConfig::from_env()?;
    let messaging = CloudMessaging::new(FirebaseClient::new(&config)?, &config);

    let mut feed = ChangeFeed::new();
    ScheduleNotifier::new(Arc::new(messaging)).register(&mut feed)?;
    let feed = Arc::new(feed);

    let func = service_fn(move |event: LambdaEvent<ChangeEvent>| {
        let feed = Arc::clone(&feed);
        async move { handler(&feed, event).await }
    });
    lambda_runtime::run(func).await?;
    Ok(())
}

/// Change events never fail the invocation; send failures are only logged.
async fn handler(
    feed: &ChangeFeed,
    event: LambdaEvent<ChangeEvent>,
) -> Result<Value, lambda_runtime::Error> {
    let handled = feed.dispatch(&event.payload).await;
    debug!("{handled} trigger(s) for {:?}", event.payload);

    Ok(json!({}))
}
