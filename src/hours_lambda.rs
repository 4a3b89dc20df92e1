use std::sync::Arc;

use jluszcz_rust_utils::lambda;
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::Value;
use squadron_schedule::APP_NAME;
use squadron_schedule::callable::CallableResponse;
use squadron_schedule::database::RealtimeDatabase;
use squadron_schedule::firebase::{FirebaseClient, FirebaseConfig};
use squadron_schedule::hours::handle_call;
use squadron_schedule::types::HoursByDate;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    lambda::init(APP_NAME, module_path!(), false).await?;

    let config = FirebaseConfig::from_env()?;
    let database = Arc::new(RealtimeDatabase::new(FirebaseClient::new(&config)?, &config));

    let func = service_fn(move |event: LambdaEvent<Value>| {
        let database = Arc::clone(&database);
        async move { handler(&database, event).await }
    });
    lambda_runtime::run(func).await?;
    Ok(())
}

async fn handler(
    database: &RealtimeDatabase,
    event: LambdaEvent<Value>,
) -> Result<CallableResponse<HoursByDate>, lambda_runtime::Error> {
    Ok(handle_call(database, event.payload).await)
}
