//! chat-kv demo
//!
//! Runs the reference scenario against the real conversational backend, or
//! with `--poem` a short free-form demo. Set `CHAT_KV_SESSION_TOKEN` first.

use chat_kv::transport::BackendConfig;
use chat_kv::{
    ChatBackend, Config, ConversationIds, KeyValueStore, LoggingSession, RemoteSession,
    SharedCredentials, StoreResult,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    init_tracing(config.log_json);

    let poem = std::env::args().skip(1).any(|arg| arg == "--poem");

    let Some(credentials) = config.credentials() else {
        tracing::error!("CHAT_KV_SESSION_TOKEN is not set");
        return Err("missing session token".into());
    };

    let backend = connect(config.backend_config())?;
    let credentials = SharedCredentials::new(credentials);
    let mut store = match &config.state_path {
        Some(path) => match ConversationIds::load(path)? {
            Some(ids) => {
                tracing::info!(path = %path.display(), ?ids, "Resuming saved conversations");
                KeyValueStore::resume(backend, credentials, ids, config.store_options())
            }
            None => KeyValueStore::new(backend, credentials, config.store_options()),
        },
        None => KeyValueStore::new(backend, credentials, config.store_options()),
    };

    store.start().await?;
    if let Some(path) = &config.state_path {
        store.conversation_ids().save(path)?;
        tracing::info!(path = %path.display(), "Saved conversation ids");
    }

    let mismatches = if poem {
        poem_demo(&mut store).await?
    } else {
        reference_scenario(&mut store).await?
    };

    if let Some(path) = &config.state_path {
        store.conversation_ids().save(path)?;
    }

    if mismatches > 0 {
        tracing::error!(mismatches, "Demo finished with unexpected answers");
        return Err(format!("{mismatches} unexpected answers").into());
    }
    tracing::info!("Demo finished");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chat_kv=info,chat_kv_demo=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn connect(config: BackendConfig) -> Result<Arc<dyn RemoteSession>, Box<dyn std::error::Error>> {
    let backend: Arc<dyn RemoteSession> = Arc::new(ChatBackend::new(config)?);
    Ok(Arc::new(LoggingSession::new(backend)))
}

/// Log `value` and flag it unless it equals one of `expected`
fn check(step: &str, value: &Value, expected: &[Value]) -> usize {
    if expected.is_empty() || expected.contains(value) {
        tracing::info!(step, %value, "Answer");
        0
    } else {
        tracing::error!(step, %value, expected = ?expected, "Invalid response");
        1
    }
}

async fn reference_scenario(store: &mut KeyValueStore) -> StoreResult<usize> {
    let mut mismatches = 0;
    let all = |map: Map<String, Value>| Value::Object(map);

    mismatches += check("save a", &store.save("a", 9).await?, &[]);
    mismatches += check("all", &all(store.all().await?), &[json!({"a": 9})]);
    mismatches += check("save xx", &store.save("xx", 12).await?, &[]);
    mismatches += check("save xy", &store.save("xy", 42).await?, &[]);
    mismatches += check("save zz", &store.save("zz", 99).await?, &[]);
    mismatches += check(
        "all",
        &all(store.all().await?),
        &[json!({"a": 9, "xx": 12, "xy": 42, "zz": 99})],
    );
    mismatches += check(
        "filter",
        &Value::Array(store.filter("x[x-y]").await?),
        &[json!(["xx", "xy"]), json!([12, 42]), json!(["12", "42"])],
    );
    mismatches += check("delete xy", &store.delete("xy").await?, &[]);
    mismatches += check(
        "all",
        &all(store.all().await?),
        &[json!({"a": 9, "xx": 12, "zz": 99})],
    );
    mismatches += check(
        "query",
        &store.query("sum all the values").await?,
        &[json!({"sum": 120}), json!(120)],
    );
    Ok(mismatches)
}

async fn poem_demo(store: &mut KeyValueStore) -> StoreResult<usize> {
    store.save("x", 42).await?;
    store.save("a", 19).await?;
    store.save("x", 99).await?;
    let poem = store.query("write me a short poem, two sentences long").await?;
    check("poem", &poem, &[]);
    check("all", &Value::Object(store.all().await?), &[]);
    Ok(0)
}
