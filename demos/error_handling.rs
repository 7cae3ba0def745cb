//! Example demonstrating error classification and the retry policy.
//!
//! This example shows how to:
//! - Branch on `ErrorKind` instead of parsing messages
//! - Read the server's requested delay from a rate-limit error
//! - Inspect the raw body when a response fails to deserialize
//! - Turn retries off for fail-fast callers
//!
//! Run with: `cargo run --example error_handling`

use posthog_insights::params::{DateWindow, FunnelsParams};
use posthog_insights::{Client, Config, Error, ErrorKind, RetryPolicy};
use std::time::Duration;

fn describe(error: &Error) {
    match error.kind() {
        ErrorKind::AuthFailed => println!("  -> check the API key"),
        ErrorKind::AccessDenied => {
            println!("  -> the key is missing a scope for {:?}", error.path())
        }
        ErrorKind::NotFound => println!("  -> wrong project id or host"),
        ErrorKind::RateLimited => {
            println!("  -> throttled; server asked for {:?}", error.retry_after())
        }
        ErrorKind::Transport => println!("  -> network trouble or timeout"),
        ErrorKind::Api => {
            if let Error::DeserializationFailed { raw_response, .. } = error {
                println!("  -> unexpected body: {}", raw_response);
            } else {
                println!("  -> provider error, status {:?}", error.status());
            }
        }
        ErrorKind::InvalidRequest => println!("  -> fix the query parameters"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("posthog_insights=debug,error_handling=info")
        .init();

    println!("=== Rejected locally: a one-step funnel ===");
    let client = Client::new(Config::builder("phx_invalid", "12345").build()?)?;
    match client
        .funnels_query(&FunnelsParams::new(["only_step"], DateWindow::since("-7d")))
        .await
    {
        Ok(_) => println!("unexpected success"),
        Err(e) => {
            println!("Error: {}", e);
            describe(&e);
        }
    }
    println!();

    println!("=== Rejected by the provider: bad API key ===");
    match client.hogql_query("SELECT 1", 1).await {
        Ok(_) => println!("unexpected success"),
        Err(e) => {
            println!("Error: {}", e);
            describe(&e);
        }
    }
    println!();

    println!("=== Unreachable host, retries disabled ===");
    let config = Config::builder("phx_invalid", "12345")
        .host("http://127.0.0.1:9")
        .timeout(Duration::from_secs(5))
        .build()?;
    let client = Client::builder(config)
        .retry_policy(RetryPolicy::none())
        .build()?;
    match client.hogql_query("SELECT 1", 1).await {
        Ok(_) => println!("unexpected success"),
        Err(e) => {
            println!("Error: {} (retryable: {})", e, e.is_retryable());
            describe(&e);
        }
    }

    Ok(())
}
