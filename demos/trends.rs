//! Example running a handful of insight queries against one project.
//!
//! This example shows how to:
//! - Build a `Config` and a `Client`
//! - Run trends, funnel and retention queries
//! - Walk a paginated event listing with the returned cursor
//!
//! Run with: `cargo run --example trends -- <api-key> <project-id>`

use posthog_insights::params::{
    DateWindow, FunnelsParams, Interval, ListEventsParams, RetentionParams, RetentionPeriod,
    TrendsParams,
};
use posthog_insights::{Client, Config, Error, FunnelSteps};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("posthog_insights=info,trends=info")
        .init();

    let mut args = std::env::args().skip(1);
    let api_key = args.next().unwrap_or_else(|| "phx_your_key".to_string());
    let project_id = args.next().unwrap_or_else(|| "12345".to_string());

    let config = Config::builder(api_key, project_id).build()?;
    let client = Client::new(config)?;

    println!("=== Daily pageviews, last 7 days ===");
    let trends = client
        .trends_query(
            &TrendsParams::new(["$pageview"], DateWindow::since("-7d"))
                .interval(Interval::Day)
                .filter_test_accounts(true),
        )
        .await?;
    for series in &trends.results {
        println!("{}: {} total", series.label, series.count);
        for (day, value) in series.days.iter().zip(&series.data) {
            println!("  {} {}", day, value);
        }
    }
    println!();

    println!("=== Signup funnel ===");
    let funnel = client
        .funnels_query(&FunnelsParams::new(
            ["$pageview", "signup_started", "signup_completed"],
            DateWindow::since("-30d"),
        ))
        .await?;
    if let FunnelSteps::Steps(steps) = &funnel.results {
        for step in steps {
            println!("{}. {}: {}", step.order + 1, step.name, step.count);
        }
    }
    println!();

    println!("=== Weekly retention ===");
    let retention = client
        .retention_query(
            &RetentionParams::new("signup_completed", DateWindow::since("-8w"))
                .returning_entity("$pageview")
                .period(RetentionPeriod::Week),
        )
        .await?;
    for cohort in &retention.results {
        let counts: Vec<u64> = cohort.values.iter().map(|v| v.count).collect();
        println!("{} (size {}): {:?}", cohort.label, cohort.size(), counts);
    }
    println!();

    println!("=== Recent signups, two pages ===");
    let mut params = ListEventsParams {
        event: Some("signup_completed".to_string()),
        limit: Some(5),
        ..Default::default()
    };
    for page_number in 1..=2 {
        let page = client.list_events(&params).await?;
        println!("page {}: {} events", page_number, page.results.len());
        match page.next_cursor {
            Some(cursor) => params.cursor = Some(cursor),
            None => break,
        }
    }

    Ok(())
}
