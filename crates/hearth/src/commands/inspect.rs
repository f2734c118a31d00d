//! Inspect command - shows the raw stored record.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use hearth_session::{
    Clock, LockPolicy, LockStatus, RecordStore, SessionRecord, SessionState, SystemClock,
};
use serde::Serialize;

use super::Context;
use super::output::format_millis;

/// Arguments for the inspect command.
#[derive(Args, Debug)]
pub struct InspectArgs {}

#[derive(Debug, Serialize)]
struct InspectOutput<'a> {
    store: String,
    state: &'a str,
    record: &'a SessionRecord,
}

/// Run the inspect command. Reads only; nothing is written.
pub async fn run(_args: InspectArgs, ctx: &Context) -> Result<()> {
    let config = ctx.session_config()?;
    let records = RecordStore::new(ctx.store());
    let record = records.load()?;

    let now = SystemClock.now_millis();
    let fresh_intent = config.is_fresh_intent(&ctx.location);
    let state = SessionState::classify(&record, now, config.timeout_millis(), fresh_intent);
    let lock = LockPolicy::new(config.lock_backoff, config.lock_stale_after).inspect(&record, now);

    if ctx.json_output {
        let output = InspectOutput {
            store: ctx.store_path().display().to_string(),
            state: state.as_str(),
            record: &record,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Session Record").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Store:"), ctx.store_path().display());
    println!("  {} {}", dim.apply_to("State:"), state);
    println!("  {} {}", dim.apply_to("Established:"), record.established);
    println!(
        "  {} {}",
        dim.apply_to("Username:"),
        record.username.as_deref().unwrap_or("-")
    );
    println!(
        "  {} {}",
        dim.apply_to("Checked at:"),
        format_millis(record.timestamp)
    );

    let lock_line = match lock {
        LockStatus::Free => "free".to_string(),
        LockStatus::Held { since: Some(since) } => format!("held since {}", format_millis(since)),
        LockStatus::Held { since: None } => "held (undated)".to_string(),
        LockStatus::Stale { since } => format!("stale since {}", format_millis(since)),
    };
    println!("  {} {}", dim.apply_to("Lock:"), lock_line);

    if let Some(location) = &record.signin_location {
        println!(
            "  {} {} {}",
            dim.apply_to("Sign-in from:"),
            location,
            dim.apply_to(format!(
                "at {}",
                format_millis(record.signin_timestamp.unwrap_or(0))
            ))
        );
    }
    println!();

    Ok(())
}
