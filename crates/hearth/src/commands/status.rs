//! Status command - evaluates the session once.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use hearth_session::{NoopObserver, Outcome};
use serde::Serialize;

use super::Context;
use super::output::print_event;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
struct BusyOutput {
    busy: bool,
    locked_since: Option<i64>,
    retry_after_ms: u128,
}

/// Run the status command.
pub async fn run(_args: StatusArgs, ctx: &Context) -> Result<()> {
    let session = ctx.session(Arc::new(NoopObserver))?;
    let cycle = session.evaluate().await?;

    match &cycle.outcome {
        Outcome::Established(event) => print_event(event, session.language(), ctx.json_output),
        Outcome::LockBusy { since } => {
            if ctx.json_output {
                let output = BusyOutput {
                    busy: true,
                    locked_since: *since,
                    retry_after_ms: cycle.next.as_millis(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!(
                    "{} Session is being checked by another context, retry in {} ms",
                    style("…").yellow(),
                    cycle.next.as_millis()
                );
            }
        }
    }

    if ctx.verbose && !ctx.json_output {
        let dim = Style::new().dim();
        println!("  {} {}", dim.apply_to("Endpoint:"), session.endpoint());
        println!("  {} {}", dim.apply_to("Store:"), ctx.store_path().display());
    }

    Ok(())
}
