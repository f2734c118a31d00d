//! Refresh command - forgets the cached session and asks the server again.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use hearth_session::{NoopObserver, Outcome};

use super::Context;
use super::output::print_event;

/// Arguments for the refresh command.
#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, ctx: &Context) -> Result<()> {
    let session = ctx.session(Arc::new(NoopObserver))?;
    let cycle = session.reevaluate().await?;

    match &cycle.outcome {
        Outcome::Established(event) => print_event(event, session.language(), ctx.json_output),
        Outcome::LockBusy { .. } => {
            println!("Another context is already refreshing the session");
        }
    }

    Ok(())
}
