//! Logout command - ends the server-side session.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::style;
use hearth_session::{NoopObserver, Outcome};

use super::Context;
use super::output::print_event;

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {}

/// Run the logout command.
///
/// A failed logout is reported and leaves the stored session untouched.
pub async fn run(_args: LogoutArgs, ctx: &Context) -> Result<()> {
    let session = ctx.session(Arc::new(NoopObserver))?;

    match session.logout().await? {
        Some(cycle) => match &cycle.outcome {
            Outcome::Established(event) => {
                print_event(event, session.language(), ctx.json_output)
            }
            Outcome::LockBusy { .. } => {
                println!("Logged out; another context is re-checking the session")
            }
        },
        None => {
            if ctx.json_output {
                println!("{}", serde_json::json!({ "logged_out": false }));
            } else {
                eprintln!(
                    "{} Logout failed; session left unchanged",
                    style("!").yellow().bold()
                );
            }
        }
    }

    Ok(())
}
