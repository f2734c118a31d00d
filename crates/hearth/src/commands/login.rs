//! Login command - records where sign-in started.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Args;
use console::Style;
use hearth_session::NoopObserver;
use tracing::info;

use super::Context;

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Save the identity endpoint to the user config file
    #[arg(long)]
    pub remember: bool,
}

/// Run the login command.
///
/// The session is evaluated first so the intent carries the timestamp of a
/// completed check. The identity provider is visited by the user; it should
/// send them back to a location ending with the fresh-intent marker.
pub async fn run(args: LoginArgs, ctx: &Context) -> Result<()> {
    let session = ctx.session(Arc::new(NoopObserver))?;
    let remembered = if args.remember {
        let path = hearth_config::user_config_path()
            .ok_or_else(|| anyhow!("No user config directory available"))?;
        hearth_config::remember_endpoint(&path, session.endpoint().as_str())?;
        info!(path = %path.display(), "Identity endpoint saved");
        Some(path)
    } else {
        None
    };
    session.evaluate().await?;
    session.initiate_sign_in()?;

    let record = session.record()?;
    if ctx.json_output {
        let output = serde_json::json!({
            "endpoint": session.endpoint().as_str(),
            "signin_location": record.signin_location,
            "signin_timestamp": record.signin_timestamp,
            "remembered_in": remembered,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let dim = Style::new().dim();
        println!("{}", session.language().login_label());
        println!("  {} {}", dim.apply_to("Visit:"), session.endpoint());
        println!(
            "  {} {}",
            dim.apply_to("Return marker:"),
            session.config().fresh_intent_marker
        );
        if let Some(location) = record.signin_location.filter(|l| !l.is_empty()) {
            println!("  {} {}", dim.apply_to("Resumes at:"), location);
        }
        if let Some(path) = &remembered {
            println!("  {} {}", dim.apply_to("Saved to:"), path.display());
        }
    }

    Ok(())
}
