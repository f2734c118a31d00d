//! Watch command - keeps the session evaluated until interrupted.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::Style;
use hearth_session::SessionHandle;
use tracing::info;

use super::Context;
use super::output::Presenter;

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Record the sign-in intent before watching
    #[arg(long)]
    pub sign_in: bool,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let language = ctx.session_config()?.language;
    let presenter = Arc::new(Presenter::new(language, ctx.json_output));
    let session = ctx.session(presenter)?;

    if !ctx.json_output {
        let dim = Style::new().dim();
        println!(
            "{} {}",
            dim.apply_to("Watching session at"),
            session.endpoint()
        );
        println!("{}", dim.apply_to("Press Ctrl-C to stop"));
    }

    let handle = SessionHandle::spawn(session);
    if args.sign_in {
        handle.initiate_sign_in()?;
    }

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, stopping session driver");
    handle.shutdown().await;

    Ok(())
}
