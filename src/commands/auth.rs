// `auth`: run the OAuth flow on a short-lived tokio runtime and store the
// token. The rest of the CLI is blocking; only the redirect listener and the
// code exchange are async.

use anyhow::{Context as _, Result};
use clap::Parser;
use serde_json::{json, Value};

use super::{parse_args, Command, Context};
use crate::config::Config;
use crate::oauth::{AuthFlow, OAuthSettings};
use crate::ui;

#[derive(Parser, Debug, Default)]
#[command(name = "auth", about = "Authenticate with OAuth")]
struct AuthArgs {
    /// Only print the authorization URL.
    #[arg(long)]
    no_browser: bool,
}

#[derive(Default)]
pub struct Auth;

impl Command for Auth {
    fn run(&self, ctx: &Context, args: &[String]) -> Result<Value> {
        let args: AuthArgs = parse_args("auth", args)?;
        let cfg = Config::load(&ctx.paths().config_file)?;

        let mut settings = OAuthSettings::from_config(&cfg);
        settings.open_browser = !args.no_browser;
        let flow = AuthFlow::new(settings)?;
        let store = ctx.paths().token_store();

        ui::banner("Basecamp OAuth Authentication");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        let mut waiting = None;
        let result = runtime.block_on(flow.authenticate(&store, |url| {
            eprintln!();
            eprintln!("Open this URL to authorize access:");
            eprintln!("URL: {url}");
            eprintln!();
            eprintln!("If the browser doesn't open, copy the URL above.");
            waiting = Some(ui::spinner("Waiting for authorization..."));
        }));
        if let Some(spinner) = waiting {
            spinner.finish_and_clear();
        }
        result?;

        eprintln!();
        eprintln!("Authentication successful!");
        eprintln!("Token saved to: {}", store.path().display());

        Ok(json!({
            "status": "ok",
            "message": "Authentication successful",
            "file": store.path().display().to_string(),
        }))
    }
}
