// `init` and `register`: the interactive first-run commands. Prompts and
// instructions go to stderr, the summary JSON to stdout.

use anyhow::{Context as _, Result};
use serde_json::{json, Value};

use super::{Command, Context};
use crate::config::{Config, DEFAULT_REDIRECT_URI};
use crate::oauth::DEFAULT_CALLBACK_PORT;
use crate::ui;

/// Where OAuth apps are registered.
pub const REGISTRATION_URL: &str = "https://launchpad.37signals.com/integrations";

#[derive(Default)]
pub struct Init;

impl Command for Init {
    fn run(&self, ctx: &Context, _args: &[String]) -> Result<Value> {
        ui::banner("Basecamp CLI Configuration");

        let cfg = Config {
            client_id: ui::prompt("Client ID", "")?,
            client_secret: ui::prompt_secret("Client Secret")?,
            account_id: ui::prompt("Account ID", "")?,
            redirect_uri: ui::prompt("Redirect URI", DEFAULT_REDIRECT_URI)?,
        };

        let file = &ctx.paths().config_file;
        cfg.save(file).context("failed to save config")?;

        eprintln!();
        eprintln!("Configuration saved to: {}", file.display());
        eprintln!("Run 'basecamp auth' to authenticate.");

        Ok(json!({
            "status": "ok",
            "message": "Configuration saved",
            "file": file.display().to_string(),
        }))
    }
}

#[derive(Default)]
pub struct Register;

impl Command for Register {
    fn run(&self, _ctx: &Context, _args: &[String]) -> Result<Value> {
        ui::banner("Basecamp OAuth App Registration Helper");
        eprintln!();
        eprintln!("This helper will generate the values you need to register");
        eprintln!("your Basecamp OAuth application.");
        eprintln!();

        let app_name = ui::prompt("Application name", "My Basecamp CLI")?;
        let company_name = ui::prompt("Company/Organization name", "")?;
        let website_url = ui::prompt("Website URL", "https://github.com/robzolkos/basecamp-cli")?;
        let accessible_url = ui::prompt(
            "URL where this computer is accessible (e.g., https://myhost.tailscale.ts.net)",
            "",
        )?;
        let redirect_uri = redirect_uri_for(&accessible_url);

        let rule = "=".repeat(60);
        eprintln!();
        eprintln!("{rule}");
        eprintln!("REGISTRATION INSTRUCTIONS");
        eprintln!("{rule}");
        eprintln!();
        eprintln!("1. Visit: {REGISTRATION_URL}");
        eprintln!();
        eprintln!("2. Click 'Register another application'");
        eprintln!();
        eprintln!("3. Fill out the form with these values:");
        eprintln!();
        eprintln!("   Name of your application:  {app_name}");
        eprintln!("   Your company/organization: {company_name}");
        eprintln!("   Website URL:               {website_url}");
        eprintln!("   Redirect URI:              {redirect_uri}");
        eprintln!();
        eprintln!("4. After registering, copy your Client ID and Client Secret");
        eprintln!();
        eprintln!("5. Run 'basecamp init' and enter the credentials when prompted");
        eprintln!("   (use the same Redirect URI shown above)");
        eprintln!();
        eprintln!("6. Run 'basecamp auth' to authenticate");
        eprintln!("{rule}");

        Ok(json!({
            "application_name": app_name,
            "company_name": company_name,
            "website_url": website_url,
            "redirect_uri": redirect_uri,
            "registration_url": REGISTRATION_URL,
        }))
    }
}

/// Redirect URI served by `basecamp auth` on a host reachable at
/// `accessible_url`; localhost when none is given.
pub fn redirect_uri_for(accessible_url: &str) -> String {
    let base = accessible_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return DEFAULT_REDIRECT_URI.to_string();
    }
    format!("{base}:{DEFAULT_CALLBACK_PORT}/callback")
}
