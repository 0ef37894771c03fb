// UI layer: everything that talks to the terminal.
// - stdout only ever receives the JSON result of a command;
// - prompts, banners and the spinner go to stderr via `dialoguer` and
//   `indicatif`, so piping the output into `jq` keeps working.

use std::time::Duration;

use anyhow::Result;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Pretty-print a command result on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `{"error": "..."}`, the shape scripts look for on stderr.
pub fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Report a failed command on stderr, including its context chain.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{}", error_json(&format!("{err:#}")));
}

/// Title line plus underline, on stderr.
pub fn banner(title: &str) {
    eprintln!("{title}");
    eprintln!("{}", "=".repeat(title.len().max(40)));
}

/// Ask for a value, offering `default` when it is non-empty.
pub fn prompt(label: &str, default: &str) -> Result<String> {
    let mut input = Input::<String>::new();
    input.with_prompt(label).allow_empty(true);
    if !default.is_empty() {
        input.default(default.to_string());
    }
    Ok(input.interact_text()?.trim().to_string())
}

/// Ask for a secret without echoing it.
pub fn prompt_secret(label: &str) -> Result<String> {
    Ok(Password::new()
        .with_prompt(label)
        .allow_empty_password(true)
        .interact()?
        .trim()
        .to_string())
}

/// Spinner on stderr; call `finish_and_clear` when done.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_json_escapes_message() {
        let out = error_json("API error: 404\n{\"error\":\"Not found\"}");
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"], "API error: 404\n{\"error\":\"Not found\"}");
    }
}
