// Library root
// -----------
// The `basecamp` binary is a thin shell over these modules; tests drive them
// directly.
//
// Module responsibilities:
// - `api`: blocking REST client (bearer auth, `Link` pagination).
// - `oauth`: authorization-code flow with a local redirect listener.
// - `config`: app credentials, token storage, `.basecamp.yml` lookup.
// - `commands`: the subcommands and their dispatcher.
// - `ui`: JSON output, prompts and the spinner.
// - `error` / `logging`: shared error type and tracing setup.
pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod oauth;
pub mod ui;

pub use error::{Error, Result};
