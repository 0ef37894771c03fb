// OAuth2 authorization-code flow with a local redirect listener.
//
// Idle -> bind the redirect port -> show the authorization URL -> wait for
// the redirect (or an error, or the deadline) -> exchange the code -> hand
// the token to the [`TokenStore`]. Nothing is retried; every failure ends
// the flow.

pub mod callback;
pub mod exchange;

use std::time::Duration;

use url::Url;

use crate::api::{TIMEOUT, USER_AGENT};
use crate::config::{Config, TokenRecord, TokenStore, AUTHORIZATION_URL, TOKEN_URL};
use crate::error::{Error, Result};

pub use exchange::{exchange_code, TokenRequest};

/// Port used when the redirect URI does not name one.
pub const DEFAULT_CALLBACK_PORT: u16 = 3002;

/// How long the user has to approve access in the browser.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Endpoints and credentials for one authorization run.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub authorization_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub timeout: Duration,
    /// Try to launch the system browser on the authorization URL.
    pub open_browser: bool,
}

impl OAuthSettings {
    pub fn from_config(cfg: &Config) -> Self {
        OAuthSettings {
            authorization_url: AUTHORIZATION_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri: cfg.redirect_uri().to_string(),
            timeout: AUTH_TIMEOUT,
            open_browser: true,
        }
    }
}

/// Port and path the listener must serve for `redirect_uri`.
pub fn callback_target(redirect_uri: &str) -> Result<(u16, String)> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| Error::Config(format!("invalid redirect URI {redirect_uri:?}: {e}")))?;
    // `Url` drops a port equal to the scheme default, so look at the raw text.
    let port = if names_port(redirect_uri) {
        url.port_or_known_default().unwrap_or(DEFAULT_CALLBACK_PORT)
    } else {
        DEFAULT_CALLBACK_PORT
    };
    Ok((port, url.path().to_string()))
}

/// Whether the authority of `uri` carries an explicit `:port`.
fn names_port(uri: &str) -> bool {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let after_host = match host_port.rfind(']') {
        Some(end) => &host_port[end + 1..],
        None => host_port,
    };
    after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

/// Provider URL the user opens to approve access.
pub fn authorization_url(settings: &OAuthSettings) -> Result<String> {
    let url = Url::parse_with_params(
        &settings.authorization_url,
        &[
            ("type", "web_server"),
            ("client_id", settings.client_id.as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid authorization endpoint: {e}")))?;
    Ok(url.into())
}

/// Drives one authorization session.
#[derive(Debug)]
pub struct AuthFlow {
    settings: OAuthSettings,
    http: reqwest::Client,
}

impl AuthFlow {
    pub fn new(settings: OAuthSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(AuthFlow { settings, http })
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Run the flow up to a token. `on_url` is called once the listener is
    /// up, with the URL the user has to open.
    pub async fn run<F>(&self, on_url: F) -> Result<TokenRecord>
    where
        F: FnOnce(&str),
    {
        let (port, path) = callback_target(&self.settings.redirect_uri)?;
        let auth_url = authorization_url(&self.settings)?;

        let listener = callback::start(port, &path).await?;

        on_url(&auth_url);
        if self.settings.open_browser {
            open_browser(&auth_url);
        }

        let code = listener.wait(self.settings.timeout).await?;

        exchange_code(
            &self.http,
            &TokenRequest {
                token_url: &self.settings.token_url,
                client_id: &self.settings.client_id,
                client_secret: &self.settings.client_secret,
                redirect_uri: &self.settings.redirect_uri,
                code: &code,
            },
        )
        .await
    }

    /// Run the flow and persist the token.
    pub async fn authenticate<F>(&self, store: &TokenStore, on_url: F) -> Result<TokenRecord>
    where
        F: FnOnce(&str),
    {
        let mut record = self.run(on_url).await?;
        store.save(&mut record)?;
        Ok(record)
    }
}

/// Best effort: the URL is also printed, so a missing browser is not fatal.
fn open_browser(url: &str) {
    if let Err(e) = open::that_detached(url) {
        tracing::warn!(error = %e, "could not launch a browser");
    }
}
