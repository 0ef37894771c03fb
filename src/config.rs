// Configuration and credential storage.
//
// - `Config` holds the OAuth app credentials and the account id, saved as
//   JSON under the XDG config dir.
// - `TokenStore` persists the `TokenRecord` produced by `basecamp auth` under
//   the XDG data dir and hands the bearer token to the API client.
// - `.basecamp.yml` in the working directory (or any parent) can pin the
//   project id so commands don't need it as their first argument.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Provider endpoint the user is sent to for approval.
pub const AUTHORIZATION_URL: &str = "https://launchpad.37signals.com/authorization/new";
/// Provider endpoint that swaps an authorization code for a token.
pub const TOKEN_URL: &str = "https://launchpad.37signals.com/authorization/token";
/// Redirect target used when the config leaves it empty.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3002/callback";
/// Root of the Basecamp 4 API; the account id is appended.
pub const API_HOST: &str = "https://3.basecampapi.com";
/// Environment variable that replaces the computed API base URL.
pub const BASE_URL_ENV: &str = "BASECAMP_BASE_URL";
/// Per-directory file that pins the project id.
pub const PROJECT_FILE: &str = ".basecamp.yml";

const APP_DIR: &str = "basecamp";

/// Locations of the config and token files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_file: PathBuf,
    pub token_file: PathBuf,
}

impl Paths {
    /// Resolve both files from `XDG_CONFIG_HOME` / `XDG_DATA_HOME`, falling
    /// back to `~/.config` and `~/.local/share`.
    pub fn from_env() -> Self {
        let config_dir = xdg_dir("XDG_CONFIG_HOME", &[".config"]);
        let data_dir = xdg_dir("XDG_DATA_HOME", &[".local", "share"]);
        Paths {
            config_file: config_dir.join("config.json"),
            token_file: data_dir.join("token.json"),
        }
    }

    /// Keep both files inside a single directory.
    pub fn in_dir(dir: &Path) -> Self {
        Paths {
            config_file: dir.join("config.json"),
            token_file: dir.join("token.json"),
        }
    }

    /// Token store backed by `token_file`.
    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(self.token_file.clone())
    }
}

fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    if let Some(dir) = std::env::var_os(var).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join(APP_DIR);
    }
    let mut dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    for part in fallback {
        dir.push(part);
    }
    dir.join(APP_DIR)
}

/// OAuth application credentials plus the Basecamp account to talk to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub account_id: String,
    #[serde(default)]
    pub redirect_uri: String,
}

impl Config {
    /// Read the config file. A missing file is `ConfigNotFound`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound)
            }
            Err(e) => return Err(Error::Io(e)),
        };
        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Write the config as pretty JSON, readable only by the owner.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_private(path, json.as_bytes())
    }

    /// Configured redirect URI, or the localhost default.
    pub fn redirect_uri(&self) -> &str {
        if self.redirect_uri.trim().is_empty() {
            DEFAULT_REDIRECT_URI
        } else {
            self.redirect_uri.trim()
        }
    }

    /// Base URL every relative API path is appended to.
    pub fn api_base_url(&self) -> Result<String> {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                return Ok(url.to_string());
            }
        }
        let account = self.account_id.trim();
        if account.is_empty() {
            return Err(Error::Config("account_id is not set".into()));
        }
        Ok(format!("{API_HOST}/{account}"))
    }
}

/// Token as returned by the provider, plus the absolute expiry we compute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as sent by the token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Unix seconds after which the token is rejected locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl TokenRecord {
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at > 0 && now > at)
    }
}

/// File-backed storage for the bearer token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        TokenStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole record without checking expiry.
    pub fn load_record(&self) -> Result<TokenRecord> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotAuthenticated)
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(serde_json::from_str(&data)?)
    }

    /// Bearer token for API calls. Expired tokens are refused; refreshing is
    /// left to a new `basecamp auth` run.
    pub fn load(&self) -> Result<String> {
        let record = self.load_record()?;
        if record.is_expired_at(chrono::Utc::now().timestamp()) {
            tracing::debug!(path = %self.path.display(), "stored token is expired");
            return Err(Error::TokenExpired);
        }
        if record.access_token.is_empty() {
            return Err(Error::NotAuthenticated);
        }
        Ok(record.access_token)
    }

    /// Persist a fresh record, stamping `expires_at` from `expires_in`.
    pub fn save(&self, record: &mut TokenRecord) -> Result<()> {
        if let Some(secs) = record.expires_in.filter(|s| *s > 0) {
            record.expires_at = Some(chrono::Utc::now().timestamp() + secs);
        }
        let json = serde_json::to_string_pretty(record)?;
        write_private(&self.path, json.as_bytes())?;
        tracing::info!(path = %self.path.display(), "token saved");
        Ok(())
    }
}

/// Write `data` to `path`, creating parents; owner-only permissions on unix.
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
        }
    }
    std::fs::write(path, data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[derive(Deserialize)]
struct ProjectFile {
    project_id: Option<serde_yaml::Value>,
}

/// Look for `.basecamp.yml` in `start` and its parents. The nearest file
/// wins; it yields `None` when it has no usable `project_id`.
pub fn find_project_id(start: &Path) -> Result<Option<String>> {
    for dir in start.ancestors() {
        let candidate = dir.join(PROJECT_FILE);
        if !candidate.is_file() {
            continue;
        }
        let data = std::fs::read_to_string(&candidate)?;
        let file: ProjectFile = serde_yaml::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {e}", candidate.display())))?;
        let id = match file.project_id {
            Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
            Some(serde_yaml::Value::String(s)) if !s.trim().is_empty() => {
                Some(s.trim().to_string())
            }
            _ => None,
        };
        tracing::debug!(file = %candidate.display(), project_id = ?id, "project file found");
        return Ok(id);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> Config {
        Config {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            account_id: "12345".into(),
            redirect_uri: String::new(),
        }
    }

    #[test]
    fn missing_config_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound));
    }

    #[test]
    fn config_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = sample_config();
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    #[cfg(unix)]
    #[test]
    fn config_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        sample_config().save(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn malformed_config_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn redirect_uri_defaults_when_empty() {
        let mut cfg = sample_config();
        assert_eq!(cfg.redirect_uri(), DEFAULT_REDIRECT_URI);
        cfg.redirect_uri = "https://box.example.ts.net:3002/callback".into();
        assert_eq!(cfg.redirect_uri(), "https://box.example.ts.net:3002/callback");
    }

    #[test]
    fn base_url_requires_account() {
        let mut cfg = sample_config();
        cfg.account_id = "  ".into();
        if std::env::var(BASE_URL_ENV).is_err() {
            assert!(matches!(cfg.api_base_url(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn missing_token_is_not_authenticated() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(matches!(store.load(), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn save_stamps_expiry_and_load_returns_token() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("data").join("token.json"));
        let mut record = TokenRecord {
            access_token: "tok".into(),
            refresh_token: Some("ref".into()),
            expires_in: Some(3600),
            expires_at: None,
        };
        store.save(&mut record).unwrap();

        let now = chrono::Utc::now().timestamp();
        let at = record.expires_at.unwrap();
        assert!(at >= now + 3590 && at <= now + 3600);
        assert_eq!(store.load().unwrap(), "tok");
        assert_eq!(store.load_record().unwrap(), record);
    }

    #[test]
    fn expired_token_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token":"old","refresh_token":"r","expires_at":1000}"#,
        )
        .unwrap();
        let store = TokenStore::new(path);
        assert!(matches!(store.load(), Err(Error::TokenExpired)));
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let record = TokenRecord {
            access_token: "t".into(),
            ..Default::default()
        };
        assert!(!record.is_expired_at(i64::MAX));
    }

    #[test]
    fn project_file_in_parent_is_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "project_id: 12345678\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_id(&nested).unwrap().as_deref(), Some("12345678"));
    }

    #[test]
    fn project_file_accepts_string_ids() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "project_id: \"987\"\n").unwrap();
        assert_eq!(find_project_id(dir.path()).unwrap().as_deref(), Some("987"));
    }

    #[test]
    fn nearest_project_file_without_id_yields_none() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "project_id: 1\n").unwrap();
        let nested = dir.path().join("child");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join(PROJECT_FILE), "name: other\n").unwrap();
        assert_eq!(find_project_id(&nested).unwrap(), None);
    }
}
