// API client module: a small blocking HTTP client for the Basecamp REST API.
// Every command goes through it. It adds the bearer token and the client
// identification header, follows `Link: <..>; rel="next"` pagination and
// turns every failure into a `crate::error::Error`.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, Paths};
use crate::error::{Error, Result};

/// Identification sent with every request, as the API asks integrations to do.
pub const USER_AGENT: &str = "Basecamp CLI (https://github.com/rzolkos/basecamp-cli)";

/// Upper bound for a single HTTP exchange.
pub const TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client bound to one account's base URL and one bearer token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: HeaderValue,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client for `base_url` (no trailing slash) using `token`.
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, TIMEOUT)
    }

    /// Same as [`ApiClient::new`] with a custom per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, token: &str, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::Config("stored token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let client = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.into(),
            auth,
        })
    }

    /// Load the config and the stored token, failing before any request is
    /// made if either is missing or the token has expired.
    pub fn from_paths(paths: &Paths) -> Result<Self> {
        let cfg = Config::load(&paths.config_file)?;
        let token = paths.token_store().load()?;
        Self::new(cfg.api_base_url()?, &token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs (as found in dock and resource payloads) are used as
    /// they are; anything else is appended to the base URL.
    pub fn resolve_url(&self, path: &str) -> String {
        if is_absolute_url(path) {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Single GET, no pagination.
    pub fn get(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, None).map(|(v, _)| v)
    }

    /// POST `body` as JSON. A body that serializes to `null` sends nothing.
    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = encode_body(body)?;
        self.send(Method::POST, path, body).map(|(v, _)| v)
    }

    /// POST without a payload.
    pub fn post_empty(&self, path: &str) -> Result<Value> {
        self.send(Method::POST, path, None).map(|(v, _)| v)
    }

    /// PUT `body` as JSON. A body that serializes to `null` sends nothing.
    pub fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = encode_body(body)?;
        self.send(Method::PUT, path, body).map(|(v, _)| v)
    }

    /// PUT without a payload.
    pub fn put_empty(&self, path: &str) -> Result<Value> {
        self.send(Method::PUT, path, None).map(|(v, _)| v)
    }

    pub fn delete(&self, path: &str) -> Result<Value> {
        self.send(Method::DELETE, path, None).map(|(v, _)| v)
    }

    /// GET every page of a collection and concatenate the arrays in order.
    ///
    /// A page with an empty body adds nothing; a page that is JSON but not an
    /// array is a parse error. Any error drops the pages fetched so far.
    pub fn get_all(&self, path: &str) -> Result<Vec<Value>> {
        let mut results = Vec::new();
        let mut next = Some(self.resolve_url(path));
        let mut pages = 0usize;

        while let Some(url) = next {
            let (page, link) = self.send(Method::GET, &url, None)?;
            pages += 1;
            match page {
                Value::Array(items) => results.extend(items),
                Value::Null => {}
                other => {
                    return Err(Error::Parse(serde::de::Error::custom(format!(
                        "expected a JSON array from {url}, got {}",
                        json_kind(&other)
                    ))))
                }
            }
            next = link;
        }

        tracing::debug!(pages, items = results.len(), "collection fetched");
        Ok(results)
    }

    /// Upload raw bytes (attachments endpoint). The body is not JSON, so the
    /// content type comes from the caller.
    pub fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<Value> {
        let url = self.resolve_url(path);
        tracing::debug!(url = %url, bytes = data.len(), content_type, "uploading");
        let request = self
            .request(Method::POST, &url)
            .header(header::CONTENT_TYPE, content_type)
            .body(data);
        self.execute(request).map(|(v, _)| v)
    }

    /// GET and deserialize into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get(path)?)?)
    }

    /// POST and deserialize the reply into `T`.
    pub fn post_as<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        Ok(serde_json::from_value(self.post(path, body)?)?)
    }

    /// PUT and deserialize the reply into `T`.
    pub fn put_as<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        Ok(serde_json::from_value(self.put(path, body)?)?)
    }

    /// `get_all`, deserializing each element into `T`.
    pub fn get_all_as<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        self.get_all(path)?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(header::AUTHORIZATION, self.auth.clone())
            .header(header::USER_AGENT, USER_AGENT)
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(Value, Option<String>)> {
        let url = self.resolve_url(path);
        tracing::debug!(method = %method, url = %url, "request");
        let mut request = self.request(method, &url);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        self.execute(request)
    }

    fn execute(&self, request: RequestBuilder) -> Result<(Value, Option<String>)> {
        let response = request.send()?;
        let status = response.status();
        let next = next_link(response.headers());
        let bytes = response.bytes()?;
        tracing::debug!(status = status.as_u16(), bytes = bytes.len(), "response");

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok((Value::Null, next));
        }
        Ok((serde_json::from_slice(&bytes)?, next))
    }
}

fn is_absolute_url(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Option<Vec<u8>>> {
    let value = serde_json::to_value(body)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_vec(&value)?))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Next-page URL from all `Link` headers of a response.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let joined = headers
        .get_all(header::LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ");
    parse_next_link(&joined)
}

// One `<url>` followed by its parameters, up to the next `<`.
static LINK_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]*)>([^<]*)").expect("link pattern is valid"));

/// Extract the URL whose relation is exactly `next` from a `Link` header
/// value such as `<a>; rel="prev", <b>; rel="next"`.
pub fn parse_next_link(header: &str) -> Option<String> {
    LINK_ENTRY.captures_iter(header).find_map(|caps| {
        let url = caps.get(1)?.as_str().trim();
        let params = caps.get(2)?.as_str();
        let is_next = params.split(';').any(|param| {
            let param = param.trim().trim_end_matches(',').trim();
            match param.split_once('=') {
                Some((key, value)) => {
                    key.trim().eq_ignore_ascii_case("rel") && value.trim().trim_matches('"') == "next"
                }
                None => false,
            }
        });
        (is_next && !url.is_empty()).then(|| url.to_string())
    })
}
