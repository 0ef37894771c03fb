// Authorization-code exchange against the provider's token endpoint.

use reqwest::StatusCode;

use crate::config::TokenRecord;
use crate::error::{Error, Result};

/// Everything the token endpoint needs for a `web_server` exchange.
#[derive(Debug, Clone)]
pub struct TokenRequest<'a> {
    pub token_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub code: &'a str,
}

/// POST the code as a form and parse the token. Anything but 200 is a
/// rejection carrying the provider's status and body.
pub async fn exchange_code(http: &reqwest::Client, req: &TokenRequest<'_>) -> Result<TokenRecord> {
    let form = [
        ("type", "web_server"),
        ("client_id", req.client_id),
        ("client_secret", req.client_secret),
        ("redirect_uri", req.redirect_uri),
        ("code", req.code),
    ];

    tracing::info!(url = %req.token_url, "exchanging authorization code");
    let response = http.post(req.token_url).form(&form).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status != StatusCode::OK {
        tracing::warn!(status = status.as_u16(), "token endpoint rejected the code");
        return Err(Error::TokenExchange {
            status: status.as_u16(),
            body,
        });
    }

    let record: TokenRecord = serde_json::from_str(&body)?;
    if record.access_token.trim().is_empty() {
        return Err(Error::OAuth("token response has no access_token".into()));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request<'a>(url: &'a str) -> TokenRequest<'a> {
        TokenRequest {
            token_url: url,
            client_id: "cid",
            client_secret: "shh",
            redirect_uri: "http://localhost:3002/callback",
            code: "ABC123",
        }
    }

    #[tokio::test]
    async fn sends_form_and_parses_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorization/token"))
            .and(body_string_contains("type=web_server"))
            .and(body_string_contains("client_id=cid"))
            .and(body_string_contains("client_secret=shh"))
            .and(body_string_contains("code=ABC123"))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2Flocalhost%3A3002%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "refresh_token": "ref",
                "expires_in": 1209600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/authorization/token", server.uri());
        let record = exchange_code(&reqwest::Client::new(), &request(&url))
            .await
            .unwrap();
        assert_eq!(record.access_token, "tok");
        assert_eq!(record.refresh_token.as_deref(), Some("ref"));
        assert_eq!(record.expires_in, Some(1_209_600));
        assert_eq!(record.expires_at, None);
    }

    #[tokio::test]
    async fn code_is_sent_as_received() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("code=+ABC123%0A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/authorization/token", server.uri());
        let req = TokenRequest {
            code: " ABC123\n",
            ..request(&url)
        };
        let record = exchange_code(&reqwest::Client::new(), &req).await.unwrap();
        assert_eq!(record.access_token, "tok");
    }

    #[tokio::test]
    async fn rejection_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let url = format!("{}/authorization/token", server.uri());
        let err = exchange_code(&reqwest::Client::new(), &request(&url))
            .await
            .unwrap_err();
        match err {
            Error::TokenExchange { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid_grant");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_200_success_is_still_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("{}"))
            .mount(&server)
            .await;

        let url = format!("{}/authorization/token", server.uri());
        let err = exchange_code(&reqwest::Client::new(), &request(&url))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(201));
    }

    #[tokio::test]
    async fn malformed_token_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let url = format!("{}/authorization/token", server.uri());
        let err = exchange_code(&reqwest::Client::new(), &request(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
