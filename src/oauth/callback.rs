// One-shot local listener for the OAuth redirect.
//
// The server accepts the provider's redirect on the callback path, answers
// the browser with a small HTML page and reports the outcome through a
// single oneshot slot. Whoever takes the slot first (the handler or the
// server task failing) wins; later signals are dropped. `wait` races that
// slot against a deadline and always closes the listener before returning.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

const SUCCESS_HTML: &str = r#"<html><body style="font-family:sans-serif;text-align:center;padding:50px;">
<h1>Authentication Successful!</h1><p>You can close this window.</p></body></html>"#;

const FAILURE_HTML: &str = r#"<html><body style="font-family:sans-serif;text-align:center;padding:50px;">
<h1>Authentication Failed</h1><p>No authorization code received.</p></body></html>"#;

/// How long an in-flight browser response may take once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

type Outcome = Result<String>;

struct ServerState {
    result_tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl ServerState {
    /// First caller delivers its outcome; every later one is discarded.
    async fn signal(&self, outcome: Outcome) {
        match self.result_tx.lock().await.take() {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => debug!("callback outcome already delivered, dropping"),
        }
    }
}

/// A bound, serving callback listener.
pub struct CallbackHandle {
    port: u16,
    result_rx: Option<oneshot::Receiver<Outcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Bind `0.0.0.0:<port>` and start serving `path` in a background task.
pub async fn start(port: u16, path: &str) -> Result<CallbackHandle> {
    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let state = Arc::new(ServerState {
        result_tx: Mutex::new(Some(result_tx)),
    });

    let app = Router::new()
        .route(path, get(handle_callback))
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(port, error = %e, "failed to bind callback server");
        Error::OAuth(format!("failed to start callback server on port {port}: {e}"))
    })?;
    info!(port, path, "callback server listening");

    let task = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = served {
            error!(error = %e, "callback server error");
            state
                .signal(Err(Error::OAuth(format!("callback server failed: {e}"))))
                .await;
        }
    });

    Ok(CallbackHandle {
        port,
        result_rx: Some(result_rx),
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

impl CallbackHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the redirect, an error, or the deadline, whichever comes
    /// first. The listener is closed before this returns.
    pub async fn wait(mut self, timeout: Duration) -> Result<String> {
        let Some(result_rx) = self.result_rx.take() else {
            return Err(Error::OAuth("callback handle already consumed".into()));
        };

        let outcome = tokio::select! {
            received = result_rx => received.unwrap_or_else(|_| {
                Err(Error::OAuth("callback server stopped unexpectedly".into()))
            }),
            _ = tokio::time::sleep(timeout) => {
                warn!(timeout_secs = timeout.as_secs(), "timed out waiting for authorization");
                Err(Error::OAuthTimeout(timeout))
            }
        };

        self.shutdown().await;
        outcome
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                debug!(port = self.port, "callback server did not drain in time, aborting");
                task.abort();
                let _ = task.await;
            }
        }
        info!(port = self.port, "callback server stopped");
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn handle_callback(
    State(state): State<Arc<ServerState>>,
    query: std::result::Result<Query<CallbackParams>, QueryRejection>,
) -> Html<&'static str> {
    // A query that does not parse still ends the flow, as a redirect without a code.
    let params = match query {
        Ok(Query(params)) => params,
        Err(e) => {
            warn!(error = %e, "unreadable redirect query");
            CallbackParams::default()
        }
    };
    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        warn!(error = %error, description = %description, "provider returned an error");
        state
            .signal(Err(Error::OAuth(format!(
                "provider returned {error}: {description}"
            ))))
            .await;
        return Html(FAILURE_HTML);
    }

    match params.code.filter(|c| !c.is_empty()) {
        Some(code) => {
            info!("authorization code received");
            state.signal(Ok(code)).await;
            Html(SUCCESS_HTML)
        }
        None => {
            warn!("redirect arrived without an authorization code");
            state
                .signal(Err(Error::OAuth("no authorization code received".into())))
                .await;
            Html(FAILURE_HTML)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn code_is_delivered_and_browser_sees_success_page() {
        let port = free_port();
        let handle = start(port, "/callback").await.unwrap();

        let browser = tokio::spawn(async move {
            reqwest::get(format!("http://127.0.0.1:{port}/callback?code=ABC123"))
                .await
                .unwrap()
                .text()
                .await
                .unwrap()
        });

        let code = handle.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(code, "ABC123");
        assert!(browser.await.unwrap().contains("Authentication Successful"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_signal_wins() {
        let state = ServerState {
            result_tx: Mutex::new(None),
        };
        let (tx, rx) = oneshot::channel();
        *state.result_tx.lock().await = Some(tx);

        state.signal(Ok("first".into())).await;
        state.signal(Err(Error::OAuth("late".into()))).await;

        assert_eq!(rx.await.unwrap().unwrap(), "first");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_query_fails_the_wait() {
        let port = free_port();
        let handle = start(port, "/callback").await.unwrap();

        let browser = tokio::spawn(async move {
            reqwest::get(format!("http://127.0.0.1:{port}/callback?code=A&code=B"))
                .await
                .unwrap()
                .text()
                .await
                .unwrap()
        });

        let err = handle.wait(Duration::from_secs(5)).await.unwrap_err();
        match err {
            Error::OAuth(msg) => assert_eq!(msg, "no authorization code received"),
            other => panic!("expected OAuth error, got {other:?}"),
        }
        assert!(browser.await.unwrap().contains("Authentication Failed"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn other_paths_do_not_resolve_the_wait() {
        let port = free_port();
        let handle = start(port, "/callback").await.unwrap();

        let status = reqwest::get(format!("http://127.0.0.1:{port}/favicon.ico"))
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 404);

        let err = handle.wait(Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, Error::OAuthTimeout(_)));
    }
}
