//! Loopback HTTP listener that receives the OAuth redirect.
//!
//! The browser is sent to `redirect_uri?code=...&state=...`; we serve that one
//! route on 127.0.0.1, hand the full callback URL to the waiting handshake and
//! shut down.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::{RawQuery, State},
    response::{Html, IntoResponse},
    routing::get,
};
use reqwest::Url;
use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::{Result, ReviewError};

const SUCCESS_PAGE: &str = "<html><body><h3>repolens: authorization received.</h3>\
<p>You can close this window and return to the terminal.</p></body></html>";

struct CallbackState {
    redirect_base: String,
    tx: Mutex<Option<oneshot::Sender<String>>>,
}

/// Build the router serving `callback_path`. The first request forwards its
/// reconstructed URL through `tx`; later requests are answered but ignored.
pub fn callback_router(
    redirect_base: impl Into<String>,
    callback_path: &str,
    tx: oneshot::Sender<String>,
) -> Router {
    let state = Arc::new(CallbackState {
        redirect_base: redirect_base.into(),
        tx: Mutex::new(Some(tx)),
    });
    Router::new()
        .route(callback_path, get(handle_callback))
        .with_state(state)
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let url = match query {
        Some(q) if !q.is_empty() => format!("{}?{}", state.redirect_base, q),
        _ => state.redirect_base.clone(),
    };
    let sender = state.tx.lock().ok().and_then(|mut guard| guard.take());
    if let Some(tx) = sender {
        let _ = tx.send(url);
    }
    Html(SUCCESS_PAGE)
}

/// Listen on the redirect URI's loopback port and wait for one callback.
pub async fn receive_callback(redirect_uri: &str, timeout: Duration) -> Result<String> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| ReviewError::Config(format!("Invalid redirect_uri: {}", e)))?;
    let port = url.port_or_known_default().ok_or_else(|| {
        ReviewError::Config(format!("redirect_uri '{}' has no port", redirect_uri))
    })?;
    let path = if url.path().is_empty() { "/" } else { url.path() };
    let redirect_base = format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or("127.0.0.1"),
        match url.port() {
            Some(p) => format!(":{}{}", p, path),
            None => path.to_string(),
        }
    );

    let (tx, rx) = oneshot::channel();
    let app = callback_router(redirect_base, path, tx);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    debug!(port, path, "waiting for OAuth callback");

    let (done_tx, done_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = done_rx.await;
            })
            .await
    });

    let outcome = tokio::time::timeout(timeout, rx).await;
    let _ = done_tx.send(());
    let _ = server.await;

    match outcome {
        Ok(Ok(callback_url)) => Ok(callback_url),
        Ok(Err(_)) => Err(ReviewError::Auth(
            "OAuth callback listener closed unexpectedly".to_string(),
        )),
        Err(_) => Err(ReviewError::Auth(format!(
            "Timed out after {}s waiting for the OAuth callback",
            timeout.as_secs()
        ))),
    }
}
