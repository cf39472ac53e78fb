//! Loopback HTTP listener for browser redirects.
//!
//! The login URL tells the identity provider to redirect to
//! `http://127.0.0.1:{port}/callback?...`. This module runs a minimal
//! TCP listener on that port, parses each GET request's query string,
//! publishes it into the [`RedirectHub`], and answers with a small
//! "you can close this tab" page. Matching the callback to the pending
//! login (via the `state` parameter) happens in the auth core, not here.
//!
//! No HTTP framework is needed — redirects are single small GET requests,
//! handled with a raw [`tokio::net::TcpListener`].

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use wingman_auth::{RedirectEvent, RedirectHub};

/// The HTML page returned to the browser after a callback is accepted.
const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Signed in</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: #f5f5f5;
            color: #333;
        }
        .card {
            text-align: center;
            padding: 3rem;
            background: white;
            border-radius: 12px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.08);
        }
        h1 { color: #22c55e; margin-bottom: 0.5rem; }
        p { color: #666; }
    </style>
</head>
<body>
    <div class="card">
        <h1>Signed in</h1>
        <p>You can close this tab and return to Wingman.</p>
    </div>
</body>
</html>"#;

/// A running loopback listener feeding redirects into a hub.
pub struct CallbackListener {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl CallbackListener {
    /// Bind `127.0.0.1:{port}` and start accepting callbacks.
    ///
    /// Pass port `0` to let the OS choose (used by tests); the bound
    /// address is available via [`addr`](Self::addr).
    pub async fn bind(port: u16, hub: RedirectHub) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind callback listener on port {port}"))?;
        let addr = listener.local_addr()?;

        tracing::info!(addr = %addr, "callback listener waiting for browser redirect");

        let handle = tokio::spawn(accept_loop(listener, hub));
        Ok(Self { addr, handle })
    }

    /// The address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Accept connections until the listener is dropped.
async fn accept_loop(listener: TcpListener, hub: RedirectHub) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::debug!(peer = %peer, "accepted callback connection");
                if let Err(e) = handle_connection(stream, &hub).await {
                    tracing::warn!(error = %e, "callback connection failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "callback accept failed");
            }
        }
    }
}

/// Read one request, publish its query parameters, send a response.
async fn handle_connection(mut stream: TcpStream, hub: &RedirectHub) -> Result<()> {
    // Redirect callbacks are small GET requests; 8KB covers the longest
    // token payloads seen in practice.
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let response = match parse_query(&request) {
        Some(query) => {
            hub.publish(RedirectEvent::from_query(query));
            tracing::info!("browser redirect received");
            http_response("200 OK", SUCCESS_HTML)
        }
        None => {
            tracing::debug!("ignoring request without a query string");
            http_response("400 Bad Request", "missing query string")
        }
    };

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Extract the query string from the first line of an HTTP GET request
/// (`GET /callback?accessToken=... HTTP/1.1`).
fn parse_query(request: &str) -> Option<&str> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let path = parts.next()?;
    path.split_once('?').map(|(_, query)| query)
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_standard_callback() {
        let request =
            "GET /callback?accessToken=a1&state=xyz HTTP/1.1\r\nHost: 127.0.0.1:8377\r\n\r\n";
        assert_eq!(parse_query(request), Some("accessToken=a1&state=xyz"));
    }

    #[test]
    fn parse_query_root_path() {
        assert_eq!(parse_query("GET /?state=s HTTP/1.1\r\n\r\n"), Some("state=s"));
    }

    #[test]
    fn parse_query_without_query_is_none() {
        assert_eq!(parse_query("GET /callback HTTP/1.1\r\n\r\n"), None);
    }

    #[test]
    fn parse_query_empty_request_is_none() {
        assert_eq!(parse_query(""), None);
    }

    async fn send_request(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut buf = vec![0u8; 16384];
        let n = stream.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[tokio::test]
    async fn callback_is_published_to_the_hub() {
        let hub = RedirectHub::new();
        let listener = CallbackListener::bind(0, hub.clone()).await.unwrap();
        let mut rx = hub.subscribe();

        let response = send_request(
            listener.addr(),
            "GET /callback?accessToken=a1&refreshToken=r1&name=Ada&email=ada%40x.com&state=s1 HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(response.contains("200 OK"));
        assert!(response.contains("close this tab"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.get("accessToken"), Some("a1"));
        assert_eq!(event.get("email"), Some("ada@x.com"));
        assert_eq!(event.get("state"), Some("s1"));
    }

    #[tokio::test]
    async fn listener_survives_malformed_requests() {
        let hub = RedirectHub::new();
        let listener = CallbackListener::bind(0, hub.clone()).await.unwrap();
        let mut rx = hub.subscribe();

        let response = send_request(listener.addr(), "GET /callback HTTP/1.1\r\n\r\n").await;
        assert!(response.contains("400 Bad Request"));

        // The listener keeps accepting after a bad request.
        let response = send_request(
            listener.addr(),
            "GET /callback?state=after HTTP/1.1\r\n\r\n",
        )
        .await;
        assert!(response.contains("200 OK"));
        assert_eq!(rx.recv().await.unwrap().get("state"), Some("after"));
    }

    #[tokio::test]
    async fn drop_stops_the_listener() {
        let hub = RedirectHub::new();
        let listener = CallbackListener::bind(0, hub).await.unwrap();
        let addr = listener.addr();
        drop(listener);

        // Give the abort a moment to land, then verify connections fail.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
