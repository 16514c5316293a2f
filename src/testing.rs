//! Shared helpers for unit tests: a local fixture server and fast retry settings.

use crate::config::HttpConfig;
use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// HTTP settings with millisecond backoffs so retry tests stay fast.
pub fn test_http_config() -> HttpConfig {
    HttpConfig {
        timeout_secs: 3,
        user_agent: "TestAgent/1.0".to_string(),
        retries: 5,
        base_backoff_ms: 5,
        max_backoff_ms: 10,
        ..HttpConfig::default()
    }
}

pub const AZQUOTES_PAGE: &str = include_str!("../testdata/azquotes.html");
pub const AZQUOTES_TWO_BLOCKS: &str = include_str!("../testdata/azquotes_two_blocks.html");
pub const GOODREADS_PAGE: &str = include_str!("../testdata/goodreads.html");
pub const FAMOUSQUOTES_PAGE: &str = include_str!("../testdata/famousquotes.html");
