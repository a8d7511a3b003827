//! Shared helpers for tests that need a live HTTP peer.

use axum::Router;
use reqwest::Client;

/// Serves `router` on an ephemeral loopback port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Outbound client for tests; ignores proxy settings from the environment.
pub fn test_client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}
