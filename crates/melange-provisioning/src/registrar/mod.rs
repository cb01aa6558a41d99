//! HTTP clients for key servers and trackers.

mod server;
mod tracker;

pub use server::HttpServerRegistrar;
pub use tracker::HttpTrackerRegistrar;

use std::time::Duration;

/// Default request timeout for registrar clients
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;

    /// Serve `router` on an ephemeral local port and return its base URL
    pub async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
