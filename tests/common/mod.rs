//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use fx_quote::config::{ServerConfig, UpstreamConfig};
use fx_quote::quoting::{Budgets, QuoteEngine};
use fx_quote::storage::QuoteStore;
use fx_quote::upstream::QuoteFetcher;
use fx_quote::{HttpServer, Shutdown};

/// Canned upstream reply.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

#[allow(dead_code)]
impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn bid(bid: &str) -> Self {
        Self::ok(format!(
            r#"{{"USDBRL":{{"code":"USD","codein":"BRL","name":"Dólar Americano/Real Brasileiro","bid":"{bid}","ask":"5.26"}}}}"#
        ))
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: "upstream error".into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Start a programmable upstream on an ephemeral port.
pub async fn start_programmable_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = vec![0u8; 4096];
                        let mut seen = Vec::new();
                        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => seen.extend_from_slice(&buf[..n]),
                            }
                        }

                        let reply = f().await;
                        tokio::time::sleep(reply.delay).await;

                        let reason = axum::http::StatusCode::from_u16(reply.status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            reply.status,
                            reason,
                            reply.body.len(),
                            reply.body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Upstream that always gives the same reply.
#[allow(dead_code)]
pub async fn start_fixed_upstream(reply: Reply) -> SocketAddr {
    start_programmable_upstream(move || {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// HTTP client that never goes through an environment proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub fn upstream_config(upstream: SocketAddr) -> UpstreamConfig {
    UpstreamConfig {
        url: format!("http://{upstream}/json/last/USD-BRL"),
        pair_key: "USDBRL".into(),
    }
}

/// A running quote server.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: QuoteStore,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}/cotacao", self.addr)
    }
}

/// Start a quote server backed by `upstream` and a database at `db_path`.
#[allow(dead_code)]
pub async fn start_server(
    upstream: SocketAddr,
    db_path: &Path,
    tweak: impl FnOnce(&mut ServerConfig),
) -> TestServer {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream = upstream_config(upstream);
    config.storage.path = db_path.display().to_string();
    tweak(&mut config);

    let store = QuoteStore::open(db_path).unwrap();
    let fetcher = QuoteFetcher::new(http_client(), &config.upstream);
    let engine = QuoteEngine::new(fetcher, store.clone(), Budgets::from(&config.timeouts));
    let server = HttpServer::new(config, engine);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        store,
        shutdown,
    }
}
