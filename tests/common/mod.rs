//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vod_proxy::aggregate::SiteRegistry;
use vod_proxy::config::ProxyConfig;
use vod_proxy::{HttpServer, Shutdown};

/// What the mock upstream does with one connection.
pub enum Reply {
    /// Answer with a complete HTTP/1.1 response and close.
    Respond {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    },
    /// Read the request and never answer.
    Hang,
}

impl Reply {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Reply::status(200, content_type, body)
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Reply::Respond {
            status: 302,
            headers: vec![("Location", location.into())],
            body: Vec::new(),
        }
    }

    pub fn status(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Reply::Respond {
            status,
            headers: vec![("Content-Type", content_type.to_string())],
            body: body.into(),
        }
    }
}

/// A raw TCP upstream that records every request head it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
    heads: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Connections accepted so far.
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request heads received so far, in arrival order.
    pub fn heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }

    /// Request targets (path + query) received so far.
    pub fn paths(&self) -> Vec<String> {
        self.heads()
            .iter()
            .filter_map(|h| h.split_whitespace().nth(1).map(String::from))
            .collect()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a programmable upstream. `reply` receives the 1-based connection number.
pub async fn start_upstream<F>(reply: F) -> MockUpstream
where
    F: Fn(u32) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let heads = Arc::new(Mutex::new(Vec::new()));
    let reply = Arc::new(reply);

    let (h, hd) = (hits.clone(), heads.clone());
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let n = h.fetch_add(1, Ordering::SeqCst) + 1;
            let action = (reply.as_ref())(n);
            let heads = hd.clone();
            tokio::spawn(async move {
                serve_one(socket, action, heads).await;
            });
        }
    });

    MockUpstream { addr, hits, heads }
}

async fn serve_one(mut socket: TcpStream, action: Reply, heads: Arc<Mutex<Vec<String>>>) {
    let head = read_head(&mut socket).await;
    heads.lock().unwrap().push(head);

    match action {
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Reply::Respond {
            status,
            headers,
            body,
        } => {
            let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason(status));
            for (name, value) in headers {
                out.push_str(&format!("{}: {}\r\n", name, value));
            }
            out.push_str(&format!(
                "Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            ));
            let _ = socket.write_all(out.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        206 => "Partial Content",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config that lets targets on 127.0.0.1 through and keeps retries fast.
pub fn loopback_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.security.denied_hosts.clear();
    config.security.denied_host_prefixes.clear();
    config.upstream.timeout_ms = 300;
    config.upstream.use_system_proxy = false;
    config
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig, registry: SiteRegistry) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(Arc::new(config), registry).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// `/proxy/<percent-encoded target>` on the proxy at `proxy`.
pub fn proxy_url(proxy: SocketAddr, target: &str) -> String {
    format!("http://{}/proxy/{}", proxy, urlencoding::encode(target))
}
