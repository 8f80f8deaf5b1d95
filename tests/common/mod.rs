//! Shared utilities for integration and load testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use admission_gate::config::{AdmissionSettings, GateConfig};
use admission_gate::http::HttpServer;
use admission_gate::lifecycle::{ServiceContext, Shutdown};
use admission_gate::Gate;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a programmable mock upstream on an ephemeral port.
///
/// `f` receives the request path and returns the status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
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
                        let Some(path) = read_request_path(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start an upstream that answers every request with a chunked body:
/// `first`, then a pause, then `rest`.
#[allow(dead_code)]
pub async fn start_streaming_backend(
    first: &'static str,
    pause: Duration,
    rest: &'static str,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request_path(&mut socket).await.is_none() {
                    return;
                }
                let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(chunk(first).as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(pause).await;
                let _ = socket.write_all(chunk(rest).as_bytes()).await;
                let _ = socket.write_all(b"0\r\n\r\n").await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

fn chunk(data: &str) -> String {
    format!("{:x}\r\n{}\r\n", data.len(), data)
}

/// Wait until the gate has no counted requests, or give up after two
/// seconds. Release happens once the response body is done, which can
/// trail the client reading it.
#[allow(dead_code)]
pub async fn wait_for_idle(gate: &Gate) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while gate.snapshot().concurrent_requests != 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Read a request head and return its path. Bodies are not expected.
async fn read_request_path(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()?
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}

/// A running gate server for tests.
#[allow(dead_code)]
pub struct TestGate {
    pub addr: SocketAddr,
    pub gate: Arc<Gate>,
    pub context: Arc<ServiceContext>,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestGate {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the gate in front of `upstream` with the given admission settings.
pub async fn start_gate(admission: AdmissionSettings, upstream: Option<SocketAddr>) -> TestGate {
    let mut config = GateConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.admission = admission;
    config.upstream.address = upstream.map(|a| a.to_string());

    let context = Arc::new(ServiceContext::new());
    let gate = context.configure_gate(&config.admission).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::clone(&context), Arc::clone(&gate));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestGate {
        addr,
        gate,
        context,
        shutdown,
    }
}

/// Admission settings for tests.
pub fn admission(reject: usize, blocking: usize, patterns: &[&str]) -> AdmissionSettings {
    AdmissionSettings {
        reject_threshold: Some(reject.to_string()),
        blocking_threshold: Some(blocking.to_string()),
        uri_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
