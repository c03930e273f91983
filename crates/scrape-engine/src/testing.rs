//! Test doubles: a scripted capability and a one-shot HTTP stub.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use scrape_core::{OrderBookTop, PollRequest, PollResult, time_util};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::Capability;
use crate::http::HttpClient;

/// Behaviour of one scripted call.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Ok,
    Fail,
    /// Sleep, then succeed.
    Hang(Duration),
    /// Succeed with a result whose header and values differ in length.
    Mismatch,
}

/// Plays `script` call by call, then repeats `fallback`.
///
/// Successful results carry the zero-based call index as `bid_price`.
pub struct ScriptedCapability {
    calls: AtomicUsize,
    script: Vec<Step>,
    fallback: Step,
}

impl ScriptedCapability {
    pub fn new(script: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), script, fallback })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new(Vec::new(), step)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

struct Lopsided;

impl PollResult for Lopsided {
    fn header_fields(&self) -> Vec<String> {
        vec!["timestamp".into(), "price".into()]
    }

    fn value_fields(&self) -> Vec<String> {
        vec!["only-one".into()]
    }
}

fn book(index: usize) -> Box<dyn PollResult> {
    Box::new(OrderBookTop {
        timestamp: time_util::now(),
        bid_price: index.to_string(),
        bid_quantity: "1".into(),
        ask_price: (index + 1).to_string(),
        ask_quantity: "1".into(),
    })
}

#[async_trait]
impl Capability for ScriptedCapability {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn scrape(&self, _request: &PollRequest) -> Result<Box<dyn PollResult>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.get(index).copied().unwrap_or(self.fallback) {
            Step::Ok => Ok(book(index)),
            Step::Fail => anyhow::bail!("scripted failure #{index}"),
            Step::Hang(d) => {
                tokio::time::sleep(d).await;
                Ok(book(index))
            }
            Step::Mismatch => Ok(Box::new(Lopsided)),
        }
    }
}

/// Client that never routes loopback requests through a proxy.
pub fn local_client() -> HttpClient {
    HttpClient::from_client(reqwest::Client::builder().no_proxy().build().unwrap())
}

/// Loopback HTTP/1.1 server answering exactly one request.
///
/// Returns the base URL and a receiver for the raw request head
/// (request line plus headers).
pub async fn serve_once(status: &'static str, body: &str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let body = body.to_string();
    let (head_tx, head_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut head: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }
        let _ = head_tx.send(String::from_utf8_lossy(&head).into_owned());

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
    });

    (base_url, head_rx)
}

/// First line of a request head, e.g. `GET /path?x=1 HTTP/1.1`.
pub fn request_line(head: &str) -> &str {
    head.lines().next().unwrap_or_default()
}
