//! HTTP webhook error reporter.
//!
//! Each report is POSTed as JSON on the tokio runtime in the background.
//! Delivery failures are logged here and never fail a watchdog check.

use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use parking_lot::Mutex;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use latwatch_monitor::{ErrorReport, ErrorReporter};

pub struct WebhookReporter {
    /// `host:port` to connect to.
    address: String,
    /// Request path including query.
    path: String,
    timeout: Duration,
    runtime: Handle,
    in_flight: Mutex<JoinSet<()>>,
}

impl WebhookReporter {
    /// Build a reporter for an `http://` URL, spawning onto `runtime`.
    pub fn new(url: &str, timeout: Duration, runtime: Handle) -> anyhow::Result<Self> {
        let uri: http::Uri = url.parse().with_context(|| format!("invalid webhook url {url}"))?;
        if uri.scheme_str() != Some("http") {
            anyhow::bail!("webhook url must use http://, got {url}");
        }
        let authority = uri
            .authority()
            .with_context(|| format!("webhook url {url} has no host"))?;
        let address = match authority.port_u16() {
            Some(_) => authority.to_string(),
            None => format!("{}:80", authority.host()),
        };
        let path = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            address,
            path,
            timeout,
            runtime,
            in_flight: Mutex::new(JoinSet::new()),
        })
    }

    /// Reports spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Wait for every report sent so far to finish.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.in_flight.lock());
        while pending.join_next().await.is_some() {}
    }
}

impl ErrorReporter for WebhookReporter {
    fn report(&self, report: &ErrorReport) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&json!({
            "level": "warning",
            "message": report.message,
            "extra": report.extra,
        }))?;

        let address = self.address.clone();
        let path = self.path.clone();
        let timeout = self.timeout;

        let mut in_flight = self.in_flight.lock();
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn_on(
            async move {
                match post_json(&address, &path, Bytes::from(body), timeout).await {
                    Ok(status) if status.is_success() => {
                        debug!(%address, %path, %status, "error report delivered");
                    }
                    Ok(status) => warn!(%address, %path, %status, "error report rejected"),
                    Err(e) => warn!(%address, %path, error = %format!("{e:#}"), "error report failed"),
                }
            },
            &self.runtime,
        );
        Ok(())
    }
}

/// POST a JSON body over HTTP/1.1 and return the response status.
pub async fn post_json(
    address: &str,
    path: &str,
    body: Bytes,
    timeout: Duration,
) -> anyhow::Result<http::StatusCode> {
    let request = async {
        let stream = tokio::net::TcpStream::connect(address)
            .await
            .with_context(|| format!("failed to connect to {address}"))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .context("webhook handshake failed")?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("POST")
            .uri(path)
            .header("host", address)
            .header("content-type", "application/json")
            .header("user-agent", "latwatchd/0.1")
            .body(Full::new(body))
            .context("failed to build webhook request")?;

        let resp = sender
            .send_request(req)
            .await
            .context("webhook request failed")?;
        Ok::<_, anyhow::Error>(resp.status())
    };

    tokio::time::timeout(timeout, request)
        .await
        .with_context(|| format!("webhook request to {address} timed out"))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use latwatch_core::HighLatencyQueues;

    /// Accept one request, answer 200, and return the raw request text.
    async fn capture_one(listener: TcpListener) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();
        String::from_utf8(raw).unwrap()
    }

    #[test]
    fn url_parsing() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let reporter =
            WebhookReporter::new("http://alerts.internal/hooks/latency?x=1", Duration::from_secs(1), rt.handle().clone())
                .unwrap();
        assert_eq!(reporter.address, "alerts.internal:80");
        assert_eq!(reporter.path, "/hooks/latency?x=1");

        assert!(WebhookReporter::new("https://alerts.internal/", Duration::from_secs(1), rt.handle().clone()).is_err());
        assert!(WebhookReporter::new("not a url", Duration::from_secs(1), rt.handle().clone()).is_err());
    }

    #[tokio::test]
    async fn report_is_posted_as_json() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(capture_one(listener));

        let reporter = WebhookReporter::new(
            &format!("http://{addr}/alerts"),
            Duration::from_secs(2),
            Handle::current(),
        )
        .unwrap();

        let queues = HighLatencyQueues::from([("default".to_string(), 25.0)]);
        reporter.report(&ErrorReport::for_queues(&queues)).unwrap();
        reporter.flush().await;

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /alerts HTTP/1.1"));
        let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["message"], "Some queues have a high latency: default");
        assert_eq!(json["extra"]["high_latency_queues"]["default"], 25.0);
    }

    #[tokio::test]
    async fn unreachable_webhook_does_not_fail_report() {
        let reporter = WebhookReporter::new(
            "http://127.0.0.1:1/alerts",
            Duration::from_millis(200),
            Handle::current(),
        )
        .unwrap();

        let queues = HighLatencyQueues::from([("default".to_string(), 25.0)]);
        assert!(reporter.report(&ErrorReport::for_queues(&queues)).is_ok());
        reporter.flush().await;
    }

    #[tokio::test]
    async fn finished_reports_are_reaped() {
        let reporter = WebhookReporter::new(
            "http://127.0.0.1:1/alerts",
            Duration::from_millis(100),
            Handle::current(),
        )
        .unwrap();

        let queues = HighLatencyQueues::from([("default".to_string(), 25.0)]);
        for _ in 0..50 {
            reporter.report(&ErrorReport::for_queues(&queues)).unwrap();
        }
        assert_eq!(reporter.in_flight(), 50);

        // Every attempt fails fast or hits the 100ms timeout.
        tokio::time::sleep(Duration::from_millis(500)).await;
        reporter.report(&ErrorReport::for_queues(&queues)).unwrap();
        assert_eq!(reporter.in_flight(), 1);

        reporter.flush().await;
        assert_eq!(reporter.in_flight(), 0);
    }

    #[tokio::test]
    async fn post_json_to_closed_port_errors() {
        let result = post_json(
            "127.0.0.1:1",
            "/",
            Bytes::from_static(b"{}"),
            Duration::from_millis(200),
        )
        .await;
        assert!(result.is_err());
    }
}
