//! Delivery channels.
//!
//! A [`DeliveryChannel`] pushes one record to the collector and reports only
//! whether the transport succeeded. Nothing about the response is inspected.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::config::DeliveryConfig;
use crate::record::Record;

/// Errors that can occur while delivering a record.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// No endpoint is configured.
    #[error("no delivery endpoint configured")]
    NoEndpoint,

    /// The record could not be encoded for the wire.
    #[error("failed to encode record: {0}")]
    Encode(String),

    /// The request did not complete.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Something that can carry a record to the collector.
///
/// Implementations must not retry or time out on their own; the queue
/// manager decides what happens after a failure.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Attempt to deliver one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record did not reach the transport.
    async fn send(&self, record: &Record) -> Result<()>;
}

#[async_trait]
impl<C: DeliveryChannel + ?Sized> DeliveryChannel for &C {
    async fn send(&self, record: &Record) -> Result<()> {
        (**self).send(record).await
    }
}

/// Form-encoded HTTP POST to the collector endpoint.
///
/// The body is a single field (`payload` by default) holding the record JSON.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: reqwest::Client,
    endpoint: String,
    form_field: String,
}

impl HttpChannel {
    /// Create a channel for the given endpoint and form field.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, form_field: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            form_field: form_field.into(),
        }
    }

    /// Create a channel from the delivery section of the configuration.
    #[must_use]
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(&config.endpoint_url, &config.form_field)
    }

    /// The configured endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeliveryChannel for HttpChannel {
    async fn send(&self, record: &Record) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(DeliveryError::NoEndpoint);
        }

        let json = record
            .to_json()
            .map_err(|e| DeliveryError::Encode(e.to_string()))?;
        trace!("POST {} ({} bytes)", self.endpoint, json.len());

        self.client
            .post(&self.endpoint)
            .form(&[(self.form_field.as_str(), json.as_str())])
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        debug!("Delivered {} to {}", record.summary(), self.endpoint);
        Ok(())
    }
}

/// A channel with no connection. Every send fails, so records go straight to the queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineChannel;

#[async_trait]
impl DeliveryChannel for OfflineChannel {
    async fn send(&self, _record: &Record) -> Result<()> {
        Err(DeliveryError::Transport("offline".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// In-process channel with a switchable connection and per-record rejects.
    #[derive(Debug)]
    pub(crate) struct FakeChannel {
        online: AtomicBool,
        rejects: Mutex<Vec<Record>>,
        sent: Mutex<Vec<Record>>,
    }

    impl FakeChannel {
        pub(crate) fn online() -> Self {
            Self {
                online: AtomicBool::new(true),
                rejects: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn offline() -> Self {
            let channel = Self::online();
            channel.set_online(false);
            channel
        }

        pub(crate) fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }

        pub(crate) fn reject(&self, record: &Record) {
            self.rejects.lock().unwrap().push(record.clone());
        }

        pub(crate) fn sent(&self) -> Vec<Record> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliveryChannel for FakeChannel {
        async fn send(&self, record: &Record) -> Result<()> {
            if !self.online.load(Ordering::SeqCst) {
                return Err(DeliveryError::Transport("offline".to_string()));
            }
            if self.rejects.lock().unwrap().contains(record) {
                return Err(DeliveryError::Transport("rejected".to_string()));
            }
            self.sent.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn sample_record() -> Record {
        let serde_json::Value::Object(fields) = json!({
            "studentName": "Ada",
            "teamNumber": 2056,
            "comments": "fast & clean",
        }) else {
            unreachable!()
        };
        Record::from_fields(fields)
    }

    /// Accept one request, reply 200, and hand back the raw request body.
    async fn serve_once(listener: TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&buf).into_owned();
        text.split_once("\r\n\r\n").map(|(_, body)| body.to_string()).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_http_channel_posts_form_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener));

        let channel = HttpChannel::new(format!("http://{addr}/exec"), "payload");
        channel.send(&sample_record()).await.unwrap();

        let body = server.await.unwrap();
        assert!(body.starts_with("payload="));
        assert!(body.contains("studentName"));
        // Form encoding escapes the JSON punctuation.
        assert!(!body.contains('{'));
    }

    #[tokio::test]
    async fn test_http_channel_refused_connection_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let channel = HttpChannel::new(format!("http://{addr}/exec"), "payload");
        let err = channel.send(&sample_record()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[tokio::test]
    async fn test_http_channel_without_endpoint_fails() {
        let channel = HttpChannel::from_config(&DeliveryConfig::default());
        let err = channel.send(&sample_record()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::NoEndpoint));
    }

    #[tokio::test]
    async fn test_fake_channel_switches() {
        let channel = FakeChannel::offline();
        let record = sample_record();
        assert!(channel.send(&record).await.is_err());

        channel.set_online(true);
        channel.send(&record).await.unwrap();
        assert_eq!(channel.sent(), vec![record.clone()]);

        channel.reject(&record);
        assert!((&channel).send(&record).await.is_err());
    }

    #[tokio::test]
    async fn test_offline_channel_always_fails() {
        assert!(OfflineChannel.send(&sample_record()).await.is_err());
    }

    #[test]
    fn test_delivery_error_display() {
        assert!(DeliveryError::NoEndpoint.to_string().contains("endpoint"));
        assert!(DeliveryError::Transport("reset".to_string())
            .to_string()
            .contains("reset"));
    }
}
