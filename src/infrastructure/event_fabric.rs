//! # Event Fabric Client
//!
//! Implements the `EventSink` trait on top of the Event Fabric HTTP API.
//! A session is opened once with `login`; the session cookie is kept by the HTTP client and sent
//! with every submitted event.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::domain::config::EventFabricConfig;
use crate::domain::traits::EventSink;
use crate::domain::types::ChangeRecord;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

pub struct EventFabricClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    channel: String,
}

impl EventFabricClient {
    pub fn new(config: &EventFabricConfig) -> Result<Self, String> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            channel: config.channel.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn stream_url(&self) -> String {
        self.endpoint(&format!("streams/{}/", self.channel))
    }

    /// Opens a session. `Ok` carries the response body.
    pub async fn login(&self) -> Result<String, String> {
        let request = LoginRequest {
            username: &self.username,
            password: &self.password,
        };

        let response = self
            .http
            .post(self.endpoint("sessions"))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        read_response(response).await
    }
}

#[async_trait]
impl EventSink for EventFabricClient {
    async fn submit(&self, record: &ChangeRecord) -> Result<String, String> {
        let response = self
            .http
            .post(self.stream_url())
            .json(record)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<String, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if status.is_success() {
        Ok(body)
    } else {
        Err(format!("{}: {}", status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(url: &str) -> EventFabricConfig {
        EventFabricConfig {
            username: "feeder".to_string(),
            password: "secret".to_string(),
            channel: "wiki".to_string(),
            url: url.to_string(),
            timeout_secs: 5,
        }
    }

    /// Serves a single HTTP exchange and returns the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}/api/", addr), handle)
    }

    #[test]
    fn test_stream_url() {
        let client = EventFabricClient::new(&config("http://event-fabric.com/api/")).unwrap();
        assert_eq!(client.endpoint("sessions"), "http://event-fabric.com/api/sessions");
        assert_eq!(client.stream_url(), "http://event-fabric.com/api/streams/wiki/");
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let (url, server) = serve_once("HTTP/1.1 201 Created", "{\"ok\":true}").await;
        let client = EventFabricClient::new(&config(&url)).unwrap();

        let body = client.login().await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(body, "{\"ok\":true}");
        assert!(request.starts_with("POST /api/sessions HTTP/1.1"));
        assert!(request.contains("\"username\":\"feeder\""));
        assert!(request.contains("\"password\":\"secret\""));
    }

    #[tokio::test]
    async fn test_submit_posts_record_json() {
        let (url, server) = serve_once("HTTP/1.1 201 Created", "created").await;
        let client = EventFabricClient::new(&config(&url)).unwrap();
        let record = crate::application::parsing::parse_change(
            "[[Example]] M B http://x/diff * Alice * (+57) fix typo",
        )
        .unwrap();

        let body = client.submit(&record).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(body, "created");
        assert!(request.starts_with("POST /api/streams/wiki/ HTTP/1.1"));
        assert!(request.contains("\"type\":\"edit\""));
        assert!(request.contains("\"diff\":57"));
    }

    #[tokio::test]
    async fn test_rejection_is_reported() {
        let (url, server) = serve_once("HTTP/1.1 401 Unauthorized", "no session").await;
        let client = EventFabricClient::new(&config(&url)).unwrap();
        let record = ChangeRecord::Action(crate::domain::types::ActionChange::default());

        let err = client.submit(&record).await.unwrap_err();
        server.await.unwrap();

        assert!(err.starts_with("401"));
        assert!(err.ends_with("no session"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        // Bind then drop to get a port nobody listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let client = EventFabricClient::new(&config(&format!("http://{}", addr))).unwrap();

        let err = client.login().await.unwrap_err();
        assert!(err.starts_with("HTTP request failed"));
    }
}
