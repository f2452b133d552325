//! # HTTP Bridge Transport
//!
//! Client for a small Wi-Fi board that relays raw printer commands to a BLE
//! printer. The bridge is a dumb pipe: it forwards the request body as is.
//!
//! ## Endpoints
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | `/print` | body = raw commands; `200 Print successful`, `500 Printer not connected` |
//! | `GET` | `/status` | JSON [`BridgeStatus`] |
//! | `GET` | `/connect` | `200 Printer connected` / `500 Failed to connect to printer` |
//! | `GET` | `/disconnect` | `200 Printer disconnected` |

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Transport;
use crate::error::{LabelprintError, Result};

/// Upper bound for one request, including a full job upload
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// `GET /status` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatus {
    /// `"connected"` or `"disconnected"`
    pub wifi: String,
    pub ip: String,
    /// `"connected"` or `"disconnected"`
    pub printer: String,
    /// BLE device name, `"Unknown"` until read
    pub printer_name: String,
    /// Seconds since boot
    pub uptime: u64,
}

impl BridgeStatus {
    pub fn printer_connected(&self) -> bool {
        self.printer == "connected"
    }
}

/// # HTTP Bridge
///
/// ```no_run
/// use labelprint::transport::{HttpBridge, Transport};
///
/// let mut bridge = HttpBridge::new("http://192.168.1.50")?;
/// if !bridge.status()?.printer_connected() {
///     bridge.connect()?;
/// }
/// bridge.write_all(b"SIZE 58 mm,40 mm\r\n")?;
/// # Ok::<(), labelprint::error::LabelprintError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpBridge {
    base_url: String,
    client: Client,
}

impl HttpBridge {
    /// Create a client for the bridge at `base_url` (`http://` or `https://`).
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LabelprintError::InvalidInput(format!(
                "bridge URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LabelprintError::Transport(format!("HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query the bridge state.
    pub fn status(&self) -> Result<BridgeStatus> {
        let response = self.send(self.client.get(self.url("/status")))?;
        response
            .json()
            .map_err(|e| LabelprintError::Transport(format!("Invalid status response: {}", e)))
    }

    /// Ask the bridge to (re)connect to its printer.
    pub fn connect(&self) -> Result<String> {
        let response = self.send(self.client.get(self.url("/connect")))?;
        Ok(body_text(response))
    }

    /// Ask the bridge to drop its printer connection.
    pub fn disconnect(&self) -> Result<String> {
        let response = self.send(self.client.get(self.url("/disconnect")))?;
        Ok(body_text(response))
    }

    /// Send a request and turn non-2xx replies into `Transport` errors
    /// carrying the bridge's message.
    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .map_err(|e| LabelprintError::Transport(format!("Bridge request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LabelprintError::Transport(format!(
                "Bridge returned {}: {}",
                status,
                body_text(response)
            )));
        }
        Ok(response)
    }
}

impl Transport for HttpBridge {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        info!("Posting {} bytes to {}", data.len(), self.base_url);
        let response = self.send(
            self.client
                .post(self.url("/print"))
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(data.to_vec()),
        )?;
        debug!("Bridge replied: {}", body_text(response));
        Ok(())
    }
}

fn body_text(response: Response) -> String {
    response.text().unwrap_or_default().trim().to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve one request with a canned reply; the handle yields
    /// `(request line, body)`.
    fn one_shot(status: &str, body: &str) -> (String, JoinHandle<(String, Vec<u8>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let reply = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut received = vec![0u8; content_length];
            reader.read_exact(&mut received).unwrap();

            reader.get_mut().write_all(reply.as_bytes()).unwrap();
            (request_line.trim().to_string(), received)
        });

        (url, handle)
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            HttpBridge::new("192.168.1.50"),
            Err(LabelprintError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let bridge = HttpBridge::new("http://printer.local/").unwrap();
        assert_eq!(bridge.base_url(), "http://printer.local");
        assert_eq!(bridge.url("/print"), "http://printer.local/print");
    }

    #[test]
    fn test_write_posts_raw_body() {
        let (url, server) = one_shot("200 OK", "Print successful");
        let mut bridge = HttpBridge::new(&url).unwrap();
        bridge.write_all(&[0x1B, 0x40, 0x00, 0xFF]).unwrap();

        let (request_line, body) = server.join().unwrap();
        assert_eq!(request_line, "POST /print HTTP/1.1");
        assert_eq!(body, vec![0x1B, 0x40, 0x00, 0xFF]);
    }

    #[test]
    fn test_printer_not_connected_is_error() {
        let (url, server) = one_shot("500 Internal Server Error", "Printer not connected");
        let mut bridge = HttpBridge::new(&url).unwrap();
        let err = bridge.write_all(b"x").unwrap_err();
        server.join().unwrap();

        match err {
            LabelprintError::Transport(msg) => assert!(msg.contains("Printer not connected")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_parses_bridge_json() {
        let json = r#"{"wifi":"connected","ip":"192.168.1.50","printer":"connected","printerName":"X6h","uptime":42}"#;
        let (url, server) = one_shot("200 OK", json);
        let status = HttpBridge::new(&url).unwrap().status().unwrap();
        let (request_line, _) = server.join().unwrap();

        assert_eq!(request_line, "GET /status HTTP/1.1");
        assert!(status.printer_connected());
        assert_eq!(status.printer_name, "X6h");
        assert_eq!(status.uptime, 42);
    }
}
