//! # HTTP Print Service
//!
//! Accepts PDFs over HTTP and prints them on the configured target, so
//! other machines on the network can print without the CLI.
//!
//! ## Usage
//!
//! ```bash
//! labelprint --device /dev/rfcomm0 serve --listen 0.0.0.0:8080
//! curl --data-binary @label.pdf 'http://localhost:8080/print?command_set=tspl&paper_height_mm=40'
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `GET` | `/status` | | `{"printer", "busy", "jobs"}` |
//! | `POST` | `/print` | PDF | `{"success", "bytes", "pages"}` |
//! | `POST` | `/preview` | PDF | PNG of the first page |
//! | `POST` | `/calibrate` | | `{"success", "bytes", "pages"}` |
//!
//! Query parameters are [`PrintOptions`](crate::printer::PrintOptions)
//! fields. Jobs are rendered on the blocking pool and sent one at a time.

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::LabelprintError;

/// Largest accepted document upload
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(handlers::status::status))
        .route("/print", post(handlers::print::print))
        .route("/preview", post(handlers::print::preview))
        .route("/calibrate", post(handlers::print::calibrate))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use std::path::PathBuf;
/// use labelprint::server::{serve, ServerConfig};
/// use labelprint::transport::Target;
///
/// # async fn example() -> Result<(), labelprint::error::LabelprintError> {
/// let config = ServerConfig {
///     target: Target::Serial { device: PathBuf::from("/dev/rfcomm0"), baud: 115200 },
///     listen_addr: "0.0.0.0:8080".to_string(),
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), LabelprintError> {
    let app = router(Arc::new(AppState::new(config.clone())));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            LabelprintError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    info!("Listening on {}", config.listen_addr);
    info!("Printing to {}", config.target);

    axum::serve(listener, app)
        .await
        .map_err(|e| LabelprintError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use image::{Rgb, RgbImage};
    use tower::ServiceExt;

    use crate::error::Result;
    use crate::pdf::PageSource;
    use crate::transport::Target;

    /// Page source returning fixed images, standing in for `pdftoppm`.
    struct FixedPages(Vec<RgbImage>);

    impl PageSource for FixedPages {
        fn render_pages(&self, _path: &Path) -> Result<Vec<RgbImage>> {
            Ok(self.0.clone())
        }
    }

    fn test_state(dir: &Path, pages: usize) -> (Arc<AppState>, PathBuf) {
        let out = dir.join("job.bin");
        let config = ServerConfig {
            target: Target::File { path: out.clone() },
            listen_addr: "127.0.0.1:0".into(),
        };
        let images = (0..pages)
            .map(|_| {
                RgbImage::from_fn(32, 16, |x, _| {
                    if x < 16 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
                })
            })
            .collect();
        let state = AppState::with_source(config, Arc::new(FixedPages(images)));
        (Arc::new(state), out)
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn post(uri: &str, body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path(), 1);
        let response = router(state)
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["busy"], false);
        assert_eq!(json["jobs"], 0);
        assert!(json["printer"].as_str().unwrap().starts_with("file "));
    }

    #[tokio::test]
    async fn test_print_tspl_job() {
        let dir = tempfile::tempdir().unwrap();
        let (state, out) = test_state(dir.path(), 2);
        let response = router(state.clone())
            .oneshot(post(
                "/print?command_set=tspl&width_dots=32&paper_width_mm=30",
                b"%PDF-1.4 test",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["pages"], 2);

        let written = std::fs::read(&out).unwrap();
        assert_eq!(json["bytes"], written.len());
        assert!(written.starts_with(b"SIZE 30 mm,10 mm\r\n"));
        assert_eq!(state.jobs_sent(), 1);
    }

    #[tokio::test]
    async fn test_print_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let (state, out) = test_state(dir.path(), 1);
        let response = router(state)
            .oneshot(post("/print", b"\x89PNG\r\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_print_rejects_unknown_command_set() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path(), 1);
        let response = router(state)
            .oneshot(post("/print?command_set=zpl", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preview_returns_png() {
        let dir = tempfile::tempdir().unwrap();
        let (state, out) = test_state(dir.path(), 1);
        let response = router(state)
            .oneshot(post("/preview?width_dots=20", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");

        let png = body_bytes(response).await;
        let img = image::load_from_memory(&png).unwrap();
        // 20 dots padded to 24
        assert_eq!((img.width(), img.height()), (24, 10));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_calibrate_sends_grid() {
        let dir = tempfile::tempdir().unwrap();
        let (state, out) = test_state(dir.path(), 0);
        let response = router(state)
            .oneshot(
                Request::post("/calibrate?paper_height_mm=40")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let written = String::from_utf8(std::fs::read(&out).unwrap()).unwrap();
        assert!(written.contains("BOX 2,2,462,318,4\r\n"));
    }

    #[tokio::test]
    async fn test_calibrate_without_height_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path(), 0);
        let response = router(state)
            .oneshot(Request::post("/calibrate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn make_fifo(path: &Path) {
        use std::os::unix::ffi::OsStrExt;
        let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);
    }

    #[tokio::test]
    async fn test_dropped_request_keeps_printer_until_write_finishes() {
        let dir = tempfile::tempdir().unwrap();
        // Writing to a FIFO blocks until someone reads it
        let fifo = dir.path().join("printer.fifo");
        make_fifo(&fifo);
        let config = ServerConfig {
            target: Target::File { path: fifo.clone() },
            listen_addr: "127.0.0.1:0".into(),
        };
        let state = Arc::new(AppState::with_source(
            config,
            Arc::new(FixedPages(vec![RgbImage::new(8, 8)])),
        ));
        let app = router(state.clone());

        // Client gives up while the write is stuck
        let first = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            app.clone().oneshot(post("/print?width_dots=8", b"%PDF-1.4")),
        )
        .await;
        assert!(first.is_err());
        assert!(state.is_busy());
        assert_eq!(state.jobs_sent(), 0);

        // A second job waits for the first instead of opening the printer
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            app.oneshot(post("/print?width_dots=8", b"%PDF-1.4")),
        )
        .await;
        assert!(second.is_err());

        let written = tokio::task::spawn_blocking(move || std::fs::read(&fifo).unwrap())
            .await
            .unwrap();
        assert_eq!(&written[..2], &[0x1B, 0x40]);

        for _ in 0..100 {
            if !state.is_busy() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!state.is_busy());
        assert_eq!(state.jobs_sent(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            target: Target::File {
                path: dir.path().join("missing-dir").join("job.bin"),
            },
            listen_addr: "127.0.0.1:0".into(),
        };
        let state = Arc::new(AppState::with_source(
            config,
            Arc::new(FixedPages(vec![RgbImage::new(8, 8)])),
        ));
        let response = router(state)
            .oneshot(post("/print?width_dots=8", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
