//! The request wrapper logs each failure once and hands back the error.

mod common;

use reqwest::Method;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tractive_tui::{ApiError, Credentials, RequestOptions, TractiveClient};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

fn capture_errors() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::ERROR)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

#[tokio::test]
async fn transport_failure_is_logged_exactly_once() {
    let base = common::closed_port_url().await;
    let client = TractiveClient::with_base_url(Credentials::new("c", "me@example.com", "pw"), &base).unwrap();
    let url = client.join_url("tracker/TRK1").unwrap();
    let (captured, _guard) = capture_errors();

    let err = client
        .request(Method::GET, url.as_str(), RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    let lines = captured.lines();
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("request failed"));
    assert!(lines[0].contains("tracker/TRK1"));
}

#[tokio::test]
async fn status_failure_is_logged_with_status() {
    let mock = common::start(3600).await;
    let client = TractiveClient::with_base_url(Credentials::new("c", "me@example.com", "pw"), &mock.base_url).unwrap();
    let url = client.join_url("tracker/TRK1").unwrap();
    let (captured, _guard) = capture_errors();

    // No session, so the mock refuses.
    let err = client
        .request(Method::GET, url.as_str(), RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { .. }));
    let lines = captured.lines();
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("401"));
}

#[tokio::test]
async fn successful_request_logs_no_errors() {
    let mock = common::start(3600).await;
    let client = TractiveClient::with_base_url(Credentials::new("c", "me@example.com", "pw"), &mock.base_url).unwrap();
    let (captured, _guard) = capture_errors();

    client.authenticate().await.unwrap();
    client.get_all_trackers().await.unwrap();

    assert!(captured.lines().is_empty());
    client.shutdown();
}
