//! Mock-server startup for sandboxes that forbid binding localhost.
//!
//! By default a socket-bound test is skipped with a note on stderr when no
//! listener can be opened. Setting `CHAPTER_DOWNLOADER_REQUIRE_SOCKET_TESTS`
//! to `1`, `true` or `yes` turns the skip into a panic, so CI cannot pass
//! vacuously.

use std::net::{Ipv4Addr, TcpListener};

use wiremock::MockServer;

const STRICT_ENV: &str = "CHAPTER_DOWNLOADER_REQUIRE_SOCKET_TESTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingSocket {
    Skip,
    Fail,
}

fn missing_socket_policy() -> MissingSocket {
    match std::env::var(STRICT_ENV) {
        Ok(value) if ["1", "true", "yes"].contains(&value.trim().to_ascii_lowercase().as_str()) => {
            MissingSocket::Fail
        }
        _ => MissingSocket::Skip,
    }
}

fn localhost_bindable() -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).is_ok()
}

/// Starts a mock server, or returns `None` when the test should be skipped.
///
/// # Panics
///
/// Panics when localhost cannot be bound and the strict variable is set.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if localhost_bindable() {
        return Some(MockServer::start().await);
    }
    match missing_socket_policy() {
        MissingSocket::Fail => panic!("cannot bind 127.0.0.1 and {STRICT_ENV} is set"),
        MissingSocket::Skip => {
            eprintln!("skipping mock-server test: cannot bind 127.0.0.1 (set {STRICT_ENV}=1 to fail)");
            None
        }
    }
}
