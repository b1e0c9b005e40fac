//! Tests for the socket listener.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use diagsh_config::SocketEndpoint;

use super::test_utils::CountingHandler;
use super::{ConnectionHandler, ListenerError, SocketListener};

#[fixture]
fn tcp_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn tcp_listener_hands_each_connection_to_the_handler(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener
        .local_addr()
        .expect("listener should report local address");
    let (count, handler) = CountingHandler::new();
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener.start(handler).expect("start listener");

    let _first = TcpStream::connect(addr).expect("connect first client");
    let _second = TcpStream::connect(addr).expect("connect second client");

    assert!(wait_for_count(&count, 2), "expected two connections");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn tcp_bind_reports_resolution_failures() {
    let endpoint = SocketEndpoint::tcp("no-such-host.invalid", 9);
    let error = SocketListener::bind(&endpoint).expect_err("bind should fail");
    assert!(matches!(
        error,
        ListenerError::Resolve { .. }
            | ListenerError::ResolveEmpty { .. }
            | ListenerError::BindTcp { .. }
    ));
}

#[cfg(unix)]
#[fixture]
fn unix_tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[cfg(unix)]
#[rstest]
fn unix_listener_replaces_stale_socket_and_removes_it_on_shutdown(
    unix_tempdir: tempfile::TempDir,
) {
    let path = unix_tempdir.path().join("diagsh.sock");
    {
        let _stale = std::os::unix::net::UnixListener::bind(&path).expect("bind stale listener");
    }
    assert!(path.exists(), "stale socket should remain");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let listener = SocketListener::bind(&endpoint).expect("bind new listener");
    let (count, handler) = CountingHandler::new();
    let handle = listener.start(handler).expect("start listener");

    let _client = std::os::unix::net::UnixStream::connect(&path).expect("connect unix client");
    assert!(wait_for_count(&count, 1), "expected one connection");

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(!path.exists(), "listener should remove unix socket on shutdown");
}

#[cfg(unix)]
#[rstest]
fn unix_listener_rejects_socket_owned_by_a_live_process(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("diagsh.sock");
    let _existing = std::os::unix::net::UnixListener::bind(&path).expect("bind existing listener");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixInUse { .. }));
}

#[cfg(unix)]
#[rstest]
fn unix_listener_refuses_regular_files(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("diagsh.sock");
    std::fs::write(&path, b"not a socket").expect("write file");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
}
