use camino::Utf8PathBuf;

#[cfg(unix)]
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::formats::LogFormat;
use crate::socket::SocketEndpoint;

/// Port the remote target's management endpoint listens on by default.
pub const DEFAULT_TARGET_PORT: u16 = 9010;

/// Port used for socket sessions where Unix domain sockets are unavailable.
#[cfg(not(unix))]
const DEFAULT_LISTEN_PORT: u16 = 9011;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default prompt written before each read.
pub const DEFAULT_PROMPT: &str = "diag> ";

/// Default management-connection timeout in milliseconds.
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default log encoding. Compact output keeps an interactive terminal legible.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default management endpoint: the loopback interface on [`DEFAULT_TARGET_PORT`].
#[must_use]
pub fn default_target_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TARGET_PORT)
}

/// Default endpoint for socket sessions.
///
/// On Unix this is `diagsh/diagsh.sock` under the user's runtime directory,
/// falling back to a per-user directory below the system temporary directory.
#[must_use]
pub fn default_listen_socket() -> SocketEndpoint {
    listen_socket_inner()
}

#[cfg(unix)]
fn listen_socket_inner() -> SocketEndpoint {
    let mut base = match runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        Some(mut dir) => {
            dir.push("diagsh");
            dir
        }
        None => {
            let mut dir = Utf8PathBuf::from_path_buf(env::temp_dir())
                .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
            dir.push("diagsh");
            dir.push(format!("uid-{}", unsafe { geteuid() }));
            dir
        }
    };
    base.push("diagsh.sock");
    SocketEndpoint::unix(base)
}

#[cfg(not(unix))]
fn listen_socket_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_LISTEN_PORT)
}
