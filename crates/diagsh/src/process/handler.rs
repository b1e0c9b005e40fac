//! Runs one connection session per accepted socket client.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use tracing::{debug, warn};

use crate::session::{SessionError, SessionHandle, ShellServices};
use crate::transport::{
    ConnectionHandler, ConnectionStream, OpenChannels, SocketChannel, TransportChannel,
};

use super::PROCESS_TARGET;
use super::launch::ShellEvent;

/// Wraps each accepted stream in a [`SocketChannel`] and serves a session on
/// it until the client leaves or the process shuts down.
pub(crate) struct SessionConnectionHandler {
    services: Arc<ShellServices>,
    channels: Arc<OpenChannels>,
    notify: Sender<ShellEvent>,
}

impl SessionConnectionHandler {
    pub(crate) const fn new(
        services: Arc<ShellServices>,
        channels: Arc<OpenChannels>,
        notify: Sender<ShellEvent>,
    ) -> Self {
        Self {
            services,
            channels,
            notify,
        }
    }
}

impl ConnectionHandler for SessionConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let peer = stream.peer_label();
        let channel: Arc<dyn TransportChannel> = match SocketChannel::new(stream) {
            Ok(channel) => Arc::new(channel),
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    %peer,
                    error = %error,
                    "failed to open socket channel"
                );
                return;
            }
        };

        let ticket = self.channels.track(Arc::clone(&channel));
        let outcome = self
            .services
            .session(channel)
            .start()
            .and_then(SessionHandle::join);
        self.channels.release(ticket);

        match outcome {
            Ok(reason) => {
                debug!(
                    target: PROCESS_TARGET,
                    %peer,
                    reason = reason.as_str(),
                    "socket session ended"
                );
            }
            Err(error @ SessionError::Aborted { .. }) => {
                if self.notify.send(ShellEvent::SessionFailed(error)).is_err() {
                    warn!(target: PROCESS_TARGET, %peer, "session aborted after shutdown began");
                }
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, %peer, error = %error, "socket session failed");
            }
        }
    }
}
