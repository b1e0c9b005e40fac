//! Connection lifecycle events and their synchronous broadcaster.
//!
//! Sessions emit [`ConnectionEvent`]s when their management connection is
//! established or lost; the command registry listens in order to recompute
//! which commands can be dispatched.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");

/// Process-unique identifier of a connection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Type tag of a [`ConnectionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    /// A session acquired its management connection.
    Connected,
    /// A session's management connection was lost or released.
    Disconnected,
}

impl ConnectionEventKind {
    /// Lower-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Immutable record delivered to every [`ConnectionListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    kind: ConnectionEventKind,
    session: SessionId,
    endpoint: String,
}

impl ConnectionEvent {
    /// Builds a `connected` event.
    #[must_use]
    pub fn connected(session: SessionId, endpoint: impl Into<String>) -> Self {
        Self {
            kind: ConnectionEventKind::Connected,
            session,
            endpoint: endpoint.into(),
        }
    }

    /// Builds a `disconnected` event.
    #[must_use]
    pub fn disconnected(session: SessionId, endpoint: impl Into<String>) -> Self {
        Self {
            kind: ConnectionEventKind::Disconnected,
            session,
            endpoint: endpoint.into(),
        }
    }

    /// The event's type tag.
    #[must_use]
    pub const fn kind(&self) -> ConnectionEventKind {
        self.kind
    }

    /// Session whose connection changed state.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Management endpoint involved.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Receives connection lifecycle events.
///
/// Listeners run on the emitting session's thread before `emit` returns. The
/// emitter does not guard against panics, so implementations must not panic.
pub trait ConnectionListener: Send + Sync {
    /// Handles one event.
    fn on_connection_event(&self, event: &ConnectionEvent);
}

/// Broadcasts [`ConnectionEvent`]s to a set of listeners.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Vec<Arc<dyn ConnectionListener>>>,
}

impl EventEmitter {
    /// Creates an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener` unless that same instance is already registered.
    pub fn add_listener(&self, listener: Arc<dyn ConnectionListener>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !listeners.iter().any(|known| same_listener(known, &listener)) {
            listeners.push(listener);
        }
    }

    /// Number of distinct registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers `event` to every registered listener, then returns.
    pub fn emit(&self, event: &ConnectionEvent) {
        // Listeners may register further listeners; never call out under the lock.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        debug!(
            target: EVENTS_TARGET,
            kind = event.kind().as_str(),
            session = %event.session(),
            listeners = listeners.len(),
            "emitting connection event"
        );
        for listener in listeners {
            listener.on_connection_event(event);
        }
    }
}

fn same_listener(left: &Arc<dyn ConnectionListener>, right: &Arc<dyn ConnectionListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<ConnectionEvent>>,
    }

    impl ConnectionListener for Recorder {
        fn on_connection_event(&self, event: &ConnectionEvent) {
            self.seen.lock().expect("recorder lock").push(event.clone());
        }
    }

    #[test]
    fn duplicate_listeners_receive_each_event_once() {
        let emitter = EventEmitter::new();
        let recorder = Arc::new(Recorder::default());

        emitter.add_listener(recorder.clone());
        emitter.add_listener(recorder.clone());
        emitter.emit(&ConnectionEvent::connected(SessionId::new(1), "tcp://t:1"));

        assert_eq!(emitter.listener_count(), 1);
        let seen = recorder.seen.lock().expect("recorder lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind(), ConnectionEventKind::Connected);
        assert_eq!(seen[0].session(), SessionId::new(1));
    }

    #[test]
    fn distinct_listeners_all_receive_the_event() {
        let emitter = EventEmitter::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        emitter.add_listener(first.clone());
        emitter.add_listener(second.clone());

        emitter.emit(&ConnectionEvent::disconnected(SessionId::new(2), "unix:///s"));

        for recorder in [first, second] {
            let seen = recorder.seen.lock().expect("recorder lock");
            assert_eq!(
                seen.as_slice(),
                [ConnectionEvent::disconnected(SessionId::new(2), "unix:///s")]
            );
        }
    }

    #[test]
    fn emitting_without_listeners_is_harmless() {
        EventEmitter::new().emit(&ConnectionEvent::connected(SessionId::new(3), "x"));
    }
}
