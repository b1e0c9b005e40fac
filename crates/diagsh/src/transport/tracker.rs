//! Registry of channels that must be closed on shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::{TRANSPORT_TARGET, TransportChannel};

/// Tracks open channels so process shutdown can close every one of them.
///
/// Once [`OpenChannels::close_all`] has run, newly tracked channels are closed
/// immediately.
#[derive(Default)]
pub struct OpenChannels {
    next: AtomicU64,
    closed: AtomicBool,
    channels: Mutex<HashMap<u64, Arc<dyn TransportChannel>>>,
}

/// Token returned by [`OpenChannels::track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelTicket(u64);

impl OpenChannels {
    /// Starts tracking `channel`.
    #[must_use = "release the ticket once the channel has closed"]
    pub fn track(&self, channel: Arc<dyn TransportChannel>) -> ChannelTicket {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::SeqCst) {
            drop(channels);
            debug!(target: TRANSPORT_TARGET, channel = channel.label(), "closing late channel");
            channel.close();
        } else {
            channels.insert(ticket, channel);
        }
        ChannelTicket(ticket)
    }

    /// Stops tracking a channel that has already been closed.
    pub fn release(&self, ticket: ChannelTicket) {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ticket.0);
    }

    /// Number of channels still tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no channels are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes and forgets every tracked channel.
    pub fn close_all(&self) {
        let drained: Vec<_> = {
            let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
            self.closed.store(true, Ordering::SeqCst);
            channels.drain().map(|(_, channel)| channel).collect()
        };
        for channel in drained {
            debug!(target: TRANSPORT_TARGET, channel = channel.label(), "closing channel");
            channel.close();
        }
    }
}
