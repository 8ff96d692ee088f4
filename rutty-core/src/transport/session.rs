//! One socket bound to one terminal surface.

use tracing::{debug, trace, warn};

use crate::network::{ReadyState, Socket};
use crate::protocol::Frame;
use crate::subscription::{Subscription, SubscriptionSet};

/// Monotonic session counter value. The first session is `1`.
pub type SessionId = u64;

/// The live binding between one socket and the surface.
///
/// A session is created by activation and consumed by
/// [`teardown`](Self::teardown); a reconnection always builds a new one.
pub struct ConnectionSession<S: Socket> {
    id: SessionId,
    socket: S,
    subscriptions: SubscriptionSet,
    /// The pending open-check retry; at most one.
    open_retry: Option<Subscription>,
}

impl<S: Socket> ConnectionSession<S> {
    pub(crate) fn new(id: SessionId, socket: S) -> Self {
        Self {
            id,
            socket,
            subscriptions: SubscriptionSet::new(),
            open_retry: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn ready_state(&self) -> ReadyState {
        self.socket.ready_state()
    }

    /// Number of subscriptions not yet released.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.active()
            + usize::from(self.open_retry.as_ref().is_some_and(|s| !s.is_disposed()))
    }

    pub(crate) fn subscribe(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Install the open-check retry timer, releasing any previous one.
    pub(crate) fn retry_open(&mut self, timer: Subscription) {
        if let Some(mut previous) = self.open_retry.replace(timer) {
            previous.dispose();
        }
    }

    /// Send a frame if the socket is open; otherwise log and drop it.
    ///
    /// Returns whether the frame was handed to the socket.
    pub fn send(&self, frame: &Frame) -> bool {
        let state = self.socket.ready_state();
        if state != ReadyState::Open {
            warn!(session = self.id, "socket state is {state}, dropping {frame}");
            return false;
        }
        match self.socket.send(frame.encode()) {
            Ok(()) => {
                trace!(session = self.id, "sent {frame}");
                true
            }
            Err(e) => {
                warn!(session = self.id, "failed to send {frame}: {e}");
                false
            }
        }
    }

    /// Release every subscription and close the socket if it is still
    /// connecting or open.
    pub fn teardown(mut self) {
        debug!(
            session = self.id,
            subscriptions = self.active_subscriptions(),
            "tearing down session"
        );
        self.subscriptions.dispose_all();
        if let Some(mut retry) = self.open_retry.take() {
            retry.dispose();
        }
        if matches!(
            self.socket.ready_state(),
            ReadyState::Connecting | ReadyState::Open
        ) {
            self.socket.close();
        }
    }
}
