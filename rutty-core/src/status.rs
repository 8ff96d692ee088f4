//! Visible connection-status indicator.
//!
//! The indicator owns a [`StatusView`] published on a `tokio::sync::watch`
//! channel so a host can render the latest state without polling. While
//! disconnected with a reconnection scheduled it runs a one-second
//! countdown that rewrites the text every tick.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const CONNECTING_TEXT: &str = "Connecting...";
const CONNECTED_TEXT: &str = "Connected";
const DISCONNECTED_TEXT: &str = "Disconnected";

/// Countdown granularity.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

// ── StatusState ──────────────────────────────────────────────────

/// Connection state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl StatusState {
    /// Stable class name for styling the display.
    pub fn class_name(self) -> &'static str {
        match self {
            StatusState::Connecting => "connecting",
            StatusState::Connected => "connected",
            StatusState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusState::Connecting => write!(f, "Connecting"),
            StatusState::Connected => write!(f, "Connected"),
            StatusState::Disconnected => write!(f, "Disconnected"),
        }
    }
}

// ── StatusView ───────────────────────────────────────────────────

/// What the display currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub state: StatusState,
    pub text: String,
    /// Seconds left until the next reconnection attempt, while counting down.
    pub countdown: Option<u64>,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            state: StatusState::Connecting,
            text: CONNECTING_TEXT.to_string(),
            countdown: None,
        }
    }
}

// ── ConnectionStatusIndicator ────────────────────────────────────

/// Three-state status display with an optional reconnection countdown.
///
/// At most one countdown task exists at any time: every `set_*` call aborts
/// the previous one before doing anything else. Each call also starts a new
/// generation, and a countdown only publishes while its generation is
/// current, so a tick already in flight on another worker cannot overwrite
/// a newer state.
pub struct ConnectionStatusIndicator {
    view: Arc<watch::Sender<StatusView>>,
    generation: Arc<AtomicU64>,
    countdown: Option<JoinHandle<()>>,
}

impl ConnectionStatusIndicator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusView::default());
        Self {
            view: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            countdown: None,
        }
    }

    /// Obtain a receiver that observes every display change.
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.view.subscribe()
    }

    /// Snapshot of the current display.
    pub fn view(&self) -> StatusView {
        self.view.borrow().clone()
    }

    pub fn state(&self) -> StatusState {
        self.view.borrow().state
    }

    /// Number of live countdown timers (0 or 1).
    pub fn active_timers(&self) -> usize {
        self.countdown
            .as_ref()
            .map_or(0, |handle| usize::from(!handle.is_finished()))
    }

    pub fn set_connecting(&mut self) {
        self.begin().publish(StatusState::Connecting, CONNECTING_TEXT.to_string(), None);
    }

    pub fn set_connected(&mut self) {
        self.begin().publish(StatusState::Connected, CONNECTED_TEXT.to_string(), None);
    }

    /// Show the disconnected state, with `reason` appended when non-empty.
    ///
    /// With `reconnect_seconds = Some(n)` the text is annotated with
    /// `(reconnecting in ns)` right away and then once per second with the
    /// remaining time. When the count reaches zero the annotation is dropped
    /// and the countdown ends. `Some(0)` shows the annotation once and
    /// installs no timer.
    pub fn set_disconnected(&mut self, reason: Option<&str>, reconnect_seconds: Option<u64>) {
        let publisher = self.begin();

        let base = match reason {
            Some(reason) if !reason.is_empty() => format!("{DISCONNECTED_TEXT} - {reason}"),
            _ => DISCONNECTED_TEXT.to_string(),
        };

        let Some(total) = reconnect_seconds else {
            publisher.publish(StatusState::Disconnected, base, None);
            return;
        };

        publisher.publish(StatusState::Disconnected, annotate(&base, total), Some(total));
        if total == 0 {
            return;
        }

        self.countdown = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for remaining in (1..total).rev() {
                ticker.tick().await;
                if !publisher.publish(
                    StatusState::Disconnected,
                    annotate(&base, remaining),
                    Some(remaining),
                ) {
                    return;
                }
            }
            ticker.tick().await;
            publisher.publish(StatusState::Disconnected, base, None);
        }));
    }

    /// Cancel any countdown and start a new generation.
    fn begin(&mut self) -> Publisher {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Publisher {
            view: Arc::clone(&self.view),
            generation: Arc::clone(&self.generation),
            issued,
        }
    }
}

impl Default for ConnectionStatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionStatusIndicator {
    fn drop(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

/// Write access to the view for one generation.
struct Publisher {
    view: Arc<watch::Sender<StatusView>>,
    generation: Arc<AtomicU64>,
    issued: u64,
}

impl Publisher {
    /// Replace the view unless a newer generation has started. The check
    /// runs under the channel lock, which every publish takes.
    fn publish(&self, state: StatusState, text: String, countdown: Option<u64>) -> bool {
        self.view.send_if_modified(|view| {
            if self.generation.load(Ordering::SeqCst) != self.issued {
                return false;
            }
            *view = StatusView {
                state,
                text,
                countdown,
            };
            true
        })
    }
}

fn annotate(base: &str, seconds: u64) -> String {
    format!("{base} (reconnecting in {seconds}s)")
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connecting_and_connected_texts() {
        let mut status = ConnectionStatusIndicator::new();
        status.set_connected();
        assert_eq!(status.view().text, "Connected");
        assert_eq!(status.state(), StatusState::Connected);

        status.set_connecting();
        assert_eq!(status.view().text, "Connecting...");
        assert_eq!(status.state().class_name(), "connecting");
        assert_eq!(status.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_reason_suffix() {
        let mut status = ConnectionStatusIndicator::new();
        status.set_disconnected(Some(""), None);
        assert_eq!(status.view().text, "Disconnected");

        status.set_disconnected(Some("server gone"), None);
        assert_eq!(status.view().text, "Disconnected - server gone");
        assert_eq!(status.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_decrements_and_reverts() {
        let mut status = ConnectionStatusIndicator::new();
        let mut rx = status.subscribe();

        status.set_disconnected(Some("idle timeout"), Some(5));
        assert_eq!(
            rx.borrow_and_update().text,
            "Disconnected - idle timeout (reconnecting in 5s)"
        );
        assert_eq!(status.active_timers(), 1);

        let start = Instant::now();
        for remaining in [4, 3, 2, 1] {
            rx.changed().await.unwrap();
            let view = rx.borrow_and_update().clone();
            assert_eq!(
                view.text,
                format!("Disconnected - idle timeout (reconnecting in {remaining}s)")
            );
            assert_eq!(view.countdown, Some(remaining));
            assert_eq!(start.elapsed(), COUNTDOWN_TICK * (5 - remaining) as u32);
        }

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().text, "Disconnected - idle timeout");
        settle().await;
        assert_eq!(status.active_timers(), 0);
        assert_eq!(status.state(), StatusState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_seconds_still_annotates() {
        let mut status = ConnectionStatusIndicator::new();
        status.set_disconnected(None, Some(0));
        assert_eq!(status.view().text, "Disconnected (reconnecting in 0s)");
        assert_eq!(status.view().countdown, Some(0));
        assert_eq!(status.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn set_cancels_running_countdown() {
        let mut status = ConnectionStatusIndicator::new();
        status.set_disconnected(None, Some(10));
        assert_eq!(status.active_timers(), 1);

        status.set_disconnected(Some("again"), Some(10));
        assert_eq!(status.active_timers(), 1);

        status.set_connecting();
        assert_eq!(status.active_timers(), 0);

        tokio::time::advance(COUNTDOWN_TICK * 3).await;
        settle().await;
        assert_eq!(status.view().text, "Connecting...");
    }

    #[tokio::test(start_paused = true)]
    async fn n_ticks_end_countdown() {
        let mut status = ConnectionStatusIndicator::new();
        status.set_disconnected(None, Some(3));
        for _ in 0..3 {
            tokio::time::advance(COUNTDOWN_TICK).await;
            settle().await;
            assert!(status.active_timers() <= 1);
        }
        assert_eq!(status.active_timers(), 0);
        assert_eq!(status.view().text, "Disconnected");
        assert_eq!(status.state(), StatusState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_tick_does_not_overwrite() {
        let mut status = ConnectionStatusIndicator::new();
        status.set_disconnected(Some("idle timeout"), Some(1));

        // A countdown tick that was already running when the state moved on.
        let stale = Publisher {
            view: Arc::clone(&status.view),
            generation: Arc::clone(&status.generation),
            issued: status.generation.load(Ordering::SeqCst),
        };
        status.set_connecting();
        assert_eq!(status.active_timers(), 0);

        assert!(!stale.publish(
            StatusState::Disconnected,
            "Disconnected - idle timeout".to_string(),
            None
        ));
        assert_eq!(status.view().text, "Connecting...");

        tokio::time::advance(COUNTDOWN_TICK).await;
        settle().await;
        assert_eq!(status.state(), StatusState::Connecting);
    }
}
