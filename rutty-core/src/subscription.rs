//! Release handles for event subscriptions and timers.
//!
//! Every listener a session installs (socket forwarding, surface
//! forwarding, retry and reconnection timers) is represented by a
//! [`Subscription`]. Releasing one is idempotent; a [`SubscriptionSet`]
//! releases all of its members in one call.

use std::fmt;
use std::future::Future;

use tracing::trace;

type Release = Box<dyn FnOnce() + Send + 'static>;

/// A single release handle.
///
/// The handle remembers whether it has already been released, so calling
/// [`dispose`](Self::dispose) twice (or dropping after disposing) runs the
/// release action exactly once.
pub struct Subscription {
    name: &'static str,
    release: Option<Release>,
}

impl Subscription {
    /// Wrap an arbitrary release action.
    pub fn new<F>(name: &'static str, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name,
            release: Some(Box::new(release)),
        }
    }

    /// Spawn `fut` on the runtime; releasing the subscription aborts it.
    pub fn spawn<Fut>(name: &'static str, fut: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        Self::new(name, move || handle.abort())
    }

    /// Run `f` once after `delay`, unless released first.
    pub fn timeout<F>(name: &'static str, delay: std::time::Duration, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(name, async move {
            tokio::time::sleep(delay).await;
            f();
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }

    /// Release the subscription. Safe to call any number of times.
    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            trace!(subscription = self.name, "released");
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A group of subscriptions released together.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    members: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.members.push(subscription);
    }

    /// Number of members not yet released.
    pub fn active(&self) -> usize {
        self.members.iter().filter(|s| !s.is_disposed()).count()
    }

    /// Release every member and empty the set.
    pub fn dispose_all(&mut self) {
        for mut subscription in self.members.drain(..) {
            subscription.dispose();
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispose_is_idempotent() {
        let (count, release) = counter();
        let mut sub = Subscription::new("test", release);
        assert!(!sub.is_disposed());

        sub.dispose();
        sub.dispose();
        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases() {
        let (count, release) = counter();
        drop(Subscription::new("test", release));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_releases_all_members() {
        let mut set = SubscriptionSet::new();
        let mut counts = Vec::new();
        for _ in 0..3 {
            let (count, release) = counter();
            counts.push(count);
            set.push(Subscription::new("member", release));
        }
        assert_eq!(set.active(), 3);

        set.dispose_all();
        set.dispose_all();
        assert_eq!(set.active(), 0);
        assert!(counts.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_once() {
        let (count, release) = counter();
        let _sub = Subscription::timeout("timer", Duration::from_secs(2), release);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_timeout_never_fires() {
        let (count, release) = counter();
        let mut sub = Subscription::timeout("timer", Duration::from_secs(2), release);
        sub.dispose();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
