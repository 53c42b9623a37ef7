//! Bounded polling for a widget owner that initializes late.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::widget::{OwnerProvider, WidgetOwner};

/// Sleep seam so tests can count ticks instead of burning wall-clock time.
#[async_trait]
pub trait PollClock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl PollClock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Poll budget for [`wait_for_owner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for WaiterSettings {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_millis(250),
        }
    }
}

/// How a wait ended. Pending is implicit while the poll loop runs.
pub enum OwnerWait {
    Ready(Arc<dyn WidgetOwner>),
    TimedOut { attempts: u32 },
}

/// Poll the provider until it hands out an owner or the attempt budget is
/// spent.
///
/// The first check runs immediately and the clock only ticks between
/// checks, so a never-ready owner costs `max_attempts` checks and
/// `max_attempts - 1` sleeps. A zero budget times out without checking.
pub async fn wait_for_owner(
    provider: &dyn OwnerProvider,
    settings: WaiterSettings,
    clock: &dyn PollClock,
) -> OwnerWait {
    let mut attempts = 0u32;
    while attempts < settings.max_attempts {
        if let Some(owner) = provider.try_owner() {
            return OwnerWait::Ready(owner);
        }
        attempts += 1;
        if attempts < settings.max_attempts {
            clock.sleep(settings.interval).await;
        }
    }
    OwnerWait::TimedOut { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::types::BotRecord;

    struct NullOwner;

    #[async_trait]
    impl WidgetOwner for NullOwner {
        fn bots(&self) -> Vec<BotRecord> {
            Vec::new()
        }
        fn replace_bots(&self, _bots: Vec<BotRecord>) {}
        async fn save_bots(&self) -> Result<()> {
            Ok(())
        }
        fn render_experts(&self) {}
    }

    /// Fails the first `checks_before_ready` lookups, then succeeds.
    struct ReadyAfter {
        checks_before_ready: u32,
        calls: AtomicU32,
    }

    impl ReadyAfter {
        fn new(checks_before_ready: u32) -> Self {
            Self {
                checks_before_ready,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OwnerProvider for ReadyAfter {
        fn try_owner(&self) -> Option<Arc<dyn WidgetOwner>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (call >= self.checks_before_ready).then(|| Arc::new(NullOwner) as Arc<dyn WidgetOwner>)
        }
    }

    #[derive(Default)]
    struct CountingClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl CountingClock {
        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().clone()
        }
    }

    #[async_trait]
    impl PollClock for CountingClock {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
        }
    }

    fn settings(max_attempts: u32) -> WaiterSettings {
        WaiterSettings {
            max_attempts,
            interval: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn ready_on_the_first_check_never_sleeps() {
        let provider = ReadyAfter::new(0);
        let clock = CountingClock::default();

        let wait = wait_for_owner(&provider, settings(5), &clock).await;

        assert!(matches!(wait, OwnerWait::Ready(_)));
        assert_eq!(provider.calls(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn sleeps_between_checks_until_ready() {
        let provider = ReadyAfter::new(2);
        let clock = CountingClock::default();

        let wait = wait_for_owner(&provider, settings(5), &clock).await;

        assert!(matches!(wait, OwnerWait::Ready(_)));
        assert_eq!(provider.calls(), 3);
        assert_eq!(clock.sleeps(), [Duration::from_millis(50); 2]);
    }

    #[tokio::test]
    async fn exhausting_the_budget_times_out() {
        let provider = ReadyAfter::new(u32::MAX);
        let clock = CountingClock::default();

        let wait = wait_for_owner(&provider, settings(4), &clock).await;

        match wait {
            OwnerWait::TimedOut { attempts } => assert_eq!(attempts, 4),
            OwnerWait::Ready(_) => panic!("owner should never become ready"),
        }
        assert_eq!(provider.calls(), 4);
        // No sleep after the final failed check.
        assert_eq!(clock.sleeps().len(), 3);
    }

    #[tokio::test]
    async fn zero_budget_times_out_without_checking() {
        let provider = ReadyAfter::new(0);
        let clock = CountingClock::default();

        let wait = wait_for_owner(&provider, settings(0), &clock).await;

        assert!(matches!(wait, OwnerWait::TimedOut { attempts: 0 }));
        assert_eq!(provider.calls(), 0);
        assert!(clock.sleeps().is_empty());
    }
}
