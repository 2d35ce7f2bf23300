//! Waiting for the chat capability to become available.
//!
//! Whoever bootstraps the backend owns a [`CapabilitySlot`] and calls
//! [`CapabilitySlot::install`] once it is usable. Turns wait on the slot through a
//! [`ReadinessWaiter`], either by awaiting the install signal directly or, for
//! hosts that cannot signal, by checking the slot on a fixed interval.

use parley_ai::ChatCapability;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};

/// Default bound on the readiness wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Default check interval for [`ReadinessStrategy::Poll`]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared cell the capability is installed into.
///
/// Cloning is cheap; all clones observe the same capability.
#[derive(Clone)]
pub struct CapabilitySlot {
    tx: Arc<watch::Sender<Option<Arc<dyn ChatCapability>>>>,
}

impl CapabilitySlot {
    /// An empty slot
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(None)),
        }
    }

    /// A slot that is ready from the start
    pub fn ready(capability: Arc<dyn ChatCapability>) -> Self {
        let slot = Self::new();
        slot.install(capability);
        slot
    }

    /// Make `capability` available, waking every waiter
    pub fn install(&self, capability: Arc<dyn ChatCapability>) {
        tracing::debug!(backend = capability.name(), "chat capability installed");
        self.tx.send_replace(Some(capability));
    }

    /// The capability, if installed
    pub fn get(&self) -> Option<Arc<dyn ChatCapability>> {
        self.tx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Arc<dyn ChatCapability>>> {
        self.tx.subscribe()
    }
}

impl Default for CapabilitySlot {
    fn default() -> Self {
        Self::new()
    }
}

/// How the waiter notices the capability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadinessStrategy {
    /// Await the install notification
    #[default]
    Signal,
    /// Check the slot every `interval`
    Poll { interval: Duration },
}

/// Bounded wait for a [`CapabilitySlot`] to be filled
#[derive(Clone)]
pub struct ReadinessWaiter {
    slot: CapabilitySlot,
    strategy: ReadinessStrategy,
    timeout: Duration,
}

impl ReadinessWaiter {
    /// Signal-based waiter with the default timeout
    pub fn new(slot: CapabilitySlot) -> Self {
        Self {
            slot,
            strategy: ReadinessStrategy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_strategy(mut self, strategy: ReadinessStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn strategy(&self) -> ReadinessStrategy {
        self.strategy
    }

    /// Wait until the capability is installed.
    ///
    /// Returns at once when it already is. Fails with
    /// [`Error::ReadinessTimeout`] once the configured bound elapses. All timers
    /// live inside the returned future and are dropped with it.
    pub async fn wait_for_ready(&self) -> Result<Arc<dyn ChatCapability>> {
        if let Some(capability) = self.slot.get() {
            return Ok(capability);
        }

        let wait = async {
            match self.strategy {
                ReadinessStrategy::Signal => self.wait_signal().await,
                ReadinessStrategy::Poll { interval } => self.wait_poll(interval).await,
            }
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(capability) => Ok(capability),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "chat capability did not become ready"
                );
                Err(Error::ReadinessTimeout {
                    waited: self.timeout,
                })
            }
        }
    }

    async fn wait_signal(&self) -> Arc<dyn ChatCapability> {
        let mut rx = self.slot.subscribe();
        let installed = rx
            .wait_for(Option::is_some)
            .await
            .map(|value| (*value).clone());

        match installed {
            Ok(Some(capability)) => capability,
            // The sender lives as long as the slot, so this only happens if the
            // slot was torn down mid-wait; let the timeout decide.
            _ => std::future::pending().await,
        }
    }

    async fn wait_poll(&self, interval: Duration) -> Arc<dyn ChatCapability> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(capability) = self.slot.get() {
                return capability;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCapability;
    use tokio::time::Instant;

    fn capability() -> Arc<dyn ChatCapability> {
        Arc::new(ScriptedCapability::text(&["hi"]))
    }

    fn poll() -> ReadinessStrategy {
        ReadinessStrategy::Poll {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_ready_returns_without_waiting() {
        for strategy in [ReadinessStrategy::Signal, poll()] {
            let waiter = ReadinessWaiter::new(CapabilitySlot::ready(capability()))
                .with_strategy(strategy);
            let start = Instant::now();
            assert!(waiter.wait_for_ready().await.is_ok());
            assert_eq!(start.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_wakes_on_install() {
        let slot = CapabilitySlot::new();
        let waiter = ReadinessWaiter::new(slot.clone());

        let installer = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            installer.install(capability());
        });

        let start = Instant::now();
        let ready = waiter.wait_for_ready().await.unwrap();
        assert_eq!(ready.name(), "scripted");
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_notices_on_next_tick() {
        let slot = CapabilitySlot::new();
        let waiter = ReadinessWaiter::new(slot.clone()).with_strategy(poll());

        let installer = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            installer.install(capability());
        });

        let start = Instant::now();
        assert!(waiter.wait_for_ready().await.is_ok());
        // Installed at 250ms, seen by the 300ms check
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_both_strategies() {
        for strategy in [ReadinessStrategy::Signal, poll()] {
            let waiter = ReadinessWaiter::new(CapabilitySlot::new())
                .with_strategy(strategy)
                .with_timeout(Duration::from_millis(3000));

            let start = Instant::now();
            let err = waiter.wait_for_ready().await.err().unwrap();
            assert!(matches!(err, Error::ReadinessTimeout { waited } if waited == Duration::from_millis(3000)));
            assert_eq!(start.elapsed(), Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_slot_clones_share_state() {
        let slot = CapabilitySlot::new();
        let other = slot.clone();
        assert!(!other.is_ready());
        slot.install(capability());
        assert!(other.is_ready());
    }
}
