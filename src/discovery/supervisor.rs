//! Supervising retry loop for the discovery feed.
//!
//! Each pass of the feed runs in its own task. Whatever ends it (an error,
//! a closed event stream, a panic) is logged, the loop waits a fixed
//! interval and starts a fresh pass from `Connecting`. Only the shutdown
//! signal stops the loop.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::discovery::feed::{DiscoveryFeed, FeedState};
use crate::discovery::orchestrator::DiscoveryError;
use crate::observability::metrics;

/// Restarts the discovery feed forever, with a fixed delay between passes.
pub struct Supervisor {
    feed: DiscoveryFeed,
    retry_interval: Duration,
}

impl Supervisor {
    pub fn new(feed: DiscoveryFeed, retry_interval: Duration) -> Self {
        Self {
            feed,
            retry_interval,
        }
    }

    /// Spawn the loop onto the runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(retry_interval = ?self.retry_interval, "Discovery supervisor starting");

        loop {
            let feed = self.feed.clone();
            let mut pass = tokio::spawn(async move { feed.run().await });

            let outcome = tokio::select! {
                joined = &mut pass => joined,
                _ = shutdown.recv() => {
                    pass.abort();
                    tracing::info!("Discovery supervisor received shutdown signal, exiting loop");
                    break;
                }
            };

            let error = match outcome {
                Ok(Err(e)) => e,
                Ok(Ok(never)) => match never {},
                Err(join_error) => DiscoveryError::Aborted(join_error.to_string()),
            };

            self.feed.set_state(FeedState::Disconnected);
            metrics::record_discovery_restart();
            tracing::warn!(
                error = %error,
                retry_in = ?self.retry_interval,
                "Discovery feed stopped, restarting"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.retry_interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Discovery supervisor received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        self.feed.set_state(FeedState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;
    use crate::discovery::testing::FakeOrchestrator;
    use crate::lifecycle::Shutdown;
    use crate::registry::BackendRegistry;
    use std::sync::Arc;

    const INTERVAL: Duration = Duration::from_secs(2);

    fn supervised(fake: &FakeOrchestrator) -> (DiscoveryFeed, Supervisor, Arc<BackendRegistry>) {
        let registry = Arc::new(BackendRegistry::empty());
        let feed = DiscoveryFeed::new(
            Arc::new(fake.clone()),
            registry.clone(),
            &DiscoveryConfig::default(),
        );
        let supervisor = Supervisor::new(feed.clone(), INTERVAL);
        (feed, supervisor, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_failure_recovers_within_two_intervals() {
        let fake = FakeOrchestrator::new();
        fake.add_instance("a", "crserver:v1", Some("10.0.0.1"), &[80]);
        fake.fail_next_subscribes(1);
        let (feed, supervisor, registry) = supervised(&fake);

        let shutdown = Shutdown::new();
        let mut state = feed.subscribe_state();
        let handle = supervisor.spawn(shutdown.subscribe());

        tokio::time::timeout(INTERVAL * 2, state.wait_for(|s| *s == FeedState::Listening))
            .await
            .expect("feed did not reach Listening")
            .unwrap();

        assert_eq!(fake.connects(), 2);
        assert_eq!(fake.subscriptions(), 1);
        assert_eq!(registry.get("v1").unwrap().host(), "10.0.0.1");
        assert!(!handle.is_finished());

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_retrying_unreachable_orchestrator() {
        let fake = FakeOrchestrator::new();
        fake.fail_next_connects(5);
        let (feed, supervisor, _registry) = supervised(&fake);

        let shutdown = Shutdown::new();
        let mut state = feed.subscribe_state();
        let handle = supervisor.spawn(shutdown.subscribe());

        tokio::time::timeout(INTERVAL * 7, state.wait_for(|s| *s == FeedState::Listening))
            .await
            .expect("feed did not reach Listening")
            .unwrap();
        assert_eq!(fake.connects(), 6);
        assert!(!handle.is_finished());

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_stream_triggers_full_resync() {
        let fake = FakeOrchestrator::new();
        fake.add_instance("a", "crserver:v1", Some("10.0.0.1"), &[80]);
        let (feed, supervisor, registry) = supervised(&fake);

        let shutdown = Shutdown::new();
        let mut state = feed.subscribe_state();
        let handle = supervisor.spawn(shutdown.subscribe());
        state.wait_for(|s| *s == FeedState::Listening).await.unwrap();

        // Changes made while the stream is down are picked up on reconnect.
        fake.break_streams();
        state.wait_for(|s| *s == FeedState::Disconnected).await.unwrap();
        fake.add_instance("b", "crserver:v2", Some("10.0.0.2"), &[80]);

        state.wait_for(|s| *s == FeedState::Listening).await.unwrap();
        assert_eq!(fake.connects(), 2);
        assert_eq!(registry.get("v2").unwrap().host(), "10.0.0.2");

        shutdown.trigger();
        handle.await.unwrap();
        assert_eq!(feed.state(), FeedState::Disconnected);
    }
}
