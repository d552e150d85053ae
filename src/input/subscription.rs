//! Runs one `SequenceMatcher` against an `EventSource`
//!
//! Each subscription owns a task that receives keystrokes and sleeps until
//! the matcher's next deadline, whichever comes first. Keystrokes carry the
//! instant they were dispatched, so a keystroke dispatched before a deadline
//! is judged against that deadline even if the task wakes late.

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tracing::debug;

use crate::core::matcher::SequenceMatcher;
use crate::core::types::{CodeCallback, CodeConfig};
use crate::core::validator::ValidationError;
use crate::input::{now, EventSource, Keystroke, ListenerId};

struct Active {
    listener: ListenerId,
    task: JoinHandle<()>,
    config: CodeConfig,
}

/// Observes one secret code until stopped or dropped
pub struct Subscription {
    source: Arc<dyn EventSource>,
    active: Option<Active>,
}

impl Subscription {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            active: None,
        }
    }

    /// Starts observing `config`, replacing any current observation
    ///
    /// Progress starts empty. For the combined variant the overall window
    /// opens now.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an invalid configuration, in which
    /// case the current observation is left untouched.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        &mut self,
        config: CodeConfig,
        callback: CodeCallback,
    ) -> Result<(), ValidationError> {
        let mut matcher = SequenceMatcher::new(&config, callback)?;
        self.stop();

        matcher.start(now());
        let (listener, events) = self.source.attach();
        let task = tokio::spawn(drive(matcher, events));

        self.active = Some(Active {
            listener,
            task,
            config,
        });
        Ok(())
    }

    /// Swaps in a new code or timing configuration
    ///
    /// The previous observation is torn down and progress restarts empty.
    pub fn reconfigure(
        &mut self,
        config: CodeConfig,
        callback: CodeCallback,
    ) -> Result<(), ValidationError> {
        debug!(code = %config.code, "reconfiguring subscription");
        self.start(config, callback)
    }

    /// Stops observing immediately
    ///
    /// Keystrokes not yet processed are dropped and no timer fires
    /// afterwards. Safe to call more than once. On a multi-threaded runtime
    /// a callback already running on another worker may still finish after
    /// this returns; await `close` to know the task is gone.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            self.source.detach(active.listener);
            active.task.abort();
            debug!(code = %active.config.code, "subscription stopped");
        }
    }

    /// Stops observing after the keystrokes already dispatched are processed
    pub async fn close(&mut self) {
        if let Some(active) = self.active.take() {
            self.source.detach(active.listener);
            if let Err(e) = active.task.await {
                tracing::warn!(code = %active.config.code, error = %e, "matcher task failed");
            }
            debug!(code = %active.config.code, "subscription closed");
        }
    }

    pub fn is_observing(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Configuration currently observed
    pub fn config(&self) -> Option<&CodeConfig> {
        self.active.as_ref().map(|active| &active.config)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("config", &self.config())
            .field("observing", &self.is_observing())
            .finish_non_exhaustive()
    }
}

/// Matcher task body
///
/// Pending keystrokes win over a due timer; each keystroke expires the
/// timers due at its own dispatch instant before being matched.
async fn drive(mut matcher: SequenceMatcher, mut events: UnboundedReceiver<Keystroke>) {
    loop {
        let deadline = matcher.next_deadline();
        let wake_at = tokio::time::Instant::from_std(deadline.unwrap_or_else(now));

        tokio::select! {
            biased;

            keystroke = events.recv() => match keystroke {
                Some(Keystroke { event, at }) => {
                    matcher.on_key(&event, at);
                }
                None => break,
            },

            () = sleep_until(wake_at), if deadline.is_some() => {
                matcher.poll_timers(now());
            }
        }
    }

    matcher.stop();
}
