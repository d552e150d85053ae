//! Many codes, one keystroke stream
//!
//! `CodeDetector` owns one `Subscription` per configured code, all attached
//! to the same `InputBus`. When any code completes, the shared match handler
//! is called with that code's configuration.

use std::sync::Arc;
use tracing::{debug, info};

use crate::core::types::{CodeConfig, KeyEvent};
use crate::core::validator::{validate_config, ValidationError};
use crate::input::{InputBus, Subscription};

/// Called with the configuration of every completed code
pub type MatchHandler = Arc<dyn Fn(&CodeConfig) + Send + Sync>;

/// Watches a set of secret codes on a shared input bus
pub struct CodeDetector {
    bus: Arc<InputBus>,
    on_match: MatchHandler,
    subscriptions: Vec<Subscription>,
}

impl CodeDetector {
    pub fn new(on_match: MatchHandler) -> Self {
        Self::with_bus(Arc::new(InputBus::new()), on_match)
    }

    /// Detector observing an existing bus
    pub fn with_bus(bus: Arc<InputBus>, on_match: MatchHandler) -> Self {
        Self {
            bus,
            on_match,
            subscriptions: Vec::new(),
        }
    }

    /// Replaces the watched codes
    ///
    /// Every configuration is validated before anything changes, so a
    /// rejected set leaves the current codes running. Returns the number of
    /// codes now watched.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn load<I>(&mut self, configs: I) -> Result<usize, ValidationError>
    where
        I: IntoIterator<Item = CodeConfig>,
    {
        let configs: Vec<CodeConfig> = configs.into_iter().collect();
        for config in &configs {
            validate_config(config)?;
        }

        self.stop();

        for config in configs {
            let handler = self.on_match.clone();
            let matched = config.clone();
            let mut subscription = Subscription::new(self.bus.clone());
            subscription.start(config, Arc::new(move || handler(&matched)))?;
            self.subscriptions.push(subscription);
        }

        info!(codes = self.subscriptions.len(), "codes loaded");
        Ok(self.subscriptions.len())
    }

    /// Feeds one keystroke to every watched code
    pub fn dispatch(&self, event: KeyEvent) -> usize {
        self.bus.dispatch(event)
    }

    pub fn bus(&self) -> &Arc<InputBus> {
        &self.bus
    }

    /// Configurations currently watched, in load order
    pub fn codes(&self) -> Vec<&CodeConfig> {
        self.subscriptions
            .iter()
            .filter_map(Subscription::config)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Stops every code immediately
    pub fn stop(&mut self) {
        if !self.subscriptions.is_empty() {
            debug!(codes = self.subscriptions.len(), "stopping codes");
        }
        self.subscriptions.clear();
    }

    /// Stops every code once the keystrokes already dispatched are processed
    pub async fn close(&mut self) {
        for subscription in &mut self.subscriptions {
            subscription.close().await;
        }
        self.subscriptions.clear();
    }
}

impl std::fmt::Debug for CodeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeDetector")
            .field("codes", &self.codes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_detector() -> (CodeDetector, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let detector = CodeDetector::new(Arc::new(move |config: &CodeConfig| {
            log.lock().unwrap().push(config.code.clone());
        }));
        (detector, seen)
    }

    async fn type_str(detector: &CodeDetector, text: &str) {
        for c in text.chars() {
            detector.dispatch(KeyEvent::from_char(c));
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_which_code_matched() {
        let (mut detector, seen) = recording_detector();
        let loaded = detector
            .load(vec![CodeConfig::new("iddqd"), CodeConfig::new("idkfa")])
            .unwrap();
        assert_eq!(loaded, 2);

        type_str(&detector, "xxidkfa").await;
        assert_eq!(*seen.lock().unwrap(), vec!["idkfa".to_string()]);

        type_str(&detector, "IDDQD").await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["idkfa".to_string(), "iddqd".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_replaces_codes() {
        let (mut detector, seen) = recording_detector();
        detector.load(vec![CodeConfig::new("old")]).unwrap();
        type_str(&detector, "ol").await;

        detector.load(vec![CodeConfig::new("new")]).unwrap();
        assert_eq!(detector.bus().listener_count(), 1);
        assert_eq!(detector.codes(), vec![&CodeConfig::new("new")]);

        type_str(&detector, "d").await;
        type_str(&detector, "new").await;
        assert_eq!(*seen.lock().unwrap(), vec!["new".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_set_keeps_running_codes() {
        let (mut detector, seen) = recording_detector();
        detector.load(vec![CodeConfig::new("keep")]).unwrap();

        let result = detector.load(vec![
            CodeConfig::new("fine"),
            CodeConfig::new("bad").with_timeout_per_character(0),
        ]);
        assert!(matches!(result, Err(ValidationError::ZeroTimeout(_))));
        assert_eq!(detector.len(), 1);

        type_str(&detector, "keep").await;
        assert_eq!(*seen.lock().unwrap(), vec!["keep".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_close() {
        let (mut detector, seen) = recording_detector();
        detector.load(vec![CodeConfig::new("ab")]).unwrap();

        detector.dispatch(KeyEvent::from_char('a'));
        detector.dispatch(KeyEvent::from_char('b'));
        detector.close().await;
        assert_eq!(seen.lock().unwrap().len(), 1, "Close processes pending input");
        assert!(detector.is_empty());

        detector.load(vec![CodeConfig::new("ab")]).unwrap();
        detector.stop();
        assert_eq!(detector.bus().listener_count(), 0);
        type_str(&detector, "ab").await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
