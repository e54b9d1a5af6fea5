//! # Feed Dispatcher
//!
//! Decides what happens to each channel message: messages from anyone but the listen identity are
//! ignored, everything else is parsed and handed to the `on_change` or `on_error` callback.
//! Callbacks are supplied explicitly through [`FeedCallbacks`]; the defaults write to the console.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::application::parsing::{ParseError, ParseFailure, parse_change};
use crate::domain::traits::EventSink;
use crate::domain::types::ChangeRecord;
use crate::strings::logs;

pub type ChangeCallback = Arc<dyn Fn(ChangeRecord) -> BoxFuture<'static, ()> + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(ParseError) + Send + Sync>;
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The callback slots of the feed listener.
#[derive(Clone)]
pub struct FeedCallbacks {
    on_change: ChangeCallback,
    on_error: ErrorCallback,
    on_log: LogCallback,
}

impl Default for FeedCallbacks {
    fn default() -> Self {
        Self {
            on_change: Arc::new(|record: ChangeRecord| {
                print_change(&record);
                async {}.boxed()
            }),
            on_error: Arc::new(|error: ParseError| print_error(&error)),
            on_log: Arc::new(|message: &str| tracing::info!("{}", message)),
        }
    }
}

impl FeedCallbacks {
    /// Console writers in every slot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(ChangeRecord) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_change = Arc::new(move |record: ChangeRecord| callback(record).boxed());
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(ParseError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(callback);
        self
    }

    pub fn on_log<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_log = Arc::new(callback);
        self
    }

    /// Sends feed diagnostics to `tracing` at debug level. Only a line that matched but failed to
    /// coerce is still reported as a warning.
    pub fn quiet(self) -> Self {
        self.on_error(|error: ParseError| match error.failure() {
            ParseFailure::Mismatch => tracing::debug!("{}", logs::parse_error(&error)),
            ParseFailure::Coercion { .. } => tracing::warn!("{}", logs::parse_error(&error)),
        })
        .on_log(|message: &str| tracing::debug!("{}", message))
    }

    /// Routes every change record to `sink`. Rejected submissions are logged and dropped.
    pub fn forwarding(self, sink: Arc<dyn EventSink>) -> Self {
        self.on_change(move |record: ChangeRecord| {
            let sink = sink.clone();
            async move {
                match sink.submit(&record).await {
                    Ok(_) => tracing::debug!("{}", logs::event_sent(record.kind(), record.user())),
                    Err(e) => tracing::error!("{}", logs::send_event_fail(&e)),
                }
            }
        })
    }
}

/// Default `on_change`: pretty-print the record.
pub fn print_change(record: &ChangeRecord) {
    match serde_json::to_string_pretty(record) {
        Ok(json) => println!("Change\n{}\n", json),
        Err(_) => println!("Change\n{:#?}\n", record),
    }
}

/// Default `on_error`.
pub fn print_error(error: &ParseError) {
    tracing::warn!("{}", logs::parse_error(error));
}

/// Outcome of a single channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Change,
    Error,
    Ignored,
}

pub struct FeedDispatcher {
    listen_nick: String,
    callbacks: FeedCallbacks,
}

impl FeedDispatcher {
    pub fn new(listen_nick: impl Into<String>, callbacks: FeedCallbacks) -> Self {
        Self {
            listen_nick: listen_nick.into(),
            callbacks,
        }
    }

    /// Handles one channel message. `on_change` is awaited before returning so records leave in
    /// arrival order.
    pub async fn handle_message(&self, sender: &str, message: &str) -> Dispatch {
        if sender != self.listen_nick {
            self.log(&logs::ignore_message(message, sender));
            return Dispatch::Ignored;
        }

        match parse_change(message) {
            Ok(record) => {
                (self.callbacks.on_change)(record).await;
                Dispatch::Change
            }
            Err(error) => {
                (self.callbacks.on_error)(error);
                Dispatch::Error
            }
        }
    }

    pub fn log(&self, message: &str) {
        (self.callbacks.on_log)(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<ChangeRecord>>,
        errors: Mutex<Vec<ParseError>>,
        logs: Mutex<Vec<String>>,
    }

    fn recording_dispatcher(listen: &str) -> (FeedDispatcher, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let (on_change, on_error, on_log) = (recorder.clone(), recorder.clone(), recorder.clone());
        let callbacks = FeedCallbacks::new()
            .on_change(move |record| {
                let recorder = on_change.clone();
                async move { recorder.changes.lock().unwrap().push(record) }
            })
            .on_error(move |error| on_error.errors.lock().unwrap().push(error))
            .on_log(move |message| on_log.logs.lock().unwrap().push(message.to_string()));
        (FeedDispatcher::new(listen, callbacks), recorder)
    }

    #[tokio::test]
    async fn test_change_from_listen_identity() {
        let (dispatcher, recorder) = recording_dispatcher("rc-pmtpa");

        let outcome = dispatcher
            .handle_message("rc-pmtpa", "[[Example]] M B http://x/diff * Alice * (+57) fix typo")
            .await;

        assert_eq!(outcome, Dispatch::Change);
        let changes = recorder.changes.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), "edit");
        assert!(recorder.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_goes_to_error_channel() {
        let (dispatcher, recorder) = recording_dispatcher("rc-pmtpa");

        let outcome = dispatcher.handle_message("rc-pmtpa", "random unrelated text").await;

        assert_eq!(outcome, Dispatch::Error);
        let errors = recorder.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason(), "Error parsing");
        assert!(errors[0].cause().is_none());
        assert_eq!(errors[0].raw(), "random unrelated text");
        assert!(recorder.changes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_senders_are_ignored() {
        let (dispatcher, recorder) = recording_dispatcher("rc-pmtpa");

        let outcome = dispatcher
            .handle_message("mallory", "[[Example]] M http://x * Alice * (+1) x")
            .await;

        assert_eq!(outcome, Dispatch::Ignored);
        assert!(recorder.changes.lock().unwrap().is_empty());
        assert!(recorder.errors.lock().unwrap().is_empty());
        let logs = recorder.logs.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].starts_with("ignore message "));
        assert!(logs[0].ends_with(" from mallory"));
    }

    #[tokio::test]
    async fn test_stream_keeps_going_after_failures() {
        let (dispatcher, recorder) = recording_dispatcher("rc");
        let lines = [
            "junk",
            "[[A]] M http://x * U * (+1) a",
            "[[B]] M http://x * U * (+99999999999999999999) b",
            "[[C]] New user creation  * Bob *  created account",
        ];

        let mut outcomes = Vec::new();
        for line in lines {
            outcomes.push(dispatcher.handle_message("rc", line).await);
        }

        assert_eq!(
            outcomes,
            [Dispatch::Error, Dispatch::Change, Dispatch::Error, Dispatch::Change]
        );
        let kinds: Vec<_> = recorder
            .changes
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.kind())
            .collect();
        assert_eq!(kinds, ["edit", "action"]);
        assert!(recorder.errors.lock().unwrap()[1].cause().is_some());
    }

    #[tokio::test]
    async fn test_quiet_callbacks_keep_dispatching() {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let recorded = changes.clone();
        let callbacks = FeedCallbacks::new().quiet().on_change(move |record| {
            let recorded = recorded.clone();
            async move { recorded.lock().unwrap().push(record) }
        });
        let dispatcher = FeedDispatcher::new("rc", callbacks);

        let outcomes = [
            dispatcher.handle_message("someone", "hi").await,
            dispatcher.handle_message("rc", "junk").await,
            dispatcher.handle_message("rc", "[[B]] M http://x * U * (+99999999999999999999) b").await,
            dispatcher.handle_message("rc", "[[A]] M http://x * U * (+1) a").await,
        ];

        assert_eq!(
            outcomes,
            [Dispatch::Ignored, Dispatch::Error, Dispatch::Error, Dispatch::Change]
        );
        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    struct MockSink {
        accept: bool,
        submitted: tokio::sync::Mutex<Vec<ChangeRecord>>,
    }

    #[async_trait]
    impl EventSink for MockSink {
        async fn submit(&self, record: &ChangeRecord) -> Result<String, String> {
            self.submitted.lock().await.push(record.clone());
            if self.accept {
                Ok("{}".to_string())
            } else {
                Err("503 Service Unavailable".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_forwarding_submits_records() {
        for accept in [true, false] {
            let sink = Arc::new(MockSink {
                accept,
                submitted: tokio::sync::Mutex::new(Vec::new()),
            });
            let dispatcher =
                FeedDispatcher::new("rc", FeedCallbacks::new().forwarding(sink.clone()));

            let first = dispatcher.handle_message("rc", "[[A]] M http://x * U * (+1) a").await;
            let second = dispatcher.handle_message("rc", "[[B]] N http://y * V * (-2) b").await;

            assert_eq!(first, Dispatch::Change);
            assert_eq!(second, Dispatch::Change);
            let submitted = sink.submitted.lock().await;
            assert_eq!(submitted.len(), 2, "accept = {accept}");
            assert_eq!(submitted[1].user(), "V");
        }
    }
}
