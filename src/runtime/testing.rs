//! Mock implementations for testing
//!
//! These mocks enable testing the gate and synchronizer without real I/O.

use super::traits::ConversationService;
use crate::llm::{LlmError, Turn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Conversation Service
// ============================================================================

/// Mock service that answers appends from a queue
///
/// A successful append records the user turn and the reply, like a real
/// chat session; a failed append leaves the history untouched.
pub struct MockConversationService {
    history: Mutex<Vec<Turn>>,
    replies: Mutex<VecDeque<Result<Turn, LlmError>>>,
    list_errors: Mutex<VecDeque<LlmError>>,
    append_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockConversationService {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            list_errors: Mutex::new(VecDeque::new()),
            append_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_history(self, turns: Vec<Turn>) -> Self {
        *self.history.lock().unwrap() = turns;
        self
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, turn: Turn) {
        self.replies.lock().unwrap().push_back(Ok(turn));
    }

    /// Queue a failed append
    pub fn queue_append_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Make the next history fetch fail
    pub fn queue_list_error(&self, error: LlmError) {
        self.list_errors.lock().unwrap().push_back(error);
    }

    pub fn push_history(&self, turn: Turn) {
        self.history.lock().unwrap().push(turn);
    }

    pub fn history(&self) -> Vec<Turn> {
        self.history.lock().unwrap().clone()
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn record_append(&self) {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn finish_append(&self, text: &str) -> Result<Turn, LlmError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock reply queued")))?;
        let mut history = self.history.lock().unwrap();
        history.push(Turn::user(text));
        history.push(reply.clone());
        Ok(reply)
    }

    fn snapshot_for_list(&self) -> Result<Vec<Turn>, LlmError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.list_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.history())
    }
}

impl Default for MockConversationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationService for MockConversationService {
    async fn append_turn(&self, text: &str) -> Result<Turn, LlmError> {
        self.record_append();
        self.finish_append(text)
    }

    async fn list_turns(&self) -> Result<Vec<Turn>, LlmError> {
        self.snapshot_for_list()
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Held Mock Service (for in-flight testing)
// ============================================================================

/// Mock service whose appends wait for an explicit release
///
/// History fetches return immediately unless `hold_next_list` was called;
/// a held fetch snapshots the history first, then waits.
pub struct HeldMockService {
    inner: MockConversationService,
    append_started: Arc<Notify>,
    append_release: Arc<Notify>,
    list_started: Arc<Notify>,
    list_release: Arc<Notify>,
    held_lists: AtomicUsize,
}

#[allow(dead_code)]
impl HeldMockService {
    pub fn new() -> Self {
        Self {
            inner: MockConversationService::new(),
            append_started: Arc::new(Notify::new()),
            append_release: Arc::new(Notify::new()),
            list_started: Arc::new(Notify::new()),
            list_release: Arc::new(Notify::new()),
            held_lists: AtomicUsize::new(0),
        }
    }

    pub fn queue_reply(&self, turn: Turn) {
        self.inner.queue_reply(turn);
    }

    pub fn push_history(&self, turn: Turn) {
        self.inner.push_history(turn);
    }

    pub fn history(&self) -> Vec<Turn> {
        self.inner.history()
    }

    pub fn append_calls(&self) -> usize {
        self.inner.append_calls()
    }

    pub fn hold_next_list(&self) {
        self.held_lists.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn wait_append_started(&self) {
        self.append_started.notified().await;
    }

    pub fn release_append(&self) {
        self.append_release.notify_one();
    }

    pub async fn wait_list_started(&self) {
        self.list_started.notified().await;
    }

    pub fn release_list(&self) {
        self.list_release.notify_one();
    }
}

impl Default for HeldMockService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationService for HeldMockService {
    async fn append_turn(&self, text: &str) -> Result<Turn, LlmError> {
        self.inner.record_append();
        self.append_started.notify_one();
        self.append_release.notified().await;
        self.inner.finish_append(text)
    }

    async fn list_turns(&self) -> Result<Vec<Turn>, LlmError> {
        let snapshot = self.inner.snapshot_for_list();
        let held = self
            .held_lists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if held {
            self.list_started.notify_one();
            self.list_release.notified().await;
        }
        snapshot
    }

    fn model_id(&self) -> &str {
        "held-mock-model"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_service_records_successful_turns_only() {
        let mock = MockConversationService::new();
        mock.queue_reply(Turn::model("hi"));
        mock.queue_append_error(LlmError::network("down"));

        assert_eq!(mock.append_turn("hello").await.unwrap(), Turn::model("hi"));
        assert!(mock.append_turn("again").await.is_err());
        // Nothing queued: fails rather than hanging
        assert!(mock.append_turn("third").await.is_err());

        assert_eq!(mock.append_calls(), 3);
        assert_eq!(
            mock.list_turns().await.unwrap(),
            vec![Turn::user("hello"), Turn::model("hi")]
        );
    }

    #[tokio::test]
    async fn test_mock_list_error_is_one_shot() {
        let mock = MockConversationService::new();
        mock.queue_list_error(LlmError::network("down"));
        assert!(mock.list_turns().await.is_err());
        assert!(mock.list_turns().await.is_ok());
        assert_eq!(mock.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_held_service_waits_for_release() {
        let mock = Arc::new(HeldMockService::new());
        mock.queue_reply(Turn::model("late"));

        let task = tokio::spawn({
            let mock = mock.clone();
            async move { mock.append_turn("x").await }
        });
        mock.wait_append_started().await;
        assert!(!task.is_finished());
        assert!(mock.history().is_empty());

        mock.release_append();
        assert_eq!(task.await.unwrap().unwrap(), Turn::model("late"));
        assert_eq!(mock.history().len(), 2);
    }
}
