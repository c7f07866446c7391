//! Chat session
//!
//! Owns the conversation log and the cooldown gate, and drives the send path:
//! gate check, user message with `sending` status, facade call, then status
//! patch and reply. The two halves of the send path are split
//! ([`ChatSession::begin_send`] / [`ChatSession::complete_send`]) so a UI loop
//! can run the facade call on a spawned task.

use crate::client::{LekhaApi, Reply, ReplyOutcome};
use crate::resilience::{CooldownGate, RetryObserver};
use crate::storage::{History, Message, MessageStatus};
use tokio::time::Instant;
use tracing::{debug, info};

/// Appended instead of calling the gateway while the cooldown is active
pub const RATE_LIMIT_NOTICE: &str = "Тише, Лёха. Не спамь — дай 2 сек перед новым запросом.";

/// Appended after the user's message when the chat call fell back
pub const APOLOGY: &str = "Лёха, сегодня я молчу. Но ты всё равно не прав.";

/// What happened to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDecision {
    /// Blank input, or a send is already in flight
    Ignored,
    /// Cooldown active; the rate-limit notice was appended
    Suppressed,
    /// The user message was appended and the call should go out
    Dispatched {
        /// Id of the appended user message
        user_id: String,
        /// Text to send
        text: String,
    },
}

/// Conversation state for the chat tab
#[derive(Debug, Default)]
pub struct ChatSession {
    history: History,
    cooldown: CooldownGate,
    loading: bool,
}

impl ChatSession {
    /// Empty session with the default cooldown window
    pub fn new() -> Self {
        Self::default()
    }

    /// Session resuming a stored conversation
    pub fn with_history(history: History) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    /// Replace the cooldown gate
    pub fn with_cooldown(mut self, cooldown: CooldownGate) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Conversation log
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether a send is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// First half of a send.
    ///
    /// A dispatched submission leaves the session loading until
    /// [`ChatSession::complete_send`] is called with the same `user_id`.
    pub fn begin_send(&mut self, input: &str, now: Instant) -> SendDecision {
        if input.trim().is_empty() || self.loading {
            return SendDecision::Ignored;
        }

        if !self.cooldown.try_acquire_at(now) {
            info!("Chat submission suppressed by cooldown");
            self.history
                .push(Message::reply(RATE_LIMIT_NOTICE, MessageStatus::Sent));
            return SendDecision::Suppressed;
        }

        let message = Message::outgoing(input);
        let user_id = message.id.clone();
        self.history.push(message);
        self.loading = true;
        debug!("Dispatching chat message {}", user_id);

        SendDecision::Dispatched {
            user_id,
            text: input.to_string(),
        }
    }

    /// Second half of a send: record how the call ended
    pub fn complete_send(&mut self, user_id: &str, reply: Reply<String>) {
        self.loading = false;
        match reply.outcome {
            ReplyOutcome::Answered => {
                self.history.patch_status(user_id, MessageStatus::Sent);
                self.history
                    .push(Message::reply(reply.value, MessageStatus::Sent));
            }
            ReplyOutcome::FellBack => {
                self.history.patch_status(user_id, MessageStatus::Failed);
                self.history.push(Message::reply(APOLOGY, MessageStatus::Failed));
            }
        }
    }

    /// Full send path against `api`
    pub async fn send(
        &mut self,
        api: &dyn LekhaApi,
        input: &str,
        observer: Option<RetryObserver<'_>>,
    ) -> SendDecision {
        let decision = self.begin_send(input, Instant::now());
        if let SendDecision::Dispatched { user_id, text } = &decision {
            let reply = api.chat(text, observer).await;
            self.complete_send(user_id, reply);
        }
        decision
    }

    /// Drop the whole conversation
    pub fn clear(&mut self) {
        self.history.clear();
    }
}
