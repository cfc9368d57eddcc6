use std::cell::Cell;

use chrono::{DateTime, Utc};

use crate::api::QueryResponse;
use crate::controller::{ActionController, Refusal};
use crate::error::ApiError;

pub const GREETING: &str = "Hello! How can I help you today?";
pub const PLACEHOLDER_TEXT: &str = "Thinking...";
pub const FAILURE_TEXT: &str = "Sorry, there was an error processing your request.";

pub type MessageId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Clone, Debug)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Message history plus the send control.
pub struct ChatPanel {
    messages: Vec<Message>,
    next_id: MessageId,
    placeholder: Option<MessageId>,
    pub input: String,
    /// Lines scrolled up from the bottom.
    pub scroll_offset: usize,
    // Largest useful offset, in rendered lines, as of the last draw
    scroll_limit: Cell<usize>,
    pub send: ActionController<QueryResponse>,
}

impl ChatPanel {
    pub fn new() -> Self {
        let mut panel = Self {
            messages: Vec::new(),
            next_id: 0,
            placeholder: None,
            input: String::new(),
            scroll_offset: 0,
            scroll_limit: Cell::new(usize::MAX),
            send: ActionController::new("chat.query"),
        };
        panel.push(Role::Assistant, GREETING);
        panel
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_placeholder(&self, id: MessageId) -> bool {
        self.placeholder == Some(id)
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        id
    }

    /// Remove the message with this id. Returns whether it was present.
    pub fn remove(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.placeholder = None;
        self.scroll_offset = 0;
    }

    /// Start a send: append the user message and the placeholder. Returns the
    /// question and the placeholder id the outcome must be matched against.
    pub fn begin_send(&mut self, text: &str) -> Result<(String, MessageId), Refusal> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Refusal::EmptyInput);
        }
        self.send.begin()?;
        self.push(Role::User, text);
        let placeholder = self.push(Role::Assistant, PLACEHOLDER_TEXT);
        self.placeholder = Some(placeholder);
        self.scroll_offset = 0;
        Ok((text.to_string(), placeholder))
    }

    /// Swap the placeholder for the answer or for a failure message.
    pub fn settle_send(&mut self, placeholder: MessageId, outcome: Result<QueryResponse, ApiError>) {
        self.remove(placeholder);
        if self.placeholder == Some(placeholder) {
            self.placeholder = None;
        }

        match &outcome {
            Ok(answer) => {
                self.push(Role::Assistant, answer.response.clone());
            }
            Err(e) => {
                self.push(Role::Assistant, format!("{} ({})", FAILURE_TEXT, e));
            }
        }
        self.send.settle(outcome);
        self.scroll_offset = 0;
    }

    /// Called by the renderer once it knows how many wrapped lines overflow.
    pub fn set_scroll_limit(&self, max_scroll: usize) {
        self.scroll_limit.set(max_scroll);
    }

    pub fn scroll_up(&mut self) {
        if self.scroll_offset < self.scroll_limit.get() {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.scroll_limit.get()).saturating_sub(1);
    }
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> Result<QueryResponse, ApiError> {
        Ok(QueryResponse {
            response: text.to_string(),
        })
    }

    fn count_placeholders(chat: &ChatPanel) -> usize {
        chat.messages()
            .iter()
            .filter(|m| m.content == PLACEHOLDER_TEXT && m.role == Role::Assistant)
            .count()
    }

    #[test]
    fn test_starts_with_greeting() {
        let chat = ChatPanel::new();
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].content, GREETING);
    }

    #[test]
    fn test_begin_send_is_optimistic() {
        let mut chat = ChatPanel::new();
        let (question, placeholder) = chat.begin_send("  what is rust?  ").unwrap();

        assert_eq!(question, "what is rust?");
        assert!(chat.send.is_pending());
        let tail: Vec<_> = chat.messages().iter().rev().take(2).collect();
        assert_eq!(tail[0].id, placeholder);
        assert_eq!(tail[0].content, PLACEHOLDER_TEXT);
        assert_eq!(tail[1].role, Role::User);
        assert_eq!(tail[1].content, "what is rust?");
    }

    #[test]
    fn test_success_replaces_placeholder() {
        let mut chat = ChatPanel::new();
        let (_, placeholder) = chat.begin_send("hi").unwrap();
        chat.settle_send(placeholder, answer("R"));

        assert!(!chat.send.is_pending());
        assert_eq!(count_placeholders(&chat), 0);
        let last = chat.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "R");
        assert_eq!(chat.messages().iter().filter(|m| m.content == "R").count(), 1);
    }

    #[test]
    fn test_failure_appends_single_failure_message() {
        let mut chat = ChatPanel::new();
        let (_, placeholder) = chat.begin_send("hi").unwrap();
        chat.settle_send(placeholder, Err(ApiError::Transport("connection refused".into())));

        assert!(!chat.send.is_pending());
        assert_eq!(count_placeholders(&chat), 0);
        let failures: Vec<_> = chat
            .messages()
            .iter()
            .filter(|m| m.content.starts_with(FAILURE_TEXT))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].content.contains("connection refused"));
        assert!(chat.send.error().is_some());
    }

    #[test]
    fn test_placeholder_removed_by_identity_not_text() {
        let mut chat = ChatPanel::new();
        // A user message that happens to match the placeholder text.
        let (_, first) = chat.begin_send(PLACEHOLDER_TEXT).unwrap();
        chat.settle_send(first, answer("ok"));

        let (_, second) = chat.begin_send("again").unwrap();
        chat.settle_send(second, answer("ok again"));

        let user_copies = chat
            .messages()
            .iter()
            .filter(|m| m.role == Role::User && m.content == PLACEHOLDER_TEXT)
            .count();
        assert_eq!(user_copies, 1);
        assert_eq!(count_placeholders(&chat), 0);
    }

    #[test]
    fn test_second_send_while_pending_is_refused() {
        let mut chat = ChatPanel::new();
        chat.begin_send("one").unwrap();
        let len = chat.messages().len();

        assert_eq!(chat.begin_send("two"), Err(Refusal::Busy));
        assert_eq!(chat.messages().len(), len);
    }

    #[test]
    fn test_scroll_bounded_by_rendered_lines() {
        let mut chat = ChatPanel::new();
        chat.set_scroll_limit(5);
        for _ in 0..20 {
            chat.scroll_up();
        }
        assert_eq!(chat.scroll_offset, 5);

        // Window grew: the first step down is visible immediately.
        chat.set_scroll_limit(2);
        chat.scroll_down();
        assert_eq!(chat.scroll_offset, 1);
    }

    #[test]
    fn test_blank_input_is_refused() {
        let mut chat = ChatPanel::new();
        assert_eq!(chat.begin_send("   "), Err(Refusal::EmptyInput));
        assert!(!chat.send.is_pending());
    }
}
