//! Web search with a local draft that can be forwarded as chat context.

use std::cell::Cell;

use crate::api::SearchResponse;
use crate::controller::{ActionController, Refusal};
use crate::error::ApiError;

pub struct SearchPanel {
    pub query: String,
    search_result: String,
    /// Wrapped lines of the draft scrolled past the top.
    pub draft_scroll: usize,
    draft_scroll_limit: Cell<usize>,
    pub search: ActionController<SearchResponse>,
    pub forward: ActionController<()>,
}

impl SearchPanel {
    pub fn new() -> Self {
        Self {
            query: String::new(),
            search_result: String::new(),
            draft_scroll: 0,
            draft_scroll_limit: Cell::new(usize::MAX),
            search: ActionController::new("search.web"),
            forward: ActionController::new("search.send_to_chat"),
        }
    }

    /// Current draft; empty until a search succeeds.
    pub fn search_result(&self) -> &str {
        &self.search_result
    }

    pub fn begin_search(&mut self) -> Result<String, Refusal> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(Refusal::EmptyInput);
        }
        let query = query.to_string();
        self.search.begin()?;
        Ok(query)
    }

    pub fn settle_search(&mut self, outcome: Result<SearchResponse, ApiError>) {
        if let Ok(response) = &outcome {
            self.search_result = response.result.clone();
            self.draft_scroll = 0;
        }
        self.search.settle(outcome);
    }

    /// Called by the renderer with the number of draft lines that overflow.
    pub fn set_draft_scroll_limit(&self, max_scroll: usize) {
        self.draft_scroll_limit.set(max_scroll);
    }

    pub fn scroll_draft_down(&mut self) {
        if self.draft_scroll < self.draft_scroll_limit.get() {
            self.draft_scroll += 1;
        }
    }

    pub fn scroll_draft_up(&mut self) {
        self.draft_scroll = self.draft_scroll.min(self.draft_scroll_limit.get()).saturating_sub(1);
    }

    pub fn can_send_to_chat(&self) -> bool {
        !self.search_result.is_empty() && !self.forward.is_pending()
    }

    /// Returns the draft to forward. The draft itself is left as is.
    pub fn begin_send_to_chat(&mut self) -> Result<String, Refusal> {
        if self.search_result.is_empty() {
            return Err(Refusal::EmptyInput);
        }
        self.forward.begin()?;
        Ok(self.search_result.clone())
    }

    pub fn settle_send_to_chat(&mut self, outcome: Result<(), ApiError>) {
        self.forward.settle(outcome);
    }
}

impl Default for SearchPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(text: &str) -> Result<SearchResponse, ApiError> {
        Ok(SearchResponse {
            result: text.to_string(),
        })
    }

    #[test]
    fn test_send_disabled_until_search_succeeds() {
        let mut panel = SearchPanel::new();
        assert!(!panel.can_send_to_chat());
        assert_eq!(panel.begin_send_to_chat(), Err(Refusal::EmptyInput));
        assert_eq!(panel.forward.runs(), 0);

        panel.query = "rust async".to_string();
        let query = panel.begin_search().unwrap();
        assert_eq!(query, "rust async");
        panel.settle_search(found("Tokio is an async runtime"));

        assert!(panel.can_send_to_chat());
        assert_eq!(panel.search_result(), "Tokio is an async runtime");
    }

    #[test]
    fn test_send_keeps_draft_and_has_own_pending_flag() {
        let mut panel = SearchPanel::new();
        panel.query = "q".to_string();
        panel.begin_search().unwrap();
        panel.settle_search(found("draft"));

        let context = panel.begin_send_to_chat().unwrap();
        assert_eq!(context, "draft");
        assert!(panel.forward.is_pending());
        assert!(!panel.search.is_pending());
        assert!(!panel.can_send_to_chat());

        panel.settle_send_to_chat(Err(ApiError::Status { status: 404, detail: None }));
        assert!(!panel.forward.is_pending());
        assert_eq!(panel.search_result(), "draft");
        assert!(panel.can_send_to_chat());
    }

    #[test]
    fn test_failed_search_keeps_previous_draft() {
        let mut panel = SearchPanel::new();
        panel.query = "q".to_string();
        panel.begin_search().unwrap();
        panel.settle_search(found("first"));

        panel.begin_search().unwrap();
        panel.settle_search(Err(ApiError::Transport("dns".into())));
        assert_eq!(panel.search_result(), "first");
    }

    #[test]
    fn test_new_draft_resets_scroll() {
        let mut panel = SearchPanel::new();
        panel.query = "q".to_string();
        panel.begin_search().unwrap();
        panel.settle_search(found("long"));
        panel.set_draft_scroll_limit(3);
        for _ in 0..10 {
            panel.scroll_draft_down();
        }
        assert_eq!(panel.draft_scroll, 3);

        panel.begin_search().unwrap();
        panel.settle_search(found("fresh"));
        assert_eq!(panel.draft_scroll, 0);
    }

    #[test]
    fn test_blank_query_is_refused() {
        let mut panel = SearchPanel::new();
        panel.query = "   ".to_string();
        assert_eq!(panel.begin_search(), Err(Refusal::EmptyInput));
        assert!(!panel.search.is_pending());
    }
}
