use crate::api::AttestationResponse;
use crate::controller::{ActionController, Refusal};
use crate::error::ApiError;

/// Modal that fetches the backend attestation each time it is opened.
pub struct AttestationModal {
    visible: bool,
    pub fetch: ActionController<AttestationResponse>,
    pub scroll: u16,
}

impl AttestationModal {
    pub fn new() -> Self {
        Self {
            visible: false,
            fetch: ActionController::new("attestation.fetch"),
            scroll: 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Update visibility. Returns `true` only on a hidden -> visible edge,
    /// which is when a fetch should fire.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let opened = visible && !self.visible;
        self.visible = visible;
        if opened {
            self.scroll = 0;
        }
        opened
    }

    pub fn output(&self) -> Option<&str> {
        self.fetch.result().map(|r| r.output.as_str())
    }

    pub fn begin(&mut self) -> Result<(), Refusal> {
        self.fetch.begin()
    }

    pub fn settle(&mut self, outcome: Result<AttestationResponse, ApiError>) {
        self.fetch.settle(outcome);
    }
}

impl Default for AttestationModal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_only_on_rising_edge() {
        let mut modal = AttestationModal::new();

        assert!(modal.set_visible(true));
        assert!(!modal.set_visible(true));
        assert!(!modal.set_visible(true));

        assert!(!modal.set_visible(false));
        assert!(!modal.set_visible(false));

        assert!(modal.set_visible(true));
    }

    #[test]
    fn test_output_follows_fetch_result() {
        let mut modal = AttestationModal::new();
        modal.set_visible(true);
        modal.begin().unwrap();
        assert!(modal.output().is_none());

        modal.settle(Ok(AttestationResponse {
            output: "quote: 0xabc".to_string(),
        }));
        assert_eq!(modal.output(), Some("quote: 0xabc"));
        assert!(!modal.fetch.is_pending());
    }

    #[test]
    fn test_failed_refetch_hides_stale_output() {
        let mut modal = AttestationModal::new();
        modal.set_visible(true);
        modal.begin().unwrap();
        modal.settle(Ok(AttestationResponse {
            output: "quote: 0xabc".to_string(),
        }));

        modal.set_visible(false);
        modal.set_visible(true);
        modal.begin().unwrap();
        modal.settle(Err(ApiError::Status { status: 502, detail: None }));

        assert!(modal.output().is_none());
        assert!(modal.fetch.error().is_some());
    }
}
