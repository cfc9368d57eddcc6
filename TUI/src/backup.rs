use chrono::{DateTime, Utc};

use crate::api::UploadResponse;
use crate::controller::{ActionController, Refusal};
use crate::error::ApiError;

#[derive(Clone, Debug)]
pub struct BackupRecord {
    pub upload_id: String,
    pub created_at: DateTime<Utc>,
}

/// Database backup button and the ids it has produced.
pub struct BackupPanel {
    backups: Vec<BackupRecord>,
    pub action: ActionController<UploadResponse>,
}

impl BackupPanel {
    pub fn new() -> Self {
        Self {
            backups: Vec::new(),
            action: ActionController::new("db.backup"),
        }
    }

    pub fn backups(&self) -> &[BackupRecord] {
        &self.backups
    }

    pub fn latest(&self) -> Option<&BackupRecord> {
        self.backups.last()
    }

    pub fn begin(&mut self) -> Result<(), Refusal> {
        self.action.begin()
    }

    pub fn settle(&mut self, outcome: Result<UploadResponse, ApiError>) {
        if let Ok(response) = &outcome {
            self.backups.push(BackupRecord {
                upload_id: response.upload_id.clone(),
                created_at: Utc::now(),
            });
        }
        self.action.settle(outcome);
    }
}

impl Default for BackupPanel {
    fn default() -> Self {
        Self::new()
    }
}
