//! Document panel: upload local files and retrieve stored ones by CID.

use std::path::{Path, PathBuf};

use crate::api::{RetrieveResponse, UploadResponse};
use crate::controller::{ActionController, Refusal};
use crate::error::ApiError;

/// Extensions the upload picker accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Uploaded,
    Retrieved,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FileRecord {
    pub name: String,
    pub server_id: Option<String>,
    pub origin: Origin,
}

pub struct FilesPanel {
    records: Vec<FileRecord>,
    pub input: String,
    pub upload: ActionController<UploadResponse>,
    pub retrieve: ActionController<RetrieveResponse>,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_accepted(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ACCEPTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FilesPanel {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            input: String::new(),
            upload: ActionController::new("files.upload"),
            retrieve: ActionController::new("files.retrieve"),
        }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Validate the selection and mark the upload as in flight. Returns the
    /// paths to send and the names to record on success.
    pub fn begin_upload(&mut self, paths: &[PathBuf]) -> Result<(Vec<PathBuf>, Vec<String>), Refusal> {
        if paths.is_empty() {
            return Err(Refusal::EmptyInput);
        }
        if let Some(bad) = paths.iter().find(|p| !is_accepted(p)) {
            return Err(Refusal::Unsupported(display_name(bad)));
        }
        self.upload.begin()?;
        let names = paths.iter().map(|p| display_name(p)).collect();
        Ok((paths.to_vec(), names))
    }

    /// On success every uploaded file is recorded under the returned id.
    pub fn settle_upload(&mut self, names: Vec<String>, outcome: Result<UploadResponse, ApiError>) {
        if let Ok(response) = &outcome {
            for name in names {
                self.records.push(FileRecord {
                    name,
                    server_id: Some(response.upload_id.clone()),
                    origin: Origin::Uploaded,
                });
            }
        }
        self.upload.settle(outcome);
    }

    /// Blank identifiers are refused before any request is made.
    pub fn begin_retrieve(&mut self, cid: &str) -> Result<String, Refusal> {
        let cid = cid.trim();
        if cid.is_empty() {
            return Err(Refusal::EmptyInput);
        }
        self.retrieve.begin()?;
        Ok(cid.to_string())
    }

    pub fn settle_retrieve(&mut self, cid: String, outcome: Result<RetrieveResponse, ApiError>) {
        if let Ok(response) = &outcome {
            self.records.push(FileRecord {
                name: response.name.clone(),
                server_id: Some(cid),
                origin: Origin::Retrieved,
            });
        }
        self.retrieve.settle(outcome);
    }

    pub fn is_busy(&self) -> bool {
        self.upload.is_pending() || self.retrieve.is_pending()
    }
}

impl Default for FilesPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded(id: &str) -> Result<UploadResponse, ApiError> {
        Ok(UploadResponse {
            upload_id: id.to_string(),
        })
    }

    #[test]
    fn test_sequential_uploads_keep_order() {
        let mut files = FilesPanel::new();

        let (_, names) = files.begin_upload(&[PathBuf::from("one.txt")]).unwrap();
        files.settle_upload(names, uploaded("A"));
        let (_, names) = files.begin_upload(&[PathBuf::from("two.pdf")]).unwrap();
        files.settle_upload(names, uploaded("B"));

        let ids: Vec<_> = files
            .records()
            .iter()
            .map(|r| r.server_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(files.records()[0].name, "one.txt");
        assert!(!files.upload.is_pending());
    }

    #[test]
    fn test_failed_upload_records_nothing() {
        let mut files = FilesPanel::new();
        let (_, names) = files.begin_upload(&[PathBuf::from("doc.docx")]).unwrap();
        files.settle_upload(names, Err(ApiError::Status { status: 500, detail: None }));

        assert!(files.records().is_empty());
        assert!(!files.upload.is_pending());
        assert!(files.upload.error().is_some());
    }

    #[test]
    fn test_unsupported_extension_is_refused() {
        let mut files = FilesPanel::new();
        let refused = files.begin_upload(&[PathBuf::from("notes.txt"), PathBuf::from("image.png")]);

        assert_eq!(refused, Err(Refusal::Unsupported("image.png".to_string())));
        assert!(!files.upload.is_pending());
    }

    #[test]
    fn test_extension_check_ignores_case() {
        let mut files = FilesPanel::new();
        assert!(files.begin_upload(&[PathBuf::from("REPORT.PDF")]).is_ok());
    }

    #[test]
    fn test_blank_cid_never_starts_retrieve() {
        let mut files = FilesPanel::new();
        assert_eq!(files.begin_retrieve("   "), Err(Refusal::EmptyInput));
        assert!(!files.retrieve.is_pending());
        assert_eq!(files.retrieve.runs(), 0);
    }

    #[test]
    fn test_retrieve_records_name_and_cid() {
        let mut files = FilesPanel::new();
        let cid = files.begin_retrieve(" bafy123 ").unwrap();
        assert_eq!(cid, "bafy123");
        assert!(files.is_busy());

        files.settle_retrieve(
            cid,
            Ok(RetrieveResponse {
                name: "paper.pdf".to_string(),
            }),
        );

        assert_eq!(
            files.records(),
            &[FileRecord {
                name: "paper.pdf".to_string(),
                server_id: Some("bafy123".to_string()),
                origin: Origin::Retrieved,
            }]
        );
        assert!(!files.is_busy());
    }
}
