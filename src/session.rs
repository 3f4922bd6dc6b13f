//! Session state and the controller operations that mutate it.
//!
//! One active intake session per process. The presentation layer reads this
//! state and never writes it; all mutation goes through the operations below.

use thiserror::Error;

use crate::extract;
use crate::model::{Annotation, ContactRecord, InterestLevel, Status, SubmissionRecord};
use crate::sheets::{self, SheetsService, SubmitError};

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("No valid information found in QR code")]
    DecodeEmpty,
    #[error("Please enter at least a name")]
    MissingName,
}

/// Operator-typed contact fields; maps 1:1 onto [`ContactRecord`].
#[derive(Debug, Clone, Default)]
pub struct ManualEntry {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    scanning_active: bool,
    current_record: Option<ContactRecord>,
    annotation: Annotation,
    status: Status,
    last_submission: Option<SubmissionRecord>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            scanning_active: false,
            current_record: None,
            annotation: Annotation::default(),
            status: Status::info("Ready to scan"),
            last_submission: None,
        }
    }

    pub fn scanning_active(&self) -> bool {
        self.scanning_active
    }

    pub fn current_record(&self) -> Option<&ContactRecord> {
        self.current_record.as_ref()
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Most recent successful submission; survives [`Self::reset`].
    pub fn last_submission(&self) -> Option<&SubmissionRecord> {
        self.last_submission.as_ref()
    }

    pub(crate) fn set_scanning(&mut self, active: bool) {
        self.scanning_active = active;
    }

    pub fn set_info(&mut self, message: impl Into<String>) {
        self.status = Status::info(message);
    }

    pub fn set_success(&mut self, message: impl Into<String>) {
        self.status = Status::success(message);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = Status::error(message);
    }

    /// Run the field extractor over decoded text and adopt the result. An
    /// extraction yielding nothing at all is an error, not a sparse record.
    pub fn apply_decoded(&mut self, text: &str) -> Result<(), IntakeError> {
        let record = extract::extract(text);
        if record.is_empty() {
            self.set_error(IntakeError::DecodeEmpty.to_string());
            return Err(IntakeError::DecodeEmpty);
        }
        self.current_record = Some(record);
        self.set_success("Badge scanned successfully!");
        Ok(())
    }

    /// Manual-entry path, bypassing the scanner and the extractor. Only the
    /// name is required; everything else passes through verbatim.
    pub fn manual_entry(&mut self, entry: ManualEntry) -> Result<(), IntakeError> {
        if entry.name.is_empty() {
            self.set_error(IntakeError::MissingName.to_string());
            return Err(IntakeError::MissingName);
        }
        let optional = |value: String| (!value.is_empty()).then_some(value);
        self.current_record = Some(ContactRecord {
            name: Some(entry.name),
            email: optional(entry.email),
            phone: optional(entry.phone),
            company: optional(entry.company),
            ..ContactRecord::default()
        });
        self.set_success("Information collected successfully!");
        Ok(())
    }

    pub fn set_interest(&mut self, level: InterestLevel) {
        self.annotation.interest_level = level;
    }

    pub fn append_note(&mut self, text: &str) {
        self.annotation.append_note(text);
    }

    /// Submit the current record with its annotation. On success the snapshot
    /// is retained for display and the session resets for the next visitor;
    /// on failure the record stays put so the operator can retry.
    ///
    /// Borrowing the session mutably for the whole call means a second
    /// submission cannot start while one is outstanding.
    pub async fn submit(&mut self, service: &dyn SheetsService) -> Result<(), SubmitError> {
        self.set_info("Submitting data...");
        match sheets::submit(service, self.current_record.as_ref(), &self.annotation).await {
            Ok(submission) => {
                self.last_submission = Some(submission);
                self.reset();
                self.set_success("Data submitted successfully!");
                Ok(())
            }
            Err(err) => {
                self.set_error(err.to_string());
                Err(err)
            }
        }
    }

    /// Clear the record and annotation together; the last submission echo is
    /// deliberately kept.
    pub fn reset(&mut self) {
        self.current_record = None;
        self.annotation = Annotation::default();
        self.set_info("Ready to scan");
    }
}
