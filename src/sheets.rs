//! Submission of intake records to the spreadsheet endpoint.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::{Annotation, ContactRecord, SubmissionRecord};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No data to submit")]
    NoData,
    #[error("Network error while submitting data: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Submission endpoint returned {0}")]
    HttpStatus(StatusCode),
    #[error("Invalid response from server")]
    BadResponse,
    #[error("{0}")]
    Application(String),
    #[error("Failed to encode submission: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Spreadsheet ingestion boundary; tests substitute a recording fake.
#[async_trait]
pub trait SheetsService: Send + Sync {
    async fn deliver(&self, record: &SubmissionRecord) -> Result<(), SubmitError>;
}

/// Validate presence, snapshot the record, and deliver it. Does not touch
/// session state; the caller applies the returned snapshot.
pub async fn submit(
    service: &dyn SheetsService,
    record: Option<&ContactRecord>,
    annotation: &Annotation,
) -> Result<SubmissionRecord, SubmitError> {
    let record = record.ok_or(SubmitError::NoData)?;
    let submission = build_submission(record, annotation, Utc::now());
    service.deliver(&submission).await?;
    Ok(submission)
}

/// Flatten a contact record and its annotation into the immutable wire form.
/// Every field degrades through its structured-payload alias to an empty
/// string; the endpoint never sees absent keys.
pub fn build_submission(
    record: &ContactRecord,
    annotation: &Annotation,
    timestamp: DateTime<Utc>,
) -> SubmissionRecord {
    let or_alias = |primary: &Option<String>, alias: &str| {
        primary
            .clone()
            .or_else(|| record.alias(alias))
            .unwrap_or_default()
    };
    SubmissionRecord {
        timestamp: timestamp.to_rfc3339(),
        name: or_alias(&record.name, "fullName"),
        email: record.email.clone().unwrap_or_default(),
        phone: or_alias(&record.phone, "phoneNumber"),
        company: or_alias(&record.company, "organization"),
        interest_level: annotation.interest_level,
        notes: annotation.notes.clone(),
        raw_data: raw_data(record),
    }
}

/// The original decoded payload when we have one, else a JSON rendering of
/// what was collected, so the sheet always receives something traceable.
fn raw_data(record: &ContactRecord) -> String {
    if let Some(raw) = &record.raw_payload {
        return raw.clone();
    }
    if let Some(map) = &record.structured {
        return Value::Object(map.clone()).to_string();
    }
    json!({
        "name": record.name,
        "email": record.email,
        "phone": record.phone,
        "company": record.company,
    })
    .to_string()
}

pub struct SheetsClient {
    http: Client,
    endpoint: Url,
}

impl SheetsClient {
    pub fn new(endpoint: Url) -> Self {
        let http = Client::builder()
            .user_agent("badge-intake/0.1")
            .build()
            .expect("reqwest client");
        SheetsClient { http, endpoint }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&cfg.sheets.endpoint_url).context("invalid sheets.endpoint_url")?;
        Ok(Self::new(endpoint))
    }

    pub fn build_request(&self, record: &SubmissionRecord) -> Result<reqwest::Request, SubmitError> {
        let body = serde_json::to_string(record)?;
        // The Apps Script endpoint wants the JSON body under text/plain.
        let request = self
            .http
            .post(self.endpoint.clone())
            .header("Content-Type", "text/plain")
            .body(body)
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl SheetsService for SheetsClient {
    async fn deliver(&self, record: &SubmissionRecord) -> Result<(), SubmitError> {
        let request = self.build_request(record)?;
        info!(url = %request.url(), "submitting intake record");
        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "sheets endpoint rejected submission");
            return Err(SubmitError::HttpStatus(status));
        }
        let body = response.text().await?;
        parse_reply(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SheetsReply {
    result: Option<String>,
    error: Option<String>,
}

/// Interpret the endpoint's JSON reply. A non-JSON body is a protocol error;
/// the "error" sentinel surfaces the server's own message verbatim.
fn parse_reply(body: &str) -> Result<(), SubmitError> {
    let reply: SheetsReply = serde_json::from_str(body).map_err(|_| SubmitError::BadResponse)?;
    if reply.result.as_deref() == Some("error") {
        return Err(SubmitError::Application(
            reply.error.unwrap_or_else(|| "unknown server error".to_string()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InterestLevel;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 24, 9, 30, 0).unwrap()
    }

    #[test]
    fn build_submission_flattens_with_empty_defaults() {
        let record = ContactRecord {
            name: Some("Jane Doe".into()),
            ..ContactRecord::default()
        };
        let submission = build_submission(&record, &Annotation::default(), ts());
        assert_eq!(submission.name, "Jane Doe");
        assert_eq!(submission.email, "");
        assert_eq!(submission.phone, "");
        assert_eq!(submission.company, "");
        assert_eq!(submission.interest_level, InterestLevel::Medium);
        assert_eq!(submission.timestamp, "2026-08-24T09:30:00+00:00");
    }

    #[test]
    fn build_submission_falls_back_to_structured_aliases() {
        let payload = r#"{"fullName":"Jo Smith","phoneNumber":"555-0000","organization":"Acme"}"#;
        let record = crate::extract::extract(payload);
        let submission = build_submission(&record, &Annotation::default(), ts());
        assert_eq!(submission.name, "Jo Smith");
        assert_eq!(submission.phone, "555-0000");
        assert_eq!(submission.company, "Acme");
        // The structured payload doubles as the raw data trail.
        assert!(submission.raw_data.contains("fullName"));
    }

    #[test]
    fn raw_data_prefers_the_original_payload() {
        let record = ContactRecord {
            name: Some("opaque".into()),
            raw_payload: Some("opaque vendor blob".into()),
            ..ContactRecord::default()
        };
        let submission = build_submission(&record, &Annotation::default(), ts());
        assert_eq!(submission.raw_data, "opaque vendor blob");
    }

    #[test]
    fn raw_data_serializes_manual_records() {
        let record = ContactRecord {
            name: Some("Bob".into()),
            phone: Some("555-1234".into()),
            ..ContactRecord::default()
        };
        let submission = build_submission(&record, &Annotation::default(), ts());
        let value: Value = serde_json::from_str(&submission.raw_data).unwrap();
        assert_eq!(value["name"], "Bob");
        assert_eq!(value["phone"], "555-1234");
    }

    #[test]
    fn parse_reply_accepts_success_shapes() {
        parse_reply(r#"{"result":"success"}"#).unwrap();
        parse_reply(r#"{"row": 17}"#).unwrap();
    }

    #[test]
    fn parse_reply_surfaces_application_errors_verbatim() {
        let err = parse_reply(r#"{"result":"error","error":"quota exceeded"}"#).unwrap_err();
        match err {
            SubmitError::Application(msg) => assert_eq!(msg, "quota exceeded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_reply_rejects_non_json_bodies() {
        let err = parse_reply("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, SubmitError::BadResponse));
    }

    #[test]
    fn build_request_targets_configured_endpoint() {
        let client = SheetsClient::new(Url::parse("https://sheets.example/exec").unwrap());
        let record = build_submission(&ContactRecord::default(), &Annotation::default(), ts());
        let request = client.build_request(&record).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://sheets.example/exec");
        assert_eq!(
            request
                .headers()
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "text/plain"
        );
    }
}
