//! Submission gateway: turns a finished intake record into a ticket on the backend.

use crate::config::IntakeConfig;
use crate::error::{IntakeError, IntakeResult};
use crate::record::IntakeRecord;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Payload for the ticket backend's `create-ticket-from-voice` route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub caller_name: String,
    pub phone_number: String,
    pub crime_type: String,
    pub primary_location: String,
    pub specific_landmark: String,
    pub city: String,
    pub state_region: String,
    pub combined_address: String,
    pub summary: String,
    pub description: String,
    pub additional_context: String,
}

impl TicketRequest {
    pub fn from_record(record: &IntakeRecord) -> IntakeResult<Self> {
        Self::from_record_at(record, Local::now())
    }

    /// Build the payload, refusing a record with any empty field.
    pub fn from_record_at(record: &IntakeRecord, reported_at: DateTime<Local>) -> IntakeResult<Self> {
        if let Some(field) = record.missing_field() {
            return Err(IntakeError::IncompleteRecord(field));
        }
        Ok(Self {
            caller_name: record.name.clone(),
            phone_number: record.phone_number.clone(),
            crime_type: record.crime_type.clone(),
            primary_location: record.area.clone(),
            specific_landmark: record.landmark.clone(),
            city: record.city.clone(),
            state_region: record.district.clone(),
            combined_address: record.full_address.clone(),
            summary: format!("{} reported by {}", record.crime_type, record.name),
            description: format!(
                "{} incident reported in {} near {}",
                record.crime_type, record.area, record.landmark
            ),
            additional_context: format!(
                "Reported via voice assistant on {}",
                reported_at.format("%Y-%m-%d %H:%M:%S")
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResult {
    pub ticket_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, request: &TicketRequest) -> IntakeResult<TicketResult>;
}

/// Posts tickets as JSON to the backend.
#[derive(Debug, Clone)]
pub struct HttpSubmissionGateway {
    url: String,
    client: reqwest::Client,
}

impl HttpSubmissionGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> IntakeResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn from_config(config: &IntakeConfig) -> IntakeResult<Self> {
        Self::new(config.submission_url.clone(), config.submission_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SubmissionGateway for HttpSubmissionGateway {
    async fn submit(&self, request: &TicketRequest) -> IntakeResult<TicketResult> {
        let res = self.client.post(&self.url).json(request).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(target: "intake::gateway", %status, "ticket API rejected submission");
            return Err(IntakeError::Submission(format!("ticket API error {}: {}", status, body)));
        }
        let ticket: TicketResult = res
            .json()
            .await
            .map_err(|e| IntakeError::Submission(format!("unreadable ticket response: {}", e)))?;
        if ticket.ticket_id.trim().is_empty() {
            return Err(IntakeError::Submission("response carried no ticket_id".to_string()));
        }
        info!(target: "intake::gateway", ticket_id = %ticket.ticket_id, "ticket created");
        Ok(ticket)
    }
}

/// Issues local `TID-xxxxxx` ids without contacting a backend (dry runs, demos).
#[derive(Debug, Default)]
pub struct OfflineGateway;

#[async_trait]
impl SubmissionGateway for OfflineGateway {
    async fn submit(&self, request: &TicketRequest) -> IntakeResult<TicketResult> {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        let ticket_id = format!("TID-{}", &hex[..6]);
        info!(target: "intake::gateway", %ticket_id, caller = %request.caller_name, "offline ticket issued");
        Ok(TicketResult {
            ticket_id,
            status: Some("pending".to_string()),
            message: Some("Ticket recorded offline".to_string()),
        })
    }
}
