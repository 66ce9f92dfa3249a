//! HTTP client for the intervention suggestion service (spec §6.5), grounded on
//! `original_source/utils/intervention_client.py`'s request shape.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionDecision {
    pub trigger_intervention: bool,
    pub confidence_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedActivity {
    pub activity_type: String,
    pub rank: u32,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionSuggestion {
    pub ranked_activities: Vec<RankedActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionResponse {
    pub decision: InterventionDecision,
    pub suggestion: InterventionSuggestion,
}

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_time_of_day: Option<&'a str>,
}

pub struct InterventionClient {
    http: reqwest::Client,
    base_url: String,
}

impl InterventionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    pub async fn suggest(&self, user_id: &str, context_time_of_day: Option<&str>) -> Result<InterventionResponse, CoreError> {
        let url = format!("{}/api/intervention/suggest", self.base_url.trim_end_matches('/'));
        debug!(%url, user_id, "polling intervention service");

        let response = self
            .http
            .post(&url)
            .json(&SuggestRequest { user_id, context_time_of_day })
            .send()
            .await
            .map_err(|e| CoreError::VendorTransient(format!("intervention request failed: {e}")))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "intervention service returned non-success status");
            return Err(CoreError::VendorTransient(format!("intervention service status {}", response.status())));
        }

        response.json().await.map_err(|e| CoreError::VendorTransient(format!("invalid intervention response body: {e}")))
    }
}
