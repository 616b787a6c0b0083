use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::model::{
    InterviewAnalytics, InterviewPage, InterviewRecord, InterviewStatus, LinkVerification, ListQuery,
    NewInterview,
};
use crate::auth::AuthSession;
use crate::error::ApiError;

pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct RecordEnvelope {
    interview: InterviewRecord,
}

#[derive(Debug, Deserialize)]
struct AnalyticsEnvelope {
    analytics: InterviewAnalytics,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Page(InterviewPage),
    Bare(Vec<InterviewRecord>),
}

/// Client for the interview CRUD API (`{base}/api/interviews`)
pub struct RemoteInterviews {
    http: reqwest::Client,
    base: String,
    auth: Arc<AuthSession>,
}

impl RemoteInterviews {
    pub fn new(base_url: &str, timeout: Duration, auth: Arc<AuthSession>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: format!("{}/api/interviews", base_url.trim_end_matches('/')),
            auth,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn list(&self, query: &ListQuery) -> Result<InterviewPage, ApiError> {
        let request = self.http.get(&self.base).query(&query.to_pairs());
        let response = self.send(request).await?;
        Ok(match decode::<ListResponse>(response).await? {
            ListResponse::Page(page) => page,
            ListResponse::Bare(records) => {
                let total = records.len();
                InterviewPage {
                    interviews: records,
                    total,
                    page: 1,
                    total_pages: u32::from(total > 0),
                }
            }
        })
    }

    pub async fn create(&self, new: &NewInterview) -> Result<InterviewRecord, ApiError> {
        let mut body = serde_json::to_value(new).map_err(|e| ApiError::Parse(e.to_string()))?;
        body["status"] = json!(InterviewStatus::Scheduled);
        let response = self.send(self.http.post(&self.base).json(&body)).await?;
        Ok(decode::<RecordEnvelope>(response).await?.interview)
    }

    pub async fn get(&self, id: &str) -> Result<InterviewRecord, ApiError> {
        let url = format!("{}/{}", self.base, id);
        let response = self.send(self.http.get(url)).await?;
        Ok(decode::<RecordEnvelope>(response).await?.interview)
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: InterviewStatus,
    ) -> Result<InterviewRecord, ApiError> {
        let url = format!("{}/{}/status", self.base, id);
        let request = self.http.patch(url).json(&json!({ "status": status }));
        let response = self.send(request).await?;
        Ok(decode::<RecordEnvelope>(response).await?.interview)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.base, id);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    pub async fn analytics(&self) -> Result<InterviewAnalytics, ApiError> {
        let url = format!("{}/analytics", self.base);
        let response = self.send(self.http.get(url)).await?;
        Ok(decode::<AnalyticsEnvelope>(response).await?.analytics)
    }

    pub async fn verify_link(&self, id: &str, candidate_name: &str) -> Result<LinkVerification, ApiError> {
        let url = format!("{}/verify/{}", self.base, id);
        let request = self
            .http
            .post(url)
            .json(&json!({ "candidateName": candidate_name }));
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Attach credentials, send, and map 401 and other non-2xx statuses
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.auth.authorize(request).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.auth.force_logout();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ApiError::Status(status.as_u16(), message));
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Backend `{message}` when present, else the raw body
async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text)
}
