use tracing::{debug, warn};

use super::csv::{self, CsvColumns};
use super::local::LocalInterviews;
use super::model::{
    InterviewAnalytics, InterviewPage, InterviewRecord, InterviewStatus, LinkVerification, ListQuery,
    NewInterview,
};
use super::remote::RemoteInterviews;
use crate::error::{ApiError, StoreError};

/// Page size used when exporting every record
const EXPORT_LIMIT: u32 = 10_000;

/// Interview CRUD: the backend first, the local store when it fails
///
/// Successful remote results are mirrored locally. Records created while
/// offline stay local; nothing is pushed to the backend later.
pub struct InterviewService {
    remote: Option<RemoteInterviews>,
    local: LocalInterviews,
}

impl InterviewService {
    pub fn new(remote: Option<RemoteInterviews>, local: LocalInterviews) -> Self {
        Self { remote, local }
    }

    /// Local store only
    pub fn offline(local: LocalInterviews) -> Self {
        Self::new(None, local)
    }

    pub fn local(&self) -> &LocalInterviews {
        &self.local
    }

    pub async fn list(&self, query: &ListQuery) -> Result<InterviewPage, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.list(query).await {
                Ok(page) => {
                    self.mirror(&page.interviews).await;
                    return Ok(page);
                }
                Err(e) => fallback("list", &e),
            }
        }
        self.local.list(query).await
    }

    pub async fn create(&self, new: NewInterview) -> Result<InterviewRecord, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.create(&new).await {
                Ok(record) => {
                    self.mirror(std::slice::from_ref(&record)).await;
                    return Ok(record);
                }
                Err(e) => fallback("create", &e),
            }
        }
        self.local.create(new).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<InterviewRecord>, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.get(id).await {
                Ok(record) => {
                    self.mirror(std::slice::from_ref(&record)).await;
                    return Ok(Some(record));
                }
                Err(e) => fallback("get", &e),
            }
        }
        self.local.get(id).await
    }

    /// Set a status as given; `None` when no store knows the id
    pub async fn update_status(
        &self,
        id: &str,
        status: InterviewStatus,
    ) -> Result<Option<InterviewRecord>, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.update_status(id, status).await {
                Ok(record) => {
                    self.mirror(std::slice::from_ref(&record)).await;
                    return Ok(Some(record));
                }
                Err(e) => fallback("update status", &e),
            }
        }
        self.local.update_status(id, status).await
    }

    /// Delete by id; returns the id whether or not a record existed
    pub async fn delete(&self, id: &str) -> Result<String, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.delete(id).await {
                Ok(()) => {
                    if let Err(e) = self.local.delete(id).await {
                        warn!("Failed to drop local copy of interview {}: {}", id, e);
                    }
                    return Ok(id.to_string());
                }
                Err(e) => fallback("delete", &e),
            }
        }
        if !self.local.delete(id).await? {
            debug!("Interview {} not found locally", id);
        }
        Ok(id.to_string())
    }

    /// Counts by status and type; computed from the local copy as fallback
    pub async fn analytics(&self) -> Result<InterviewAnalytics, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.analytics().await {
                Ok(analytics) => return Ok(analytics),
                Err(e) => fallback("analytics", &e),
            }
        }
        self.local.analytics().await
    }

    /// Check a candidate's interview link
    ///
    /// A 4xx answer other than 401 is the backend's verdict and is returned
    /// as a rejection rather than retried locally.
    pub async fn verify_link(&self, id: &str, candidate_name: &str) -> Result<LinkVerification, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.verify_link(id, candidate_name).await {
                Ok(verification) => {
                    if let Some(record) = &verification.interview {
                        self.mirror(std::slice::from_ref(record)).await;
                    }
                    return Ok(verification);
                }
                Err(ApiError::Status(code, message)) if (400..500).contains(&code) => {
                    debug!("Backend rejected link for interview {}: {}", id, message);
                    return Ok(LinkVerification::rejected(message));
                }
                Err(e) => fallback("verify link", &e),
            }
        }
        self.local.verify_link(id, candidate_name).await
    }

    /// Every record matching the query's filters as CSV
    pub async fn export_csv(&self, query: &ListQuery, columns: CsvColumns) -> Result<String, StoreError> {
        let query = ListQuery {
            page: 1,
            limit: EXPORT_LIMIT,
            ..query.clone()
        };
        let page = self.list(&query).await?;
        Ok(csv::to_csv(&page.interviews, columns))
    }

    async fn mirror(&self, records: &[InterviewRecord]) {
        if let Err(e) = self.local.upsert(records).await {
            warn!("Failed to mirror {} interview(s) locally: {}", records.len(), e);
        }
    }
}

fn fallback(operation: &str, err: &ApiError) {
    warn!("Interview API {} failed, using local store: {}", operation, err);
}
