use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewStatus {
    #[default]
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
    Rescheduled,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Scheduled => "scheduled",
            InterviewStatus::Ongoing => "ongoing",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
            InterviewStatus::Rescheduled => "rescheduled",
        }
    }

    /// Still expected to take place
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            InterviewStatus::Scheduled | InterviewStatus::Ongoing | InterviewStatus::Rescheduled
        )
    }
}

impl std::fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    Technical,
    Hr,
    Behavioral,
    /// Any type this client does not know about
    #[serde(other)]
    Other,
}

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Technical => "technical",
            InterviewType::Hr => "hr",
            InterviewType::Behavioral => "behavioral",
            InterviewType::Other => "other",
        }
    }
}

impl std::fmt::Display for InterviewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An interview as stored by the backend and by the local fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRecord {
    /// Backend document id, or a millisecond timestamp for local records
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    #[serde(default)]
    pub candidate_phone: String,
    pub interview_date: DateTime<Utc>,
    pub interview_type: InterviewType,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: InterviewStatus,
}

/// Fields supplied when scheduling an interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInterview {
    #[serde(alias = "name")]
    pub candidate_name: String,
    #[serde(alias = "email")]
    pub candidate_email: String,
    #[serde(default, alias = "phone")]
    pub candidate_phone: String,
    #[serde(alias = "date")]
    pub interview_date: DateTime<Utc>,
    #[serde(alias = "type")]
    pub interview_type: InterviewType,
    #[serde(default)]
    pub notes: String,
}

impl NewInterview {
    /// The record with a given id, always `scheduled`
    pub fn into_record(self, id: String) -> InterviewRecord {
        InterviewRecord {
            id,
            candidate_name: self.candidate_name,
            candidate_email: self.candidate_email,
            candidate_phone: self.candidate_phone,
            interview_date: self.interview_date,
            interview_type: self.interview_type,
            notes: self.notes,
            status: InterviewStatus::Scheduled,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    InterviewDate,
    CandidateName,
    Status,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::InterviewDate => "interviewDate",
            SortField::CandidateName => "candidateName",
            SortField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// List parameters (`GET /api/interviews` query)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub status: Option<InterviewStatus>,
    #[serde(rename = "type")]
    pub interview_type: Option<InterviewType>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            status: None,
            interview_type: None,
        }
    }
}

impl ListQuery {
    /// Query-string pairs, omitting unset filters
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("sortOrder", self.sort_order.as_str().to_string()),
        ];
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        if let Some(kind) = self.interview_type {
            pairs.push(("type", kind.to_string()));
        }
        pairs
    }
}

/// One page of interviews, identical whichever store served it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewPage {
    pub interviews: Vec<InterviewRecord>,
    #[serde(default)]
    pub total: usize,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

/// Interview counts for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnalytics {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub by_status: BTreeMap<String, usize>,
    #[serde(default)]
    pub by_type: BTreeMap<String, usize>,
    /// Scheduled or rescheduled interviews still ahead of `now`
    #[serde(default)]
    pub upcoming: usize,
}

impl InterviewAnalytics {
    pub fn from_records(records: &[InterviewRecord], now: DateTime<Utc>) -> Self {
        let mut analytics = InterviewAnalytics {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            *analytics
                .by_status
                .entry(record.status.as_str().to_string())
                .or_default() += 1;
            *analytics
                .by_type
                .entry(record.interview_type.as_str().to_string())
                .or_default() += 1;
            if record.status.is_open() && record.interview_date > now {
                analytics.upcoming += 1;
            }
        }
        analytics
    }
}

/// Whether a candidate may join an interview through its link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkVerification {
    #[serde(alias = "success")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview: Option<InterviewRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LinkVerification {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            interview: None,
            message: Some(message.into()),
        }
    }

    /// Check `candidate_name` against a stored record
    ///
    /// Names compare trimmed and case-insensitively. Completed and cancelled
    /// interviews can no longer be joined.
    pub fn check(record: Option<InterviewRecord>, candidate_name: &str) -> Self {
        let Some(record) = record else {
            return Self::rejected("Interview not found");
        };
        if !same_name(&record.candidate_name, candidate_name) {
            return Self::rejected("Candidate name does not match this interview");
        }
        if !record.status.is_open() {
            return Self::rejected(format!("Interview is {}", record.status));
        }
        Self {
            valid: true,
            interview: Some(record),
            message: None,
        }
    }
}

fn same_name(stored: &str, given: &str) -> bool {
    let given = given.trim();
    !given.is_empty() && stored.trim().to_lowercase() == given.to_lowercase()
}

fn first_page() -> u32 {
    1
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepts_backend_and_local_ids() {
        let backend = r#"{"_id":"65f0c","candidateName":"Ada","candidateEmail":"ada@example.com",
            "interviewDate":"2024-03-01T10:00:00Z","interviewType":"technical","status":"ongoing"}"#;
        let record: InterviewRecord = serde_json::from_str(backend).unwrap();
        assert_eq!(record.id, "65f0c");
        assert_eq!(record.status, InterviewStatus::Ongoing);
        assert_eq!(record.notes, "");

        let local = r#"{"id":1709287200000,"candidateName":"Ada","candidateEmail":"ada@example.com",
            "interviewDate":"2024-03-01T10:00:00Z","interviewType":"culture-fit"}"#;
        let record: InterviewRecord = serde_json::from_str(local).unwrap();
        assert_eq!(record.id, "1709287200000");
        assert_eq!(record.interview_type, InterviewType::Other);
        assert_eq!(record.status, InterviewStatus::Scheduled);
    }

    #[test]
    fn test_new_interview_accepts_form_names() {
        let form = r#"{"name":"Grace","email":"grace@example.com","date":"2024-03-01T10:00:00Z","type":"hr"}"#;
        let new: NewInterview = serde_json::from_str(form).unwrap();
        assert_eq!(new.candidate_name, "Grace");
        assert_eq!(new.interview_type, InterviewType::Hr);
    }

    fn record(id: &str, name: &str, status: InterviewStatus, kind: InterviewType, day: u32) -> InterviewRecord {
        use chrono::TimeZone;
        InterviewRecord {
            id: id.to_string(),
            candidate_name: name.to_string(),
            candidate_email: String::new(),
            candidate_phone: String::new(),
            interview_date: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            interview_type: kind,
            notes: String::new(),
            status,
        }
    }

    #[test]
    fn test_analytics_counts_by_status_and_type() {
        use chrono::TimeZone;
        let records = vec![
            record("1", "Ada", InterviewStatus::Completed, InterviewType::Technical, 1),
            record("2", "Bob", InterviewStatus::Scheduled, InterviewType::Technical, 20),
            record("3", "Cy", InterviewStatus::Rescheduled, InterviewType::Hr, 2),
            record("4", "Di", InterviewStatus::Cancelled, InterviewType::Behavioral, 25),
        ];
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let analytics = InterviewAnalytics::from_records(&records, now);

        assert_eq!(analytics.total, 4);
        assert_eq!(analytics.by_status["completed"], 1);
        assert_eq!(analytics.by_status["scheduled"], 1);
        assert!(!analytics.by_status.contains_key("ongoing"));
        assert_eq!(analytics.by_type["technical"], 2);
        assert_eq!(analytics.by_type["hr"], 1);
        // Cancelled and past interviews are not upcoming
        assert_eq!(analytics.upcoming, 1);
    }

    #[test]
    fn test_link_verification_matches_candidate_name() {
        let scheduled = record("7", "Ada Lovelace", InterviewStatus::Scheduled, InterviewType::Hr, 1);

        let ok = LinkVerification::check(Some(scheduled.clone()), "  ada lovelace ");
        assert!(ok.valid);
        assert_eq!(ok.interview.map(|r| r.id), Some("7".to_string()));

        assert!(!LinkVerification::check(Some(scheduled.clone()), "Grace").valid);
        assert!(!LinkVerification::check(Some(scheduled), "").valid);
        assert!(!LinkVerification::check(None, "Ada Lovelace").valid);

        let done = record("8", "Ada", InterviewStatus::Completed, InterviewType::Hr, 1);
        let rejected = LinkVerification::check(Some(done), "Ada");
        assert!(!rejected.valid);
        assert_eq!(rejected.message.as_deref(), Some("Interview is completed"));
    }

    #[test]
    fn test_backend_verification_accepts_success_field() {
        let body = r#"{"success":true,"message":"Welcome"}"#;
        let verification: LinkVerification = serde_json::from_str(body).unwrap();
        assert!(verification.valid);
        assert!(verification.interview.is_none());
    }

    #[test]
    fn test_query_pairs_skip_unset_filters() {
        let pairs = ListQuery::default().to_pairs();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&("sortBy", "interviewDate".to_string())));
    }
}
