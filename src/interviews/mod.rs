//! Interview records
//!
//! `InterviewService` serves CRUD against the backend API and falls back to
//! a local JSON store whenever the backend is unreachable or answers with a
//! non-2xx status. Either path returns the same record shape.

pub mod csv;
mod facade;
pub mod local;
mod model;
pub mod remote;

pub use csv::CsvColumns;
pub use facade::InterviewService;
pub use local::{JsonStore, LocalInterviews, INTERVIEWS_KEY};
pub use model::{
    InterviewAnalytics, InterviewPage, InterviewRecord, InterviewStatus, InterviewType,
    LinkVerification, ListQuery, NewInterview, SortField, SortOrder,
};
pub use remote::{RemoteInterviews, DEFAULT_API_TIMEOUT};
