use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::model::{
    InterviewAnalytics, InterviewPage, InterviewRecord, InterviewStatus, LinkVerification,
    ListQuery, NewInterview, SortField, SortOrder,
};
use crate::error::StoreError;

/// Key the interview list is stored under
pub const INTERVIEWS_KEY: &str = "interviews";

/// Key-value JSON storage, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read a key; a missing key reads as `None`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let bytes = match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    /// Replace a key's value; written to a temp file and renamed into place
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(value)?;
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, self.path(key)).await?;
        Ok(())
    }
}

/// Interview list kept in a `JsonStore` under `INTERVIEWS_KEY`
pub struct LocalInterviews {
    store: JsonStore,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl LocalInterviews {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    async fn load(&self) -> Result<Vec<InterviewRecord>, StoreError> {
        Ok(self.store.get(INTERVIEWS_KEY).await?.unwrap_or_default())
    }

    async fn save(&self, records: &[InterviewRecord]) -> Result<(), StoreError> {
        self.store.set(INTERVIEWS_KEY, &records).await
    }

    pub async fn all(&self) -> Result<Vec<InterviewRecord>, StoreError> {
        let _lock = self.lock.lock().await;
        self.load().await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<InterviewPage, StoreError> {
        let records = self.all().await?;
        Ok(paginate(records, query))
    }

    /// Store a new record under a timestamp id
    pub async fn create(&self, new: NewInterview) -> Result<InterviewRecord, StoreError> {
        let _lock = self.lock.lock().await;
        let mut records = self.load().await?;

        let mut id = Utc::now().timestamp_millis();
        while records.iter().any(|r| r.id == id.to_string()) {
            id += 1;
        }

        let record = new.into_record(id.to_string());
        records.push(record.clone());
        self.save(&records).await?;
        debug!("Stored interview {} locally", record.id);
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<Option<InterviewRecord>, StoreError> {
        let _lock = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|r| r.id == id))
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: InterviewStatus,
    ) -> Result<Option<InterviewRecord>, StoreError> {
        let _lock = self.lock.lock().await;
        let mut records = self.load().await?;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        record.status = status;
        let updated = record.clone();
        self.save(&records).await?;
        Ok(Some(updated))
    }

    /// Remove a record; true if it existed
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _lock = self.lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }

    pub async fn analytics(&self) -> Result<InterviewAnalytics, StoreError> {
        let records = self.all().await?;
        Ok(InterviewAnalytics::from_records(&records, Utc::now()))
    }

    pub async fn verify_link(&self, id: &str, candidate_name: &str) -> Result<LinkVerification, StoreError> {
        let record = self.get(id).await?;
        Ok(LinkVerification::check(record, candidate_name))
    }

    /// Insert or replace records by id (last writer wins)
    pub async fn upsert(&self, incoming: &[InterviewRecord]) -> Result<(), StoreError> {
        if incoming.is_empty() {
            return Ok(());
        }
        let _lock = self.lock.lock().await;
        let mut records = self.load().await?;
        for record in incoming {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        self.save(&records).await
    }
}

/// Filter, sort and slice one page
pub fn paginate(mut records: Vec<InterviewRecord>, query: &ListQuery) -> InterviewPage {
    records.retain(|r| {
        query.status.map_or(true, |s| r.status == s)
            && query.interview_type.map_or(true, |t| r.interview_type == t)
    });

    records.sort_by(|a, b| {
        let ordering = compare(a, b, query.sort_by);
        match query.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    let total = records.len();
    let limit = query.limit.max(1) as usize;
    let page = query.page.max(1);
    let total_pages = total.div_ceil(limit) as u32;

    let interviews = records
        .into_iter()
        .skip((page as usize - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    InterviewPage {
        interviews,
        total,
        page,
        total_pages,
    }
}

fn compare(a: &InterviewRecord, b: &InterviewRecord, field: SortField) -> Ordering {
    match field {
        SortField::InterviewDate => a.interview_date.cmp(&b.interview_date),
        SortField::CandidateName => a
            .candidate_name
            .to_lowercase()
            .cmp(&b.candidate_name.to_lowercase()),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interviews::model::InterviewType;
    use chrono::TimeZone;

    fn new_interview(name: &str, day: u32, kind: InterviewType) -> NewInterview {
        NewInterview {
            candidate_name: name.to_string(),
            candidate_email: format!("{}@example.com", name.to_lowercase()),
            candidate_phone: String::new(),
            interview_date: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            interview_type: kind,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_unique_timestamp_ids() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalInterviews::new(JsonStore::new(dir.path()));

        let a = local.create(new_interview("Ada", 1, InterviewType::Technical)).await.unwrap();
        let b = local.create(new_interview("Bob", 2, InterviewType::Hr)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.id.parse::<i64>().is_ok());
        assert_eq!(a.status, InterviewStatus::Scheduled);
        assert_eq!(local.all().await.unwrap().len(), 2);
        assert!(dir.path().join("interviews.json").exists());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalInterviews::new(JsonStore::new(dir.path()));
        let record = local.create(new_interview("Ada", 1, InterviewType::Technical)).await.unwrap();

        let updated = local
            .update_status(&record.id, InterviewStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, InterviewStatus::Completed);
        assert!(local.update_status("missing", InterviewStatus::Cancelled).await.unwrap().is_none());

        assert!(local.delete(&record.id).await.unwrap());
        assert!(!local.delete(&record.id).await.unwrap());
        assert!(local.get(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("interviews.json"), b"{not json").unwrap();
        let local = LocalInterviews::new(JsonStore::new(dir.path()));
        assert!(matches!(local.all().await, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_paginate_filters_and_sorts() {
        let records: Vec<InterviewRecord> = [
            ("Cy", 3, InterviewType::Technical),
            ("Ada", 1, InterviewType::Technical),
            ("Bob", 2, InterviewType::Hr),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (name, day, kind))| new_interview(name, day, kind).into_record(i.to_string()))
        .collect();

        let page = paginate(records.clone(), &ListQuery::default());
        let names: Vec<_> = page.interviews.iter().map(|r| r.candidate_name.as_str()).collect();
        assert_eq!(names, vec!["Cy", "Bob", "Ada"]);

        let query = ListQuery {
            sort_by: SortField::CandidateName,
            sort_order: SortOrder::Asc,
            interview_type: Some(InterviewType::Technical),
            limit: 1,
            page: 2,
            ..Default::default()
        };
        let page = paginate(records, &query);
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.interviews[0].candidate_name, "Cy");
    }
}
