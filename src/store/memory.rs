//! In-memory implementation of `RequestStore`.
//!
//! Holds everything in a `HashMap`; all records are lost on restart. Used by
//! tests and useful for local runs without a database file.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RequestStore, ReviewUpdate, StoreError};
use crate::request::{LeaveRequest, RequestId};

pub struct MemoryStore {
    requests: RwLock<HashMap<RequestId, LeaveRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn create(&self, request: &LeaveRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        // Ids come from the notice transport and are never reused; a second
        // create for the same id is a caller bug, as in the SQLite backend.
        if requests.contains_key(&request.id) {
            return Err(StoreError::storage(
                "create",
                format!("request with id {} already exists", request.id),
            ));
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn get(&self, id: &RequestId) -> Result<Option<LeaveRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.get(id).cloned())
    }

    async fn update_review(&self, id: &RequestId, update: &ReviewUpdate) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(id) {
            Some(request) => {
                request.status = update.status;
                request.processed_by = Some(update.processed_by.clone());
                request.processed_at = Some(update.processed_at);
                Ok(())
            }
            None => Err(StoreError::storage(
                "update review",
                format!("no stored request with id {}", id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Actor, NoticeId, RequestStatus, SubmissionFields, UserId};
    use chrono::Utc;

    fn sample_request(id: &str) -> LeaveRequest {
        let requester = Actor {
            id: UserId("42".into()),
            display_name: "Rivka".into(),
            avatar_ref: Some("https://cdn.example.com/a/42.png".into()),
            is_service: false,
        };
        let fields = SubmissionFields {
            start_date: "25-12-2025".into(),
            end_date: "01-01-2026".into(),
            category: "Vacation".into(),
            notes: None,
        };
        LeaveRequest::pending(
            RequestId::from(NoticeId(id.into())),
            &requester,
            &fields,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_get_returns_none_for_missing() {
        let store = MemoryStore::new();
        let missing = store
            .get(&RequestId::from(NoticeId("absent".into())))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let request = sample_request("1001");

        store.create(&request).await.unwrap();
        let fetched = store.get(&request.id).await.unwrap().unwrap();

        assert_eq!(fetched, request);
        assert_eq!(fetched.status, RequestStatus::Pending);
        assert_eq!(fetched.processed_by, None);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let store = MemoryStore::new();
        let request = sample_request("1003");

        store.create(&request).await.unwrap();
        let err = store.create(&request).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_update_review_overwrites_outcome() {
        let store = MemoryStore::new();
        let request = sample_request("1002");
        store.create(&request).await.unwrap();

        let first = ReviewUpdate {
            status: RequestStatus::Approved,
            processed_by: UserId("admin-1".into()),
            processed_at: Utc::now(),
        };
        store.update_review(&request.id, &first).await.unwrap();

        let second = ReviewUpdate {
            status: RequestStatus::Denied,
            processed_by: UserId("admin-2".into()),
            processed_at: Utc::now(),
        };
        store.update_review(&request.id, &second).await.unwrap();

        let fetched = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Denied);
        assert_eq!(fetched.processed_by, Some(UserId("admin-2".into())));
        assert_eq!(fetched.processed_at, Some(second.processed_at));
        // Submission-time fields stay untouched.
        assert_eq!(fetched.start_date, "25-12-2025");
        assert_eq!(fetched.notes, "N/A");
    }

    #[tokio::test]
    async fn test_update_review_missing_record_errors() {
        let store = MemoryStore::new();
        let update = ReviewUpdate {
            status: RequestStatus::Approved,
            processed_by: UserId("admin-1".into()),
            processed_at: Utc::now(),
        };
        let err = store
            .update_review(&RequestId::from(NoticeId("absent".into())), &update)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no stored request"));
    }
}
