//! Contract for the read-through reference cache.
//!
//! Offline forms need student and class lookups without network access. The
//! cache is an external collaborator: the sync engine neither reads nor
//! writes it. Only the interface lives here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cached student reference data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    pub class_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<u32>,
}

/// Cached class reference data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub class_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// Error surfaced by a reference cache implementation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage unavailable: {0}")]
    Unavailable(String),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read-through cache for student/class reference data.
#[async_trait]
pub trait ReferenceCache: Send + Sync {
    async fn upsert_students(&self, records: Vec<StudentRecord>) -> Result<(), CacheError>;

    async fn upsert_classes(&self, records: Vec<ClassRecord>) -> Result<(), CacheError>;

    async fn student(&self, student_id: &str) -> Result<Option<StudentRecord>, CacheError>;

    async fn class(&self, class_id: &str) -> Result<Option<ClassRecord>, CacheError>;
}
