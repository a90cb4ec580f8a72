use crate::models::{ScoreRecord, Student, Tenant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Raised by the in-memory fake to stand in for a dropped backend.
    #[cfg(test)]
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the persistence backend that result lookups depend on.
pub trait ResultStore {
    /// Every tenant regardless of status, in a stable order.
    fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError>;

    /// Exact index-number match inside one tenant.
    fn find_student(
        &self,
        tenant_id: &str,
        index_number: &str,
    ) -> Result<Option<Student>, StoreError>;

    /// All marks for one student, every term.
    fn list_scores(&self, student_id: &str) -> Result<Vec<ScoreRecord>, StoreError>;
}
