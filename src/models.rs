use serde::{Deserialize, Serialize};

/// Terms a mark can be recorded against.
pub const TERMS: [&str; 3] = ["Term 1", "Term 2", "Term 3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Pending,
    Active,
    Rejected,
}

impl TenantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantStatus::Pending => "pending",
            TenantStatus::Active => "active",
            TenantStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(TenantStatus::Pending),
            "active" => Some(TenantStatus::Active),
            "rejected" => Some(TenantStatus::Rejected),
            _ => None,
        }
    }
}

/// A school using the system.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub plan: String,
    pub logo_url: Option<String>,
    pub theme_color: Option<String>,
    pub status: TenantStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub tenant_id: String,
    pub full_name: String,
    pub index_number: String,
    pub class_name: String,
}

/// One subject/score/term entry for a student.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: String,
    pub student_id: String,
    pub tenant_id: String,
    pub subject: String,
    pub score: f64,
    pub term: String,
}

pub fn is_known_term(term: &str) -> bool {
    TERMS.contains(&term)
}
