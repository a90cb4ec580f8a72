use crate::models::{ScoreRecord, Student, Tenant};
use crate::store::{ResultStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no student found with index number {index_number}")]
    NotFound { index_number: String },

    #[error("class does not match the records for index number {index_number}")]
    Mismatch { index_number: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a public result page needs about one student, read in one pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSnapshot {
    #[serde(rename = "school")]
    pub tenant: Tenant,
    pub student: Student,
    pub scores: Vec<ScoreRecord>,
}

fn class_matches(hint: &str, class_name: &str) -> bool {
    hint.trim().to_lowercase() == class_name.trim().to_lowercase()
}

/// Scans tenants in store order and stops at the first one holding `index_number`.
///
/// A non-blank `class_hint` that disagrees with the found student fails with
/// `Mismatch`; later tenants are not tried even if they hold the same index number.
pub fn resolve<S: ResultStore + ?Sized>(
    store: &S,
    index_number: &str,
    class_hint: Option<&str>,
) -> Result<ResultSnapshot, ResolveError> {
    let index_number = index_number.trim();
    let tenants = store.list_tenants().map_err(|e| {
        warn!(error = %e, "tenant list failed");
        e
    })?;

    let mut found: Option<(Tenant, Student)> = None;
    for tenant in tenants {
        debug!(tenant_id = %tenant.id, "probing tenant");
        let hit = store
            .find_student(&tenant.id, index_number)
            .map_err(|e| {
                warn!(tenant_id = %tenant.id, error = %e, "student lookup failed");
                e
            })?;
        if let Some(student) = hit {
            found = Some((tenant, student));
            break;
        }
    }

    let Some((tenant, student)) = found else {
        info!(index_number, "no tenant holds index number");
        return Err(ResolveError::NotFound {
            index_number: index_number.to_string(),
        });
    };

    if let Some(hint) = class_hint.filter(|h| !h.trim().is_empty()) {
        if !class_matches(hint, &student.class_name) {
            info!(index_number, tenant_id = %tenant.id, "class hint mismatch");
            return Err(ResolveError::Mismatch {
                index_number: index_number.to_string(),
            });
        }
    }

    let scores = store.list_scores(&student.id).map_err(|e| {
        warn!(student_id = %student.id, error = %e, "score list failed");
        e
    })?;
    info!(
        index_number,
        tenant_id = %tenant.id,
        score_count = scores.len(),
        "resolved result snapshot"
    );

    Ok(ResultSnapshot {
        tenant,
        student,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TenantStatus;
    use crate::store::memory::MemoryStore;

    fn tenant(id: &str, name: &str) -> Tenant {
        Tenant {
            id: id.to_string(),
            name: name.to_string(),
            plan: "free".to_string(),
            logo_url: None,
            theme_color: None,
            status: TenantStatus::Active,
        }
    }

    fn student(id: &str, tenant_id: &str, index: &str, class_name: &str) -> Student {
        Student {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            full_name: format!("Student {}", id),
            index_number: index.to_string(),
            class_name: class_name.to_string(),
        }
    }

    fn mark(student_id: &str, tenant_id: &str, subject: &str, term: &str) -> ScoreRecord {
        ScoreRecord {
            id: format!("{}-{}", student_id, subject),
            student_id: student_id.to_string(),
            tenant_id: tenant_id.to_string(),
            subject: subject.to_string(),
            score: 60.0,
            term: term.to_string(),
        }
    }

    fn two_school_store() -> MemoryStore {
        MemoryStore {
            tenants: vec![tenant("t1", "North High"), tenant("t2", "South High")],
            students: vec![
                student("s1", "t1", "2023/050", "JHS 1"),
                student("s2", "t2", "2024/001", "JHS 2"),
            ],
            scores: vec![
                mark("s2", "t2", "Math", "Term 1"),
                mark("s2", "t2", "English", "Term 2"),
                mark("s1", "t1", "Math", "Term 1"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn keeps_scanning_past_tenants_without_a_match() {
        let store = two_school_store();
        let snap = resolve(&store, "2024/001", None).expect("resolve");
        assert_eq!(snap.tenant.id, "t2");
        assert_eq!(snap.student.id, "s2");
        assert_eq!(snap.scores.len(), 2);
        assert_eq!(*store.probes.borrow(), vec!["t1", "t2"]);
    }

    #[test]
    fn stops_at_first_matching_tenant() {
        let mut store = two_school_store();
        store.students.push(student("s3", "t2", "2023/050", "JHS 1"));
        let snap = resolve(&store, "2023/050", None).expect("resolve");
        assert_eq!(snap.tenant.id, "t1");
        assert_eq!(*store.probes.borrow(), vec!["t1"]);
    }

    #[test]
    fn unknown_index_is_not_found() {
        let store = two_school_store();
        let e = resolve(&store, "9999", None).expect_err("should fail");
        assert!(matches!(e, ResolveError::NotFound { .. }));
        assert_eq!(store.score_reads.get(), 0);
    }

    #[test]
    fn class_hint_is_case_insensitive() {
        let store = two_school_store();
        let snap = resolve(&store, "2024/001", Some("jhs 2")).expect("resolve");
        assert_eq!(snap.student.class_name, "JHS 2");
    }

    #[test]
    fn blank_class_hint_is_ignored() {
        let store = two_school_store();
        assert!(resolve(&store, "2024/001", Some("   ")).is_ok());
    }

    #[test]
    fn wrong_class_hint_is_mismatch_without_fallthrough() {
        let mut store = two_school_store();
        // A later tenant holds the same index in the hinted class; it must not be tried.
        store.tenants.push(tenant("t3", "East High"));
        store.students.push(student("s4", "t3", "2023/050", "SHS 3"));

        let e = resolve(&store, "2023/050", Some("SHS 3")).expect_err("should fail");
        assert!(matches!(e, ResolveError::Mismatch { .. }));
        assert_eq!(*store.probes.borrow(), vec!["t1"]);
        assert_eq!(store.score_reads.get(), 0);
    }

    #[test]
    fn index_number_is_trimmed() {
        let store = two_school_store();
        assert!(resolve(&store, "  2024/001 ", None).is_ok());
    }

    #[test]
    fn store_failure_surfaces_as_store_error() {
        let store = MemoryStore {
            fail_lists: true,
            ..two_school_store()
        };
        let e = resolve(&store, "2024/001", None).expect_err("should fail");
        assert!(matches!(e, ResolveError::Store(_)));
    }
}
