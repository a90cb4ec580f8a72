use crate::models::{ScoreRecord, Student, Tenant, TenantStatus};
use crate::store::{ResultStore, StoreError};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

pub const DB_FILE: &str = "results.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schools(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            plan TEXT NOT NULL DEFAULT 'free',
            logo_url TEXT,
            theme_color TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            full_name TEXT NOT NULL,
            index_number TEXT NOT NULL,
            class_name TEXT NOT NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            UNIQUE(school_id, index_number)
        )",
        [],
    )?;

    // school_id is copied from the owning student for per-school queries.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS marks(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            school_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            score REAL NOT NULL,
            term TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(school_id) REFERENCES schools(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marks_student ON marks(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key = ?", [key], |r| r.get(0))
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("setting {} is not valid json", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, value.to_string()),
    )?;
    Ok(())
}

fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    let status: String = row.get(5)?;
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        plan: row.get(2)?,
        logo_url: row.get(3)?,
        theme_color: row.get(4)?,
        // Unknown status strings are treated as not yet approved.
        status: TenantStatus::parse(&status).unwrap_or(TenantStatus::Pending),
    })
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        full_name: row.get(2)?,
        index_number: row.get(3)?,
        class_name: row.get(4)?,
    })
}

fn mark_from_row(row: &Row<'_>) -> rusqlite::Result<ScoreRecord> {
    Ok(ScoreRecord {
        id: row.get(0)?,
        student_id: row.get(1)?,
        tenant_id: row.get(2)?,
        subject: row.get(3)?,
        score: row.get(4)?,
        term: row.get(5)?,
    })
}

/// Workspace database as a result store.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ResultStore for SqliteStore<'_> {
    fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, plan, logo_url, theme_color, status
             FROM schools
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], tenant_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_student(
        &self,
        tenant_id: &str,
        index_number: &str,
    ) -> Result<Option<Student>, StoreError> {
        let student = self
            .conn
            .query_row(
                "SELECT id, school_id, full_name, index_number, class_name
                 FROM students
                 WHERE school_id = ? AND index_number = ?",
                (tenant_id, index_number),
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }

    fn list_scores(&self, student_id: &str) -> Result<Vec<ScoreRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, school_id, subject, score, term
             FROM marks
             WHERE student_id = ?
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([student_id], mark_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub fn school_get(conn: &Connection, school_id: &str) -> anyhow::Result<Option<Tenant>> {
    let t = conn
        .query_row(
            "SELECT id, name, plan, logo_url, theme_color, status FROM schools WHERE id = ?",
            [school_id],
            tenant_from_row,
        )
        .optional()?;
    Ok(t)
}

pub fn student_get(conn: &Connection, student_id: &str) -> anyhow::Result<Option<Student>> {
    let s = conn
        .query_row(
            "SELECT id, school_id, full_name, index_number, class_name FROM students WHERE id = ?",
            [student_id],
            student_from_row,
        )
        .optional()?;
    Ok(s)
}

pub fn students_for_school(conn: &Connection, school_id: &str) -> anyhow::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, school_id, full_name, index_number, class_name
         FROM students
         WHERE school_id = ?
         ORDER BY full_name, index_number",
    )?;
    let rows = stmt
        .query_map([school_id], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    #[test]
    fn students_rely_on_the_unique_constraint_index() {
        let workspace = temp_workspace("resultsd-db-schema");
        let conn = open_db(&workspace).expect("open");
        // Reopening must not fail on existing tables or indexes.
        drop(conn);
        let conn = open_db(&workspace).expect("reopen");

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'students'")
            .expect("prepare");
        let names = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .expect("query")
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        // One autoindex for the text primary key, one for UNIQUE(school_id, index_number).
        assert_eq!(names.len(), 2, "indexes: {:?}", names);
        assert!(
            names.iter().all(|n| n.starts_with("sqlite_autoindex_students")),
            "indexes: {:?}",
            names
        );

        let _ = std::fs::remove_dir_all(&workspace);
    }
}
