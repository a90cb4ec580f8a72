use std::collections::VecDeque;
use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::resolve::ResultSnapshot;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub snapshots: SnapshotCache,
}

const MAX_SNAPSHOTS: usize = 32;

/// Resolved lookups kept for follow-up term queries and exports. Oldest out first.
#[derive(Default)]
pub struct SnapshotCache {
    entries: VecDeque<(String, ResultSnapshot)>,
}

impl SnapshotCache {
    pub fn insert(&mut self, snapshot: ResultSnapshot) -> String {
        let id = Uuid::new_v4().to_string();
        if self.entries.len() >= MAX_SNAPSHOTS {
            self.entries.pop_front();
        }
        self.entries.push_back((id.clone(), snapshot));
        id
    }

    pub fn get(&self, id: &str) -> Option<&ResultSnapshot> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
