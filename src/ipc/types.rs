use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::marksheets::SheetBlock;
use crate::store::GradebookStore;

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
    pub store: Option<GradebookStore>,
    /// Blocks from the most recent `marksheets.render`, used by export.
    pub last_marksheets: Option<Vec<SheetBlock>>,
}
