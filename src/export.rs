use crate::marksheets::SheetBlock;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// `## <title>`, header row, data rows, then a blank line, per block.
pub fn render_csv_blocks(blocks: &[SheetBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str("## ");
        out.push_str(&block.title);
        out.push('\n');

        let header: Vec<String> = block.sheet.columns.iter().map(|c| csv_quote(c)).collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for row in &block.sheet.rows {
            let fields: Vec<String> = row.iter().map(|c| csv_quote(&c.to_string())).collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("marksheets_{}.csv", at.timestamp_millis())
}

pub fn write_marksheets_csv(out_dir: &Path, blocks: &[SheetBlock]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let out_path = out_dir.join(export_file_name(Utc::now()));
    std::fs::write(&out_path, render_csv_blocks(blocks))
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
    tracing::info!(path = %out_path.display(), blocks = blocks.len(), "marksheets exported");
    Ok(out_path)
}
