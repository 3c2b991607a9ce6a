//! Keyword filtering, text rendering and file export of result rows.
use crate::codec;
use crate::model::Row;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Rows whose encoded line contains `keyword`, paired with their index in
/// `rows` so that a delete can target the unfiltered position.
/// An empty keyword keeps every row.
pub fn filter<'a>(rows: &'a [Row], keyword: &str) -> Vec<(usize, &'a Row)> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| keyword.is_empty() || codec::encode(row).contains(keyword))
        .collect()
}

/// One encoded line per row, each terminated by `\n`, so the file ends with
/// a newline. No rows render as an empty string.
pub fn render<'a>(rows: impl IntoIterator<Item = &'a Row>) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&codec::encode(row));
        out.push('\n');
    }
    out
}

pub async fn write(path: &Path, rows: &[Row]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, render(rows))
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "export written");
    Ok(())
}

/// Fixed-column listing. `entries` carry the row's position in its set.
pub fn table(entries: &[(usize, &Row)]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<10} {:<10} {:<8} {:>10} {:<8} {:<20} {:>10}  {}",
        "#", "label", "review", "mall", "price", "point", "time", "csq", "name"
    );
    for (index, row) in entries {
        let csq = codec::extract_id(row)
            .map(|id| id.0)
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>4}  {:<10} {:<10} {:<8} {:>10} {:<8} {:<20} {:>10}  {}",
            index,
            row.label,
            row.review,
            row.mall,
            row.price_display(),
            row.point,
            row.time,
            csq,
            row.name
        );
    }
    out
}
