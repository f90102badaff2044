//! Tab-separated lookup tables (letter weights, letter similarities, corpora)

use crate::error::{ResemblaError, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

const COMMENT_PREFIX: char = '#';

/// One non-empty, non-comment row of a TSV file
#[derive(Debug, Clone, PartialEq)]
pub struct TsvRow {
    /// 1-based line number in the source file
    pub line: usize,
    pub columns: Vec<String>,
}

/// A TSV file loaded into memory
///
/// Blank lines and lines starting with `#` are dropped, as are rows with
/// fewer than `min_columns` columns.
#[derive(Debug, Clone)]
pub struct TsvTable {
    path: PathBuf,
    rows: Vec<TsvRow>,
}

impl TsvTable {
    pub fn read(path: impl AsRef<Path>, min_columns: usize) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ResemblaError::io(path, e))?;
        Ok(Self::parse(path, &content, min_columns))
    }

    pub(crate) fn parse(path: &Path, content: &str, min_columns: usize) -> Self {
        let mut rows = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
                continue;
            }
            let columns: Vec<String> = line.split('\t').map(str::to_string).collect();
            if columns.len() < min_columns {
                warn!(
                    path = %path.display(),
                    line = i + 1,
                    columns = columns.len(),
                    expected = min_columns,
                    "skipping short row"
                );
                continue;
            }
            rows.push(TsvRow {
                line: i + 1,
                columns,
            });
        }
        Self {
            path: path.to_path_buf(),
            rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[TsvRow] {
        &self.rows
    }

    /// Parse column `col` of `row` as a floating point value
    pub fn number(&self, row: &TsvRow, col: usize) -> Result<f64> {
        let raw = row.columns.get(col).map(String::as_str).unwrap_or_default();
        raw.trim().parse::<f64>().map_err(|_| {
            ResemblaError::table(
                &self.path,
                row.line,
                format!("column {} is not a number: '{}'", col + 1, raw),
            )
        })
    }
}
