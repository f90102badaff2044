//! Corpus tables
//!
//! A corpus is a TSV file with one entry per row. Column positions are
//! 1-based; position 0 disables the optional id and attribute columns.

use crate::error::{ResemblaError, Result};
use crate::table::TsvTable;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where each field lives in a corpus row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusColumns {
    pub id_col: usize,
    pub text_col: usize,
    pub features_col: usize,
}

impl Default for CorpusColumns {
    fn default() -> Self {
        Self {
            id_col: 0,
            text_col: 1,
            features_col: 2,
        }
    }
}

/// One corpus row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub id: Option<i64>,
    pub text: String,
    /// Raw attribute column, e.g. `keyword=a,b`
    pub attributes: Option<String>,
}

impl CorpusEntry {
    /// Text with its attribute column re-attached, as preprocessors expect
    /// for original texts
    pub fn original(&self) -> String {
        with_attributes(&self.text, self.attributes.as_deref())
    }
}

/// `text\tattributes`, or the text alone
pub fn with_attributes(text: &str, attributes: Option<&str>) -> String {
    match attributes {
        Some(attributes) => format!("{}\t{}", text, attributes),
        None => text.to_string(),
    }
}

/// Read corpus entries; rows without a text column are skipped
pub fn load_corpus(path: impl AsRef<Path>, columns: CorpusColumns) -> Result<Vec<CorpusEntry>> {
    if columns.text_col == 0 {
        return Err(ResemblaError::Config("text_col must be 1 or greater".into()));
    }
    let table = TsvTable::read(path, columns.text_col)?;

    let mut entries = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        let field = |col: usize| (col > 0).then(|| row.columns.get(col - 1)).flatten();

        let id = match field(columns.id_col) {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                ResemblaError::table(table.path(), row.line, format!("invalid id '{}'", raw))
            })?),
            None => None,
        };
        entries.push(CorpusEntry {
            id,
            text: row.columns[columns.text_col - 1].clone(),
            attributes: field(columns.features_col).cloned(),
        });
    }
    Ok(entries)
}
