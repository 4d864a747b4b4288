//! Movie catalog: the fixed mapping from dense arm index to item label.

use crate::error::{BanditError, BanditResult};
use crate::tabular::split_record;
use crate::types::ArmIndex;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub title: String,
}

/// Ordered, non-empty list of items. Position in the list is the arm index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> BanditResult<Self> {
        if items.is_empty() {
            return Err(BanditError::InvalidConfiguration(
                "catalog must contain at least one item".into(),
            ));
        }
        if let Some(item) = items.iter().find(|i| i.title.contains(['\n', '\r'])) {
            return Err(BanditError::Catalog(format!(
                "movie {} has a line break in its title",
                item.id
            )));
        }
        Ok(Self { items })
    }

    /// Build a catalog from bare titles, numbering ids from 1.
    pub fn from_titles<I, S>(titles: I) -> BanditResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| CatalogItem {
                id: i as u64 + 1,
                title: title.into(),
            })
            .collect();
        Self::new(items)
    }

    /// Load a catalog from a CSV file with `movieId` (or `id`) and `title`
    /// columns, keeping at most `limit` rows in file order.
    pub fn load(path: &Path, limit: Option<usize>) -> BanditResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            BanditError::Catalog(format!("cannot open {}: {e}", path.display()))
        })?;
        let catalog = Self::from_reader(std::io::BufReader::new(file), limit)?;
        info!(
            path = %path.display(),
            items = catalog.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_reader<R: BufRead>(reader: R, limit: Option<usize>) -> BanditResult<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(BanditError::Catalog("catalog file is empty".into())),
        };
        // Spreadsheet exports often start with a byte order mark.
        let header = header.trim_start_matches('\u{feff}');
        let columns = split_record(header)
            .ok_or_else(|| BanditError::Catalog("malformed header line".into()))?;
        let find = |names: &[&str]| {
            columns
                .iter()
                .position(|c| names.iter().any(|n| c.trim().eq_ignore_ascii_case(n)))
        };
        let id_col = find(&["movieId", "id"])
            .ok_or_else(|| BanditError::Catalog("missing 'movieId' column".into()))?;
        let title_col = find(&["title"])
            .ok_or_else(|| BanditError::Catalog("missing 'title' column".into()))?;

        let limit = limit.unwrap_or(usize::MAX);
        let mut items = Vec::new();

        for (line_no, line) in lines.enumerate() {
            if items.len() >= limit {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Header is line 1.
            let line_no = line_no + 2;
            let fields = split_record(&line).ok_or_else(|| {
                BanditError::Catalog(format!("line {line_no}: unterminated quoted field"))
            })?;
            let id = fields
                .get(id_col)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or_else(|| BanditError::Catalog(format!("line {line_no}: invalid movie id")))?;
            let title = fields
                .get(title_col)
                .map(|t| t.trim().to_string())
                .ok_or_else(|| BanditError::Catalog(format!("line {line_no}: missing title")))?;
            debug!(id, title = %title, "Catalog item");
            items.push(CatalogItem { id, title });
        }

        Self::new(items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: ArmIndex) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    /// Display label for an arm; out-of-range indices yield `<unknown>`.
    pub fn label(&self, index: ArmIndex) -> &str {
        self.items
            .get(index)
            .map(|i| i.title.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.title.as_str())
    }
}
