use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::super::domain::LeadRecord;
use crate::config::DEFAULT_TERRITORY_FIELD;

/// Fixed mapping from a record attribute (e.g. region) to an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryTable {
    field: String,
    entries: HashMap<String, String>,
}

impl Default for TerritoryTable {
    fn default() -> Self {
        Self::new(DEFAULT_TERRITORY_FIELD)
    }
}

#[derive(Debug, Deserialize)]
struct TerritoryRow {
    territory: String,
    assignee: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TerritoryImportError {
    #[error("failed to open territory file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse territory CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("territory row {row} is missing a territory or assignee")]
    IncompleteRow { row: usize },
}

impl TerritoryTable {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            entries: HashMap::new(),
        }
    }

    pub fn with_entry(mut self, territory: &str, assignee: &str) -> Self {
        self.insert(territory, assignee);
        self
    }

    pub fn insert(&mut self, territory: &str, assignee: &str) {
        self.entries
            .insert(normalize(territory), assignee.trim().to_string());
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owner for the record's territory attribute, if mapped.
    pub fn lookup(&self, record: &LeadRecord) -> Option<(&str, &str)> {
        let value = record.attribute(&self.field)?.to_string();
        let key = normalize(&value);
        self.entries
            .get_key_value(&key)
            .map(|(territory, assignee)| (territory.as_str(), assignee.as_str()))
    }

    /// Load a `territory,assignee` CSV with headers.
    pub fn from_reader<R: Read>(reader: R, field: &str) -> Result<Self, TerritoryImportError> {
        let mut table = Self::new(field);
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        for (index, row) in csv_reader.deserialize::<TerritoryRow>().enumerate() {
            let row = row?;
            if row.territory.is_empty() || row.assignee.is_empty() {
                return Err(TerritoryImportError::IncompleteRow { row: index + 1 });
            }
            table.insert(&row.territory, &row.assignee);
        }

        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P, field: &str) -> Result<Self, TerritoryImportError> {
        let file = File::open(path)?;
        Self::from_reader(file, field)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn imports_csv_and_matches_case_insensitively() {
        let csv = "territory,assignee\nWest, dana\nnortheast,eli\n";
        let table = TerritoryTable::from_reader(Cursor::new(csv), "region").expect("csv imports");
        assert_eq!(table.len(), 2);

        let record = LeadRecord::new("lead-1").with_attribute("region", " WEST ");
        assert_eq!(table.lookup(&record), Some(("west", "dana")));

        let unmapped = LeadRecord::new("lead-2").with_attribute("region", "south");
        assert_eq!(table.lookup(&unmapped), None);
    }

    #[test]
    fn rejects_blank_rows() {
        let csv = "territory,assignee\nwest,\n";
        match TerritoryTable::from_reader(Cursor::new(csv), "region") {
            Err(TerritoryImportError::IncompleteRow { row }) => assert_eq!(row, 1),
            other => panic!("expected incomplete row, got {other:?}"),
        }
    }
}
