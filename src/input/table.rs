//! In-memory CSV tables that keep every original column

use crate::error::{MediaTopicsError, Result};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers.iter().position(|h| h == name).ok_or_else(|| {
            MediaTopicsError::InvalidInput(format!(
                "Column '{}' not found. Available columns: {}",
                name,
                self.headers.join(", ")
            ))
        })
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(String::as_str)
    }

    pub fn column(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |r| r[column].as_str())
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Vec<String>) -> bool,
    {
        self.rows.retain(keep);
    }

    /// Rewrite one column in place; rows for which `update` yields `None` are dropped
    pub fn filter_map_column<F>(&mut self, column: usize, mut update: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .filter_map(|mut row| {
                let value = update(&row[column])?;
                row[column] = value;
                Some(row)
            })
            .collect();
    }

    pub fn add_column<T: ToString>(&mut self, name: &str, values: &[T]) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(MediaTopicsError::InvalidInput(format!(
                "Column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value.to_string());
        }
        Ok(())
    }
}
