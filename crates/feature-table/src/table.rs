//! CSV Feature Tables

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::assembler::FeatureRow;
use crate::error::AssemblyError;

/// Rows of feature values under one shared header
///
/// CSV form: one header row, then one row per record. Values are written in
/// shortest round-trip decimal form and NaN is written as an empty field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f32>>,
}

impl FeatureTable {
    /// Single-row table
    pub fn from_row(row: FeatureRow) -> Self {
        Self {
            columns: row.columns,
            rows: vec![row.values],
        }
    }

    /// Encode the table as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), AssemblyError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|&v| format_value(v)))?;
        }
        writer
            .flush()
            .map_err(|e| AssemblyError::Csv(e.to_string()))
    }

    pub fn to_csv_string(&self) -> Result<String, AssemblyError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| AssemblyError::Csv(e.to_string()))
    }

    /// Decode a CSV document written by [`FeatureTable::write_csv`]
    ///
    /// Empty fields read back as NaN.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, AssemblyError> {
        let mut reader = csv::Reader::from_reader(reader);
        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for (row_no, record) in reader.records().enumerate() {
            let record = record?;
            let values = record
                .iter()
                .enumerate()
                .map(|(col, field)| parse_value(field, row_no, col))
                .collect::<Result<Vec<f32>, AssemblyError>>()?;
            rows.push(values);
        }

        Ok(Self { columns, rows })
    }
}

fn format_value(value: f32) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_value(field: &str, row: usize, col: usize) -> Result<f32, AssemblyError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(f32::NAN);
    }
    field.parse::<f32>().map_err(|_| {
        AssemblyError::Csv(format!(
            "row {}, column {}: '{}' is not a number",
            row, col, field
        ))
    })
}
