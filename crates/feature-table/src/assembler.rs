//! Feature Row Assembler

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AssemblyError;
use crate::kind::FeatureKind;
use crate::table::FeatureTable;

/// Placeholder metadata columns emitted ahead of the spectral columns
pub const EXTRA_COLUMNS: [&str; 11] = [
    "record_json_id",
    "original_file_ref",
    "fruit",
    "day",
    "side",
    "camera_type",
    "ripeness_state",
    "ripeness_state_fine",
    "firmness",
    "init_weight",
    "storage_days",
];

/// Feature vectors keyed by kind, kept in insertion order
///
/// Insertion order decides column order in the assembled row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    entries: Vec<(FeatureKind, Vec<f64>)>,
}

impl FeatureSet {
    /// Create an empty feature set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature; replacing an existing kind keeps its original position
    pub fn insert(&mut self, kind: FeatureKind, values: Vec<f64>) {
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = values,
            None => self.entries.push((kind, values)),
        }
    }

    pub fn get(&self, kind: FeatureKind) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains(&self, kind: FeatureKind) -> bool {
        self.get(kind).is_some()
    }

    /// Kinds in insertion order
    pub fn kinds(&self) -> Vec<FeatureKind> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One named record of 32-bit feature values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Column names, in output order
    pub columns: Vec<String>,
    /// One value per column; placeholders are NaN
    pub values: Vec<f32>,
}

impl FeatureRow {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value of the named column
    pub fn value(&self, column: &str) -> Option<f32> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx).copied())
    }
}

/// Assemble one feature set into a single row
pub fn assemble(
    features: &FeatureSet,
    target_bands: usize,
    include_extras: bool,
) -> Result<FeatureRow, AssemblyError> {
    let kinds = features.kinds();
    Ok(FeatureRow {
        columns: header(&kinds, target_bands, include_extras),
        values: row_values(features, &kinds, target_bands, include_extras)?,
    })
}

/// Assemble feature sets sharing the same kinds into one table
///
/// The header follows the first set's insertion order; later sets may
/// hold the same kinds in any order.
pub fn assemble_batch(
    batch: &[FeatureSet],
    target_bands: usize,
    include_extras: bool,
) -> Result<FeatureTable, AssemblyError> {
    let first = batch.first().ok_or(AssemblyError::EmptyBatch)?;
    let kinds = first.kinds();

    let mut rows = Vec::with_capacity(batch.len());
    for (index, features) in batch.iter().enumerate() {
        if features.len() != kinds.len() || !kinds.iter().all(|k| features.contains(*k)) {
            return Err(AssemblyError::KeyMismatch {
                index,
                expected: kinds,
                found: features.kinds(),
            });
        }
        rows.push(row_values(features, &kinds, target_bands, include_extras)?);
    }

    debug!(
        rows = rows.len(),
        kinds = kinds.len(),
        target_bands,
        "Assembled feature table"
    );

    Ok(FeatureTable {
        columns: header(&kinds, target_bands, include_extras),
        rows,
    })
}

fn header(kinds: &[FeatureKind], target_bands: usize, include_extras: bool) -> Vec<String> {
    let extras = if include_extras { EXTRA_COLUMNS.len() } else { 0 };
    let mut columns = Vec::with_capacity(extras + kinds.len() * target_bands);

    if include_extras {
        columns.extend(EXTRA_COLUMNS.iter().map(|c| c.to_string()));
    }
    for kind in kinds {
        columns.extend((0..target_bands).map(|i| kind.column_name(i)));
    }
    columns
}

fn row_values(
    features: &FeatureSet,
    kinds: &[FeatureKind],
    target_bands: usize,
    include_extras: bool,
) -> Result<Vec<f32>, AssemblyError> {
    let mut values = Vec::with_capacity(EXTRA_COLUMNS.len() + kinds.len() * target_bands);

    if include_extras {
        values.extend(std::iter::repeat(f32::NAN).take(EXTRA_COLUMNS.len()));
    }
    for &kind in kinds {
        let vector = features.get(kind).unwrap_or_default();
        if vector.len() != target_bands {
            return Err(AssemblyError::ShapeMismatch {
                kind,
                expected: target_bands,
                actual: vector.len(),
            });
        }
        values.extend(vector.iter().map(|&v| v as f32));
    }
    Ok(values)
}
