//! End-to-end pipeline tests

use std::sync::Arc;

use feature_table::{FeatureKind, FeatureTable, EXTRA_COLUMNS};
use hypercube::{
    BoundingBox, Cube, CubeError, CubeSlicer, CubeSource, DataType, Detection, InMemoryCube,
    JsonCubeFile, ObjectDetector, WavelengthMetadata,
};
use ndarray::{Array2, Array3, ArrayView3};
use preprocessor::{extract_features, ErrorKind, ExtractionConfig, Preprocessor};

fn textured_cube(rows: usize, cols: usize, bands: usize) -> Cube {
    Array3::from_shape_fn((rows, cols, bands), |(r, c, b)| {
        let seed = (r * 31 + c * 17 + b * 7) % 23;
        0.2 + 0.6 * seed as f32 / 23.0
    })
}

fn header_wavelengths(entries: &[&str]) -> Option<WavelengthMetadata> {
    Some(WavelengthMetadata::new(
        entries.iter().map(|e| e.to_string()).collect(),
    ))
}

/// Source whose load always fails, recording whether it was released
struct BrokenSource {
    released: bool,
}

impl CubeSource for BrokenSource {
    fn rows(&self) -> usize {
        10
    }

    fn cols(&self) -> usize {
        10
    }

    fn bands(&self) -> usize {
        4
    }

    fn dtype(&self) -> DataType {
        DataType::Float32
    }

    fn wavelength_metadata(&self) -> Option<&WavelengthMetadata> {
        None
    }

    fn load(&mut self) -> Result<Cube, CubeError> {
        Err(CubeError::Format("truncated cube file".to_string()))
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Detector returning fixed boxes with full masks
struct FixedDetector {
    boxes: Vec<BoundingBox>,
}

impl ObjectDetector for FixedDetector {
    fn detect(&self, cube: ArrayView3<'_, f32>) -> Result<Vec<Detection>, CubeError> {
        let (rows, cols, _) = cube.dim();
        Ok(self
            .boxes
            .iter()
            .map(|&bbox| Detection {
                bbox,
                mask: Array2::ones((rows, cols)),
            })
            .collect())
    }
}

#[test]
fn test_default_run_succeeds() {
    let mut source = InMemoryCube::new(
        textured_cube(10, 10, 4),
        header_wavelengths(&["470.0", "600.0", "750.0", "900.0"]),
    );
    let preprocessor = Preprocessor::new(ExtractionConfig::default()).unwrap();

    let row = preprocessor.run(&mut source).unwrap();

    assert_eq!(row.len(), 5 * 100);
    assert_eq!(row.columns[0], "avg_spectrum_b0");
    assert_eq!(row.columns[100], "deriv1_avg_spectrum_b0");
    assert_eq!(row.columns[200], "continuum_removed_avg_spectrum_b0");
    assert_eq!(row.columns[300], "snv_avg_spectrum_b0");
    assert_eq!(row.columns[499], "deriv1_continuum_removed_b99");
    assert!(row.values.iter().all(|v| v.is_finite()));
    assert!(source.is_released());
}

#[test]
fn test_all_background_cube_fails() {
    let mut source = InMemoryCube::new(
        Array3::zeros((10, 10, 4)),
        header_wavelengths(&["470.0", "600.0", "750.0", "900.0"]),
    );
    let preprocessor = Preprocessor::new(ExtractionConfig::with_background_removal()).unwrap();

    let err = preprocessor.run(&mut source).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackgroundRemoval);
    assert!(source.is_released());
}

#[test]
fn test_non_numeric_wavelengths_fail() {
    let mut source = InMemoryCube::new(
        textured_cube(10, 10, 4),
        header_wavelengths(&["banana", "mogging", "baby gronk", "$#*^@"]),
    );
    let preprocessor = Preprocessor::new(ExtractionConfig::default()).unwrap();

    let err = preprocessor.run(&mut source).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingMetadata);
    assert!(source.is_released());
}

#[test]
fn test_wavelength_count_mismatch_fails() {
    let mut source = InMemoryCube::new(
        textured_cube(10, 10, 4),
        header_wavelengths(&["470.0", "600.0", "900.0"]),
    );
    let preprocessor = Preprocessor::new(ExtractionConfig::default()).unwrap();

    let err = preprocessor.run(&mut source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingMetadata);
}

#[test]
fn test_missing_wavelengths_fall_back_to_range() {
    let mut source = InMemoryCube::new(textured_cube(5, 5, 8), None);
    let preprocessor = Preprocessor::new(ExtractionConfig::default()).unwrap();
    assert!(preprocessor.run(&mut source).is_ok());

    let mut source = InMemoryCube::new(textured_cube(5, 5, 8), Some(WavelengthMetadata::default()));
    assert!(preprocessor.run(&mut source).is_ok());
}

#[test]
fn test_load_failure_still_releases() {
    let mut source = BrokenSource { released: false };
    let preprocessor = Preprocessor::new(ExtractionConfig::default()).unwrap();

    let err = preprocessor.run(&mut source).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("truncated"));
    assert!(source.released);
}

#[test]
fn test_no_requested_features_fails() {
    let config = ExtractionConfig {
        extraction_methods: Vec::new(),
        ..Default::default()
    };
    let mut source = InMemoryCube::new(textured_cube(4, 4, 4), None);
    let preprocessor = Preprocessor::new(config).unwrap();

    let err = preprocessor.run(&mut source).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DataProcessing);
    assert!(source.is_released());
}

#[test]
fn test_columns_follow_evaluation_order() {
    let config = ExtractionConfig {
        extraction_methods: vec![FeatureKind::SnvAvgSpectrum, FeatureKind::AvgSpectrum],
        target_bands: 30,
        ..Default::default()
    };

    let row = extract_features(&textured_cube(3, 3, 6), None, &config).unwrap();

    assert_eq!(row.len(), 60);
    assert_eq!(row.columns[0], "avg_spectrum_b0");
    assert_eq!(row.columns[30], "snv_avg_spectrum_b0");
}

#[test]
fn test_flat_cube_features() {
    let config = ExtractionConfig {
        target_bands: 25,
        savgol_window: 5,
        ..Default::default()
    };
    let cube = Array3::from_elem((4, 4, 10), 0.5f32);

    let row = extract_features(&cube, None, &config).unwrap();

    for i in 0..25 {
        let avg = row.value(&format!("avg_spectrum_b{}", i)).unwrap();
        let continuum = row.value(&format!("continuum_removed_avg_spectrum_b{}", i)).unwrap();
        let snv = row.value(&format!("snv_avg_spectrum_b{}", i)).unwrap();
        let slope = row.value(&format!("deriv1_avg_spectrum_b{}", i)).unwrap();
        assert!((avg - 0.5).abs() < 1e-6);
        assert_eq!(continuum, 1.0);
        assert_eq!(snv, 0.0);
        assert!(slope.abs() < 1e-6);
    }
}

#[test]
fn test_extras_are_leading_nan_columns() {
    let config = ExtractionConfig {
        extra_features: true,
        extraction_methods: vec![FeatureKind::AvgSpectrum],
        target_bands: 20,
        savgol_window: 5,
        ..Default::default()
    };

    let row = extract_features(&textured_cube(3, 3, 5), None, &config).unwrap();

    assert_eq!(row.len(), EXTRA_COLUMNS.len() + 20);
    assert_eq!(row.columns[0], "record_json_id");
    assert_eq!(row.columns[10], "storage_days");
    assert!(row.values[..11].iter().all(|v| v.is_nan()));
    assert!(row.values[11..].iter().all(|v| v.is_finite()));
}

#[test]
fn test_json_cube_to_csv() {
    let (rows, cols, bands) = (3usize, 2usize, 5usize);
    let data: Vec<f32> = (0..rows * cols * bands)
        .map(|i| 0.1 + (i % 7) as f32 * 0.1)
        .collect();
    let document = serde_json::json!({
        "rows": rows,
        "cols": cols,
        "bands": bands,
        "data": data,
        "wavelengths": [450, 500, "550", 600, 650.5],
    })
    .to_string();

    let mut source = JsonCubeFile::from_reader(document.as_bytes()).unwrap();
    let config = ExtractionConfig {
        target_bands: 16,
        savgol_window: 5,
        ..Default::default()
    };
    let row = Preprocessor::new(config).unwrap().run(&mut source).unwrap();
    assert!(!source.is_open());

    let csv = FeatureTable::from_row(row).to_csv_string().unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("avg_spectrum_b0,avg_spectrum_b1,"));
    assert_eq!(header.split(',').count(), 5 * 16);
    assert_eq!(lines.next().unwrap().split(',').count(), 5 * 16);
    assert!(lines.next().is_none());

    let parsed = FeatureTable::read_csv(csv.as_bytes()).unwrap();
    assert_eq!(parsed.rows.len(), 1);
}

#[test]
fn test_batch_extraction_one_row_per_sample() {
    let detector = FixedDetector {
        boxes: vec![BoundingBox::new(0, 0, 3, 3), BoundingBox::new(3, 3, 6, 6)],
    };
    let slicer = CubeSlicer::new(Arc::new(detector));
    let config = ExtractionConfig {
        target_bands: 20,
        savgol_window: 5,
        ..Default::default()
    };
    let preprocessor = Preprocessor::new(config).unwrap();

    let table = preprocessor
        .extract_batch(&textured_cube(6, 6, 32), None, &slicer)
        .unwrap();

    assert_eq!(table.columns.len(), 5 * 20);
    assert_eq!(table.rows.len(), 2);
    assert!(table.rows.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn test_batch_without_detections_fails() {
    let slicer = CubeSlicer::new(Arc::new(FixedDetector { boxes: Vec::new() }));
    let config = ExtractionConfig {
        target_bands: 20,
        savgol_window: 5,
        ..Default::default()
    };
    let preprocessor = Preprocessor::new(config).unwrap();

    let err = preprocessor
        .extract_batch(&textured_cube(6, 6, 32), None, &slicer)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataProcessing);
}

#[test]
fn test_batch_rejects_narrow_cube() {
    let slicer = CubeSlicer::new(Arc::new(FixedDetector {
        boxes: vec![BoundingBox::new(0, 0, 2, 2)],
    }));
    let preprocessor = Preprocessor::new(ExtractionConfig {
        target_bands: 20,
        savgol_window: 5,
        ..Default::default()
    })
    .unwrap();

    let err = preprocessor
        .extract_batch(&textured_cube(4, 4, 12), None, &slicer)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
