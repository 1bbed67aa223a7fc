//! Average Spectrum

use ndarray::{Array2, ArrayView2, ArrayViewD, Axis, Ix2, Ix3, Zip};

use crate::error::SpectralError;

/// Mean spectrum over the pixels selected by `mask`
///
/// A 2-D image is treated as a single-band cube and yields one value.
/// Without a mask every pixel is selected. An all-false mask yields NaN for
/// every band; callers that cannot accept that must check the mask first.
pub fn average_spectrum(
    cube: ArrayViewD<'_, f32>,
    mask: Option<ArrayView2<'_, bool>>,
) -> Result<Vec<f64>, SpectralError> {
    let cube = match cube.ndim() {
        2 => cube
            .into_dimensionality::<Ix2>()
            .map_err(|e| SpectralError::InvalidInput(e.to_string()))?
            .insert_axis(Axis(2)),
        3 => cube
            .into_dimensionality::<Ix3>()
            .map_err(|e| SpectralError::InvalidInput(e.to_string()))?,
        ndim => {
            return Err(SpectralError::InvalidInput(format!(
                "Input image data must be 2D or 3D. Got {}D",
                ndim
            )))
        }
    };

    let (rows, cols, bands) = cube.dim();
    let full;
    let mask = match mask {
        Some(mask) => {
            if mask.dim() != (rows, cols) {
                return Err(SpectralError::ShapeMismatch {
                    what: "mask pixel count",
                    expected: rows * cols,
                    actual: mask.len(),
                });
            }
            mask.reborrow()
        }
        None => {
            full = Array2::from_elem((rows, cols), true);
            full.view()
        }
    };

    let mut sums = vec![0.0f64; bands];
    let mut selected = 0usize;
    Zip::from(cube.lanes(Axis(2)))
        .and(&mask)
        .for_each(|pixel, &keep| {
            if keep {
                for (acc, &v) in sums.iter_mut().zip(pixel.iter()) {
                    *acc += v as f64;
                }
                selected += 1;
            }
        });

    let count = selected as f64;
    Ok(sums.into_iter().map(|s| s / count).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3, IxDyn};
    use proptest::prelude::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_2d_with_mask() {
        let image = array![[0.1f32, 0.2, 0.3], [0.7, 0.8, 0.9], [0.0, 0.1, 0.2]];
        let mask = array![[false, false, false], [true, true, true], [false, false, false]];
        let spectrum = average_spectrum(image.view().into_dyn(), Some(mask.view())).unwrap();
        assert_close(&spectrum, &[0.8]);
    }

    #[test]
    fn test_3d_with_mask() {
        let cube = array![
            [[0.1f32, 0.2, 0.0], [0.1, 0.2, 0.1]],
            [[0.7, 0.8, 0.6], [0.8, 0.9, 0.7]]
        ];
        let mask = array![[false, false], [true, true]];
        let spectrum = average_spectrum(cube.view().into_dyn(), Some(mask.view())).unwrap();
        assert_close(&spectrum, &[0.75, 0.85, 0.65]);
    }

    #[test]
    fn test_no_mask_selects_everything() {
        let image = array![[0.1f32, 0.2, 0.3], [0.7, 0.8, 0.9], [0.3, 0.1, 0.2]];
        let spectrum = average_spectrum(image.view().into_dyn(), None).unwrap();
        assert_close(&spectrum, &[0.4]);
    }

    #[test]
    fn test_empty_selection_is_nan() {
        let cube = Array3::<f32>::ones((2, 2, 3));
        let mask = Array2::from_elem((2, 2), false);
        let spectrum = average_spectrum(cube.view().into_dyn(), Some(mask.view())).unwrap();
        assert_eq!(spectrum.len(), 3);
        assert!(spectrum.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_mask_shape_mismatch() {
        let cube = Array3::<f32>::ones((2, 2, 3));
        let mask = Array2::from_elem((3, 2), true);
        assert!(matches!(
            average_spectrum(cube.view().into_dyn(), Some(mask.view())),
            Err(SpectralError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_rank() {
        let line = ndarray::Array1::<f32>::from(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            average_spectrum(line.view().into_dyn(), None),
            Err(SpectralError::InvalidInput(_))
        ));
        let hyper = ndarray::ArrayD::<f32>::zeros(IxDyn(&[2, 2, 2, 2]));
        assert!(matches!(
            average_spectrum(hyper.view(), None),
            Err(SpectralError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_mean_of_selected_pixels(
            (rows, cols, bands) in (1usize..5, 1usize..5, 1usize..6),
            seed in any::<u64>(),
        ) {
            let cube = Array3::from_shape_fn((rows, cols, bands), |(r, c, b)| {
                ((seed as usize).wrapping_add(r * 31 + c * 17 + b * 7) % 97) as f32 / 97.0
            });
            let mask = Array2::from_shape_fn((rows, cols), |(r, c)| {
                (r + c + (seed % 2) as usize) % 2 == 0
            });
            let spectrum = average_spectrum(cube.view().into_dyn(), Some(mask.view())).unwrap();
            prop_assert_eq!(spectrum.len(), bands);

            let picked: Vec<(usize, usize)> = mask
                .indexed_iter()
                .filter(|(_, keep)| **keep)
                .map(|(idx, _)| idx)
                .collect();
            for b in 0..bands {
                if picked.is_empty() {
                    prop_assert!(spectrum[b].is_nan());
                } else {
                    let expected = picked.iter().map(|&(r, c)| cube[[r, c, b]] as f64).sum::<f64>()
                        / picked.len() as f64;
                    prop_assert!((spectrum[b] - expected).abs() < 1e-9);
                }
            }
        }
    }
}
