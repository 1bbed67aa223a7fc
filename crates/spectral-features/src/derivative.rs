//! Savitzky-Golay First Derivative

use crate::error::SpectralError;

/// Smoothed first derivative of `spectrum` with unit sample spacing
///
/// Interior samples use the convolution coefficients of a centred
/// least-squares polynomial of order `polyorder` over `window` samples. The
/// first and last `window / 2` samples take the derivative of a polynomial
/// fitted to the first and last `window` samples respectively.
pub fn savgol_derivative(
    spectrum: &[f64],
    window: usize,
    polyorder: usize,
) -> Result<Vec<f64>, SpectralError> {
    if window == 0 || window % 2 == 0 {
        return Err(SpectralError::InvalidParameters(format!(
            "window length must be a positive odd number, got {}",
            window
        )));
    }
    if polyorder >= window {
        return Err(SpectralError::InvalidParameters(format!(
            "polynomial order {} must be less than window length {}",
            polyorder, window
        )));
    }
    if window > spectrum.len() {
        return Err(SpectralError::InvalidParameters(format!(
            "window length {} exceeds spectrum length {}",
            window,
            spectrum.len()
        )));
    }

    let len = spectrum.len();
    let half = window / 2;
    let offsets: Vec<f64> = (0..window).map(|j| j as f64 - half as f64).collect();

    let mut derivative = vec![0.0; len];
    if polyorder == 0 {
        return Ok(derivative);
    }

    // coefficient j is the slope at 0 of the fit to a unit impulse at j
    let mut coefficients = Vec::with_capacity(window);
    let mut impulse = vec![0.0; window];
    for j in 0..window {
        impulse[j] = 1.0;
        coefficients.push(fit_polynomial(&offsets, &impulse, polyorder)?[1]);
        impulse[j] = 0.0;
    }

    for i in half..len - half {
        let neighbourhood = &spectrum[i - half..=i + half];
        derivative[i] = coefficients
            .iter()
            .zip(neighbourhood)
            .map(|(c, y)| c * y)
            .sum();
    }

    let head = fit_polynomial(&offsets, &spectrum[..window], polyorder)?;
    for (i, slot) in derivative.iter_mut().take(half).enumerate() {
        *slot = polynomial_slope(&head, offsets[i]);
    }

    let tail = fit_polynomial(&offsets, &spectrum[len - window..], polyorder)?;
    for k in 0..half {
        derivative[len - half + k] = polynomial_slope(&tail, offsets[window - half + k]);
    }

    Ok(derivative)
}

/// Derivative of `sum c_k t^k` at `t`
fn polynomial_slope(coefficients: &[f64], t: f64) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| k as f64 * c * t.powi(k as i32 - 1))
        .sum()
}

/// Least-squares polynomial coefficients (lowest order first)
fn fit_polynomial(ts: &[f64], ys: &[f64], order: usize) -> Result<Vec<f64>, SpectralError> {
    let size = order + 1;

    // normal equations: (A^T A) c = A^T y with A[j][k] = t_j^k
    let mut matrix = vec![vec![0.0; size + 1]; size];
    for (&t, &y) in ts.iter().zip(ys) {
        let powers: Vec<f64> = (0..=2 * order).map(|p| t.powi(p as i32)).collect();
        for (r, row) in matrix.iter_mut().enumerate() {
            for c in 0..size {
                row[c] += powers[r + c];
            }
            row[size] += powers[r] * y;
        }
    }

    solve_augmented(matrix)
}

/// Gaussian elimination with partial pivoting on an augmented matrix
fn solve_augmented(mut matrix: Vec<Vec<f64>>) -> Result<Vec<f64>, SpectralError> {
    let size = matrix.len();

    for col in 0..size {
        let pivot = (col..size)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);
        if matrix[pivot][col].abs() < 1e-12 {
            return Err(SpectralError::InvalidParameters(
                "polynomial fit is singular".to_string(),
            ));
        }
        matrix.swap(col, pivot);

        for row in col + 1..size {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=size {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (matrix[row][size] - tail) / matrix[row][row];
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tolerance, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_linear_signal_has_constant_slope() {
        let spectrum: Vec<f64> = (0..15).map(|i| 3.0 + 2.0 * i as f64).collect();
        let derivative = savgol_derivative(&spectrum, 5, 2).unwrap();
        assert_close(&derivative, &[2.0; 15], 1e-9);
    }

    #[test]
    fn test_quadratic_is_exact_with_order_two() {
        let spectrum: Vec<f64> = (0..12).map(|i| (i * i) as f64).collect();
        let derivative = savgol_derivative(&spectrum, 7, 2).unwrap();
        let expected: Vec<f64> = (0..12).map(|i| 2.0 * i as f64).collect();
        assert_close(&derivative, &expected, 1e-8);
    }

    #[test]
    fn test_classic_five_point_coefficients() {
        // window 5, order 2: [-2, -1, 0, 1, 2] / 10
        let spectrum = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let derivative = savgol_derivative(&spectrum, 5, 2).unwrap();
        assert!((derivative[3] - (-0.1)).abs() < 1e-12);
        assert!((derivative[4] - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_order_zero_is_flat() {
        let spectrum = [1.0, 4.0, 2.0, 8.0, 5.0];
        let derivative = savgol_derivative(&spectrum, 3, 0).unwrap();
        assert_eq!(derivative, vec![0.0; 5]);
    }

    #[test]
    fn test_window_equal_to_length() {
        let spectrum = [1.0, 2.0, 3.0];
        let derivative = savgol_derivative(&spectrum, 3, 1).unwrap();
        assert_close(&derivative, &[1.0, 1.0, 1.0], 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        let spectrum = [0.0; 10];
        assert!(savgol_derivative(&spectrum, 4, 2).is_err());
        assert!(savgol_derivative(&spectrum, 0, 0).is_err());
        assert!(savgol_derivative(&spectrum, 5, 5).is_err());
        assert!(savgol_derivative(&spectrum, 11, 2).is_err());
    }
}
