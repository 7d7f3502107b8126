//! Regression evaluation metrics.

/// Mean squared error. Empty input yields 0.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return 0.0;
    }
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    sse / actual.len() as f64
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: the score is 1 for a perfect
/// fit and 0 otherwise, so the result is always finite.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}
