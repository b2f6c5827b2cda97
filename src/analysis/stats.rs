//! Descriptive statistics over node scalars.

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScalarStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl ScalarStats {
    pub fn from_values(values: &[f64]) -> Self {
        let (mean, std_dev) = mean_std(values);
        Self {
            count: values.len(),
            mean,
            median: median(values),
            std_dev,
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean and sample standard deviation (`n - 1` divisor).
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let mean = mean(values);
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values
        .iter()
        .map(|v| {
            let d = *v - mean;
            d * d
        })
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    (mean, var.max(0.0).sqrt())
}

pub fn std_dev(values: &[f64]) -> f64 {
    mean_std(values).1
}

/// Middle value; mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
