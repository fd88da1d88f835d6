/// Per-feature standardisation fitted on one partition.
///
/// Uses the population standard deviation; a constant feature is centred but
/// not rescaled. Once fitted, the statistics never change: evaluation rows
/// are transformed with the training mean and deviation.
///
/// # Examples
/// ```
/// use flowshark_core::experiment::scale::StandardScaler;
///
/// let scaler = StandardScaler::fit(&[vec![40.0], vec![60.0]]);
/// assert_eq!(scaler.means(), [50.0]);
/// assert_eq!(scaler.scales(), [10.0]);
/// assert_eq!(scaler.transform(&[vec![60.0]]), vec![vec![1.0]]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on `rows`; an empty input yields an identity transform of width 0.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let count = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= count;
        }

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((var, value), mean) in scales.iter_mut().zip(row).zip(&means) {
                *var += (value - mean).powi(2);
            }
        }
        for scale in &mut scales {
            let std = (*scale / count).sqrt();
            *scale = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        }
        Self { means, scales }
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(value, (mean, scale))| (value - mean) / scale)
                    .collect()
            })
            .collect()
    }
}
