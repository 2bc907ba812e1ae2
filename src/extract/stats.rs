use serde::{Deserialize, Serialize};

/// Distribution of feature values in an extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Mean weighted by intersection area; the plain mean when all areas are zero.
    pub area_weighted_mean: f64,
}

impl ValueStatistics {
    /// Statistics over `(value, area)` pairs, or None when there are none.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let (mut values, areas): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let total_area: f64 = areas.iter().sum();
        let area_weighted_mean = if total_area > 0.0 {
            values.iter().zip(&areas).map(|(v, a)| v * a).sum::<f64>() / total_area
        } else {
            mean
        };

        values.sort_by(f64::total_cmp);
        let median = if count % 2 == 1 {
            values[count / 2]
        } else {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        };

        Some(Self {
            count,
            min: values[0],
            max: values[count - 1],
            mean,
            median,
            std: variance.sqrt(),
            area_weighted_mean,
        })
    }
}
