//! Data processing for water time series.
//!
//! This crate turns raw observation series into the shapes a sequence
//! model trains on: gap-free daily series, min/max normalized values, and
//! sliding training windows.

use thiserror::Error;

/// Errors from the data preparation steps.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum DataError {
    /// The series is too short for the requested operation.
    #[error("insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Series(#[from] wrm_core::SeriesError),
}

/// Min/max scaling to `[0, 1]`.
pub mod normalize {
    use super::DataError;
    use serde::{Deserialize, Serialize};

    /// Observed range of a training series.
    ///
    /// Computed once at train time and stored with the trained model; the
    /// same parameters are reused for every inference on that model.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct NormalizationParams {
        pub min: f64,
        pub max: f64,
    }

    impl NormalizationParams {
        /// `max - min`, or 1 for a constant series.
        pub fn range(&self) -> f64 {
            let range = self.max - self.min;
            if range == 0.0 {
                1.0
            } else {
                range
            }
        }

        pub fn normalize_value(&self, x: f64) -> f64 {
            (x - self.min) / self.range()
        }

        pub fn denormalize_value(&self, x: f64) -> f64 {
            x * self.range() + self.min
        }
    }

    /// Scan `series` once for its min and max.
    pub fn fit(series: &[f64]) -> Result<NormalizationParams, DataError> {
        if series.is_empty() {
            return Err(DataError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        let (min, max) = series
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        Ok(NormalizationParams { min, max })
    }

    /// Scale into `[0, 1]`. Values outside the fitted range land outside
    /// `[0, 1]`; nothing is clamped.
    pub fn normalize(series: &[f64], params: &NormalizationParams) -> Vec<f64> {
        series.iter().map(|&x| params.normalize_value(x)).collect()
    }

    pub fn denormalize(series: &[f64], params: &NormalizationParams) -> Vec<f64> {
        series.iter().map(|&x| params.denormalize_value(x)).collect()
    }

}

/// Sliding-window supervised training sets.
pub mod window {
    use super::DataError;
    use serde::{Deserialize, Serialize};

    /// One supervised example: `input` is `W` timesteps of a single feature,
    /// `target` the `L` values that follow.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TrainingWindow {
        pub input: Vec<f64>,
        pub target: Vec<f64>,
    }

    /// Number of windows a series of `len` points yields:
    /// `max(0, len - W - L + 1)`.
    pub fn window_count(len: usize, window_size: usize, look_ahead: usize) -> usize {
        (len + 1).saturating_sub(window_size + look_ahead)
    }

    /// Slide a `W + L` window over `series` with stride 1.
    ///
    /// A series shorter than `W + L` cannot train anything and is an error,
    /// not an empty training set.
    pub fn build_training_set(
        series: &[f64],
        window_size: usize,
        look_ahead: usize,
    ) -> Result<Vec<TrainingWindow>, DataError> {
        if window_size == 0 || look_ahead == 0 {
            return Err(DataError::InvalidParameter(format!(
                "window size ({window_size}) and look-ahead ({look_ahead}) must be positive"
            )));
        }
        let span = window_size + look_ahead;
        if series.len() < span {
            return Err(DataError::InsufficientData {
                required: span,
                actual: series.len(),
            });
        }
        Ok(series
            .windows(span)
            .map(|w| TrainingWindow {
                input: w[..window_size].to_vec(),
                target: w[window_size..].to_vec(),
            })
            .collect())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_window_count_formula() {
            for n in 0..20 {
                for w in 1..6 {
                    for l in 1..3 {
                        let expected = (n as i64 - w as i64 - l as i64 + 1).max(0) as usize;
                        assert_eq!(window_count(n, w, l), expected);
                        match build_training_set(&vec![0.5; n], w, l) {
                            Ok(windows) => assert_eq!(windows.len(), expected),
                            Err(DataError::InsufficientData { required, actual }) => {
                                assert_eq!(expected, 0);
                                assert_eq!(required, w + l);
                                assert_eq!(actual, n);
                            }
                            Err(e) => panic!("unexpected error {e}"),
                        }
                    }
                }
            }
        }

        #[test]
        fn test_window_contents() {
            let series: Vec<f64> = (0..6).map(|i| i as f64).collect();
            let windows = build_training_set(&series, 3, 2).unwrap();
            assert_eq!(windows.len(), 2);
            assert_eq!(windows[0].input, vec![0.0, 1.0, 2.0]);
            assert_eq!(windows[0].target, vec![3.0, 4.0]);
            assert_eq!(windows[1].input, vec![1.0, 2.0, 3.0]);
            assert_eq!(windows[1].target, vec![4.0, 5.0]);
        }

        #[test]
        fn test_exactly_one_window() {
            let windows = build_training_set(&[1.0; 8], 7, 1).unwrap();
            assert_eq!(windows.len(), 1);
        }

        #[test]
        fn test_zero_sizes_rejected() {
            assert!(matches!(
                build_training_set(&[1.0; 8], 0, 1),
                Err(DataError::InvalidParameter(_))
            ));
            assert!(matches!(
                build_training_set(&[1.0; 8], 3, 0),
                Err(DataError::InvalidParameter(_))
            ));
        }
    }
}

/// Linear interpolation for filling gaps in observation data.
pub mod interpolation {
    use super::DataError;
    use wrm_core::{TimeSeries, TimeSeriesPoint};

    /// Daily points from `start` to `end` inclusive on the straight line
    /// between them. A non-increasing date pair yields just `start`.
    pub fn interpolate_pair(start: &TimeSeriesPoint, end: &TimeSeriesPoint) -> Vec<TimeSeriesPoint> {
        let days = (end.date - start.date).num_days();
        if days <= 0 {
            return vec![*start];
        }
        let slope = (end.value - start.value) / days as f64;
        (0..=days)
            .map(|i| {
                TimeSeriesPoint::new(start.date + chrono::Duration::days(i), start.value + slope * i as f64)
            })
            .collect()
    }

    /// Fill missing days of a date-sorted slice by linear interpolation.
    /// Values are not rounded.
    pub fn fill_gaps(points: &[TimeSeriesPoint]) -> Vec<TimeSeriesPoint> {
        let mut result = Vec::with_capacity(points.len());
        for pair in points.windows(2) {
            let mut span = interpolate_pair(&pair[0], &pair[1]);
            if span.len() > 1 {
                // the end point opens the next pair
                span.pop();
            }
            result.append(&mut span);
        }
        result.extend(points.last().copied());
        result
    }

    /// A gap-free daily copy of `series`.
    pub fn fill_series(series: &TimeSeries) -> Result<TimeSeries, DataError> {
        let filled = fill_gaps(series.points());
        let added = filled.len() - series.len();
        if added > 0 {
            log::debug!("interpolation: filled {} missing days", added);
        }
        Ok(TimeSeries::new(filled)?)
    }

}
