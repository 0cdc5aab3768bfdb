//! One-directional walk over adjacent column pairs.
//!
//! The forward scanner compares `(c, c + 1)` left to right and blames `c + 1`
//! when the pair is inconsistent. The backward scanner compares `(c, c - 1)`
//! right to left and blames `c - 1`. A real stripe at `k` upsets both pairs
//! touching it, so each direction reports `k` plus one of its neighbours; the
//! consensus step keeps what both agree on.

use strum_macros::Display;

use crate::column_cache::ColumnCache;
use crate::config::{ColumnRange, QualityThresholds};
use crate::regression::{self, Regression};
use crate::stop::{StopToken, Stopped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScanDirection {
    Forward,
    Backward,
}

/// A column one scanner considers suspicious, with the regression of the
/// pair that raised it (x = the column being visited, y = `column`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultCandidate {
    pub column: usize,
    pub regression: Regression,
}

#[derive(Debug, Clone)]
pub struct DirectionalScanner<'a> {
    cache: &'a ColumnCache,
    range: ColumnRange,
    direction: ScanDirection,
    thresholds: QualityThresholds,
}

impl<'a> DirectionalScanner<'a> {
    pub fn new(
        cache: &'a ColumnCache,
        range: ColumnRange,
        direction: ScanDirection,
        thresholds: QualityThresholds,
    ) -> Self {
        assert!(
            range.end <= cache.cols(),
            "column range {}..{} exceeds {} columns",
            range.start,
            range.end,
            cache.cols()
        );
        Self {
            cache,
            range,
            direction,
            thresholds,
        }
    }

    pub fn direction(&self) -> ScanDirection {
        self.direction
    }

    /// Number of pairs this scanner compares.
    pub fn pair_count(&self) -> usize {
        self.range.pair_count()
    }

    /// `(visited, compared_with)` columns of the `step`-th comparison.
    #[inline]
    fn pair(&self, step: usize) -> (usize, usize) {
        match self.direction {
            ScanDirection::Forward => {
                let column = self.range.start + step;
                (column, column + 1)
            }
            ScanDirection::Backward => {
                let column = self.range.end - 1 - step;
                (column, column - 1)
            }
        }
    }

    /// Walks the range in order, checking `stop` before every pair.
    ///
    /// `on_progress(visited, total)` is called after each pair.
    pub fn scan<F>(&self, stop: &StopToken, mut on_progress: F) -> Result<Vec<FaultCandidate>, Stopped>
    where
        F: FnMut(usize, usize),
    {
        let total = self.pair_count();
        let mut candidates = Vec::new();

        for step in 0..total {
            if stop.is_requested() {
                tracing::debug!(direction = %self.direction, step, "Scanner stopped");
                return Err(Stopped);
            }

            let (visited, neighbour) = self.pair(step);
            let fit = regression::fit(self.cache.column(visited), self.cache.column(neighbour));
            if !regression::judge(fit.as_ref(), &self.thresholds) {
                // judge only rejects determinate fits
                if let Some(regression) = fit {
                    tracing::debug!(
                        direction = %self.direction,
                        column = neighbour,
                        gain = regression.gain,
                        bias = regression.bias,
                        "Potential bad column"
                    );
                    candidates.push(FaultCandidate {
                        column: neighbour,
                        regression,
                    });
                }
            }

            on_progress(step + 1, total);
        }

        Ok(candidates)
    }
}

/// Runs one uninterruptible scan without progress reporting.
pub fn scan(
    cache: &ColumnCache,
    range: ColumnRange,
    direction: ScanDirection,
    thresholds: QualityThresholds,
) -> Vec<FaultCandidate> {
    let scanner = DirectionalScanner::new(cache, range, direction, thresholds);
    // a fresh token is never requested
    scanner.scan(&StopToken::new(), |_, _| {}).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{clean_band, striped_band, Stripe};

    fn columns(candidates: &[FaultCandidate]) -> Vec<usize> {
        candidates.iter().map(|c| c.column).collect()
    }

    fn striped_cache() -> ColumnCache {
        ColumnCache::build(&striped_band(80, 30, &[Stripe::new(10, 1.5, 200.0)]))
    }

    #[test]
    fn test_clean_band_has_no_candidates() {
        let cache = ColumnCache::build(&clean_band(80, 30));
        let range = ColumnRange::full(30);
        for direction in [ScanDirection::Forward, ScanDirection::Backward] {
            let found = scan(&cache, range, direction, QualityThresholds::default());
            assert!(found.is_empty(), "{direction}: {:?}", columns(&found));
        }
    }

    #[test]
    fn test_forward_blames_stripe_and_right_neighbour() {
        let cache = striped_cache();
        let found = scan(
            &cache,
            ColumnRange::full(30),
            ScanDirection::Forward,
            QualityThresholds::default(),
        );
        assert_eq!(columns(&found), vec![10, 11]);
        // pair (9, 10): stripe is y
        assert!((found[0].regression.gain - 1.5).abs() < 0.01);
    }

    #[test]
    fn test_backward_blames_stripe_and_left_neighbour() {
        let cache = striped_cache();
        let found = scan(
            &cache,
            ColumnRange::full(30),
            ScanDirection::Backward,
            QualityThresholds::default(),
        );
        assert_eq!(columns(&found), vec![10, 9]);
        // pair (11, 10): stripe is y
        assert!((found[0].regression.gain - 1.5).abs() < 0.01);
        // pair (10, 9): stripe is x
        assert!((found[1].regression.gain - 1.0 / 1.5).abs() < 0.01);
    }

    #[test]
    fn test_range_limits_the_walk() {
        let cache = striped_cache();
        let thresholds = QualityThresholds::default();

        let outside = ColumnRange::new(12, 30);
        assert!(scan(&cache, outside, ScanDirection::Forward, thresholds).is_empty());
        assert!(scan(&cache, outside, ScanDirection::Backward, thresholds).is_empty());

        let ending_on_stripe = ColumnRange::new(0, 11);
        assert_eq!(
            columns(&scan(&cache, ending_on_stripe, ScanDirection::Forward, thresholds)),
            vec![10]
        );
        assert_eq!(
            columns(&scan(&cache, ending_on_stripe, ScanDirection::Backward, thresholds)),
            vec![9]
        );
    }

    #[test]
    fn test_progress_reaches_total_in_order() {
        let cache = striped_cache();
        let scanner = DirectionalScanner::new(
            &cache,
            ColumnRange::full(30),
            ScanDirection::Backward,
            QualityThresholds::default(),
        );

        let mut seen = Vec::new();
        scanner
            .scan(&StopToken::new(), |visited, total| seen.push((visited, total)))
            .unwrap();

        assert_eq!(seen.len(), 29);
        assert!(seen.windows(2).all(|w| w[0].0 + 1 == w[1].0));
        assert_eq!(seen.last(), Some(&(29, 29)));
    }

    #[test]
    fn test_stop_interrupts_scan() {
        let cache = striped_cache();
        let scanner = DirectionalScanner::new(
            &cache,
            ColumnRange::full(30),
            ScanDirection::Forward,
            QualityThresholds::default(),
        );
        let stop = StopToken::new();

        let mut visited = 0;
        let result = scanner.scan(&stop, |v, _| {
            visited = v;
            if v == 5 {
                stop.request();
            }
        });

        assert_eq!(result, Err(Stopped));
        assert_eq!(visited, 5);
    }

    #[test]
    fn test_single_column_range_compares_nothing() {
        let cache = striped_cache();
        let scanner = DirectionalScanner::new(
            &cache,
            ColumnRange::new(10, 11),
            ScanDirection::Forward,
            QualityThresholds::default(),
        );
        assert_eq!(scanner.pair_count(), 0);
        assert_eq!(scanner.scan(&StopToken::new(), |_, _| {}), Ok(vec![]));
    }
}
