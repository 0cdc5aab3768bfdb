//! Column-major copy of one band.
//!
//! Raster formats are read row by row, while the scanners compare whole
//! columns over and over. One transpose pass up front turns every column
//! lookup into a slice borrow.

use crate::raster::RasterBand;

/// Immutable column-major samples of a single band.
///
/// Shared read-only by both scanners. Dropped when the band is done so only
/// one band is held at a time.
#[derive(Debug, Clone)]
pub struct ColumnCache {
    rows: usize,
    cols: usize,
    /// Column `c` occupies `samples[c * rows..(c + 1) * rows]`.
    samples: Vec<u16>,
}

impl ColumnCache {
    /// Transposes `band`, visiting its rows in file order.
    pub fn build(band: &RasterBand) -> Self {
        let rows = band.rows();
        let cols = band.cols();
        let mut samples = vec![0u16; rows * cols];

        for (r, row) in band.rows_iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                samples[c * rows + r] = value;
            }
        }

        tracing::debug!(rows, cols, "Built column cache");

        Self {
            rows,
            cols,
            samples,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Samples of column `col`, top to bottom.
    #[inline]
    pub fn column(&self, col: usize) -> &[u16] {
        assert!(
            col < self.cols,
            "column {} out of range for {} columns",
            col,
            self.cols
        );
        let start = col * self.rows;
        &self.samples[start..start + self.rows]
    }
}
