//! Single-band 16-bit rasters and the multi-page TIFF datasets holding them.

mod dataset;

pub use dataset::{write_dataset, RasterHeader, RasterReader, RasterWriter};

/// One band of unsigned 16-bit samples, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBand {
    rows: usize,
    cols: usize,
    samples: Vec<u16>,
}

impl RasterBand {
    pub fn new(rows: usize, cols: usize, samples: Vec<u16>) -> Self {
        assert_eq!(
            samples.len(),
            rows * cols,
            "samples length must equal rows * cols"
        );
        Self {
            rows,
            cols,
            samples,
        }
    }

    pub fn new_filled(rows: usize, cols: usize, value: u16) -> Self {
        Self::new(rows, cols, vec![value; rows * cols])
    }

    /// Builds a band by evaluating `f(row, col)` for every sample.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> u16) -> Self {
        let mut samples = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                samples.push(f(row, col));
            }
        }
        Self::new(rows, cols, samples)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u16 {
        debug_assert!(row < self.rows && col < self.cols);
        self.samples[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u16) {
        debug_assert!(row < self.rows && col < self.cols);
        self.samples[row * self.cols + col] = value;
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[u16] {
        let start = row * self.cols;
        &self.samples[start..start + self.cols]
    }

    /// Rows in file order. An empty band yields no rows.
    pub fn rows_iter(&self) -> impl Iterator<Item = &[u16]> {
        // chunks_exact panics on a zero chunk size
        self.samples.chunks_exact(self.cols.max(1))
    }

    #[inline]
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn same_shape(&self, other: &RasterBand) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_is_row_major() {
        let band = RasterBand::from_fn(2, 3, |r, c| (r * 10 + c) as u16);
        assert_eq!(band.samples(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(band.get(1, 2), 12);
        assert_eq!(band.row(1), &[10, 11, 12]);
    }

    #[test]
    fn rows_iter_visits_every_row() {
        let band = RasterBand::from_fn(4, 2, |r, _| r as u16);
        let rows: Vec<&[u16]> = band.rows_iter().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], &[3, 3]);
    }

    #[test]
    fn set_updates_single_sample() {
        let mut band = RasterBand::new_filled(3, 3, 7);
        band.set(1, 2, 9);
        assert_eq!(band.get(1, 2), 9);
        assert_eq!(band.samples().iter().filter(|&&v| v == 7).count(), 8);
    }

    #[test]
    #[should_panic(expected = "samples length must equal rows * cols")]
    fn new_rejects_wrong_length() {
        RasterBand::new(2, 2, vec![0; 3]);
    }
}
