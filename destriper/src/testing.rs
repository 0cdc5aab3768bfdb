//! Synthetic striped scenes shared by the unit tests.

use std::path::Path;

use crate::raster::{write_dataset, RasterBand};

/// A column whose detector response is `gain·v + bias` instead of `v`.
#[derive(Debug, Clone, Copy)]
pub struct Stripe {
    pub column: usize,
    pub gain: f64,
    pub bias: f64,
}

impl Stripe {
    pub fn new(column: usize, gain: f64, bias: f64) -> Self {
        Self { column, gain, bias }
    }
}

/// Clean scene: every column sees the same row profile plus a tiny
/// per-column offset, so neighbour fits have gain 1 and |bias| <= 2.
pub fn scene_value(row: usize, col: usize) -> u16 {
    1000 + ((row * 37 + (row * row) % 11) % 400) as u16 + (col % 3) as u16
}

pub fn clean_band(rows: usize, cols: usize) -> RasterBand {
    RasterBand::from_fn(rows, cols, scene_value)
}

pub fn striped_band(rows: usize, cols: usize, stripes: &[Stripe]) -> RasterBand {
    RasterBand::from_fn(rows, cols, |r, c| {
        let value = scene_value(r, c);
        match stripes.iter().find(|s| s.column == c) {
            Some(s) => (value as f64 * s.gain + s.bias)
                .round()
                .clamp(0.0, u16::MAX as f64) as u16,
            None => value,
        }
    })
}

/// Writes a multi-band scene where `stripes[b]` lists band `b`'s defects.
pub fn write_scene(path: &Path, rows: usize, cols: usize, stripes: &[Vec<Stripe>]) -> Vec<RasterBand> {
    let bands: Vec<RasterBand> = stripes
        .iter()
        .map(|s| striped_band(rows, cols, s))
        .collect();
    write_dataset(path, &bands).unwrap();
    bands
}
