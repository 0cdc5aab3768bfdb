//! Audit mask of the pixels a correction touched.

use crate::raster::RasterBand;

/// Mask value of a sample the correction changed.
pub const MASK_CHANGED: u16 = u16::MAX;
/// Mask value of an untouched sample.
pub const MASK_UNCHANGED: u16 = 0;

/// Marks every cell where `corrected` differs from `original`.
pub fn build(original: &RasterBand, corrected: &RasterBand) -> RasterBand {
    assert!(
        original.same_shape(corrected),
        "mask inputs differ in size: {}x{} vs {}x{}",
        original.cols(),
        original.rows(),
        corrected.cols(),
        corrected.rows()
    );

    let samples = original
        .samples()
        .iter()
        .zip(corrected.samples())
        .map(|(a, b)| if a == b { MASK_UNCHANGED } else { MASK_CHANGED })
        .collect();

    RasterBand::new(original.rows(), original.cols(), samples)
}
