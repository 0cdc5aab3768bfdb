use crate::consensus::VerifiedFault;
use crate::raster::RasterBand;

/// Pulls one observed sample back toward the gain 1, bias 0 baseline.
#[inline]
pub fn correct_sample(observed: u16, fault: &VerifiedFault) -> u16 {
    let observed = observed as f64;
    let drift = (observed * fault.gain + fault.bias) - observed;
    (observed - drift).round().clamp(0.0, u16::MAX as f64) as u16
}

/// Returns a copy of `band` with every faulty column corrected.
///
/// Columns not listed are copied unchanged. The input is never modified.
pub fn apply(band: &RasterBand, faults: &[VerifiedFault]) -> RasterBand {
    let mut corrected = band.clone();

    for fault in faults {
        assert!(
            fault.column < band.cols(),
            "fault column {} out of range for {} columns",
            fault.column,
            band.cols()
        );
        for row in 0..band.rows() {
            let value = correct_sample(band.get(row, fault.column), fault);
            corrected.set(row, fault.column, value);
        }
        tracing::debug!(column = fault.column, "Column corrected");
    }

    corrected
}
