use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};

use super::RasterBand;
use crate::error::{Error, Result};

/// Geometry shared by every band of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    pub rows: usize,
    pub cols: usize,
    pub band_count: usize,
}

/// Streaming reader over a multi-page 16-bit grayscale TIFF, one page per band.
pub struct RasterReader {
    path: PathBuf,
    header: RasterHeader,
    decoder: Decoder<BufReader<File>>,
    /// Page the decoder is positioned on.
    current: usize,
}

impl std::fmt::Debug for RasterReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("current", &self.current)
            .finish()
    }
}

impl RasterReader {
    /// Opens `path` and walks its page directory to build the header.
    ///
    /// Every page must be single-channel 16-bit and share the first page's size.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut decoder = open_decoder(&path)?;

        let (cols, rows) = check_page(&mut decoder, &path, 0)?;
        let mut band_count = 1;
        while decoder.more_images() {
            decoder
                .next_image()
                .map_err(|source| Error::DecodeRaster {
                    path: path.clone(),
                    band: Some(band_count),
                    source,
                })?;
            let dims = check_page(&mut decoder, &path, band_count)?;
            if dims != (cols, rows) {
                return Err(Error::UnsupportedRaster {
                    path,
                    reason: format!(
                        "band {} is {}x{}, expected {}x{}",
                        band_count, dims.0, dims.1, cols, rows
                    ),
                });
            }
            band_count += 1;
        }

        let decoder = open_decoder(&path)?;
        let header = RasterHeader {
            rows,
            cols,
            band_count,
        };
        tracing::debug!(path = %path.display(), ?header, "Opened raster");

        Ok(Self {
            path,
            header,
            decoder,
            current: 0,
        })
    }

    pub fn header(&self) -> RasterHeader {
        self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads band `index` row-major. Reading forward is sequential; going back
    /// to an earlier band reopens the file.
    pub fn read_band(&mut self, index: usize) -> Result<RasterBand> {
        assert!(
            index < self.header.band_count,
            "band {} out of range for {} bands",
            index,
            self.header.band_count
        );

        if index < self.current {
            self.decoder = open_decoder(&self.path)?;
            self.current = 0;
        }
        while self.current < index {
            self.decoder
                .next_image()
                .map_err(|source| Error::DecodeRaster {
                    path: self.path.clone(),
                    band: Some(self.current + 1),
                    source,
                })?;
            self.current += 1;
        }

        let image = self
            .decoder
            .read_image()
            .map_err(|source| Error::DecodeRaster {
                path: self.path.clone(),
                band: Some(index),
                source,
            })?;

        let samples = match image {
            DecodingResult::U16(samples) => samples,
            _ => {
                return Err(Error::UnsupportedRaster {
                    path: self.path.clone(),
                    reason: format!("band {} does not hold unsigned 16-bit samples", index),
                });
            }
        };

        let RasterHeader { rows, cols, .. } = self.header;
        if samples.len() != rows * cols {
            return Err(Error::UnsupportedRaster {
                path: self.path.clone(),
                reason: format!(
                    "band {} holds {} samples, expected {}",
                    index,
                    samples.len(),
                    rows * cols
                ),
            });
        }

        Ok(RasterBand::new(rows, cols, samples))
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|source| Error::OpenRaster {
        path: path.to_path_buf(),
        source,
    })?;
    // Satellite scenes easily exceed the default decoding limits
    let decoder = Decoder::new(BufReader::new(file)).map_err(|source| Error::DecodeRaster {
        path: path.to_path_buf(),
        band: None,
        source,
    })?;
    Ok(decoder.with_limits(Limits::unlimited()))
}

/// Checks the current page is Gray16 and returns its `(cols, rows)`.
fn check_page(
    decoder: &mut Decoder<BufReader<File>>,
    path: &Path,
    band: usize,
) -> Result<(usize, usize)> {
    let decode_err = |source| Error::DecodeRaster {
        path: path.to_path_buf(),
        band: Some(band),
        source,
    };

    let color = decoder.colortype().map_err(decode_err)?;
    if color != tiff::ColorType::Gray(16) {
        return Err(Error::UnsupportedRaster {
            path: path.to_path_buf(),
            reason: format!("band {} has color type {:?}, expected Gray(16)", band, color),
        });
    }

    let (width, height) = decoder.dimensions().map_err(decode_err)?;
    Ok((width as usize, height as usize))
}

/// Writes bands as pages of a temporary TIFF next to `target`.
///
/// Nothing appears at `target` until [`RasterWriter::commit`]; dropping the
/// writer discards the temporary file.
pub struct RasterWriter {
    target: PathBuf,
    rows: usize,
    cols: usize,
    encoder: TiffEncoder<File>,
    temp: NamedTempFile,
    bands_written: usize,
}

impl std::fmt::Debug for RasterWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterWriter")
            .field("target", &self.target)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("bands_written", &self.bands_written)
            .finish()
    }
}

impl RasterWriter {
    pub fn create<P: AsRef<Path>>(target: P, rows: usize, cols: usize) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let create_err = |source: io::Error| Error::CreateOutput {
            path: target.clone(),
            source,
        };

        if u32::try_from(rows).is_err() || u32::try_from(cols).is_err() {
            return Err(create_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}x{} exceeds TIFF dimensions", cols, rows),
            )));
        }

        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(dir).map_err(create_err)?;
        let file = temp.as_file().try_clone().map_err(create_err)?;
        let encoder =
            TiffEncoder::new(file).map_err(|e| create_err(io::Error::other(e.to_string())))?;

        Ok(Self {
            target,
            rows,
            cols,
            encoder,
            temp,
            bands_written: 0,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn bands_written(&self) -> usize {
        self.bands_written
    }

    /// Appends `band` as the next page. `index` is only used for error context.
    pub fn write_band(&mut self, index: usize, band: &RasterBand) -> Result<()> {
        assert!(
            band.rows() == self.rows && band.cols() == self.cols,
            "band {}x{} doesn't match writer {}x{}",
            band.cols(),
            band.rows(),
            self.cols,
            self.rows
        );

        // Both fit in u32, checked in create()
        let image = self
            .encoder
            .new_image::<colortype::Gray16>(self.cols as u32, self.rows as u32);
        image
            .and_then(|image| image.write_data(band.samples()))
            .map_err(|source| Error::EncodeRaster {
                path: self.target.clone(),
                band: index,
                source,
            })?;

        self.bands_written += 1;
        Ok(())
    }

    /// Flushes the temporary file and atomically moves it onto the target.
    pub fn commit(self) -> Result<PathBuf> {
        let Self {
            target,
            encoder,
            temp,
            ..
        } = self;
        drop(encoder);

        let persist_err = |source| Error::PersistOutput {
            path: target.clone(),
            source,
        };
        temp.as_file().sync_all().map_err(persist_err)?;
        temp.persist(&target).map_err(|e| persist_err(e.error))?;

        tracing::debug!(path = %target.display(), "Committed raster");
        Ok(target)
    }
}

/// Writes `bands` as a complete dataset at `path`.
pub fn write_dataset<P: AsRef<Path>>(path: P, bands: &[RasterBand]) -> Result<()> {
    let path = path.as_ref();
    let Some(first) = bands.first() else {
        return Err(Error::UnsupportedRaster {
            path: path.to_path_buf(),
            reason: "a dataset needs at least one band".to_string(),
        });
    };

    let mut writer = RasterWriter::create(path, first.rows(), first.cols())?;
    for (index, band) in bands.iter().enumerate() {
        writer.write_band(index, band)?;
    }
    writer.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(rows: usize, cols: usize, seed: u16) -> RasterBand {
        RasterBand::from_fn(rows, cols, |r, c| seed.wrapping_mul(31) + (r * cols + c) as u16)
    }

    #[test]
    fn write_then_read_multi_band() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tif");
        let bands = vec![band(6, 5, 1), band(6, 5, 2), band(6, 5, 3)];

        write_dataset(&path, &bands).unwrap();

        let mut reader = RasterReader::open(&path).unwrap();
        assert_eq!(
            reader.header(),
            RasterHeader {
                rows: 6,
                cols: 5,
                band_count: 3
            }
        );
        for (i, expected) in bands.iter().enumerate() {
            assert_eq!(&reader.read_band(i).unwrap(), expected, "band {i}");
        }
        // going backwards reopens the file
        assert_eq!(reader.read_band(0).unwrap(), bands[0]);
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RasterReader::open(dir.path().join("nope.tif")).unwrap_err();
        assert!(matches!(err, Error::OpenRaster { .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.tif");
        std::fs::write(&path, b"definitely not a tiff").unwrap();

        let err = RasterReader::open(&path).unwrap_err();
        assert!(matches!(err, Error::DecodeRaster { .. }));
    }

    #[test]
    fn uncommitted_writer_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");

        let mut writer = RasterWriter::create(&path, 4, 4).unwrap();
        writer.write_band(0, &band(4, 4, 0)).unwrap();
        drop(writer);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn commit_moves_file_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");

        let mut writer = RasterWriter::create(&path, 3, 2).unwrap();
        writer.write_band(0, &band(3, 2, 4)).unwrap();
        assert_eq!(writer.bands_written(), 1);
        assert_eq!(writer.commit().unwrap(), path);

        let mut reader = RasterReader::open(&path).unwrap();
        assert_eq!(reader.header().band_count, 1);
        assert_eq!(reader.read_band(0).unwrap(), band(3, 2, 4));
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = RasterWriter::create(dir.path().join("missing/out.tif"), 2, 2).unwrap_err();
        assert!(matches!(err, Error::CreateOutput { .. }));
        assert!(!err.is_input_error());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_dataset(dir.path().join("x.tif"), &[]).is_err());
    }
}
