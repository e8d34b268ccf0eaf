// SPDX-License-Identifier: GPL-3.0-only

//! Sink writing every published buffer to its own file

use super::{ChannelId, Sink, SinkBuffer};
use crate::constants::file_layout::FRAME_DIGITS;
use crate::errors::SinkError;
use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk encoding of published buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// PNG, 16-bit grayscale for Y16 and Z16
    #[default]
    Png,
    /// Native-endian samples without header
    Raw,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Raw => "raw",
        }
    }
}

/// Writes `ch{channel}_{NNNNNN}.{ext}` files under an output directory
///
/// Each channel counts its own buffers, so the files of one cycle share a
/// frame number as long as every channel is published once per cycle.
pub struct FileSink {
    dir: PathBuf,
    format: OutputFormat,
    counters: HashMap<ChannelId, u64>,
    written: usize,
    failures: usize,
}

impl FileSink {
    /// Create the output directory if needed
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format,
            counters: HashMap::new(),
            written: 0,
            failures: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written successfully
    pub fn written(&self) -> usize {
        self.written
    }

    /// Buffers that could not be written
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Path of the file for `frame` on `channel`
    pub fn file_path(&self, channel: ChannelId, frame: u64) -> PathBuf {
        self.dir.join(format!(
            "ch{}_{:0width$}.{}",
            channel.0,
            frame,
            self.format.extension(),
            width = FRAME_DIGITS
        ))
    }

    fn write(&self, buffer: &SinkBuffer<'_>, path: &Path) -> Result<(), SinkError> {
        match self.format {
            OutputFormat::Png => write_png(buffer, path),
            OutputFormat::Raw => write_raw(buffer, path),
        }
    }
}

impl Sink for FileSink {
    fn publish(&mut self, buffer: SinkBuffer<'_>, channel: ChannelId) {
        let frame = *self.counters.get(&channel).unwrap_or(&0);
        let path = self.file_path(channel, frame);

        match self.write(&buffer, &path) {
            Ok(()) => {
                self.written += 1;
                debug!(
                    %channel,
                    format = buffer.format(),
                    path = %path.display(),
                    "Buffer written"
                );
            }
            Err(e) => {
                self.failures += 1;
                warn!(%channel, path = %path.display(), error = %e, "Failed to write buffer");
            }
        }
        self.counters.insert(channel, frame + 1);
    }
}

fn dimensions_u32(buffer: &SinkBuffer<'_>) -> Result<(u32, u32), SinkError> {
    let (width, height) = buffer.dimensions();
    let width = u32::try_from(width).map_err(|_| SinkError::Encode("width too large".into()))?;
    let height = u32::try_from(height).map_err(|_| SinkError::Encode("height too large".into()))?;
    Ok((width, height))
}

fn write_png(buffer: &SinkBuffer<'_>, path: &Path) -> Result<(), SinkError> {
    let (width, height) = dimensions_u32(buffer)?;
    let size_error = || SinkError::Encode(format!("buffer does not match {}x{}", width, height));

    match buffer {
        SinkBuffer::Intensity(image) if image.fits_y8() => {
            GrayImage::from_raw(width, height, image.to_y8())
                .ok_or_else(size_error)?
                .save(path)?;
        }
        SinkBuffer::Intensity(image) => {
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, image.as_slice().to_vec())
                .ok_or_else(size_error)?
                .save(path)?;
        }
        SinkBuffer::Depth(depth) => {
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, depth.as_slice().to_vec())
                .ok_or_else(size_error)?
                .save(path)?;
        }
        SinkBuffer::Rgba8 { data, .. } => {
            RgbaImage::from_raw(width, height, data.to_vec())
                .ok_or_else(size_error)?
                .save(path)?;
        }
    }
    Ok(())
}

fn write_raw(buffer: &SinkBuffer<'_>, path: &Path) -> Result<(), SinkError> {
    match buffer {
        SinkBuffer::Intensity(image) if image.fits_y8() => std::fs::write(path, image.to_y8())?,
        SinkBuffer::Intensity(image) => {
            std::fs::write(path, bytemuck::cast_slice::<u16, u8>(image.as_slice()))?
        }
        SinkBuffer::Depth(depth) => {
            std::fs::write(path, bytemuck::cast_slice::<u16, u8>(depth.as_slice()))?
        }
        SinkBuffer::Rgba8 { data, .. } => std::fs::write(path, data)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Grid, IntensityImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stereo-depth-file-sink-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_png_per_channel_counters() {
        let dir = scratch_dir("png");
        let mut sink = FileSink::new(&dir, OutputFormat::Png).unwrap();
        let left = IntensityImage::filled(3, 2, 40);
        let depth = Grid::filled(3, 2, 1200u16);

        sink.publish(SinkBuffer::Intensity(&left), ChannelId::LEFT_INFRARED);
        sink.publish(SinkBuffer::Depth(&depth), ChannelId::COMPUTED_DEPTH);
        sink.publish(SinkBuffer::Depth(&depth), ChannelId::COMPUTED_DEPTH);

        assert_eq!(sink.written(), 3);
        assert!(dir.join("ch0_000000.png").exists());
        assert!(dir.join("ch2_000001.png").exists());
        assert!(!dir.join("ch0_000001.png").exists());

        let reloaded = image::open(dir.join("ch2_000000.png")).unwrap().into_luma16();
        assert_eq!(reloaded.get_pixel(2, 1).0[0], 1200);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_raw_z16_is_native_endian() {
        let dir = scratch_dir("raw");
        let mut sink = FileSink::new(&dir, OutputFormat::Raw).unwrap();
        let depth = Grid::from_vec(2, 1, vec![1u16, 513]).unwrap();

        sink.publish(SinkBuffer::Depth(&depth), ChannelId::HARDWARE_DEPTH);

        let bytes = std::fs::read(dir.join("ch3_000000.raw")).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&1u16.to_ne_bytes());
        expected.extend_from_slice(&513u16.to_ne_bytes());
        assert_eq!(bytes, expected);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bad_buffer_is_counted_not_raised() {
        let dir = scratch_dir("bad");
        let mut sink = FileSink::new(&dir, OutputFormat::Png).unwrap();
        let data = [0u8; 3];

        sink.publish(
            SinkBuffer::Rgba8 {
                width: 2,
                height: 2,
                data: &data,
            },
            ChannelId::DEPTH_PREVIEW,
        );

        assert_eq!(sink.written(), 0);
        assert_eq!(sink.failures(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
