// SPDX-License-Identifier: GPL-3.0-only

//! Output of published buffers
//!
//! The session hands every buffer of a cycle to a [`Sink`] together with a
//! stable [`ChannelId`]. Sinks never report back: failures are logged by the
//! sink and the pipeline carries on with the next buffer.
//!
//! | Channel | Content | Format |
//! |---|---|---|
//! | 0 | Left infrared | Y8 / Y16 |
//! | 1 | Right infrared | Y8 / Y16 |
//! | 2 | Computed depth | Z16 |
//! | 3 | Hardware depth | Z16 |
//! | 4 | Depth preview | RGBA8 |

mod file;
mod memory;

pub use file::{FileSink, OutputFormat};
pub use memory::{NullSink, Published, RecordingSink};

use crate::constants::channels;
use crate::frame::{Grid, IntensityImage};

/// Stable identifier of an output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl ChannelId {
    pub const LEFT_INFRARED: ChannelId = ChannelId(channels::LEFT_INFRARED);
    pub const RIGHT_INFRARED: ChannelId = ChannelId(channels::RIGHT_INFRARED);
    pub const COMPUTED_DEPTH: ChannelId = ChannelId(channels::COMPUTED_DEPTH);
    pub const HARDWARE_DEPTH: ChannelId = ChannelId(channels::HARDWARE_DEPTH);
    pub const DEPTH_PREVIEW: ChannelId = ChannelId(channels::DEPTH_PREVIEW);
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// Borrowed view of a buffer being published
#[derive(Debug, Clone, Copy)]
pub enum SinkBuffer<'a> {
    /// Infrared intensities, Y8 when every sample fits 8 bits, else Y16
    Intensity(&'a IntensityImage),
    /// Depth in 16-bit storage width (Z16)
    Depth(&'a Grid<u16>),
    /// Interleaved RGBA preview, 4 bytes per pixel
    Rgba8 {
        width: usize,
        height: usize,
        data: &'a [u8],
    },
}

impl SinkBuffer<'_> {
    /// Pixel format name
    pub fn format(&self) -> &'static str {
        match self {
            SinkBuffer::Intensity(image) if image.fits_y8() => "Y8",
            SinkBuffer::Intensity(_) => "Y16",
            SinkBuffer::Depth(_) => "Z16",
            SinkBuffer::Rgba8 { .. } => "RGBA8",
        }
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            SinkBuffer::Intensity(image) => image.dimensions(),
            SinkBuffer::Depth(depth) => depth.dimensions(),
            SinkBuffer::Rgba8 { width, height, .. } => (*width, *height),
        }
    }

    /// Copy the buffer out of the borrowed frame
    pub fn to_owned_buffer(&self) -> OwnedBuffer {
        match self {
            SinkBuffer::Intensity(image) => OwnedBuffer::Intensity((*image).clone()),
            SinkBuffer::Depth(depth) => OwnedBuffer::Depth((*depth).clone()),
            SinkBuffer::Rgba8 {
                width,
                height,
                data,
            } => OwnedBuffer::Rgba8 {
                width: *width,
                height: *height,
                data: data.to_vec(),
            },
        }
    }
}

/// Owned copy of a [`SinkBuffer`]
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedBuffer {
    Intensity(IntensityImage),
    Depth(Grid<u16>),
    Rgba8 {
        width: usize,
        height: usize,
        data: Vec<u8>,
    },
}

impl OwnedBuffer {
    /// Borrow as a [`SinkBuffer`]
    pub fn as_buffer(&self) -> SinkBuffer<'_> {
        match self {
            OwnedBuffer::Intensity(image) => SinkBuffer::Intensity(image),
            OwnedBuffer::Depth(depth) => SinkBuffer::Depth(depth),
            OwnedBuffer::Rgba8 {
                width,
                height,
                data,
            } => SinkBuffer::Rgba8 {
                width: *width,
                height: *height,
                data,
            },
        }
    }
}

/// Destination of published buffers
pub trait Sink {
    /// Take one buffer; failures stay inside the sink
    fn publish(&mut self, buffer: SinkBuffer<'_>, channel: ChannelId);
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn publish(&mut self, buffer: SinkBuffer<'_>, channel: ChannelId) {
        (**self).publish(buffer, channel)
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn publish(&mut self, buffer: SinkBuffer<'_>, channel: ChannelId) {
        (**self).publish(buffer, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_format_follows_samples() {
        let narrow = IntensityImage::filled(2, 2, 255);
        let wide = IntensityImage::filled(2, 2, 256);
        assert_eq!(SinkBuffer::Intensity(&narrow).format(), "Y8");
        assert_eq!(SinkBuffer::Intensity(&wide).format(), "Y16");
    }

    #[test]
    fn test_owned_round_trip() {
        let data = vec![1u8, 2, 3, 4];
        let buffer = SinkBuffer::Rgba8 {
            width: 1,
            height: 1,
            data: &data,
        };
        let owned = buffer.to_owned_buffer();
        assert_eq!(owned.as_buffer().format(), "RGBA8");
        assert_eq!(owned.as_buffer().dimensions(), (1, 1));
    }

    #[test]
    fn test_channel_ids_are_stable() {
        assert_eq!(ChannelId::LEFT_INFRARED, ChannelId(0));
        assert_eq!(ChannelId::RIGHT_INFRARED, ChannelId(1));
        assert_eq!(ChannelId::COMPUTED_DEPTH, ChannelId(2));
        assert_eq!(ChannelId::HARDWARE_DEPTH, ChannelId(3));
        assert_eq!(ChannelId::DEPTH_PREVIEW, ChannelId(4));
    }
}
