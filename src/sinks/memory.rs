// SPDX-License-Identifier: GPL-3.0-only

use super::{ChannelId, OwnedBuffer, Sink, SinkBuffer};
use tracing::trace;

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn publish(&mut self, buffer: SinkBuffer<'_>, channel: ChannelId) {
        trace!(%channel, format = buffer.format(), "Buffer discarded");
    }
}

/// One buffer received by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub channel: ChannelId,
    pub buffer: OwnedBuffer,
}

/// Sink keeping owned copies of everything it receives, in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: Vec<Published>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> &[Published] {
        &self.published
    }

    /// Channels in publish order
    pub fn channels(&self) -> Vec<ChannelId> {
        self.published.iter().map(|p| p.channel).collect()
    }

    /// Buffers published on `channel`, oldest first
    pub fn on_channel(&self, channel: ChannelId) -> impl Iterator<Item = &OwnedBuffer> {
        self.published
            .iter()
            .filter(move |p| p.channel == channel)
            .map(|p| &p.buffer)
    }
}

impl Sink for RecordingSink {
    fn publish(&mut self, buffer: SinkBuffer<'_>, channel: ChannelId) {
        self.published.push(Published {
            channel,
            buffer: buffer.to_owned_buffer(),
        });
    }
}
