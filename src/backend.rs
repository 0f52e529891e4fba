//! Hardware access seam.
//!
//! [`Backend`] is the small slice of libiio this crate needs: device and channel lookup,
//! attribute writes, channel enablement, buffer creation and direct register access.
//! [`crate::iio::IioBackend`] implements it on top of `industrial-io`.

use crate::{AttrValue, Direction, Result};

/// Access to an IIO context and the devices below it.
pub trait Backend {
    /// Device handle.
    type Device;
    /// Channel handle.
    type Channel;
    /// Streaming buffer created on a device.
    type Buffer: RxBuffer;

    /// Looks up a device by name.
    fn find_device(&self, name: &str) -> Option<Self::Device>;

    /// Looks up a channel on `device` by name and direction.
    fn find_channel(
        &self,
        device: &Self::Device,
        name: &str,
        direction: Direction,
    ) -> Option<Self::Channel>;

    /// Writes a channel attribute.
    fn write_attr(&self, channel: &Self::Channel, attr: &str, value: &AttrValue) -> Result<()>;

    /// Enables a channel for streaming.
    fn enable(&self, channel: &Self::Channel);

    /// Disables a streaming channel.
    fn disable(&self, channel: &Self::Channel);

    /// Creates a non-cyclic buffer of `samples` samples carrying the interleaved
    /// `i_channel`/`q_channel` pair. Both channels must already be enabled.
    fn create_buffer(
        &self,
        device: &Self::Device,
        i_channel: &Self::Channel,
        q_channel: &Self::Channel,
        samples: usize,
    ) -> Result<Self::Buffer>;

    /// Reads a device register.
    fn reg_read(&self, device: &Self::Device, addr: u32) -> Result<u32>;

    /// Writes a device register.
    fn reg_write(&self, device: &Self::Device, addr: u32, value: u32) -> Result<()>;
}

/// A hardware buffer that is refilled in place.
///
/// Dropping the buffer destroys it.
pub trait RxBuffer {
    /// Blocks until the hardware delivered a new block of samples.
    fn refill(&mut self) -> Result<()>;

    /// Interleaved `I, Q` elements of the last successful refill.
    fn samples(&self) -> &[i16];
}
