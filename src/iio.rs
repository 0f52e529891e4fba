//! [`Backend`] implementation over libiio.

use industrial_io as iio;
use log::info;

use crate::backend::{Backend, RxBuffer};
use crate::{AttrValue, Direction, Error, Result};

/// libiio context.
///
/// Dropping it destroys the context.
pub struct IioBackend {
    ctx: iio::Context,
}

impl IioBackend {
    /// Opens the default context, or the context at `uri`.
    pub fn open(uri: Option<&str>) -> Result<Self> {
        let ctx = match uri {
            Some(uri) => iio::Context::from_uri(uri),
            None => iio::Context::new(),
        }
        .map_err(|e| Error::Context {
            uri: uri.map(str::to_string),
            source: Box::new(e.into()),
        })?;

        info!("Opened IIO context with {} devices", ctx.num_devices());
        Ok(IioBackend { ctx })
    }
}

impl Drop for IioBackend {
    fn drop(&mut self) {
        info!("Destroying IIO context");
    }
}

impl Backend for IioBackend {
    type Device = iio::Device;
    type Channel = iio::Channel;
    type Buffer = IioBuffer;

    fn find_device(&self, name: &str) -> Option<iio::Device> {
        self.ctx.find_device(name)
    }

    fn find_channel(
        &self,
        device: &iio::Device,
        name: &str,
        direction: Direction,
    ) -> Option<iio::Channel> {
        device.find_channel(name, is_output(direction))
    }

    fn write_attr(&self, channel: &iio::Channel, attr: &str, value: &AttrValue) -> Result<()> {
        match value {
            AttrValue::Str(s) => channel.attr_write_str(attr, s)?,
            AttrValue::Int(v) => channel.attr_write_int(attr, *v)?,
        }
        Ok(())
    }

    fn enable(&self, channel: &iio::Channel) {
        channel.enable();
    }

    fn disable(&self, channel: &iio::Channel) {
        channel.disable();
    }

    fn create_buffer(
        &self,
        device: &iio::Device,
        i_channel: &iio::Channel,
        q_channel: &iio::Channel,
        samples: usize,
    ) -> Result<IioBuffer> {
        let buf = device.create_buffer(samples, false)?;
        Ok(IioBuffer {
            buf,
            i_channel: i_channel.clone(),
            q_channel: q_channel.clone(),
            data: Vec::with_capacity(2 * samples),
        })
    }

    fn reg_read(&self, device: &iio::Device, addr: u32) -> Result<u32> {
        Ok(device.reg_read(addr)?)
    }

    fn reg_write(&self, device: &iio::Device, addr: u32, value: u32) -> Result<()> {
        Ok(device.reg_write(addr, value)?)
    }
}

fn is_output(direction: Direction) -> bool {
    direction == Direction::Output
}

/// Non-cyclic libiio buffer.
///
/// libiio only hands out per-channel iterators over its mapped block, so every refill
/// copies the I/Q pair into an interleaved `Vec<i16>` (4 bytes per sample) that is
/// reused across refills.
pub struct IioBuffer {
    buf: iio::Buffer,
    i_channel: iio::Channel,
    q_channel: iio::Channel,
    data: Vec<i16>,
}

impl RxBuffer for IioBuffer {
    fn refill(&mut self) -> Result<()> {
        self.data.clear();
        self.buf.refill()?;

        interleave(
            &mut self.data,
            self.buf.channel_iter::<i16>(&self.i_channel),
            self.buf.channel_iter::<i16>(&self.q_channel),
        );
        Ok(())
    }

    fn samples(&self) -> &[i16] {
        &self.data
    }
}

/// Appends `i` and `q` as `I, Q` pairs, stopping at the shorter of the two.
fn interleave(data: &mut Vec<i16>, i: impl Iterator<Item = i16>, q: impl Iterator<Item = i16>) {
    for (i, q) in i.zip(q) {
        data.push(i);
        data.push(q);
    }
}
