#![deny(unsafe_code)]

//! # AD9361 receive over libiio
//!
//! This crate configures the receive path of an [AD9361](https://www.analog.com/en/products/ad9361.html)
//! RF transceiver through [libiio](https://github.com/analogdevicesinc/libiio) and streams raw
//! 16-bit I/Q samples from its DMA buffer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use ad9361_rx::{iio::IioBackend, Ad9361, RxConfig};
//!
//! fn main() -> Result<()> {
//!     let config = RxConfig::default();
//!     let radio = Ad9361::open(IioBackend::open(Some("ip:192.168.2.1"))?)?;
//!     radio.configure(&config)?;
//!
//!     let mut stream = radio.start_rx_stream(config.buffer_samples)?;
//!     for _ in 0..10 {
//!         let samples = stream.refill()?;
//!         println!("peak {}", samples.peaks().max());
//!     }
//!     // Dropping the stream destroys the buffer and disables the streaming channels.
//!     drop(stream);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg), feature(doc_auto_cfg))]
#![warn(missing_docs)]

pub mod backend;
pub mod cli;
pub mod iio;
pub mod stats;
pub mod stream;
mod types;

#[cfg(test)]
mod mock;

use log::{info, warn};
pub use types::*;

use backend::{Backend, RxBuffer};
use stats::{Overflow, SampleView};

/// AD9361 transceiver reached through an IIO context.
///
/// Owns the backend, so dropping it destroys the context.
pub struct Ad9361<B: Backend> {
    backend: B,
    phy: B::Device,
    rx: B::Device,
    i_channel: B::Channel,
    q_channel: B::Channel,
}

impl<B: Backend> Ad9361<B> {
    /// Locates the phy and streaming devices and the streaming channels.
    pub fn open(backend: B) -> Result<Self> {
        info!("Finding {PHY_DEVICE} device");
        let phy = backend
            .find_device(PHY_DEVICE)
            .ok_or(Error::DeviceNotFound(PHY_DEVICE))?;

        info!("Finding {RX_DEVICE} device");
        let rx = backend
            .find_device(RX_DEVICE)
            .ok_or(Error::DeviceNotFound(RX_DEVICE))?;

        info!("Finding {RX_DEVICE} streaming channels");
        let i_channel = find_channel(&backend, &rx, RX_DEVICE, RX_I_CHANNEL, Direction::Input)?;
        let q_channel = find_channel(&backend, &rx, RX_DEVICE, RX_Q_CHANNEL, Direction::Input)?;

        Ok(Ad9361 {
            backend,
            phy,
            rx,
            i_channel,
            q_channel,
        })
    }

    /// Applies port, bandwidth, sample rate and LO frequency from `config`.
    ///
    /// The first failure aborts the sequence; settings written before it stay applied.
    pub fn configure(&self, config: &RxConfig) -> Result<()> {
        info!("Finding {PHY_DEVICE} rx1 control channel");
        let chn = find_channel(
            &self.backend,
            &self.phy,
            PHY_DEVICE,
            RX_CONTROL_CHANNEL,
            Direction::Input,
        )?;

        info!("Setting rx port to {}", config.rf_port);
        self.write(&chn, Attr::RfPortSelect, AttrValue::Str(config.rf_port.clone()))?;

        info!("Setting rx bandwidth to {:.1} MHz", config.bandwidth_hz as f64 / 1e6);
        self.write(&chn, Attr::RfBandwidth, AttrValue::Int(config.bandwidth_hz))?;

        info!(
            "Setting sampling frequency to {:.1} Msps",
            config.sample_rate_hz as f64 / 1e6
        );
        self.write(&chn, Attr::SamplingFrequency, AttrValue::Int(config.sample_rate_hz))?;

        info!("Finding {PHY_DEVICE} rx local oscillator channel");
        let lo = find_channel(
            &self.backend,
            &self.phy,
            PHY_DEVICE,
            RX_LO_CHANNEL,
            Direction::Output,
        )?;

        info!(
            "Setting center frequency to {:.3} GHz",
            config.frequency_hz as f64 / 1e9
        );
        self.write(&lo, Attr::Frequency, AttrValue::Int(config.frequency_hz))?;

        Ok(())
    }

    /// Enables the streaming channels and allocates a buffer of `buffer_samples` samples.
    ///
    /// When the stream is dropped the buffer is destroyed and the channels are disabled again.
    pub fn start_rx_stream(&self, buffer_samples: usize) -> Result<RxStream<'_, B>> {
        if buffer_samples == 0 {
            return Err(Error::Argument("buffer must hold at least one sample"));
        }

        info!("Enabling {RX_DEVICE} streaming channels");
        self.backend.enable(&self.i_channel);
        self.backend.enable(&self.q_channel);

        info!("Creating non-cyclic buffer of {buffer_samples} samples");
        let buffer = match self.backend.create_buffer(
            &self.rx,
            &self.i_channel,
            &self.q_channel,
            buffer_samples,
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.disable_channels();
                return Err(e);
            }
        };

        Ok(RxStream {
            radio: self,
            buffer: Some(buffer),
        })
    }

    fn write(&self, chn: &B::Channel, attr: Attr, value: AttrValue) -> Result<()> {
        self.backend
            .write_attr(chn, attr.name(), &value)
            .map_err(|e| Error::AttrWrite {
                attr: attr.name(),
                value,
                source: Box::new(e),
            })
    }

    fn disable_channels(&self) {
        info!("Disabling {RX_DEVICE} streaming channels");
        self.backend.disable(&self.i_channel);
        self.backend.disable(&self.q_channel);
    }
}

fn find_channel<B: Backend>(
    backend: &B,
    device: &B::Device,
    device_name: &'static str,
    channel: &'static str,
    direction: Direction,
) -> Result<B::Channel> {
    backend
        .find_channel(device, channel, direction)
        .ok_or(Error::ChannelNotFound {
            device: device_name,
            channel,
            direction,
        })
}

/// Receive stream over a hardware buffer of the streaming device.
pub struct RxStream<'a, B: Backend> {
    radio: &'a Ad9361<B>,
    buffer: Option<B::Buffer>,
}

impl<B: Backend> RxStream<'_, B> {
    /// Blocks until the hardware refilled the buffer and returns the new samples.
    ///
    /// The view is only valid until the next refill.
    pub fn refill(&mut self) -> Result<SampleView<'_>> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(Error::Argument("buffer already destroyed"));
        };
        buffer.refill()?;
        Ok(SampleView::new(buffer.samples()))
    }

    /// Reads the overflow status register and acknowledges it.
    ///
    /// The acknowledge value is written back whether or not the overflow bit was set.
    pub fn check_overflow(&self) -> Overflow {
        let backend = &self.radio.backend;
        let rx = &self.radio.rx;

        let status = match backend.reg_read(rx, OVERFLOW_STATUS_REG) {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to read overflow status: {e}");
                return Overflow::Unknown;
            }
        };
        if let Err(e) = backend.reg_write(rx, OVERFLOW_STATUS_REG, OVERFLOW_BIT) {
            warn!("Failed to acknowledge overflow status: {e}");
        }

        if status & OVERFLOW_BIT != 0 {
            Overflow::Yes
        } else {
            Overflow::No
        }
    }
}

impl<B: Backend> Drop for RxStream<'_, B> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            info!("Destroying buffer");
            drop(buffer);
        }
        self.radio.disable_channels();
    }
}
