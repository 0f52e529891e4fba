/// Name of the AD9361 physical-layer (RF control) device.
pub const PHY_DEVICE: &str = "ad9361-phy";
/// Name of the AD9361 receive streaming device.
pub const RX_DEVICE: &str = "cf-ad9361-lpc";

/// Phy channel carrying the rx1 controls.
pub(crate) const RX_CONTROL_CHANNEL: &str = "voltage0";
/// Phy channel driving the rx local oscillator.
pub(crate) const RX_LO_CHANNEL: &str = "altvoltage0";
/// Streaming channel carrying I samples.
pub(crate) const RX_I_CHANNEL: &str = "voltage0";
/// Streaming channel carrying Q samples.
pub(crate) const RX_Q_CHANNEL: &str = "voltage1";

/// Status register of the streaming device signalling DMA overflow.
pub const OVERFLOW_STATUS_REG: u32 = 0x8000_0088;
/// Overflow bit in [`OVERFLOW_STATUS_REG`]. Writing it back acknowledges the condition.
pub const OVERFLOW_BIT: u32 = 4;

/// Channel attributes written while configuring the phy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    /// RF input port selection.
    RfPortSelect,
    /// RF bandwidth in Hz.
    RfBandwidth,
    /// Baseband sample rate in Hz.
    SamplingFrequency,
    /// Local oscillator frequency in Hz.
    Frequency,
}

impl Attr {
    /// The attribute name as exposed by the kernel driver.
    pub fn name(self) -> &'static str {
        match self {
            Attr::RfPortSelect => "rf_port_select",
            Attr::RfBandwidth => "rf_bandwidth",
            Attr::SamplingFrequency => "sampling_frequency",
            Attr::Frequency => "frequency",
        }
    }
}

/// Value written to a channel attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// String valued attribute.
    Str(String),
    /// Integer valued attribute.
    Int(i64),
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Direction of a channel, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Data flows from the device to the host.
    Input,
    /// Data flows from the host to the device.
    Output,
}

/// Receive parameters applied to the AD9361.
#[derive(Debug, Clone, PartialEq)]
pub struct RxConfig {
    /// libiio context URI, `None` for the default context.
    pub uri: Option<String>,
    /// RF input port, written verbatim to `rf_port_select`.
    pub rf_port: String,
    /// RF bandwidth in Hz.
    pub bandwidth_hz: i64,
    /// Baseband sample rate in Hz.
    pub sample_rate_hz: i64,
    /// Local oscillator (center) frequency in Hz.
    pub frequency_hz: i64,
    /// Capacity of the streaming buffer, in samples.
    pub buffer_samples: usize,
    /// Read and acknowledge the overflow register after every refill.
    pub check_overflow: bool,
}

impl Default for RxConfig {
    fn default() -> Self {
        Self {
            uri: None,
            rf_port: "A_BALANCED".to_string(),
            bandwidth_hz: 5_000_000,
            sample_rate_hz: 20_000_000,
            frequency_hz: 2_500_000_000,
            buffer_samples: 1024 * 1024,
            check_overflow: true,
        }
    }
}

/// AD9361 receive errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error reported by libiio.
    #[error("iio: {0}")]
    Iio(#[from] industrial_io::Error),
    /// Context could not be created.
    #[error("failed to create IIO context{}", from_uri(.uri))]
    Context {
        /// URI the context was requested from, if any.
        uri: Option<String>,
        /// Underlying backend error.
        #[source]
        source: Box<Error>,
    },
    /// Named device missing from the context.
    #[error("device {0} not found")]
    DeviceNotFound(&'static str),
    /// Named channel missing from a device.
    #[error("channel {channel} ({direction:?}) not found on {device}")]
    ChannelNotFound {
        /// Device that was searched.
        device: &'static str,
        /// Requested channel name.
        channel: &'static str,
        /// Requested channel direction.
        direction: Direction,
    },
    /// Writing a channel attribute failed.
    #[error("failed to write {attr} = {value}")]
    AttrWrite {
        /// Attribute name.
        attr: &'static str,
        /// Value that was rejected.
        value: AttrValue,
        /// Underlying backend error.
        #[source]
        source: Box<Error>,
    },
    /// Error reported by a non-libiio backend.
    #[error("backend: {0}")]
    Backend(String),
    /// Invalid argument provided.
    #[error("{0}")]
    Argument(&'static str),
}

fn from_uri(uri: &Option<String>) -> String {
    match uri {
        Some(uri) => format!(" from {uri}"),
        None => String::new(),
    }
}

/// Result type for operations that may return an `Error`.
pub type Result<T> = std::result::Result<T, Error>;
