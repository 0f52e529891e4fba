//! Recording fake of an IIO context with an AD9361 attached.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::backend::{Backend, RxBuffer};
use crate::stream::CancelToken;
use crate::{AttrValue, Direction, Error, Result, PHY_DEVICE, RX_DEVICE};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    FindDevice(String),
    FindChannel {
        device: String,
        name: String,
        direction: Direction,
    },
    WriteAttr {
        channel: String,
        attr: String,
        value: AttrValue,
    },
    Enable(String),
    Disable(String),
    CreateBuffer {
        samples: usize,
    },
    Refill,
    DestroyBuffer,
    RegRead(u32),
    RegWrite(u32, u32),
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

pub(crate) struct MockBackend {
    log: CallLog,
    devices: Vec<&'static str>,
    channels: Vec<(&'static str, &'static str, Direction)>,
    rejected_attr: Option<&'static str>,
    failing_buffer: bool,
    refills: Rc<RefCell<VecDeque<Vec<i16>>>>,
    cancel_after: Option<(usize, CancelToken)>,
    registers: RefCell<VecDeque<u32>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        MockBackend {
            log: Rc::new(RefCell::new(Vec::new())),
            devices: vec![PHY_DEVICE, RX_DEVICE],
            channels: vec![
                (PHY_DEVICE, "voltage0", Direction::Input),
                (PHY_DEVICE, "altvoltage0", Direction::Output),
                (RX_DEVICE, "voltage0", Direction::Input),
                (RX_DEVICE, "voltage1", Direction::Input),
            ],
            rejected_attr: None,
            failing_buffer: false,
            refills: Rc::new(RefCell::new(VecDeque::new())),
            cancel_after: None,
            registers: RefCell::new(VecDeque::new()),
        }
    }

    pub(crate) fn log(&self) -> CallLog {
        Rc::clone(&self.log)
    }

    pub(crate) fn without_device(mut self, name: &str) -> Self {
        self.devices.retain(|d| *d != name);
        self
    }

    pub(crate) fn without_channel(mut self, device: &str, name: &str) -> Self {
        self.channels.retain(|(d, n, _)| !(*d == device && *n == name));
        self
    }

    pub(crate) fn rejecting_attr(mut self, attr: &'static str) -> Self {
        self.rejected_attr = Some(attr);
        self
    }

    pub(crate) fn failing_buffer(mut self) -> Self {
        self.failing_buffer = true;
        self
    }

    /// Blocks delivered by successive refills. Once exhausted, refill fails.
    pub(crate) fn with_refills(self, blocks: Vec<Vec<i16>>) -> Self {
        self.refills.borrow_mut().extend(blocks);
        self
    }

    /// Trips `token` from inside the `n`th refill, as a signal arriving mid-block would.
    pub(crate) fn cancel_after(mut self, n: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    /// Values returned by successive register reads. Once exhausted, reads fail.
    pub(crate) fn with_registers(self, values: Vec<u32>) -> Self {
        self.registers.borrow_mut().extend(values);
        self
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl Backend for MockBackend {
    type Device = String;
    type Channel = String;
    type Buffer = MockBuffer;

    fn find_device(&self, name: &str) -> Option<String> {
        self.record(Call::FindDevice(name.to_string()));
        self.devices
            .iter()
            .find(|d| **d == name)
            .map(|d| d.to_string())
    }

    fn find_channel(&self, device: &String, name: &str, direction: Direction) -> Option<String> {
        self.record(Call::FindChannel {
            device: device.clone(),
            name: name.to_string(),
            direction,
        });
        self.channels
            .iter()
            .find(|(d, n, dir)| d == device && *n == name && *dir == direction)
            .map(|(d, n, _)| format!("{d}/{n}"))
    }

    fn write_attr(&self, channel: &String, attr: &str, value: &AttrValue) -> Result<()> {
        self.record(Call::WriteAttr {
            channel: channel.clone(),
            attr: attr.to_string(),
            value: value.clone(),
        });
        if self.rejected_attr == Some(attr) {
            return Err(Error::Backend("EINVAL".into()));
        }
        Ok(())
    }

    fn enable(&self, channel: &String) {
        self.record(Call::Enable(channel.clone()));
    }

    fn disable(&self, channel: &String) {
        self.record(Call::Disable(channel.clone()));
    }

    fn create_buffer(
        &self,
        _device: &String,
        _i_channel: &String,
        _q_channel: &String,
        samples: usize,
    ) -> Result<MockBuffer> {
        if self.failing_buffer {
            return Err(Error::Backend("ENOMEM".into()));
        }
        self.record(Call::CreateBuffer { samples });
        Ok(MockBuffer {
            log: self.log(),
            refills: Rc::clone(&self.refills),
            cancel_after: self.cancel_after.clone(),
            done: 0,
            data: Vec::new(),
        })
    }

    fn reg_read(&self, _device: &String, addr: u32) -> Result<u32> {
        self.record(Call::RegRead(addr));
        self.registers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::Backend("EIO".into()))
    }

    fn reg_write(&self, _device: &String, addr: u32, value: u32) -> Result<()> {
        self.record(Call::RegWrite(addr, value));
        Ok(())
    }
}

pub(crate) struct MockBuffer {
    log: CallLog,
    refills: Rc<RefCell<VecDeque<Vec<i16>>>>,
    cancel_after: Option<(usize, CancelToken)>,
    done: usize,
    data: Vec<i16>,
}

impl RxBuffer for MockBuffer {
    fn refill(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Call::Refill);
        self.done += 1;
        if let Some((n, token)) = &self.cancel_after {
            if self.done == *n {
                token.cancel();
            }
        }
        self.data = self
            .refills
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::Backend("ETIMEDOUT".into()))?;
        Ok(())
    }

    fn samples(&self) -> &[i16] {
        &self.data
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Call::DestroyBuffer);
    }
}
