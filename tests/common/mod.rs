//! Shared test doubles: recording and gated register buses, a mock effect
//! subsystem, and a single-poll driver for lock-contention tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use lm3633_leds::bus::RegisterBus;
use lm3633_leds::effect::{EffectEngine, EffectHandle, EffectKind, Ticket};
use lm3633_leds::{Error, Result};

// ============================================================================
// Register bus doubles
// ============================================================================

/// One observed bus access.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BusOp {
    Rmw { addr: u8, mask: u8, value: u8 },
    Write { addr: u8, value: u8 },
}

pub struct BusState {
    pub regs: [u8; 256],
    pub ops: Vec<BusOp>,
    pub fail_on_addr: Option<u8>,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            regs: [0; 256],
            ops: Vec::new(),
            fail_on_addr: None,
        }
    }
}

impl BusState {
    fn apply_rmw(&mut self, addr: u8, mask: u8, value: u8) -> Result<()> {
        if self.fail_on_addr == Some(addr) {
            return Err(Error::Bus);
        }
        let old = self.regs[addr as usize];
        self.regs[addr as usize] = (old & !mask) | (value & mask);
        self.ops.push(BusOp::Rmw { addr, mask, value });
        Ok(())
    }

    fn apply_write(&mut self, addr: u8, value: u8) -> Result<()> {
        if self.fail_on_addr == Some(addr) {
            return Err(Error::Bus);
        }
        self.regs[addr as usize] = value;
        self.ops.push(BusOp::Write { addr, value });
        Ok(())
    }
}

/// Recording bus; clones share one register file and op log.
#[derive(Clone, Default)]
pub struct SharedBus(pub Rc<RefCell<BusState>>);

impl SharedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<BusOp> {
        self.0.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.0.borrow_mut().ops.clear();
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.0.borrow().regs[addr as usize]
    }

    pub fn fail_on_addr(&self, addr: u8) {
        self.0.borrow_mut().fail_on_addr = Some(addr);
    }
}

impl RegisterBus for SharedBus {
    async fn read_modify_write(&mut self, addr: u8, mask: u8, value: u8) -> Result<()> {
        self.0.borrow_mut().apply_rmw(addr, mask, value)
    }

    async fn write_byte(&mut self, addr: u8, value: u8) -> Result<()> {
        self.0.borrow_mut().apply_write(addr, value)
    }
}

/// Recording bus whose every access parks until the gate is opened.
#[derive(Clone)]
pub struct GatedBus {
    pub state: Rc<RefCell<BusState>>,
    pub open: Rc<Cell<bool>>,
}

impl GatedBus {
    pub fn new(open: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState::default())),
            open: Rc::new(Cell::new(open)),
        }
    }

    pub fn ops(&self) -> Vec<BusOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }
}

async fn wait_open(open: &Cell<bool>) {
    std::future::poll_fn(|_cx| {
        if open.get() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    })
    .await;
}

impl RegisterBus for GatedBus {
    async fn read_modify_write(&mut self, addr: u8, mask: u8, value: u8) -> Result<()> {
        wait_open(&self.open).await;
        self.state.borrow_mut().apply_rmw(addr, mask, value)
    }

    async fn write_byte(&mut self, addr: u8, value: u8) -> Result<()> {
        wait_open(&self.open).await;
        self.state.borrow_mut().apply_write(addr, value)
    }
}

// ============================================================================
// Effect subsystem doubles
// ============================================================================

/// One observed effect request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestedEffect {
    pub name: &'static str,
    pub kind: EffectKind,
    pub channel: usize,
}

/// Engine that records requests and can refuse after a set count.
#[derive(Default)]
pub struct MockEngine {
    pub requests: RefCell<Vec<RequestedEffect>>,
    pub fail_after: Cell<Option<usize>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every request once `granted` have been accepted.
    pub fn fail_after(granted: usize) -> Self {
        let engine = Self::default();
        engine.fail_after.set(Some(granted));
        engine
    }

    pub fn kinds(&self) -> Vec<EffectKind> {
        self.requests.borrow().iter().map(|r| r.kind).collect()
    }
}

impl EffectEngine for MockEngine {
    fn request(&self, name: &'static str, kind: EffectKind, channel: usize) -> Result<Ticket> {
        if let Some(limit) = self.fail_after.get() {
            if self.requests.borrow().len() >= limit {
                return Err(Error::EffectRequest);
            }
        }
        let id = self.requests.borrow().len() as u32;
        self.requests.borrow_mut().push(RequestedEffect {
            name,
            kind,
            channel,
        });
        Ok(Ticket(id))
    }
}

/// One observed write through an effect handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EffectOp {
    Time { msec: u32, reg_offset: u8 },
    Ramp { msec: u32 },
    Level { value: u8, reg_offset: u8 },
}

/// Log shared between the test and the handles it hands out.
#[derive(Clone, Default)]
pub struct EffectLog(pub Rc<RefCell<Vec<EffectOp>>>);

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<EffectOp> {
        self.0.borrow().clone()
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            log: self.clone(),
            fail: false,
        }
    }

    pub fn failing_handle(&self) -> MockHandle {
        MockHandle {
            log: self.clone(),
            fail: true,
        }
    }
}

/// Handle that records its writes into an [`EffectLog`].
pub struct MockHandle {
    log: EffectLog,
    fail: bool,
}

impl EffectHandle for MockHandle {
    async fn set_time(&mut self, msec: u32, reg_offset: u8) -> Result<()> {
        if self.fail {
            return Err(Error::Bus);
        }
        self.log.0.borrow_mut().push(EffectOp::Time { msec, reg_offset });
        Ok(())
    }

    async fn set_ramp(&mut self, msec: u32) -> Result<()> {
        if self.fail {
            return Err(Error::Bus);
        }
        self.log.0.borrow_mut().push(EffectOp::Ramp { msec });
        Ok(())
    }

    async fn set_level(&mut self, level: u8, reg_offset: u8) -> Result<()> {
        if self.fail {
            return Err(Error::Bus);
        }
        self.log.0.borrow_mut().push(EffectOp::Level {
            value: level,
            reg_offset,
        });
        Ok(())
    }
}

// ============================================================================
// Polling helper
// ============================================================================

/// Polls a pinned future exactly once with a no-op waker.
pub fn poll_once<F: Future>(fut: &mut Pin<&mut F>) -> Poll<F::Output> {
    let mut cx = Context::from_waker(Waker::noop());
    fut.as_mut().poll(&mut cx)
}
