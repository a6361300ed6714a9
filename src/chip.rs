//! The chip and per-string LED data model, brightness scheduling, and the
//! pattern operations.
//!
//! One [`Chip`] owns the register transport and all per-LED mutable state
//! behind a single async lock; every register-touching path acquires it,
//! so operations on different channels of the same chip serialize with
//! each other. Brightness writes are decoupled from their non-blocking
//! entry point through per-LED latest-wins slots drained by
//! [`brightness_worker_loop`]; effect completions land through
//! [`effect_service_loop`].
//!
//! # Example
//!
//! ```no_run
//! use lm3633_leds::Result;
//! use lm3633_leds::bus::RegisterBus;
//! use lm3633_leds::chip::{Chip, ChipStatic, brightness_worker_loop};
//! use lm3633_leds::config::{LedConfig, LedString};
//! use static_cell::StaticCell;
//!
//! struct Bus;
//!
//! impl RegisterBus for Bus {
//!     async fn read_modify_write(&mut self, _addr: u8, _mask: u8, _value: u8) -> Result<()> {
//!         Ok(())
//!     }
//!     async fn write_byte(&mut self, _addr: u8, _value: u8) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! static CHIP_STATIC: ChipStatic = ChipStatic::new_static();
//! static CHIP: StaticCell<Chip<Bus>> = StaticCell::new();
//!
//! async fn example() -> Result<()> {
//!     let configs = [
//!         LedConfig::new(LedString::LVLED1, 20).with_name("status"),
//!         LedConfig::new(LedString::LVLED2.union(LedString::LVLED3), 10),
//!     ];
//!     let chip = &*CHIP.init(Chip::new(Bus, &configs, &CHIP_STATIC)?);
//!     chip.init().await?;
//!
//!     chip.set_brightness(0, 128);
//!     // normally spawned as its own executor task
//!     brightness_worker_loop(chip).await;
//!     Ok(())
//! }
//! ```

use core::fmt::Write as _;

use embassy_futures::select::{Either, select, select_array};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::{String, Vec};

use crate::bank::{self, BankId};
use crate::bus::RegisterBus;
use crate::config::{LedConfig, MAX_LEDS};
use crate::effect::{
    EffectCompletion, EffectCompletions, EffectEngine, EffectHandle, EffectKind, Ticket,
};
use crate::pattern::{self, PatternLevel, PatternTime};
use crate::registers::{REG_BRT_LVLED_BASE, REG_IMAX_LVLED_BASE, REG_PATTERN};
use crate::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Full-scale brightness value.
pub const MAX_BRIGHTNESS: u8 = 255;

/// Name prefix for channels configured without one.
pub const DEFAULT_LED_NAME: &str = "indicator";

// ============================================================================
// Per-string state
// ============================================================================

/// One LED string's driver state. Mutated only under the chip lock.
struct Led {
    config: LedConfig,
    bank_id: BankId,
    brightness: u8,
    time: PatternTime,
    level: PatternLevel,
}

impl Led {
    fn new(config: LedConfig) -> Self {
        Self {
            config,
            bank_id: BankId::C,
            brightness: 0,
            time: PatternTime::default(),
            level: PatternLevel::default(),
        }
    }
}

struct ChipInner<BUS> {
    bus: BUS,
    leds: Vec<Led, MAX_LEDS>,
}

impl<BUS> ChipInner<BUS> {
    fn led(&self, channel: usize) -> Result<&Led> {
        self.leds.get(channel).ok_or(Error::BadChannel { index: channel })
    }

    fn led_mut(&mut self, channel: usize) -> Result<&mut Led> {
        self.leds
            .get_mut(channel)
            .ok_or(Error::BadChannel { index: channel })
    }
}

// ============================================================================
// Chip statics
// ============================================================================

/// Static resources backing one chip's deferred brightness scheduling.
pub struct ChipStatic {
    // One latest-wins slot per channel; a second set before the worker runs
    // replaces the first.
    brightness: [Signal<CriticalSectionRawMutex, u8>; MAX_LEDS],
    shutdown: Signal<CriticalSectionRawMutex, ()>,
}

impl ChipStatic {
    /// Creates static resources.
    #[must_use]
    pub const fn new_static() -> Self {
        Self {
            brightness: [const { Signal::new() }; MAX_LEDS],
            shutdown: Signal::new(),
        }
    }
}

// ============================================================================
// Chip
// ============================================================================

/// One LM3633 device: transport handle plus 1..=6 LED string channels.
///
/// See the [module documentation](mod@crate::chip) for a wiring example.
pub struct Chip<BUS> {
    inner: Mutex<CriticalSectionRawMutex, ChipInner<BUS>>,
    statics: &'static ChipStatic,
    num_leds: usize,
}

impl<BUS: RegisterBus> Chip<BUS> {
    /// Builds the per-channel state from the configuration descriptors.
    ///
    /// Fails when no channels are configured or more than the chip's six
    /// output strings. No register is touched; call [`init`](Self::init)
    /// afterwards.
    pub fn new(bus: BUS, configs: &[LedConfig], statics: &'static ChipStatic) -> Result<Self> {
        if configs.is_empty() {
            return Err(Error::NoLedChannels);
        }
        if configs.len() > MAX_LEDS {
            return Err(Error::TooManyLedChannels {
                count: configs.len(),
            });
        }

        let mut leds = Vec::new();
        for config in configs {
            leds.push(Led::new(*config)).map_err(|_| Error::TooManyLedChannels {
                count: configs.len(),
            })?;
        }

        Ok(Self {
            inner: Mutex::new(ChipInner { bus, leds }),
            statics,
            num_leds: configs.len(),
        })
    }

    /// Number of configured channels.
    #[must_use]
    pub const fn num_leds(&self) -> usize {
        self.num_leds
    }

    /// Programs every channel's control bank and max current.
    ///
    /// A failing channel aborts initialization; channels already programmed
    /// in the same call keep their committed register state.
    pub async fn init(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        for index in 0..inner.leds.len() {
            let string = inner.leds[index].config.string;
            let bank = bank::assign_banks(&mut inner.bus, string).await?;
            inner.leds[index].bank_id = bank;

            let code = inner.leds[index].config.imax_code();
            inner
                .bus
                .write_byte(REG_IMAX_LVLED_BASE + bank.index(), code)
                .await?;
        }

        Ok(())
    }

    /// Requests the brightness worker to stop after draining pending writes.
    pub fn shutdown(&self) {
        self.statics.shutdown.signal(());
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// The control bank a channel was assigned at init.
    pub async fn bank_id(&self, channel: usize) -> Result<BankId> {
        let guard = self.inner.lock().await;
        Ok(guard.led(channel)?.bank_id)
    }

    /// Last brightness value written by the worker for a channel.
    pub async fn brightness(&self, channel: usize) -> Result<u8> {
        let guard = self.inner.lock().await;
        Ok(guard.led(channel)?.brightness)
    }

    /// Cached pattern phase durations for a channel.
    pub async fn pattern_times(&self, channel: usize) -> Result<PatternTime> {
        let guard = self.inner.lock().await;
        Ok(guard.led(channel)?.time)
    }

    /// Cached pattern boundary levels for a channel.
    pub async fn pattern_levels(&self, channel: usize) -> Result<PatternLevel> {
        let guard = self.inner.lock().await;
        Ok(guard.led(channel)?.level)
    }

    /// The channel's display name, configured or defaulted.
    pub async fn led_name(&self, channel: usize) -> Result<String<24>> {
        let guard = self.inner.lock().await;
        let led = guard.led(channel)?;
        let mut out = String::new();
        match led.config.name {
            Some(name) => out.push_str(name).map_err(|()| Error::Format)?,
            None => write!(out, "{DEFAULT_LED_NAME}:{channel}").map_err(|_| Error::Format)?,
        }
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Brightness scheduling
    // ------------------------------------------------------------------------

    /// Schedules a brightness write for a channel.
    ///
    /// Non-blocking and infallible: the value is parked in the channel's
    /// slot and written later by [`brightness_worker_loop`]. Rapid
    /// successive calls coalesce; only the last scheduled value is
    /// guaranteed to reach the register. Unknown channels are ignored.
    pub fn set_brightness(&self, channel: usize, value: u8) {
        if channel >= self.num_leds {
            return;
        }
        self.statics.brightness[channel].signal(value);
    }

    /// Runs every still-pending scheduled brightness write now.
    ///
    /// The worker calls this on shutdown to drain its slots; tests and
    /// callers without a running worker may drive it directly.
    pub async fn flush_brightness(&self) {
        for channel in 0..self.num_leds {
            if let Some(value) = self.statics.brightness[channel].try_take() {
                self.apply_brightness(channel, value).await;
            }
        }
    }

    /// The deferred half of a brightness write: store, write the bank's
    /// brightness register, then enable or disable the bank. Failures have
    /// no return channel and are only logged.
    async fn apply_brightness(&self, channel: usize, value: u8) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let Some(led) = inner.leds.get_mut(channel) else {
            return;
        };
        led.brightness = value;
        let bank = led.bank_id;

        if let Err(e) = inner
            .bus
            .write_byte(REG_BRT_LVLED_BASE + bank.index(), value)
            .await
        {
            warn!("brightness write failed on channel {}: {}", channel, e);
        }
        if let Err(e) = bank::set_bank_enabled(&mut inner.bus, bank, value != 0).await {
            warn!("bank enable failed on channel {}: {}", channel, e);
        }
    }

    // ------------------------------------------------------------------------
    // Pattern programming
    // ------------------------------------------------------------------------

    /// Stores pattern phase durations and requests their effects.
    ///
    /// Issues delay, high-time, and low-time requests, then the ramp pair
    /// of the channel's pattern generator. A request that fails to enqueue
    /// skips the rest of the sequence; requests already granted stay in
    /// flight and still complete.
    pub async fn set_pattern_times<E: EffectEngine>(
        &self,
        engine: &E,
        channel: usize,
        time: PatternTime,
    ) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let led = guard.led_mut(channel)?;
        led.time = time;
        let bank = led.bank_id;

        request(engine, EffectKind::Delay, channel)?;
        request(engine, EffectKind::HighTime, channel)?;
        request(engine, EffectKind::LowTime, channel)?;

        let (ramp_up, ramp_down) = if bank.is_low_group() {
            (EffectKind::Ptn0RampUp, EffectKind::Ptn0RampDown)
        } else {
            (EffectKind::Ptn1RampUp, EffectKind::Ptn1RampDown)
        };
        request(engine, ramp_up, channel)?;
        request(engine, ramp_down, channel)?;

        Ok(())
    }

    /// Stores pattern boundary levels and requests their effects.
    ///
    /// Disables the channel's bank first so the pattern cannot run while
    /// its boundary values are rewritten; the bank is not re-enabled here.
    /// Re-enable happens through [`run_pattern`](Self::run_pattern) or a
    /// nonzero brightness write.
    pub async fn set_pattern_levels<E: EffectEngine>(
        &self,
        engine: &E,
        channel: usize,
        level: PatternLevel,
    ) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let led = inner.led_mut(channel)?;
        led.level = level;
        let bank = led.bank_id;

        bank::set_bank_enabled(&mut inner.bus, bank, false).await?;

        request(engine, EffectKind::LowBrightness, channel)?;
        request(engine, EffectKind::HighBrightness, channel)?;

        Ok(())
    }

    /// Starts or stops the channel's hardware pattern.
    ///
    /// Starting also enables the bank; stopping clears only the pattern
    /// bit and leaves the bank running.
    pub async fn run_pattern(&self, channel: usize, enable: bool) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let bank = inner.led(channel)?.bank_id;

        let mask = bank.pattern_mask();
        let value = if enable { mask } else { 0 };
        inner.bus.read_modify_write(REG_PATTERN, mask, value).await?;

        if enable {
            bank::set_bank_enabled(&mut inner.bus, bank, true).await?;
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Attribute surface
    // ------------------------------------------------------------------------

    /// Attribute write: pattern times as five unsigned integers
    /// (delay, rise, high, fall, low; milliseconds).
    ///
    /// Malformed input is rejected before any state changes or lock is
    /// taken.
    pub async fn store_pattern_times<E: EffectEngine>(
        &self,
        engine: &E,
        channel: usize,
        input: &str,
    ) -> Result<()> {
        let time = pattern::parse_pattern_times(input)?;
        self.set_pattern_times(engine, channel, time).await
    }

    /// Attribute read: pattern times.
    pub async fn show_pattern_times(&self, channel: usize) -> Result<String<96>> {
        let time = self.pattern_times(channel).await?;
        pattern::format_pattern_times(&time)
    }

    /// Attribute write: pattern levels as two unsigned integers, each
    /// clamped to [`MAX_BRIGHTNESS`].
    pub async fn store_pattern_levels<E: EffectEngine>(
        &self,
        engine: &E,
        channel: usize,
        input: &str,
    ) -> Result<()> {
        let level = pattern::parse_pattern_levels(input)?;
        self.set_pattern_levels(engine, channel, level).await
    }

    /// Attribute read: pattern levels.
    pub async fn show_pattern_levels(&self, channel: usize) -> Result<String<64>> {
        let level = self.pattern_levels(channel).await?;
        pattern::format_pattern_levels(&level)
    }

    /// Attribute write: run pattern, boolean-like integer (nonzero starts).
    pub async fn store_run_pattern(&self, channel: usize, input: &str) -> Result<()> {
        let enable = pattern::parse_run_pattern(input)?;
        self.run_pattern(channel, enable).await
    }

    // ------------------------------------------------------------------------
    // Effect completions
    // ------------------------------------------------------------------------

    /// Applies one effect completion under the chip lock.
    ///
    /// Dispatches on the completion's request kind and writes the matching
    /// cached parameter through the subsystem handle. Each kind writes a
    /// disjoint register location, so completion order does not matter.
    /// Write failures have no return channel and are only logged.
    pub async fn complete_effect<H: EffectHandle>(&self, completion: EffectCompletion<H>) {
        let EffectCompletion {
            mut handle,
            kind,
            channel,
        } = completion;

        let guard = self.inner.lock().await;
        let Ok(led) = guard.led(channel) else {
            error!("effect completion for unknown channel {}", channel);
            return;
        };
        let time = led.time;
        let level = led.level;
        let bank = led.bank_id;
        let offset = bank.pattern_reg_offset();

        let written = match kind {
            EffectKind::Delay => handle.set_time(time.delay, offset).await,
            EffectKind::HighTime => handle.set_time(time.high, offset).await,
            EffectKind::LowTime => handle.set_time(time.low, offset).await,
            EffectKind::Ptn0RampUp | EffectKind::Ptn1RampUp => handle.set_ramp(time.rise).await,
            EffectKind::Ptn0RampDown | EffectKind::Ptn1RampDown => handle.set_ramp(time.fall).await,
            EffectKind::LowBrightness => handle.set_level(level.low, offset).await,
            // The high level register is indexed by bank, not by the
            // pattern block stride.
            EffectKind::HighBrightness => handle.set_level(level.high, bank.index()).await,
        };
        if let Err(e) = written {
            warn!("pattern effect write failed on channel {}: {}", channel, e);
        }
    }
}

/// Submits one effect request, mapping the kind to its registered name.
fn request<E: EffectEngine>(engine: &E, kind: EffectKind, channel: usize) -> Result<Ticket> {
    engine.request(kind.name(), kind, channel)
}

// ============================================================================
// Worker loops
// ============================================================================

/// Services deferred brightness writes for one chip.
///
/// Wakes on any channel's scheduled value, applies it under the chip lock,
/// and loops. Returns after [`Chip::shutdown`], draining still-pending
/// slots first so no scheduled value is lost on teardown.
pub async fn brightness_worker_loop<BUS: RegisterBus>(chip: &Chip<BUS>) {
    loop {
        let pending: [_; MAX_LEDS] =
            core::array::from_fn(|i| chip.statics.brightness[i].wait());
        match select(select_array(pending), chip.statics.shutdown.wait()).await {
            Either::First((value, channel)) => chip.apply_brightness(channel, value).await,
            Either::Second(()) => {
                chip.flush_brightness().await;
                return;
            }
        }
    }
}

/// Services effect completions for one chip. Never returns.
pub async fn effect_service_loop<BUS: RegisterBus, H: EffectHandle>(
    chip: &Chip<BUS>,
    completions: &EffectCompletions<H>,
) -> ! {
    loop {
        let completion = completions.receive().await;
        chip.complete_effect(completion).await;
    }
}
