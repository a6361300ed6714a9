//! Contracts for the reusable effect subsystem.
//!
//! The effect subsystem owns the conversion from milliseconds and level
//! values into timing-register codes. The driver only submits named
//! requests and reacts to their completions; a request is granted
//! immediately but completes later, out of order relative to other
//! outstanding requests.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::Result;

// ============================================================================
// Registered effect names
// ============================================================================

/// Pattern delay time effect.
pub const EFFECT_PTN_DELAY: &str = "ptn_delay";
/// Pattern high time effect.
pub const EFFECT_PTN_HIGHTIME: &str = "ptn_hightime";
/// Pattern low time effect.
pub const EFFECT_PTN_LOWTIME: &str = "ptn_lowtime";
/// Ramp-up effect of the first pattern generator (banks C..E).
pub const EFFECT_PTN0_RAMPUP: &str = "ptn0_rampup";
/// Ramp-down effect of the first pattern generator.
pub const EFFECT_PTN0_RAMPDOWN: &str = "ptn0_rampdn";
/// Ramp-up effect of the second pattern generator (banks F..H).
pub const EFFECT_PTN1_RAMPUP: &str = "ptn1_rampup";
/// Ramp-down effect of the second pattern generator.
pub const EFFECT_PTN1_RAMPDOWN: &str = "ptn1_rampdn";
/// Pattern low brightness effect.
pub const EFFECT_PTN_LOWBRT: &str = "ptn_lowbrt";
/// Pattern high brightness effect.
pub const EFFECT_PTN_HIGHBRT: &str = "ptn_highbrt";

// ============================================================================
// Request kinds
// ============================================================================

/// The closed set of effect requests the driver issues.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EffectKind {
    /// Pattern start delay, per bank.
    Delay,
    /// Time spent at the high level, per bank.
    HighTime,
    /// Time spent at the low level, per bank.
    LowTime,
    /// Rise ramp of the first pattern generator.
    Ptn0RampUp,
    /// Fall ramp of the first pattern generator.
    Ptn0RampDown,
    /// Rise ramp of the second pattern generator.
    Ptn1RampUp,
    /// Fall ramp of the second pattern generator.
    Ptn1RampDown,
    /// Brightness at the pattern's low phase.
    LowBrightness,
    /// Brightness at the pattern's high phase.
    HighBrightness,
}

impl EffectKind {
    /// The effect name registered with the subsystem for this request kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Delay => EFFECT_PTN_DELAY,
            Self::HighTime => EFFECT_PTN_HIGHTIME,
            Self::LowTime => EFFECT_PTN_LOWTIME,
            Self::Ptn0RampUp => EFFECT_PTN0_RAMPUP,
            Self::Ptn0RampDown => EFFECT_PTN0_RAMPDOWN,
            Self::Ptn1RampUp => EFFECT_PTN1_RAMPUP,
            Self::Ptn1RampDown => EFFECT_PTN1_RAMPDOWN,
            Self::LowBrightness => EFFECT_PTN_LOWBRT,
            Self::HighBrightness => EFFECT_PTN_HIGHBRT,
        }
    }
}

// ============================================================================
// Subsystem contracts
// ============================================================================

/// Token identifying a granted request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticket(
    /// Subsystem-assigned request id.
    pub u32,
);

/// One granted effect, handed back with its completion.
///
/// The handle wraps the subsystem's own register access for the effect;
/// each method converts and writes one parameter.
pub trait EffectHandle {
    /// Writes a time parameter at the given per-bank register offset.
    async fn set_time(&mut self, msec: u32, reg_offset: u8) -> Result<()>;

    /// Writes a ramp time parameter (the generator's shared ramp register).
    async fn set_ramp(&mut self, msec: u32) -> Result<()>;

    /// Writes a level parameter at the given register offset.
    async fn set_level(&mut self, level: u8, reg_offset: u8) -> Result<()>;
}

/// The effect subsystem's request side.
pub trait EffectEngine {
    /// Submits a request for the named effect. Returns immediately; the
    /// grant completes later as an [`EffectCompletion`] carrying `kind`
    /// and `channel` back, exactly once, in no guaranteed order.
    fn request(&self, name: &'static str, kind: EffectKind, channel: usize) -> Result<Ticket>;
}

/// Completion message for one granted request.
pub struct EffectCompletion<H> {
    /// Subsystem handle for the granted effect.
    pub handle: H,
    /// The request kind echoed back for dispatch.
    pub kind: EffectKind,
    /// The LED channel the request was issued for.
    pub channel: usize,
}

/// Depth of the completion queue between the subsystem and the driver.
pub const EFFECT_QUEUE_DEPTH: usize = 16;

/// Channel carrying completions into [`crate::chip::effect_service_loop`].
pub type EffectCompletions<H> =
    Channel<CriticalSectionRawMutex, EffectCompletion<H>, EFFECT_QUEUE_DEPTH>;
