//! Control bank identities and the output-line to bank allocator.
//!
//! Lines 0 and 3 are hard-wired to banks C and F and never reprogrammed.
//! Every other configured line either joins its group lead's bank (bank
//! select bit cleared) or takes the independent bank matching its line
//! index (bit set).

use crate::bus::RegisterBus;
use crate::config::{LedString, NUM_LINES};
use crate::registers::{
    LED_BANK_OFFSET, PATTERN_EN, PATTERN_REG_OFFSET, REG_BANK_SEL, REG_ENABLE,
};
use crate::Result;

// ============================================================================
// BankId
// ============================================================================

/// One of the six low-voltage LED control banks.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BankId {
    /// Bank C, fixed home of line 0.
    C,
    /// Bank D.
    D,
    /// Bank E.
    E,
    /// Bank F, fixed home of line 3.
    F,
    /// Bank G.
    G,
    /// Bank H.
    H,
}

impl BankId {
    /// Number of banks on the chip.
    pub const COUNT: usize = 6;

    /// The independent bank owning the given output line.
    pub(crate) const fn from_line(line: usize) -> Self {
        match line {
            0 => Self::C,
            1 => Self::D,
            2 => Self::E,
            3 => Self::F,
            4 => Self::G,
            _ => Self::H,
        }
    }

    /// The shared bank a grouped line falls back to.
    pub(crate) const fn group_default(line: usize) -> Self {
        if line < 3 { Self::C } else { Self::F }
    }

    /// Bank-select bit marking the group lead a grouped line shares.
    pub(crate) const fn group_marker(line: usize) -> u8 {
        if line < 3 { 1 << 0 } else { 1 << 3 }
    }

    /// Bank index as a register byte offset.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// This bank's bit in the shared enable register.
    #[must_use]
    pub const fn enable_mask(self) -> u8 {
        1 << (self as u8 + LED_BANK_OFFSET)
    }

    /// This bank's bit in the pattern enable register.
    #[must_use]
    pub const fn pattern_mask(self) -> u8 {
        PATTERN_EN << (self as u8 + LED_BANK_OFFSET)
    }

    /// Byte offset of this bank's pattern timing register block.
    #[must_use]
    pub const fn pattern_reg_offset(self) -> u8 {
        self as u8 * PATTERN_REG_OFFSET
    }

    /// Banks C..E run the first pattern generator, F..H the second.
    #[must_use]
    pub const fn is_low_group(self) -> bool {
        matches!(self, Self::C | Self::D | Self::E)
    }
}

// ============================================================================
// Allocation and enable control
// ============================================================================

/// Assigns a control bank for every line in `string` and programs the bank
/// select register accordingly. Returns the bank the channel ends up on.
///
/// Lines 0 and 3 need no register write. Each remaining line gets one masked
/// read-modify-write; the first failure aborts the rest of this channel's
/// assignment while earlier writes stay committed (assignments are
/// per-line independent).
pub(crate) async fn assign_banks<BUS: RegisterBus>(
    bus: &mut BUS,
    string: LedString,
) -> Result<BankId> {
    // Lines 0 and 3 are hard-wired to their banks.
    let mut bank = if string.contains_line(0) {
        BankId::C
    } else if string.contains_line(3) {
        BankId::F
    } else {
        BankId::C
    };

    for line in 0..NUM_LINES {
        if line == 0 || line == 3 {
            continue;
        }
        if !string.contains_line(line) {
            continue;
        }

        let bit = 1u8 << line;
        let value = if string.bits() & BankId::group_marker(line) != 0 {
            bank = BankId::group_default(line);
            0
        } else {
            bank = BankId::from_line(line);
            bit
        };
        bus.read_modify_write(REG_BANK_SEL, bit, value).await?;
    }

    Ok(bank)
}

/// Sets or clears a bank's bit in the shared enable register. Idempotent.
pub(crate) async fn set_bank_enabled<BUS: RegisterBus>(
    bus: &mut BUS,
    bank: BankId,
    on: bool,
) -> Result<()> {
    let mask = bank.enable_mask();
    let value = if on { mask } else { 0 };
    bus.read_modify_write(REG_ENABLE, mask, value).await
}
