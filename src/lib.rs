//! Bank-based control for the TI LM3633 low-voltage LED strings.
//!
//! The LM3633 exposes six LED output strings (LVLED1..LVLED6). Each string is
//! driven by one of six internal control *banks*; a bank owns the shared
//! brightness, current-limit, and pattern-generator register set for every
//! string attached to it. This crate decides which strings share a bank,
//! programs the assignment, and then drives brightness and the autonomous
//! hardware blink pattern through that bank.
//!
//! # Glossary
//!
//! - **Bank:** an internal register group (C..H) owning brightness, max
//!   current, and pattern timing for the strings attached to it.
//! - **Group:** a hardware-fixed association of three output lines
//!   (indices 0..=2 and 3..=5). The two trailing lines of a group may share
//!   the lead line's bank instead of getting an independent one.
//! - **Pattern:** an autonomous timing sequence
//!   (delay → rise → high → fall → low) the chip runs without host help
//!   once started.
//! - **Effect request:** an asynchronous unit of work submitted to the
//!   reusable effect subsystem to program one named timing/ramp/level
//!   parameter; it completes later through a completion message.
//!
//! # Structure
//!
//! [`chip::Chip`] owns the register transport and all per-string state
//! behind a single async lock. Brightness changes are decoupled from the
//! caller through a latest-wins slot serviced by
//! [`chip::brightness_worker_loop`]; pattern parameters travel through the
//! effect subsystem and land in registers via
//! [`chip::effect_service_loop`]. Both loops are plain `async fn`s the
//! application wraps in its own executor tasks.

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait, reason = "single-executor embedded use")]

#[macro_use]
mod fmt;

pub mod bank;
pub mod bus;
pub mod chip;
pub mod config;
pub mod effect;
mod error;
pub mod pattern;
pub mod registers;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
