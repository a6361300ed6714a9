//! Crate-wide error type.

use derive_more::{Display, Error};

/// Errors surfaced by chip construction and register-touching operations.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No LED channels were configured.
    #[display("no LED channels configured")]
    NoLedChannels,

    /// More channels configured than the chip has output strings.
    #[display("too many LED channels: {count}")]
    TooManyLedChannels {
        /// Number of channels requested.
        count: usize,
    },

    /// An operation referenced a channel index outside the configured set.
    #[display("no such LED channel: {index}")]
    BadChannel {
        /// The offending channel index.
        index: usize,
    },

    /// The register transport reported a failure.
    #[display("register transport failure")]
    Bus,

    /// The effect subsystem refused to enqueue a request.
    #[display("effect subsystem rejected request")]
    EffectRequest,

    /// Malformed pattern attribute input (wrong token count or bad integer).
    #[display("malformed pattern attribute input")]
    PatternParse,

    /// Attribute output exceeded its fixed-capacity buffer.
    #[display("attribute formatting overflow")]
    Format,
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
