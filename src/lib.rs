// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

//! # cea608-frame
//!
//! A decoder for closed-caption bitstreams: CEA-608 (NTSC line-21) frame reconstruction, the
//! CEA-708 (DTVCC) packet layer, and Extended Data Services (XDS) metadata.
//!
//! The reference for the byte layouts in this crate is the ANSI/CTA-608-E and CTA-708-E
//! specifications.
//!
//! Three pieces are exposed at the crate root:
//!
//! - [`Frame`] reconstructs a 15x32 screen of styled cells from a stream of 16-bit caption-data
//!   words, in pop-on, roll-up or paint-on mode.
//! - [`RollUpValidator`] and [`PopOnValidator`] watch the *order* that control codes arrive in
//!   and flag streams that violate the prescribed command grammar, independent of frame content.
//! - [`opcode`] is the low-level byte classification and character-table module (basic/special
//!   North-American and western-European text, control codes, preambles, mid-row changes) that
//!   the above are built on; most callers won't need it directly.
//!
//! ```
//! use cea608_frame::{Frame, RollUpValidator, PopOnValidator};
//!
//! let mut frame = Frame::new();
//! let mut roll = RollUpValidator::new();
//! let mut pop = PopOnValidator::new();
//! frame.decode(0x8080, 0.0, false, &mut roll, &mut pop);
//! ```

#[macro_use]
extern crate log;

pub mod buffer;
pub mod detail;
pub mod dtvcc;
pub mod opcode;
pub mod text;
pub mod validator;
pub mod xds;

mod frame;

pub use buffer::{Buffer, Cell};
pub use detail::{Status, StatusDetail, StatusDetailState};
pub use dtvcc::DtvccWordType;
pub use frame::{Frame, FrameState, WriteTarget};
pub use validator::{PopOnValidator, RollUpValidator, ValidatorCommand};
pub use xds::{Class as XdsClass, PacketSlot as XdsPacketSlot, XdsState};

/// A CEA-608 caption identifier unique within a caption-data stream: the field it is carried on
/// combined with the channel selected within that field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Id {
    /// Field 1, channel 1.
    CC1,
    /// Field 1, channel 2.
    CC2,
    /// Field 2, channel 1.
    CC3,
    /// Field 2, channel 2.
    CC4,
}

/// Which of the two interlaced NTSC fields a word was carried on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    /// Field 1, which may carry CEA-608 channels 1/2 and CEA-708 packets.
    One,
    /// Field 2, which may additionally carry XDS.
    Two,
}

impl Id {
    /// The field this identifier is carried on.
    pub fn field(&self) -> Field {
        match self {
            Id::CC1 | Id::CC2 => Field::One,
            Id::CC3 | Id::CC4 => Field::Two,
        }
    }

    /// The channel this identifier selects within its field.
    pub fn channel(&self) -> opcode::Channel {
        match self {
            Id::CC1 | Id::CC3 => opcode::Channel::One,
            Id::CC2 | Id::CC4 => opcode::Channel::Two,
        }
    }

    /// Construct an [`Id`] from a [`Field`] and [`opcode::Channel`].
    pub fn from_field_channel(field: Field, channel: opcode::Channel) -> Self {
        match (field, channel) {
            (Field::One, opcode::Channel::One) => Id::CC1,
            (Field::One, opcode::Channel::Two) => Id::CC2,
            (Field::Two, opcode::Channel::One) => Id::CC3,
            (Field::Two, opcode::Channel::Two) => Id::CC4,
        }
    }
}

/// Errors returned when constructing or translating caption data fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParserError {
    /// A byte failed the odd-parity check required of every CEA-608 word.
    #[error("Invalid parity")]
    InvalidParity,
    /// A word could not be translated into a displayable character.
    #[error("Word {0:#06x} does not translate to a displayable character")]
    UntranslatableCharacter(u16),
}

/// Errors returned by boundary helpers that write into a fixed-capacity resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriterError {
    /// Writing would overflow the resource's capacity by this many bytes.
    #[error("Writing would overflow by {0} bytes")]
    WouldOverflow(usize),
    /// The target row or column lies outside the screen.
    #[error("Position ({0}, {1}) is off-screen")]
    OffScreen(i8, i8),
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::OnceLock;

    static LOGGING: OnceLock<()> = OnceLock::new();

    pub fn test_init_log() {
        LOGGING.get_or_init(|| {
            env_logger::init();
        });
    }
}
