// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Decode status and the sticky anomaly bitset threaded through every component.

use bitflags::bitflags;

/// The result of decoding a single word.
///
/// Unlike a fallible [`Result`](std::result::Result), [`Status::Error`] here means "this one
/// word was rejected", not "the call failed outright" -- real streams routinely carry parity
/// glitches and out-of-sequence control codes that a caller is expected to shrug off and keep
/// decoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// The word was rejected. The frame's visible state is unchanged.
    Error,
    /// The word was absorbed. Nothing new is displayable.
    #[default]
    Ok,
    /// The front buffer now reflects a newly displayable caption.
    Ready,
}

impl Status {
    /// Merge two statuses, preferring the more "interesting" of the two.
    ///
    /// `Error` dominates `Ok`/`Ready`, and `Ready` dominates `Ok`. This mirrors combining the
    /// result of several sub-decodes (e.g. 608 dispatch plus sequence validation) into the single
    /// status returned to the caller.
    pub fn update(self, other: Status) -> Status {
        match (self, other) {
            (Status::Error, _) | (_, Status::Error) => Status::Error,
            (Status::Ready, _) | (_, Status::Ready) => Status::Ready,
            _ => Status::Ok,
        }
    }
}

bitflags! {
    /// Sticky anomaly bits accumulated while decoding a stream.
    ///
    /// None of these are ever fatal to the frame as a whole: they record that *something* about
    /// a particular word was non-conformant while the decoder otherwise keeps going.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct StatusDetail: u32 {
        /// A cell write addressed a row/column outside the 15x32 grid.
        const OFF_SCREEN = 1 << 1;
        /// A control (or special north-american) code repeated its immediate predecessor.
        const DUPLICATE_CONTROL = 1 << 2;
        /// A control code dispatch matched no known command.
        const UNKNOWN_COMMAND = 1 << 3;
        /// A basic north-american or western-european word failed to translate to a character.
        const INVALID_CHARACTER = 1 << 4;
        /// A byte failed the even-parity check.
        const PARITY_ERROR = 1 << 5;
        /// A preamble address code fell outside its legal byte range but was installed anyway.
        const ABNORMAL_PACKET = 1 << 6;
        /// A mid-row change word had an unrecognised style/underline byte combination.
        const UNKNOWN_TEXT_ATTRIBUTE = 1 << 7;
        /// An extended character word failed to translate to a character.
        const INVALID_EXT_CHARACTER = 1 << 8;
        /// The roll-up validator saw a command arrive out of its expected sequence.
        const ROLLUP_OOS_ERROR = 1 << 9;
        /// The roll-up validator's sequence finished without all required commands.
        const ROLLUP_MISSING_ERROR = 1 << 10;
        /// Umbrella bit set alongside either roll-up validation error.
        const ROLLUP_ERROR = 1 << 11;
        /// The pop-on validator saw a command arrive out of its expected sequence.
        const POPON_OOS_ERROR = 1 << 12;
        /// The pop-on validator's sequence finished without all required commands.
        const POPON_MISSING_ERROR = 1 << 13;
        /// Umbrella bit set alongside either pop-on validation error.
        const POPON_ERROR = 1 << 14;
        /// An XDS informational byte fell outside its legal range.
        const XDS_INVALID_CHARACTERS = 1 << 15;
        /// An XDS packet's trailing checksum did not match the computed value.
        const XDS_CHECKSUM_ERROR = 1 << 16;
        /// An XDS control code or continuation reference made no structural sense.
        const XDS_INVALID_PKT_STRUCTURE = 1 << 17;
        /// A DTVCC header's sequence number skipped ahead of the expected value.
        const SEQUENCE_DISCONTINUITY = 1 << 18;
        /// A DTVCC header advertised a service block larger than the standard allows.
        const ABNORMAL_SERVICE_BLOCK = 1 << 19;
        /// A DTVCC data byte used a reserved/illegal control code.
        const ABNORMAL_CONTROL_CODE = 1 << 20;
        /// A `DefineWindow` command specified an illegal anchor point.
        const ABNORMAL_WINDOW_POSITION = 1 << 21;
        /// A `DefineWindow` command specified a row or column count outside its legal range.
        const ABNORMAL_WINDOW_SIZE = 1 << 22;
        /// A DTVCC data byte used a reserved/illegal character code.
        const ABNORMAL_CHARACTER = 1 << 23;
        /// The number of bytes consumed by a DTVCC opcode did not fit inside its service block.
        const DTVCC_PACKING_MISMATCH = 1 << 24;
    }
}

/// Accumulated anomaly state and service counters for a single frame.
///
/// Shared by reference across the 608 decoder, both sequence validators, the 708 packet parser
/// and the XDS parser; none of them hold their own copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusDetailState {
    /// The accumulated anomaly bits.
    pub types: StatusDetail,
    /// The highest DTVCC service number seen so far.
    pub num_services_708: u8,
    /// Number of DTVCC packet-sequence groups detected as lost.
    pub packet_loss: u32,
    /// Whether any CEA-608 word has been seen.
    pub has_cea608: bool,
    /// Whether any CEA-708 word has been seen.
    pub has_cea708: bool,
}

impl StatusDetailState {
    /// Set one or more anomaly bits.
    pub fn set(&mut self, bits: StatusDetail) {
        warn!("status detail: {bits:?}");
        self.types.insert(bits);
    }

    /// Whether the given anomaly bit(s) are currently set.
    pub fn is_set(&self, bits: StatusDetail) -> bool {
        self.types.contains(bits)
    }

    /// Reset to the state of a freshly constructed value.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
