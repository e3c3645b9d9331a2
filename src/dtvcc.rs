// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The CEA-708 (DTVCC) packet parser.
//!
//! This is a byte-level walker over DTVCC service blocks carried inside the 16-bit caption-data
//! stream: it tracks packet-sequence continuity and classifies each opcode byte into its C0/C1/
//! C2/C3/G0/G1/G2/G3 class, consuming the right number of parameter bytes for each. It does not
//! render windows; it only parses structure and flags non-conformant framing.

use crate::detail::{StatusDetail, StatusDetailState};

/// The kind of caption-data word a CEA-708 caller is handing to the parser.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtvccWordType {
    /// An NTSC field-1 CEA-608 word (not processed by this parser).
    NtscField1,
    /// An NTSC field-2 CEA-608 word (not processed by this parser).
    NtscField2,
    /// A DTVCC packet header word.
    DtvccPacketHeader,
    /// A DTVCC packet data word.
    DtvccPacketData,
}

/// Per-16-bit-byte parameter length for the twelve non-extended C1 opcodes, in order starting at
/// `0x80`.
const C1_CODE_LENGTH: [u8; 32] = [
    1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 1, 1, 3, 4, 3, 1, 1, 1, 1, 5, 7, 7, 7, 7, 7, 7, 7, 7,
];

/// State carried across DTVCC packet header/data words for a single service.
#[derive(Debug, Default)]
pub struct DtvccPacketState {
    sequence_number: u8,
    sequence_count: u8,
    seen_sequences: u8,
    packet_size: u8,
    service_number: u8,
    block_size: u8,
    is_extended_header: bool,
    is_ext_code: bool,
    in_variable_length_header: bool,
    in_define_window: bool,
    bytes_left: u8,
}

impl DtvccPacketState {
    /// Construct a freshly-zeroed packet state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one caption-data word of the given type into the parser.
    pub fn decode(
        &mut self,
        word: u16,
        word_type: DtvccWordType,
        detail: &mut StatusDetailState,
    ) -> crate::detail::Status {
        match word_type {
            DtvccWordType::NtscField1 | DtvccWordType::NtscField2 => {
                crate::detail::Status::Ok
            }
            DtvccWordType::DtvccPacketHeader => self.decode_header(word, detail),
            DtvccWordType::DtvccPacketData => self.decode_data(word, detail),
        }
    }

    fn decode_header(&mut self, word: u16, detail: &mut StatusDetailState) -> crate::detail::Status {
        let b1 = (word >> 8) as u8;
        let b2 = word as u8;

        let new_seq = (b1 >> 6) & 0x03;
        // Preserved quirk: the reference decoder masks packet_size with 0x2F, not the 0x3F that
        // would capture all six bits -- likely a historical bug, kept verbatim.
        let packet_size = b1 & 0x2f;
        let service_number = (b2 >> 5) & 0x07;
        let block_size = b2 & 0x1f;

        let expected = (self.sequence_number + 1) % 4;
        if self.sequence_count > 0 && new_seq != expected {
            detail.set(StatusDetail::SEQUENCE_DISCONTINUITY);
        }
        self.sequence_number = new_seq;
        self.seen_sequences |= 1 << new_seq;
        self.sequence_count += 1;
        if self.sequence_count >= 4 {
            if self.seen_sequences != 0x0f {
                detail.packet_loss += 1;
            }
            self.seen_sequences = 0;
            self.sequence_count = 0;
        }

        self.packet_size = packet_size;
        self.service_number = service_number;
        self.block_size = block_size;
        self.is_extended_header = false;

        if block_size > 31 {
            detail.set(StatusDetail::ABNORMAL_SERVICE_BLOCK);
        }
        if service_number > detail.num_services_708 {
            detail.num_services_708 = service_number;
        }
        if service_number == 7 && block_size != 0 {
            self.is_extended_header = true;
        }

        detail.has_cea708 = true;
        crate::detail::Status::Ok
    }

    fn decode_data(&mut self, word: u16, detail: &mut StatusDetailState) -> crate::detail::Status {
        if self.is_extended_header {
            self.service_number = ((word >> 8) as u8) & 0x3f;
            self.is_extended_header = false;
            self.decode_byte(word as u8, detail);
            self.check_overrun(detail);
            return crate::detail::Status::Ok;
        }

        self.decode_byte((word >> 8) as u8, detail);
        self.decode_byte(word as u8, detail);
        self.check_overrun(detail);
        crate::detail::Status::Ok
    }

    /// If the active opcode's remaining parameter count no longer fits in what's left of the
    /// service block, the opcode would overrun it.
    fn check_overrun(&mut self, detail: &mut StatusDetailState) {
        if self.bytes_left > self.block_size {
            detail.set(StatusDetail::ABNORMAL_CONTROL_CODE);
        }
    }

    fn decode_byte(&mut self, byte: u8, detail: &mut StatusDetailState) {
        if self.service_number == 0 || self.block_size == 0 {
            return;
        }

        if self.bytes_left > 0 {
            self.consume_parameter_byte(byte, detail);
            self.block_size = self.block_size.saturating_sub(1);
            return;
        }

        if self.is_ext_code {
            self.is_ext_code = false;
            self.in_define_window = false;
            self.classify_extended(byte, detail);
        } else if byte == 0x10 {
            self.is_ext_code = true;
            self.in_define_window = false;
            self.bytes_left = 0;
        } else {
            self.in_define_window = false;
            self.classify(byte, detail);
        }

        self.block_size = self.block_size.saturating_sub(1);
    }

    fn classify(&mut self, byte: u8, detail: &mut StatusDetailState) {
        match byte {
            0x00..=0x1f => {
                // C0
                if !matches!(byte, 0x00 | 0x03 | 0x08 | 0x0c | 0x0d | 0x0e) {
                    detail.set(StatusDetail::ABNORMAL_CONTROL_CODE);
                }
                self.bytes_left = 0;
            }
            0x20..=0x7f => {
                // G0: printable, no parameters
                self.bytes_left = 0;
            }
            0x80..=0x9f => {
                // C1
                self.bytes_left = C1_CODE_LENGTH[(byte - 0x80) as usize].saturating_sub(1);
                self.in_define_window = (0x98..=0x9f).contains(&byte);
            }
            0xa0..=0xff => {
                // G1: printable, no parameters
                self.bytes_left = 0;
            }
        }
    }

    fn classify_extended(&mut self, byte: u8, detail: &mut StatusDetailState) {
        match byte {
            0x00..=0x1f => {
                // C2: every extended C0-range code reserves a fixed parameter count.
                self.bytes_left = match byte {
                    0x00..=0x07 => 0,
                    0x08..=0x0f => 1,
                    0x10..=0x17 => 2,
                    _ => 3,
                };
            }
            0x20..=0x7f => {
                // G2: extended character set, no parameters.
                self.bytes_left = 0;
            }
            0x80 => {
                detail.set(StatusDetail::ABNORMAL_CONTROL_CODE);
                self.bytes_left = 0;
            }
            0x81..=0x87 => {
                self.bytes_left = 4;
            }
            0x88..=0x8f => {
                self.bytes_left = 5;
            }
            0x90..=0x9f => {
                self.in_variable_length_header = true;
                self.bytes_left = 1;
            }
            0xa0 => {
                // G3: the single legal extended G3 code.
                self.bytes_left = 0;
            }
            0xa1..=0xff => {
                detail.set(StatusDetail::ABNORMAL_CHARACTER);
                self.bytes_left = 0;
            }
        }
    }

    fn consume_parameter_byte(&mut self, byte: u8, detail: &mut StatusDetailState) {
        if self.in_variable_length_header {
            self.in_variable_length_header = false;
            self.bytes_left = byte & 0x1f;
            return;
        }

        // DefineWindow (non-extended C1 0x98-0x9f) parameter layout: offset 3 carries the anchor
        // point and row count, offset 4 the column count. Only inspect these offsets when the
        // active opcode is actually a define_window -- other C1 opcodes can reach the same
        // bytes_left countdown values without sharing this byte layout.
        if self.in_define_window {
            match self.bytes_left {
                3 => {
                    let anchor = (byte >> 4) & 0x0f;
                    let rows = (byte & 0x0f) + 1;
                    if anchor > 8 {
                        detail.set(StatusDetail::ABNORMAL_WINDOW_POSITION);
                    }
                    if rows > 12 {
                        detail.set(StatusDetail::ABNORMAL_WINDOW_SIZE);
                    }
                }
                2 => {
                    let cols = (byte & 0x3f) + 1;
                    if cols > 42 {
                        detail.set(StatusDetail::ABNORMAL_WINDOW_SIZE);
                    }
                }
                _ => {}
            }
        }
        self.bytes_left = self.bytes_left.saturating_sub(1);
    }
}
