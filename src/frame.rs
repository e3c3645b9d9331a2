// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The CEA-608 frame reconstructor: the component that turns a stream of 16-bit caption-data
//! words into the pop-on/roll-up/paint-on screen state a viewer would actually see.

use crate::buffer::{Buffer, SCREEN_ROWS};
use crate::detail::{Status, StatusDetail, StatusDetailState};
use crate::dtvcc::{DtvccPacketState, DtvccWordType};
use crate::opcode::{self, Control, Style};
use crate::text;
use crate::validator::{PopOnValidator, RollUpValidator, ValidatorCommand};
use crate::xds::XdsState;

/// Which buffer text writes currently target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum WriteTarget {
    /// No mode has been selected yet; writes are dropped.
    #[default]
    None,
    /// Writes target the displayed (front) buffer: paint-on or roll-up mode.
    Front,
    /// Writes target the hidden (back) buffer: pop-on mode.
    Back,
}

/// The mutable cursor/style state carried between words.
#[derive(Debug, Clone)]
pub struct FrameState {
    underline: bool,
    style: Style,
    /// `0` means not roll-up; `1..=3` is the number of extra rows above the cursor row.
    rup: u8,
    row: i8,
    col: i8,
    cc_data: u16,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            underline: false,
            style: Style::White,
            rup: 0,
            // Preserved quirk: the reference decoder initialises the cursor row to the last row
            // index (`SCREEN_ROWS - 1`), not `-1`.
            row: (SCREEN_ROWS - 1) as i8,
            col: 0,
            cc_data: 0,
        }
    }
}

/// A single caption channel's reconstructed screen state.
#[derive(Debug)]
pub struct Frame {
    timestamp: f64,
    xds: XdsState,
    dtvcc: DtvccPacketState,
    state: FrameState,
    front: Buffer,
    back: Buffer,
    write: WriteTarget,
    status: Status,
    detail: StatusDetailState,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            timestamp: -1.0,
            xds: XdsState::new(),
            dtvcc: DtvccPacketState::new(),
            state: FrameState::default(),
            front: Buffer::default(),
            back: Buffer::default(),
            write: WriteTarget::None,
            status: Status::Ok,
            detail: StatusDetailState::default(),
        }
    }
}

impl Frame {
    /// Construct a freshly initialised frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// The timestamp of the most recently absorbed word.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Whether this frame is currently composing off-screen (pop-on mode).
    pub fn is_popon(&self) -> bool {
        self.write == WriteTarget::Back
    }

    /// Whether this frame is currently writing directly on-screen (paint-on mode).
    pub fn is_painton(&self) -> bool {
        self.write == WriteTarget::Front && self.state.rup == 0
    }

    /// Whether this frame is currently in roll-up mode, and if so how many rows.
    pub fn rollup_rows(&self) -> Option<u8> {
        const ROLLUP_ROWS: [u8; 4] = [0, 2, 3, 4];
        let rows = ROLLUP_ROWS[self.state.rup as usize];
        (rows != 0).then_some(rows)
    }

    /// The displayed buffer.
    pub fn front(&self) -> &Buffer {
        &self.front
    }

    /// The hidden (staging) buffer.
    pub fn back(&self) -> &Buffer {
        &self.back
    }

    /// The accumulated anomaly state for this frame.
    pub fn detail(&self) -> &StatusDetailState {
        &self.detail
    }

    /// Stuff the back buffer with word-wrapped `text`, then atomically swap it to front, as if a
    /// complete pop-on caption had just arrived.
    pub fn from_text(&mut self, input: &str) {
        text::buffer_from_text(&mut self.back, input);
        self.end();
    }

    /// Render the front buffer as plain text, rows joined by `\r\n`.
    pub fn to_text(&self) -> String {
        text::buffer_to_text(&self.front)
    }

    /// Render both buffers as an ASCII-art dump, for debugging.
    pub fn dump(&self) -> String {
        text::dump(&self.front, &self.back)
    }

    fn write_target(&mut self) -> Option<&mut Buffer> {
        match self.write {
            WriteTarget::None => None,
            WriteTarget::Front => Some(&mut self.front),
            WriteTarget::Back => Some(&mut self.back),
        }
    }

    fn write_char(&mut self, channel_col: i8, ch: char) {
        let row = self.state.row;
        let (style, underline) = (self.state.style, self.state.underline);
        let Some(buf) = self.write_target() else {
            return;
        };
        match buf.cell_mut(row, channel_col) {
            Some(cell) => {
                cell.data = Some(ch);
                cell.style = style;
                cell.underline = underline;
            }
            None => {
                self.detail.set(StatusDetail::OFF_SCREEN);
            }
        }
    }

    /// Decode one CEA-608 caption-data word.
    ///
    /// `process_xds` selects whether this field's caller wants XDS sub-stream parsing; callers
    /// processing field-1 words must pass `false`.
    pub fn decode(
        &mut self,
        cc_data: u16,
        timestamp: f64,
        process_xds: bool,
        roll_fsm: &mut RollUpValidator,
        pop_fsm: &mut PopOnValidator,
    ) -> Status {
        trace!("decoding {cc_data:#06x} at {timestamp}");

        if !opcode::parity_verify(cc_data) {
            self.detail.set(StatusDetail::PARITY_ERROR);
            self.status = Status::Error;
            return self.status;
        }

        if opcode::is_padding(cc_data) {
            return Status::Ok;
        }

        if self.timestamp < 0.0 || self.timestamp == timestamp || self.status == Status::Ready {
            self.timestamp = timestamp;
            self.status = Status::Ok;
        }

        let is_repeatable_control = opcode::is_control(cc_data) || opcode::is_specialna(cc_data);
        if is_repeatable_control && cc_data == self.state.cc_data {
            debug!("duplicate control/special-na word, suppressing");
            self.detail.set(StatusDetail::DUPLICATE_CONTROL);
            return Status::Ok;
        }
        self.state.cc_data = cc_data;
        self.detail.has_cea608 = true;

        if process_xds && (self.xds.in_packet() || opcode::is_xds(cc_data)) {
            let status = self.xds.decode(cc_data, &mut self.detail);
            self.status = self.status.update(status);
            return self.status;
        }

        let status = if opcode::is_control(cc_data) {
            self.decode_control(cc_data, roll_fsm, pop_fsm)
        } else if opcode::is_basicna(cc_data) || opcode::is_specialna(cc_data) || opcode::is_westeu(cc_data) {
            self.decode_text(cc_data)
        } else if opcode::is_preamble(cc_data) {
            self.decode_preamble(cc_data, roll_fsm, pop_fsm)
        } else if opcode::is_midrowchange(cc_data) {
            self.decode_midrow(cc_data)
        } else {
            Status::Ok
        };

        self.status = self.status.update(status);
        self.status
    }

    /// Decode one DTVCC (CEA-708) header or data word.
    pub fn decode_dtvcc(&mut self, cc_data: u16, word_type: DtvccWordType) -> Status {
        let status = self.dtvcc.decode(cc_data, word_type, &mut self.detail);
        self.status = self.status.update(status);
        self.status
    }

    fn decode_control(
        &mut self,
        cc_data: u16,
        roll_fsm: &mut RollUpValidator,
        pop_fsm: &mut PopOnValidator,
    ) -> Status {
        let (control, _channel) = opcode::parse_control(cc_data);

        let cmd = ValidatorCommand::Control(control);
        if self.state.rup > 0 {
            roll_fsm.update(cmd, &mut self.detail);
        } else {
            pop_fsm.update(cmd, &mut self.detail);
        }

        match control {
            Control::ResumeDirectCaptioning => {
                self.state.rup = 0;
                self.write = WriteTarget::Front;
                Status::Ok
            }
            Control::EraseDisplayedMemory => {
                self.front.clear();
                Status::Ready
            }
            Control::RollUp2 => {
                self.state.rup = 1;
                self.write = WriteTarget::Front;
                Status::Ok
            }
            Control::RollUp3 => {
                self.state.rup = 2;
                self.write = WriteTarget::Front;
                Status::Ok
            }
            Control::RollUp4 => {
                self.state.rup = 3;
                self.write = WriteTarget::Front;
                Status::Ok
            }
            Control::CarriageReturn => self.carriage_return(),
            Control::Backspace => {
                self.state.col = (self.state.col - 1).max(0);
                let (row, col) = (self.state.row, self.state.col);
                if let Some(buf) = self.write_target() {
                    if let Some(cell) = buf.cell_mut(row, col) {
                        *cell = Default::default();
                    }
                }
                Status::Ok
            }
            Control::DeleteToEndOfRow => {
                let (row, col) = (self.state.row, self.state.col);
                if let Some(buf) = self.write_target() {
                    buf.clear_row_from(row, col);
                }
                Status::Ok
            }
            Control::ResumeCaptionLoading => {
                self.state.rup = 0;
                self.write = WriteTarget::Back;
                Status::Ok
            }
            Control::EraseNonDisplayedMemory => {
                self.back.clear();
                Status::Ok
            }
            Control::EndOfCaption => self.end(),
            Control::TabOffset1 => {
                self.state.col = (self.state.col + 1).min(31);
                Status::Ok
            }
            Control::TabOffset2 => {
                self.state.col = (self.state.col + 2).min(31);
                Status::Ok
            }
            Control::TabOffset3 => {
                self.state.col = (self.state.col + 3).min(31);
                Status::Ok
            }
            Control::AlarmOff | Control::AlarmOn | Control::TextRestart | Control::ResumeTextDisplay => {
                Status::Ok
            }
            Control::Unknown => {
                self.detail.set(StatusDetail::UNKNOWN_COMMAND);
                Status::Ok
            }
        }
    }

    fn end(&mut self) -> Status {
        self.front = self.back.clone();
        self.back.clear();
        Status::Ready
    }

    fn carriage_return(&mut self) -> Status {
        if self.state.row < 0 || self.state.row as usize >= SCREEN_ROWS {
            self.detail.set(StatusDetail::OFF_SCREEN);
            return Status::Error;
        }

        let rollup_lines = self.state.rup;
        let r = self.state.row - (rollup_lines as i8 - 1);
        if r <= 0 || rollup_lines == 0 {
            return Status::Ok;
        }

        if let Some(buf) = self.write_target() {
            buf.shift_rows_up(r as usize);
        }
        self.state.col = 0;
        Status::Ok
    }

    fn decode_text(&mut self, cc_data: u16) -> Status {
        if self.write == WriteTarget::None {
            return Status::Ok;
        }

        let (n, chars, _channel) = opcode::to_utf8(cc_data);

        if opcode::is_westeu(cc_data) {
            // Western-European characters replace the previous one.
            self.state.col = (self.state.col - 1).max(0);
        }

        if n == 0 {
            let kind = if opcode::is_westeu(cc_data) {
                StatusDetail::INVALID_EXT_CHARACTER
            } else {
                StatusDetail::INVALID_CHARACTER
            };
            self.detail.set(kind);
            return Status::Ok;
        }

        for ch in chars.iter().take(n) {
            let col = self.state.col;
            self.write_char(col, *ch);
            self.state.col = (self.state.col + 1).min(31);
        }

        if self.is_painton() {
            Status::Ready
        } else {
            Status::Ok
        }
    }

    fn decode_preamble(
        &mut self,
        cc_data: u16,
        roll_fsm: &mut RollUpValidator,
        pop_fsm: &mut PopOnValidator,
    ) -> Status {
        if self.state.rup > 0 {
            roll_fsm.update(ValidatorCommand::Preamble, &mut self.detail);
        } else {
            pop_fsm.update(ValidatorCommand::Preamble, &mut self.detail);
        }

        let mut status = Status::Ok;
        if !(0x40..=0x7f).contains(&opcode::low7(cc_data)) {
            self.detail.set(StatusDetail::ABNORMAL_PACKET);
        }

        match opcode::parse_preamble(cc_data) {
            Some(pac) => {
                self.state.row = pac.row as i8;
                self.state.col = pac.col as i8;
                self.state.style = pac.style;
                self.state.underline = pac.underline;
            }
            None => {
                status = Status::Error;
            }
        }
        status
    }

    fn decode_midrow(&mut self, cc_data: u16) -> Status {
        match opcode::parse_midrowchange(cc_data) {
            Some(mr) => {
                self.state.style = mr.style;
                self.state.underline = mr.underline;
                Status::Ok
            }
            None => {
                self.detail.set(StatusDetail::UNKNOWN_TEXT_ATTRIBUTE);
                Status::Ok
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_init_log;

    #[test]
    fn padding_leaves_frame_untouched() {
        test_init_log();
        let mut frame = Frame::new();
        let mut roll = RollUpValidator::new();
        let mut pop = PopOnValidator::new();
        let status = frame.decode(0x8080, 1.0, false, &mut roll, &mut pop);
        assert_eq!(status, Status::Ok);
        assert_eq!(frame.detail().types, StatusDetail::empty());
    }

    #[test]
    fn bad_parity_is_rejected() {
        test_init_log();
        let mut frame = Frame::new();
        let mut roll = RollUpValidator::new();
        let mut pop = PopOnValidator::new();
        // 0x01 by itself is odd parity already (one set bit); as the high byte here it is *not*
        // marked with the parity bit, so the byte has even weight (invalid).
        let status = frame.decode(0x0100, 1.0, false, &mut roll, &mut pop);
        assert_eq!(status, Status::Error);
        assert!(frame.detail().is_set(StatusDetail::PARITY_ERROR));
    }

    #[test]
    fn duplicate_control_is_suppressed() {
        test_init_log();
        let mut frame = Frame::new();
        let mut roll = RollUpValidator::new();
        let mut pop = PopOnValidator::new();
        // resume_caption_loading: high7=0x14, low7=0x20; odd parity requires each byte's total
        // set-bit count be odd, so set the parity bits accordingly.
        let rcl = 0x9420u16; // 0x94 has 3 set bits (odd), 0x20 has 1 set bit (odd)
        assert_eq!(frame.decode(rcl, 1.0, false, &mut roll, &mut pop), Status::Ok);
        assert_eq!(frame.decode(rcl, 1.0, false, &mut roll, &mut pop), Status::Ok);
        assert!(frame.detail().is_set(StatusDetail::DUPLICATE_CONTROL));
    }

    #[test]
    fn popon_end_of_caption_swaps_buffers() {
        test_init_log();
        let mut frame = Frame::new();
        let mut roll = RollUpValidator::new();
        let mut pop = PopOnValidator::new();

        let rcl = 0x9420u16; // RCL
        frame.decode(rcl, 1.0, false, &mut roll, &mut pop);
        assert!(frame.is_popon());

        // write directly into the back buffer to avoid re-deriving preamble byte math here
        frame.back.cell_mut(14, 0).unwrap().data = Some('H');

        let eoc = 0x942fu16; // EOC: low7 = 0x2f, 0x2f has 6 set bits -> even, need odd parity bit
        let eoc = eoc | 0x0080; // flip parity bit on low byte to restore odd weight
        let status = frame.decode(eoc, 2.0, false, &mut roll, &mut pop);
        assert_eq!(status, Status::Ready);
        assert_eq!(frame.front().cell(14, 0).unwrap().data, Some('H'));
        assert!(frame.back().cell(14, 0).unwrap().data.is_none());
    }

    #[test]
    fn rollup_carriage_return_shifts_rows() {
        test_init_log();
        let mut frame = Frame::new();
        frame.state.row = 14;
        frame.state.rup = 1; // roll-up 2
        frame.write = WriteTarget::Front;
        frame.front.cell_mut(14, 0).unwrap().data = Some('A');
        let status = frame.carriage_return();
        assert_eq!(status, Status::Ok);
        // row 14's content moves up to row 13; row 14 itself is cleared.
        assert_eq!(frame.front().cell(13, 0).unwrap().data, Some('A'));
        assert_eq!(frame.front().cell(14, 0).unwrap().data, None);
        assert_eq!(frame.state.col, 0);
    }

    #[test]
    fn rollup2_carriage_return_then_new_line_matches_spec_scenario() {
        // Scenario S4: RU2, PAC(row=14), 'A', CR, 'B' -> row13="A", row14="B".
        test_init_log();
        let mut frame = Frame::new();

        frame.state.rup = 1; // roll-up 2
        frame.write = WriteTarget::Front;
        frame.state.row = 14;
        frame.state.col = 0;
        frame.write_char(0, 'A');

        let status = frame.carriage_return();
        assert_eq!(status, Status::Ok);
        assert_eq!(frame.front().cell(13, 0).unwrap().data, Some('A'));
        assert_eq!(frame.front().cell(14, 0).unwrap().data, None);

        frame.write_char(0, 'B');
        assert_eq!(frame.front().cell(13, 0).unwrap().data, Some('A'));
        assert_eq!(frame.front().cell(14, 0).unwrap().data, Some('B'));
    }
}
