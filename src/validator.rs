// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Command-sequence validators for pop-on and roll-up captioning.
//!
//! These two finite state machines never touch frame content: they watch the order that control
//! codes and preambles arrive in and raise sticky flags when a stream violates the prescribed
//! grammar. A well-formed pop-on stream is `RCL -> (ENM|PAC) -> (PAC|TOFF|EDM)* -> EDM -> EOC`; a
//! well-formed roll-up stream is `RU123 -> CR -> PACR -> (RU123 ...)`.

use crate::detail::{StatusDetailState, StatusDetail};
use crate::opcode::Control;

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    struct RollUpState: u8 {
        const RU123 = 1 << 0;
        const CR = 1 << 1;
        const PACR = 1 << 2;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    struct PopOnState: u8 {
        const RCL = 1 << 0;
        const ENM = 1 << 1;
        const PAC = 1 << 2;
        const TOFF = 1 << 3;
        const EDM = 1 << 4;
        const EOC = 1 << 5;
    }
}

/// A command relevant to sequence validation, independent of which FSM consumes it.
///
/// Preambles are collapsed to a single sentinel: the validators only care that *some* PAC
/// arrived, not its row/column/style payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidatorCommand {
    /// A preamble address code arrived.
    Preamble,
    /// One of [`Control`]'s variants arrived.
    Control(Control),
}

/// Validates the roll-up command grammar: `RU123 -> CR -> PACR -> ...`.
#[derive(Debug, Default)]
pub struct RollUpValidator {
    cur_state: RollUpState,
    next_state: RollUpState,
    ru123_count: u32,
    cr_count: u32,
    pac_count: u32,
    oos_error: bool,
    missing_error: bool,
}

impl RollUpValidator {
    /// Construct a freshly reset validator.
    pub fn new() -> Self {
        let mut v = Self::default();
        v.reset();
        v
    }

    /// Reset to the initial state, expecting the next roll-up sequence to begin with `RU123`.
    pub fn reset(&mut self) {
        *self = Self::default();
        self.next_state = RollUpState::RU123;
    }

    /// Feed one command into the validator.
    pub fn update(&mut self, cmd: ValidatorCommand, detail: &mut StatusDetailState) {
        match cmd {
            ValidatorCommand::Control(Control::RollUp2)
            | ValidatorCommand::Control(Control::RollUp3)
            | ValidatorCommand::Control(Control::RollUp4) => {
                if !self.next_state.contains(RollUpState::RU123) {
                    self.oos_error = true;
                    self.missing_error = true;
                    self.emit(detail);
                }
                self.cur_state = RollUpState::RU123;
                self.next_state = RollUpState::CR;
                self.ru123_count += 1;
                self.oos_error = false;
                self.missing_error = false;
            }
            ValidatorCommand::Control(Control::CarriageReturn) => {
                if !self.next_state.contains(RollUpState::CR) {
                    self.oos_error = true;
                }
                self.cur_state = RollUpState::CR;
                self.next_state = RollUpState::PACR;
                self.cr_count += 1;
            }
            ValidatorCommand::Preamble => {
                if !self.next_state.contains(RollUpState::PACR) {
                    self.oos_error = true;
                }
                self.cur_state = RollUpState::PACR;
                self.next_state = RollUpState::RU123;
                self.pac_count += 1;
                if self.cr_count == 0 {
                    self.missing_error = true;
                }
                self.emit(detail);
                self.reset();
            }
            _ => {}
        }
    }

    fn emit(&self, detail: &mut StatusDetailState) {
        if self.oos_error {
            detail.set(StatusDetail::ROLLUP_OOS_ERROR | StatusDetail::ROLLUP_ERROR);
        }
        if self.missing_error {
            detail.set(StatusDetail::ROLLUP_MISSING_ERROR | StatusDetail::ROLLUP_ERROR);
        }
    }
}

/// Validates the pop-on command grammar: `RCL -> (ENM|PAC) -> (PAC|TOFF|EDM)* -> EDM -> EOC`.
#[derive(Debug, Default)]
pub struct PopOnValidator {
    cur_state: PopOnState,
    next_state: PopOnState,
    rcl_count: u32,
    enm_count: u32,
    pac_count: u32,
    toff_count: u32,
    edm_count: u32,
    eoc_count: u32,
    oos_error: bool,
    missing_error: bool,
}

impl PopOnValidator {
    /// Construct a freshly reset validator.
    pub fn new() -> Self {
        let mut v = Self::default();
        v.reset();
        v
    }

    /// Reset to the initial state, expecting the next sequence to begin with `RCL`.
    pub fn reset(&mut self) {
        *self = Self::default();
        self.next_state = PopOnState::RCL;
    }

    /// Feed one command into the validator.
    pub fn update(&mut self, cmd: ValidatorCommand, detail: &mut StatusDetailState) {
        if let ValidatorCommand::Control(Control::ResumeCaptionLoading) = cmd {
            if !self.next_state.contains(PopOnState::RCL) {
                // The previous sequence never reached EndOfCaption.
                self.oos_error = true;
                self.missing_error = true;
                self.emit(detail);
            }
            self.reset();
            self.cur_state = PopOnState::RCL;
            self.next_state = PopOnState::ENM | PopOnState::PAC;
            self.rcl_count += 1;
            return;
        }

        if self.cur_state.contains(PopOnState::RCL) || self.pac_count > 0 || self.enm_count > 0 {
            if let ValidatorCommand::Preamble = cmd {
                if !self.next_state.contains(PopOnState::PAC) {
                    self.oos_error = true;
                }
                self.cur_state = PopOnState::PAC;
                self.next_state = PopOnState::PAC | PopOnState::TOFF | PopOnState::EDM;
                self.pac_count += 1;
                return;
            }
        }

        match cmd {
            ValidatorCommand::Control(Control::EraseNonDisplayedMemory) => {
                // No out-of-sequence check on ENM arrival: preserved from the reference decoder,
                // which never guards this transition either.
                self.cur_state = PopOnState::ENM;
                self.next_state = PopOnState::PAC;
                self.enm_count += 1;
            }
            ValidatorCommand::Control(Control::TabOffset1)
            | ValidatorCommand::Control(Control::TabOffset2)
            | ValidatorCommand::Control(Control::TabOffset3) => {
                // No out-of-sequence check on TOFF arrival either: same historical quirk.
                self.cur_state = PopOnState::TOFF;
                self.next_state = PopOnState::PAC | PopOnState::TOFF | PopOnState::EDM;
                self.toff_count += 1;
            }
            ValidatorCommand::Control(Control::EraseDisplayedMemory) => {
                if !self.next_state.contains(PopOnState::EDM) {
                    self.oos_error = true;
                }
                self.cur_state = PopOnState::EDM;
                self.next_state = PopOnState::EOC;
                self.edm_count += 1;
            }
            ValidatorCommand::Control(Control::EndOfCaption) => {
                if !self.next_state.contains(PopOnState::EOC) {
                    self.oos_error = true;
                }
                self.cur_state = PopOnState::EOC;
                self.next_state = PopOnState::RCL;
                self.eoc_count += 1;
                if self.pac_count == 0 || self.edm_count == 0 {
                    self.missing_error = true;
                }
                self.emit(detail);
                self.reset();
            }
            _ => {}
        }
    }

    fn emit(&self, detail: &mut StatusDetailState) {
        if self.oos_error {
            detail.set(StatusDetail::POPON_OOS_ERROR | StatusDetail::POPON_ERROR);
        }
        if self.missing_error {
            detail.set(StatusDetail::POPON_MISSING_ERROR | StatusDetail::POPON_ERROR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_happy_path_raises_nothing() {
        let mut v = RollUpValidator::new();
        let mut detail = StatusDetailState::default();
        v.update(ValidatorCommand::Control(Control::RollUp2), &mut detail);
        v.update(ValidatorCommand::Preamble, &mut detail);
        v.update(ValidatorCommand::Control(Control::CarriageReturn), &mut detail);
        v.update(ValidatorCommand::Preamble, &mut detail);
        assert!(!detail.is_set(StatusDetail::ROLLUP_ERROR));
    }

    #[test]
    fn rollup_missing_cr_is_flagged() {
        let mut v = RollUpValidator::new();
        let mut detail = StatusDetailState::default();
        v.update(ValidatorCommand::Control(Control::RollUp2), &mut detail);
        v.update(ValidatorCommand::Preamble, &mut detail);
        assert!(detail.is_set(StatusDetail::ROLLUP_MISSING_ERROR));
    }

    #[test]
    fn popon_happy_path_raises_nothing() {
        let mut v = PopOnValidator::new();
        let mut detail = StatusDetailState::default();
        v.update(
            ValidatorCommand::Control(Control::ResumeCaptionLoading),
            &mut detail,
        );
        v.update(ValidatorCommand::Preamble, &mut detail);
        v.update(
            ValidatorCommand::Control(Control::EraseDisplayedMemory),
            &mut detail,
        );
        v.update(ValidatorCommand::Control(Control::EndOfCaption), &mut detail);
        assert!(!detail.is_set(StatusDetail::POPON_ERROR));
    }

    #[test]
    fn popon_missing_edm_is_flagged() {
        let mut v = PopOnValidator::new();
        let mut detail = StatusDetailState::default();
        v.update(
            ValidatorCommand::Control(Control::ResumeCaptionLoading),
            &mut detail,
        );
        v.update(ValidatorCommand::Preamble, &mut detail);
        v.update(ValidatorCommand::Control(Control::EndOfCaption), &mut detail);
        assert!(detail.is_set(StatusDetail::POPON_MISSING_ERROR));
    }
}
