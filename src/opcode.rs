// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The EIA-608 "opcode oracle": pure byte-classification and character-table functions.
//!
//! Every function here takes a raw 16-bit caption-data word (first transmitted byte in the high
//! eight bits, second transmitted byte in the low eight bits, both still carrying their parity
//! bit) and answers one narrow question about it. Nothing in this module knows about frames,
//! buffers, or sequence validators.
//!
//! The reference for the byte layout and character tables is the ANSI/CTA-608-E specification.

/// A CEA-608 caption channel, as selected by the control-code byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Channel 1 (the default channel for a field).
    One,
    /// Channel 2.
    Two,
}

/// The on-screen text style selected by a preamble or mid-row code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Style {
    /// Plain white text.
    White,
    /// Green text.
    Green,
    /// Blue text.
    Blue,
    /// Cyan text.
    Cyan,
    /// Red text.
    Red,
    /// Yellow text.
    Yellow,
    /// Magenta text.
    Magenta,
    /// White text, italicised.
    Italics,
}

/// A decoded preamble address code: row, column, style, underline and channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PreambleAddressCode {
    /// The target row, `0..15`.
    pub row: u8,
    /// The target column, `0..32`, in increments of 4.
    pub col: u8,
    /// The style to apply from this column onward.
    pub style: Style,
    /// Whether the text should be underlined.
    pub underline: bool,
    /// The channel this preamble was received on.
    pub channel: Channel,
}

/// A decoded mid-row style change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MidRow {
    /// The style to apply from this point onward.
    pub style: Style,
    /// Whether the text should be underlined.
    pub underline: bool,
    /// The channel this mid-row change was received on.
    pub channel: Channel,
}

/// The non-text, non-preamble, non-mid-row control vocabulary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Control {
    /// Begin composing a caption off-screen (pop-on mode).
    ResumeCaptionLoading,
    /// Move the cursor back one column and blank that cell.
    Backspace,
    /// Silence the alarm. Legal no-op.
    AlarmOff,
    /// Sound the alarm. Legal no-op.
    AlarmOn,
    /// Clear from the cursor to the end of the current row.
    DeleteToEndOfRow,
    /// Enter 2-row roll-up mode.
    RollUp2,
    /// Enter 3-row roll-up mode.
    RollUp3,
    /// Enter 4-row roll-up mode.
    RollUp4,
    /// Start writing directly to the displayed buffer (paint-on mode).
    ResumeDirectCaptioning,
    /// Legal no-op retained for historical decoders.
    TextRestart,
    /// Legal no-op retained for historical decoders.
    ResumeTextDisplay,
    /// Advance the cursor by one column, ignoring the one already crossed.
    TabOffset1,
    /// Advance the cursor by two columns.
    TabOffset2,
    /// Advance the cursor by three columns.
    TabOffset3,
    /// Roll up or shift down a displayed line.
    CarriageReturn,
    /// Clear the displayed buffer.
    EraseDisplayedMemory,
    /// Clear the non-displayed (back) buffer.
    EraseNonDisplayedMemory,
    /// Swap the non-displayed buffer into the displayed buffer (pop-on mode).
    EndOfCaption,
    /// A control byte pair matching no known command.
    Unknown,
}

/// The low seven bits (parity stripped) of the first transmitted byte.
pub fn high7(word: u16) -> u8 {
    ((word >> 8) & 0x7f) as u8
}

/// The low seven bits (parity stripped) of the second transmitted byte.
pub fn low7(word: u16) -> u8 {
    (word & 0x7f) as u8
}

/// Verify the per-byte odd-parity check required of every CEA-608 word.
pub fn parity_verify(word: u16) -> bool {
    fn odd_parity(byte: u8) -> bool {
        byte.count_ones() % 2 == 1
    }
    odd_parity((word >> 8) as u8) && odd_parity(word as u8)
}

/// Whether this word is padding (both bytes null after stripping parity).
pub fn is_padding(word: u16) -> bool {
    word & 0x7f7f == 0
}

/// Whether this word is one of the generic (non-preamble, non-mid-row) control commands.
pub fn is_control(word: u16) -> bool {
    matches!(high7(word), 0x14 | 0x15 | 0x17 | 0x1c | 0x1d | 0x1f)
        && (0x20..=0x2f).contains(&low7(word))
}

/// Whether this word is a preamble address code.
pub fn is_preamble(word: u16) -> bool {
    (0x10..=0x1f).contains(&high7(word)) && (0x40..=0x7f).contains(&low7(word))
}

/// Whether this word is a mid-row style change.
pub fn is_midrowchange(word: u16) -> bool {
    matches!(high7(word), 0x11 | 0x19) && (0x20..=0x2f).contains(&low7(word))
}

/// Whether this word opens or continues an XDS packet.
pub fn is_xds(word: u16) -> bool {
    (0x01..=0x0f).contains(&high7(word))
}

/// Whether this word carries a basic North-American character in its first byte.
///
/// Ported from the bit test used by production CEA-608 encoders/decoders: the first byte's
/// low-order command bits are non-zero whenever it falls in the printable basic-NA range.
pub fn is_basicna(word: u16) -> bool {
    0x0000 != (0x6000 & word)
}

/// Whether this word carries a western-European extended character.
pub fn is_westeu(word: u16) -> bool {
    0x1220 == (0x7660 & word)
}

/// Whether this word carries a special North-American character.
pub fn is_specialna(word: u16) -> bool {
    0x1130 == (0x7770 & word)
}

const BASICNA: [char; 128] = {
    let mut table = [' '; 128];
    let mut i = 0;
    while i < 128 {
        table[i] = i as u8 as char;
        i += 1;
    }
    table
};

/// Special North-American characters, indexed by `low7(word) - 0x30`.
const SPECIALNA: [char; 16] = [
    '®', '°', '½', '¿', '™', '¢', '£', '♪', 'à', ' ', 'è', 'â', 'ê', 'î', 'ô', 'û',
];

/// Western-European characters, indexed by `low7(word) - 0x20`.
const WESTEU: [char; 16] = [
    'á', 'é', 'ó', 'ú', 'ü', 'ñ', 'Ñ', '¡', 'Á', 'É', 'Ó', 'Ú', '¿', 'Ü', 'ü', 'É',
];

/// Translate a text word into up to two displayable characters plus the channel it targeted.
///
/// Returns the number of characters produced (`0`, `1` or `2`), the characters themselves and the
/// channel implied by the first byte's parity bit. A return of `0` characters for a word the
/// caller already knows is basic-NA or western-European is a translation failure the caller
/// should flag.
pub fn to_utf8(word: u16) -> (usize, [char; 2], Channel) {
    let channel = if word & 0x0800 != 0 {
        Channel::Two
    } else {
        Channel::One
    };

    if is_westeu(word) {
        let idx = (low7(word).wrapping_sub(0x20)) as usize;
        if idx < WESTEU.len() {
            return (1, [WESTEU[idx], '\0'], channel);
        }
        return (0, ['\0', '\0'], channel);
    }

    if is_specialna(word) {
        let idx = (low7(word).wrapping_sub(0x30)) as usize;
        if idx < SPECIALNA.len() {
            return (1, [SPECIALNA[idx], '\0'], channel);
        }
        return (0, ['\0', '\0'], channel);
    }

    let b1 = high7(word);
    let b2 = low7(word);
    let mut chars = ['\0'; 2];
    let mut n = 0;
    if (0x20..0x80).contains(&b1) {
        chars[n] = BASICNA[b1 as usize];
        n += 1;
    }
    if (0x20..0x80).contains(&b2) {
        chars[n] = BASICNA[b2 as usize];
        n += 1;
    }
    (n, chars, channel)
}

/// Parse a preamble address code word.
///
/// Returns `None` if the word is not in the preamble byte range at all; a legality violation
/// within the preamble range (the low byte outside `0x40..=0x7F`) is the caller's responsibility
/// to flag, since the preamble is still installed best-effort in that case.
pub fn parse_preamble(word: u16) -> Option<PreambleAddressCode> {
    if !(0x10..=0x1f).contains(&high7(word)) {
        return None;
    }
    let b1 = high7(word);
    let b2 = low7(word);
    let channel = if b1 & 0x08 != 0 {
        Channel::Two
    } else {
        Channel::One
    };
    let row_group = b1 & 0x07;
    let row_high_bit = (b1 >> 3) & 0x01;
    // Row encoding: 15 possible rows across two first-byte groups (0x10-0x17 / 0x18-0x1f),
    // selected further by bit 5 of the second byte.
    let row = match (row_high_bit, b2 & 0x20 != 0) {
        (0, false) => row_group * 2,
        (0, true) => row_group * 2 + 1,
        (1, false) => 7 + row_group * 2,
        (1, true) => 7 + row_group * 2 + 1,
    };
    let row = row.min(14);

    let underline = b2 & 0x01 != 0;
    let (style, col) = if b2 & 0x10 != 0 {
        // indent code: column set directly, style always white
        let indent = ((b2 >> 1) & 0x0f) as u8;
        (Style::White, indent * 4)
    } else {
        let style_bits = (b2 >> 1) & 0x07;
        let style = match style_bits {
            0 => Style::White,
            1 => Style::Green,
            2 => Style::Blue,
            3 => Style::Cyan,
            4 => Style::Red,
            5 => Style::Yellow,
            6 => Style::Magenta,
            _ => Style::Italics,
        };
        (style, 0)
    };

    Some(PreambleAddressCode {
        row,
        col,
        style,
        underline,
        channel,
    })
}

/// Parse a mid-row style change word.
pub fn parse_midrowchange(word: u16) -> Option<MidRow> {
    if !is_midrowchange(word) {
        return None;
    }
    let b1 = high7(word);
    let b2 = low7(word);
    let channel = if b1 == 0x19 {
        Channel::Two
    } else {
        Channel::One
    };
    let underline = b2 & 0x01 != 0;
    let style_bits = (b2 >> 1) & 0x07;
    let style = match style_bits {
        0 => Style::White,
        1 => Style::Green,
        2 => Style::Blue,
        3 => Style::Cyan,
        4 => Style::Red,
        5 => Style::Yellow,
        6 => Style::Magenta,
        _ => Style::Italics,
    };
    Some(MidRow {
        style,
        underline,
        channel,
    })
}

/// Parse a generic control command word.
///
/// Returns [`Control::Unknown`] rather than `None` for an unrecognised byte pair within the
/// control range, so callers can still flag `UNKNOWN_COMMAND` with the channel intact.
pub fn parse_control(word: u16) -> (Control, Channel) {
    let b1 = high7(word);
    let b2 = low7(word);
    let channel = if matches!(b1, 0x15 | 0x1d | 0x1f) {
        Channel::Two
    } else {
        Channel::One
    };

    let is_tab_group = matches!(b1, 0x17 | 0x1f);
    let control = if is_tab_group {
        match b2 {
            0x21 => Control::TabOffset1,
            0x22 => Control::TabOffset2,
            0x23 => Control::TabOffset3,
            _ => Control::Unknown,
        }
    } else {
        match b2 {
            0x20 => Control::ResumeCaptionLoading,
            0x21 => Control::Backspace,
            0x22 => Control::AlarmOff,
            0x23 => Control::AlarmOn,
            0x24 => Control::DeleteToEndOfRow,
            0x25 => Control::RollUp2,
            0x26 => Control::RollUp3,
            0x27 => Control::RollUp4,
            0x29 => Control::ResumeDirectCaptioning,
            0x2a => Control::TextRestart,
            0x2b => Control::ResumeTextDisplay,
            0x2c => Control::EraseDisplayedMemory,
            0x2d => Control::CarriageReturn,
            0x2e => Control::EraseNonDisplayedMemory,
            0x2f => Control::EndOfCaption,
            _ => Control::Unknown,
        }
    };
    (control, channel)
}
