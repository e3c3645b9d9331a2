// Copyright (C) 2024 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Boundary utilities for stuffing and reading a frame buffer as plain text, and dumping it for
//! debugging. None of this participates in bitstream decoding; it exists purely so callers that
//! want to *compose* a caption (for testing, or for a text-only ingest pipeline) don't have to
//! hand-drive the cell grid themselves.

use crate::buffer::{Buffer, SCREEN_COLS, SCREEN_ROWS};

/// Word-wrap `text` into `buf`, greedily filling each row up to [`SCREEN_COLS`] columns and
/// skipping leading whitespace on each new row. Rows beyond [`SCREEN_ROWS`] are dropped silently.
pub fn buffer_from_text(buf: &mut Buffer, text: &str) {
    buf.clear();
    let mut row = 0usize;
    let mut col = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if row >= SCREEN_ROWS {
            break;
        }
        if col == 0 && c.is_whitespace() && c != '\n' {
            chars.next();
            continue;
        }
        if c == '\n' {
            chars.next();
            row += 1;
            col = 0;
            continue;
        }

        // Find the length of the next word (run of non-whitespace).
        let mut word_len = 0usize;
        for &wc in chars.clone().collect::<Vec<_>>().iter() {
            if wc.is_whitespace() {
                break;
            }
            word_len += 1;
        }

        if col > 0 && col + 1 + word_len > SCREEN_COLS {
            row += 1;
            col = 0;
            if row >= SCREEN_ROWS {
                break;
            }
            continue;
        }

        for _ in 0..word_len {
            if col >= SCREEN_COLS {
                break;
            }
            let Some(ch) = chars.next() else { break };
            if let Some(cell) = buf.cell_mut(row as i8, col as i8) {
                cell.data = Some(ch);
            }
            col += 1;
        }
    }
}

/// Read `buf` back out as text: non-empty rows joined by `\r\n`, with leading whitespace in each
/// row skipped until the first printable character.
pub fn buffer_to_text(buf: &Buffer) -> String {
    let mut out = String::new();
    let mut first = true;
    for row in buf.rows() {
        let mut line = String::new();
        let mut started = false;
        for cell in row.iter() {
            match cell.data {
                Some(c) if !started && c.is_whitespace() => continue,
                Some(c) => {
                    started = true;
                    line.push(c);
                }
                None if started => line.push(' '),
                None => continue,
            }
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if !first {
            out.push_str("\r\n");
        }
        out.push_str(line);
        first = false;
    }
    out
}

/// Render both buffers side by side as an ASCII-art box, for debugging.
pub fn dump_buffer(buf: &Buffer) -> String {
    let mut out = String::new();
    out.push('+');
    out.push_str(&"-".repeat(SCREEN_COLS));
    out.push_str("+\n");
    for row in buf.rows() {
        out.push('|');
        for cell in row.iter() {
            out.push(cell.data.unwrap_or(' '));
        }
        out.push_str("|\n");
    }
    out.push('+');
    out.push_str(&"-".repeat(SCREEN_COLS));
    out.push('+');
    out
}

/// Render the front and back buffers of a frame side by side.
pub fn dump(front: &Buffer, back: &Buffer) -> String {
    let mut out = String::new();
    out.push_str("front:\n");
    out.push_str(&dump_buffer(front));
    out.push_str("\nback:\n");
    out.push_str(&dump_buffer(back));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_round_trips() {
        let mut buf = Buffer::default();
        buffer_from_text(&mut buf, "HI");
        assert_eq!(buffer_to_text(&buf), "HI");
    }

    #[test]
    fn long_text_wraps_at_column_boundary() {
        let mut buf = Buffer::default();
        let word = "A".repeat(40);
        buffer_from_text(&mut buf, &word);
        let text = buffer_to_text(&buf);
        assert!(text.contains("\r\n"));
    }
}
