// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line framing for the receiver's Telnet stream.
//!
//! NAD receivers terminate lines with CR, some firmware versions with CRLF,
//! and may open the connection with Telnet option negotiation. The
//! [`TelnetLineCodec`] turns that byte stream into non-empty text lines.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Longest line accepted before it is discarded.
pub const MAX_LINE_LENGTH: usize = 1024;

const IAC: u8 = 0xFF;
const SE: u8 = 0xF0;
const SB: u8 = 0xFA;
const WILL: u8 = 0xFB;
const DONT: u8 = 0xFE;

/// Splits a Telnet byte stream into lines.
///
/// - CR, LF and CRLF all end a line; empty fragments are skipped
/// - `IAC` option negotiation and subnegotiation are removed, `IAC IAC` is
///   kept as a literal `0xFF`
/// - a line longer than [`MAX_LINE_LENGTH`] is dropped up to its terminator
///
/// Encoding writes the given string unchanged; callers include the delimiter.
#[derive(Debug)]
pub struct TelnetLineCodec {
    line: Vec<u8>,
    max_length: usize,
    discarding: bool,
}

impl TelnetLineCodec {
    /// Creates a codec with the default maximum line length.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Creates a codec with a custom maximum line length.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            line: Vec::new(),
            max_length,
            discarding: false,
        }
    }

    fn push(&mut self, byte: u8) {
        if self.discarding {
            return;
        }
        if self.line.len() >= self.max_length {
            tracing::warn!(max_length = self.max_length, "Discarding over-long line");
            self.line.clear();
            self.discarding = true;
            return;
        }
        self.line.push(byte);
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        line
    }
}

impl Default for TelnetLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TelnetLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut consumed = 0;
        let mut result = None;

        while consumed < src.len() {
            let byte = src[consumed];
            match byte {
                IAC => {
                    // Incomplete sequences stay buffered until more bytes arrive.
                    let Some(&command) = src.get(consumed + 1) else {
                        break;
                    };
                    match command {
                        IAC => {
                            self.push(IAC);
                            consumed += 2;
                        }
                        WILL..=DONT => {
                            if src.len() < consumed + 3 {
                                break;
                            }
                            consumed += 3;
                        }
                        SB => {
                            let end = src[consumed + 2..]
                                .windows(2)
                                .position(|pair| pair == [IAC, SE]);
                            let Some(end) = end else {
                                break;
                            };
                            consumed += 2 + end + 2;
                        }
                        _ => consumed += 2,
                    }
                }
                b'\r' | b'\n' => {
                    consumed += 1;
                    if self.discarding {
                        self.discarding = false;
                        self.line.clear();
                        continue;
                    }
                    if self.line.is_empty() {
                        continue;
                    }
                    result = Some(self.take_line());
                    break;
                }
                _ => {
                    self.push(byte);
                    consumed += 1;
                }
            }
        }

        src.advance(consumed);
        Ok(result)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        src.clear();
        if self.discarding || self.line.is_empty() {
            self.discarding = false;
            self.line.clear();
            return Ok(None);
        }
        Ok(Some(self.take_line()))
    }
}

impl Encoder<String> for TelnetLineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}
