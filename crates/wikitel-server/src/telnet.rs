//! Server-side telnet over any byte stream: option negotiation and an
//! echoing line reader.
//!
//! Full line editing (history, cursor movement) is a client concern; this
//! layer handles exactly what an interactive telnet session needs from the
//! server: the raw-mode negotiation pair, IAC stripping, NAWS capture,
//! echo, backspace, and tab events for the completion engine.

use std::collections::VecDeque;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

pub const OPT_TRANSMIT_BINARY: u8 = 0;
pub const OPT_ECHO: u8 = 1;
pub const OPT_SUPPRESS_GO_AHEAD: u8 = 3;
pub const OPT_NAWS: u8 = 31;

const BACKSPACE_ECHO: &[u8] = b"\x08 \x08";

/// One unit of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// A completed line (terminator stripped, UTF-8 lossy).
    Line(String),
    /// Tab pressed; carries the current partial line, buffer preserved.
    Tab(String),
    /// Clean disconnect, or ctrl-D on an empty line.
    Eof,
}

enum ParseState {
    Data,
    Iac,
    OptionByte,
    Sub,
    SubIac,
}

/// Telnet framing over a bidirectional byte stream.
pub struct TelnetStream<S> {
    stream: S,
    pending: VecDeque<u8>,
    parse: ParseState,
    sub_buffer: Vec<u8>,
    line: Vec<u8>,
    last_was_cr: bool,
    window: Option<(u16, u16)>,
}

impl<S> TelnetStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: VecDeque::new(),
            parse: ParseState::Data,
            sub_buffer: Vec::new(),
            line: Vec::new(),
            last_was_cr: false,
            window: None,
        }
    }

    /// Send the option sequence every session starts with: binary
    /// transmission and window-size reports, then raw mode — the echo and
    /// suppress-go-ahead controls are issued together as a pair.
    pub async fn negotiate(&mut self) -> io::Result<()> {
        let sequence = [
            IAC, DO, OPT_TRANSMIT_BINARY,
            IAC, DO, OPT_NAWS,
            IAC, DO, OPT_SUPPRESS_GO_AHEAD,
            IAC, WILL, OPT_SUPPRESS_GO_AHEAD,
            IAC, WILL, OPT_ECHO,
        ];
        self.stream.write_all(&sequence).await?;
        self.stream.flush().await
    }

    /// Latest window size reported via NAWS, if any.
    pub fn window_size(&self) -> Option<(u16, u16)> {
        self.window
    }

    /// Raw write access for response streaming; bypasses line handling.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub async fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.flush().await
    }

    /// Read until the next input event, echoing as we go (we negotiated
    /// WILL ECHO, so the display is our job).
    pub async fn next_event(&mut self) -> io::Result<TelnetEvent> {
        loop {
            let mut echo = Vec::new();
            let mut event = None;
            while let Some(byte) = self.pending.pop_front() {
                if let Some(found) = self.process_byte(byte, &mut echo) {
                    event = Some(found);
                    break;
                }
            }
            if !echo.is_empty() {
                self.stream.write_all(&echo).await?;
                self.stream.flush().await?;
            }
            if let Some(event) = event {
                return Ok(event);
            }

            let mut buf = [0u8; 1024];
            let count = self.stream.read(&mut buf).await?;
            if count == 0 {
                return Ok(TelnetEvent::Eof);
            }
            self.pending.extend(&buf[..count]);
        }
    }

    /// Replace the edit buffer (unique tab completion), erasing the old
    /// text on screen and typing the replacement.
    pub async fn replace_line(&mut self, replacement: &str) -> io::Result<()> {
        let displayed = String::from_utf8_lossy(&self.line).chars().count();
        let mut output = Vec::with_capacity(displayed * 3 + replacement.len());
        for _ in 0..displayed {
            output.extend_from_slice(BACKSPACE_ECHO);
        }
        output.extend_from_slice(replacement.as_bytes());
        self.stream.write_all(&output).await?;
        self.stream.flush().await?;
        self.line = replacement.as_bytes().to_vec();
        Ok(())
    }

    /// Re-show the prompt and the in-progress line (after a candidate
    /// listing scrolled them away).
    pub async fn redraw(&mut self, prompt: &str) -> io::Result<()> {
        self.stream.write_all(prompt.as_bytes()).await?;
        if !self.line.is_empty() {
            let line = self.line.clone();
            self.stream.write_all(&line).await?;
        }
        self.stream.flush().await
    }

    fn process_byte(&mut self, byte: u8, echo: &mut Vec<u8>) -> Option<TelnetEvent> {
        match self.parse {
            ParseState::Data => self.process_data_byte(byte, echo),
            ParseState::Iac => {
                match byte {
                    IAC => {
                        // Escaped literal 0xFF data byte.
                        self.parse = ParseState::Data;
                        self.line.push(IAC);
                    }
                    WILL | WONT | DO | DONT => self.parse = ParseState::OptionByte,
                    SB => {
                        self.sub_buffer.clear();
                        self.parse = ParseState::Sub;
                    }
                    _ => self.parse = ParseState::Data,
                }
                None
            }
            ParseState::OptionByte => {
                // Option acknowledgements are accepted silently.
                self.parse = ParseState::Data;
                None
            }
            ParseState::Sub => {
                if byte == IAC {
                    self.parse = ParseState::SubIac;
                } else {
                    self.sub_buffer.push(byte);
                }
                None
            }
            ParseState::SubIac => {
                match byte {
                    SE => {
                        self.finish_subnegotiation();
                        self.parse = ParseState::Data;
                    }
                    IAC => {
                        self.sub_buffer.push(IAC);
                        self.parse = ParseState::Sub;
                    }
                    _ => self.parse = ParseState::Sub,
                }
                None
            }
        }
    }

    fn process_data_byte(&mut self, byte: u8, echo: &mut Vec<u8>) -> Option<TelnetEvent> {
        if byte == IAC {
            self.parse = ParseState::Iac;
            return None;
        }

        let was_cr = self.last_was_cr;
        self.last_was_cr = false;
        match byte {
            b'\r' => {
                self.last_was_cr = true;
                echo.extend_from_slice(b"\r\n");
                Some(TelnetEvent::Line(self.take_line()))
            }
            b'\n' => {
                if was_cr {
                    // CR LF terminator; the CR already closed the line.
                    return None;
                }
                echo.extend_from_slice(b"\r\n");
                Some(TelnetEvent::Line(self.take_line()))
            }
            0x00 => {
                // CR NUL terminator tail, or a stray NUL; either way drop it.
                None
            }
            b'\t' => Some(TelnetEvent::Tab(
                String::from_utf8_lossy(&self.line).into_owned(),
            )),
            0x04 => {
                if self.line.is_empty() {
                    Some(TelnetEvent::Eof)
                } else {
                    None
                }
            }
            0x08 | 0x7f => {
                if self.pop_line_char() {
                    echo.extend_from_slice(BACKSPACE_ECHO);
                }
                None
            }
            byte if byte >= 0x20 => {
                self.line.push(byte);
                echo.push(byte);
                None
            }
            _ => None,
        }
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.line);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Remove the last character (not byte) from the edit buffer.
    fn pop_line_char(&mut self) -> bool {
        if self.line.is_empty() {
            return false;
        }
        while let Some(&last) = self.line.last() {
            self.line.pop();
            if last & 0b1100_0000 != 0b1000_0000 {
                break;
            }
        }
        true
    }

    fn finish_subnegotiation(&mut self) {
        if self.sub_buffer.first() == Some(&OPT_NAWS) && self.sub_buffer.len() >= 5 {
            let width = u16::from_be_bytes([self.sub_buffer[1], self.sub_buffer[2]]);
            let height = u16::from_be_bytes([self.sub_buffer[3], self.sub_buffer[4]]);
            // Recorded for the line-editing collaborator; nothing here
            // reacts to a resize.
            self.window = Some((width, height));
        }
        self.sub_buffer.clear();
    }
}
