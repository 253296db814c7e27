//! ANSI escape removal and report trimming.

use vte::{Params, Parser, Perform};

/// Strip ANSI escape sequences from raw output bytes.
///
/// Printable text, newlines, carriage returns and tabs are kept; CSI, OSC,
/// DCS and bare escape sequences are dropped. Invalid UTF-8 is replaced.
pub fn strip_ansi(input: &[u8]) -> String {
    let mut text = PlainText::default();
    let mut parser = Parser::new();
    parser.advance(&mut text, input);
    text.into_string()
}

/// [`strip_ansi`] for text that is already a string.
pub fn strip_ansi_str(input: &str) -> String {
    strip_ansi(input.as_bytes())
}

/// The last `max_chars` characters of `text`, marked with a leading `...`
/// when anything was cut.
pub fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let skip = count - max_chars;
    let kept: String = text.chars().skip(skip).collect();
    format!("...{}", kept)
}

#[derive(Default)]
struct PlainText {
    output: Vec<u8>,
}

impl PlainText {
    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Perform for PlainText {
    fn print(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.output
            .extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.output.push(byte);
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
