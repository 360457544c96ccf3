//! Low-level indented text writer used by the serializer.

use crate::error::{Error, Result};
use crate::utils::string::escape_into;

pub struct Writer {
    out: String,
    indent_unit: String,
}

impl Writer {
    pub fn new(indent_spaces: usize) -> Self {
        Self {
            out: String::new(),
            indent_unit: " ".repeat(indent_spaces),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn push_str(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub fn push_char(&mut self, ch: char) {
        self.out.push(ch);
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.indent_unit);
        }
    }

    pub fn write_int(&mut self, value: i64) {
        let mut buffer = itoa::Buffer::new();
        self.out.push_str(buffer.format(value));
    }

    /// Canonical float text: shortest round-trip form, always with a
    /// decimal point, never scientific notation (the grammar has none).
    pub fn write_float(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::serialize(format!(
                "cannot serialize non-finite float {value}"
            )));
        }
        let mut buffer = ryu::Buffer::new();
        let text = buffer.format_finite(value);
        if text.contains('e') || text.contains('E') {
            // Fall back to the positional rendering.
            let positional = format!("{value}");
            self.out.push_str(&positional);
            if !positional.contains('.') {
                self.out.push_str(".0");
            }
        } else {
            self.out.push_str(text);
        }
        Ok(())
    }

    pub fn write_quoted(&mut self, s: &str) {
        self.out.push('"');
        escape_into(&mut self.out, s);
        self.out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_text(value: f64) -> String {
        let mut writer = Writer::new(4);
        writer.write_float(value).unwrap();
        writer.finish()
    }

    #[rstest::rstest]
    fn test_floats_always_carry_a_point() {
        assert_eq!(float_text(1.0), "1.0");
        assert_eq!(float_text(-2.5), "-2.5");
        assert_eq!(float_text(0.125), "0.125");
        assert!(float_text(1e30).contains('.'));
        assert!(!float_text(1e30).contains('e'));
    }

    #[rstest::rstest]
    fn test_non_finite_rejected() {
        let mut writer = Writer::new(4);
        assert!(writer.write_float(f64::NAN).is_err());
        assert!(writer.write_float(f64::INFINITY).is_err());
    }

    #[rstest::rstest]
    fn test_quoting_and_indent() {
        let mut writer = Writer::new(2);
        writer.indent(2);
        writer.write_quoted("a\"b\n");
        assert_eq!(writer.finish(), "    \"a\\\"b\\n\"");
    }

    #[rstest::rstest]
    fn test_int() {
        let mut writer = Writer::new(4);
        writer.write_int(i64::MIN);
        assert_eq!(writer.finish(), i64::MIN.to_string());
    }
}
