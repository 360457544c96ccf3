use std::fmt;

/// Encodings the surrounding reader is expected to understand.
///
/// The core never decodes bytes itself; `ftml_encoding` only advises the
/// I/O layer, which re-decodes and calls back in with clean text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
    Ascii,
    Utf16,
}

impl Encoding {
    /// Normalize and resolve an encoding label.
    ///
    /// Labels are lowercased and `_` becomes `-` before matching, so
    /// `UTF_8` and `utf-8` are the same thing.
    pub fn parse(label: &str) -> Option<Encoding> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" => Some(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(Encoding::Latin1),
            "ascii" => Some(Encoding::Ascii),
            "utf-16" | "utf-16-le" | "utf-16-be" => Some(Encoding::Utf16),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
            Encoding::Ascii => "ascii",
            Encoding::Utf16 => "utf-16",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
