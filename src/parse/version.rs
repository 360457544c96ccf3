//! `ftml_version` gate.
//!
//! Runs over the raw token stream before the structural parser so an
//! incompatible document is rejected without building anything. The
//! declared version must match `MAJOR.MINOR` with an optional pre-release
//! suffix (`a`/`b`/`rc` plus a number); pre-release stages order
//! `a < b < rc < release`.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{FTML_VERSION, RESERVED_KEY_VERSION};
use crate::error::{Error, Result};
use crate::lex::{Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Alpha(u32),
    Beta(u32),
    Rc(u32),
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub stage: Stage,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)(?:(a|b|rc)(\d+))?$").expect("version pattern is valid")
    })
}

impl Version {
    pub fn parse(text: &str) -> Result<Version> {
        let captures = version_regex()
            .captures(text.trim())
            .ok_or_else(|| Error::version(format!("invalid version string '{text}'")))?;

        let number = |i: usize| -> Result<u32> {
            captures[i]
                .parse()
                .map_err(|_| Error::version(format!("invalid version string '{text}'")))
        };

        let major = number(1)?;
        let minor = number(2)?;
        let stage = match captures.get(3).map(|m| m.as_str()) {
            None => Stage::Release,
            Some(tag) => {
                let n = number(4)?;
                match tag {
                    "a" => Stage::Alpha(n),
                    "b" => Stage::Beta(n),
                    _ => Stage::Rc(n),
                }
            }
        };

        Ok(Version {
            major,
            minor,
            stage,
        })
    }

    /// Whether a document declaring `self` can be read by `parser`.
    pub fn is_compatible_with(&self, parser: &Version) -> bool {
        if self.major != parser.major {
            return self.major < parser.major;
        }
        if self.minor != parser.minor {
            return self.minor < parser.minor;
        }
        self.stage <= parser.stage
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        match self.stage {
            Stage::Alpha(n) => write!(f, "a{n}"),
            Stage::Beta(n) => write!(f, "b{n}"),
            Stage::Rc(n) => write!(f, "rc{n}"),
            Stage::Release => Ok(()),
        }
    }
}

/// The version this parser implements.
pub fn parser_version() -> Version {
    Version::parse(FTML_VERSION).expect("built-in version string is valid")
}

/// Scan the token stream for a root-level `ftml_version` entry and check
/// it against `parser`. Absence means compatible.
pub fn check_tokens(tokens: &[Spanned], parser: &Version) -> Result<()> {
    let Some(declared) = declared_version(tokens)? else {
        return Ok(());
    };
    let version = Version::parse(&declared)?;
    if !version.is_compatible_with(parser) {
        return Err(Error::version(format!(
            "document requires FTML {version} but this parser implements {parser}"
        )));
    }
    Ok(())
}

fn declared_version(tokens: &[Spanned]) -> Result<Option<String>> {
    let mut depth = 0usize;
    let mut iter = tokens.iter().enumerate();

    while let Some((i, spanned)) = iter.next() {
        match &spanned.token {
            Token::LBrace | Token::LBracket => depth += 1,
            Token::RBrace | Token::RBracket => depth = depth.saturating_sub(1),
            Token::Ident(name) | Token::Str(name) | Token::SingleStr(name)
                if depth == 0 && name == RESERVED_KEY_VERSION =>
            {
                // Only a key position counts: previous significant token
                // must open a line.
                if !at_line_start(tokens, i) {
                    continue;
                }
                let mut rest = tokens[i + 1..].iter();
                let Some(eq) = next_significant(&mut rest) else {
                    return Ok(None);
                };
                if !matches!(eq.token, Token::Equal) {
                    continue;
                }
                return match next_significant(&mut rest) {
                    Some(value) => match &value.token {
                        Token::Str(s) | Token::SingleStr(s) => Ok(Some(s.clone())),
                        other => Err(Error::version(format!(
                            "{RESERVED_KEY_VERSION} must be a string, got {}",
                            other.describe()
                        ))),
                    },
                    None => Ok(None),
                };
            }
            _ => {}
        }
    }
    Ok(None)
}

fn at_line_start(tokens: &[Spanned], index: usize) -> bool {
    tokens[..index]
        .iter()
        .rev()
        .find(|s| !s.token.is_trivia())
        .map(|s| matches!(s.token, Token::Newline))
        .unwrap_or(true)
}

fn next_significant<'a>(iter: &mut impl Iterator<Item = &'a Spanned>) -> Option<&'a Spanned> {
    iter.find(|s| !s.token.is_trivia() && !matches!(s.token, Token::Newline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Tokenizer;

    fn check(input: &str) -> Result<()> {
        let tokens = Tokenizer::new(input).tokenize().unwrap();
        check_tokens(&tokens, &parser_version())
    }

    #[rstest::rstest]
    #[case("1.0", 1, 0, Stage::Release)]
    #[case("2.13", 2, 13, Stage::Release)]
    #[case("1.0a1", 1, 0, Stage::Alpha(1))]
    #[case("1.0b2", 1, 0, Stage::Beta(2))]
    #[case("1.0rc3", 1, 0, Stage::Rc(3))]
    fn test_parse(
        #[case] text: &str,
        #[case] major: u32,
        #[case] minor: u32,
        #[case] stage: Stage,
    ) {
        let version = Version::parse(text).unwrap();
        assert_eq!(
            version,
            Version {
                major,
                minor,
                stage
            }
        );
    }

    #[rstest::rstest]
    #[case("1")]
    #[case("1.0.0")]
    #[case("v1.0")]
    #[case("1.0c1")]
    #[case("1.0rc")]
    fn test_parse_rejects(#[case] text: &str) {
        assert!(Version::parse(text).is_err());
    }

    #[rstest::rstest]
    fn test_stage_ordering() {
        assert!(Stage::Alpha(9) < Stage::Beta(1));
        assert!(Stage::Beta(9) < Stage::Rc(1));
        assert!(Stage::Rc(9) < Stage::Release);
        assert!(Stage::Alpha(1) < Stage::Alpha(2));
    }

    #[rstest::rstest]
    fn test_compatibility() {
        let parser = Version::parse("1.2").unwrap();
        let ok = |s: &str| Version::parse(s).unwrap().is_compatible_with(&parser);
        assert!(ok("1.2"));
        assert!(ok("1.1"));
        assert!(ok("0.9"));
        assert!(ok("1.2rc1"));
        assert!(!ok("1.3"));
        assert!(!ok("2.0"));

        let parser_rc = Version::parse("1.2rc1").unwrap();
        let ok = |s: &str| Version::parse(s).unwrap().is_compatible_with(&parser_rc);
        assert!(ok("1.2a1"));
        assert!(ok("1.2b9"));
        assert!(ok("1.2rc1"));
        assert!(!ok("1.2"));
    }

    #[rstest::rstest]
    fn test_absent_version_is_compatible() {
        assert!(check("a = 1\n").is_ok());
    }

    #[rstest::rstest]
    fn test_matching_version_passes() {
        assert!(check("ftml_version = \"1.0\"\na = 1\n").is_ok());
    }

    #[rstest::rstest]
    fn test_newer_version_rejected() {
        let err = check("ftml_version = \"2.0\"\n").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Version);
        assert!(err.message.contains("2.0"));
    }

    #[rstest::rstest]
    fn test_non_string_version_rejected() {
        let err = check("ftml_version = 2\n").unwrap_err();
        assert!(err.message.contains("must be a string"));
    }

    #[rstest::rstest]
    fn test_nested_key_ignored() {
        assert!(check("o = { \"ftml_version\" = \"9.9\" }\na = 1\n").is_ok());
    }

    #[rstest::rstest]
    fn test_invalid_version_string() {
        let err = check("ftml_version = \"banana\"\n").unwrap_err();
        assert!(err.message.contains("invalid version string"));
    }
}
