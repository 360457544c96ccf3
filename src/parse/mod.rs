//! Load pipeline: tokenize, version gate, structural parse, comment
//! attachment, encoding cross-check.

pub mod comments;
pub mod parser;
pub mod version;

use tracing::debug;

use crate::ast::Document;
use crate::constants::RESERVED_KEY_ENCODING;
use crate::error::{Error, Position, Result};
use crate::lex::Tokenizer;
use crate::options::ParseOptions;

pub(crate) fn parse_document(input: &str, options: &ParseOptions) -> Result<Document> {
    let tokens = Tokenizer::new(input).tokenize()?;
    debug!(tokens = tokens.len(), "tokenized input");

    if options.check_version {
        version::check_tokens(&tokens, &version::parser_version())?;
    }

    let mut doc = parser::Parser::new(&tokens).parse_document()?;
    debug!(entries = doc.items.len(), "parsed document");

    if options.preserve_comments {
        comments::attach_comments(&mut doc, &tokens)?;
    }

    check_encoding(&doc, options)?;
    Ok(doc)
}

fn check_encoding(doc: &Document, options: &ParseOptions) -> Result<()> {
    let declared = match doc.declared_encoding() {
        Ok(declared) => declared,
        Err(message) => {
            let pos = doc
                .get(RESERVED_KEY_ENCODING)
                .map(|kv| kv.pos)
                .unwrap_or_else(Position::start);
            return Err(Error::parse(pos, message));
        }
    };

    if let (Some(declared), Some(hint)) = (declared, options.declared_encoding) {
        if declared != hint {
            let pos = doc
                .get(RESERVED_KEY_ENCODING)
                .map(|kv| kv.pos)
                .unwrap_or_else(Position::start);
            return Err(Error::parse(
                pos,
                format!(
                    "document declares encoding '{declared}' but the reader decoded '{hint}'"
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encoding::Encoding;

    #[rstest::rstest]
    fn test_pipeline_attaches_comments_by_default() {
        let doc = parse_document("// lead\na = 1\n", &ParseOptions::default()).unwrap();
        assert_eq!(doc.get("a").unwrap().leading_comments, vec!["lead"]);
    }

    #[rstest::rstest]
    fn test_preserve_comments_off_skips_attachment() {
        let options = ParseOptions::new().with_preserve_comments(false);
        let doc = parse_document("// lead\na = 1\n", &options).unwrap();
        assert!(doc.get("a").unwrap().leading_comments.is_empty());
    }

    #[rstest::rstest]
    fn test_version_gate_runs_before_parse() {
        // The body after the version line is structurally broken, but the
        // gate fires first.
        let err = parse_document("ftml_version = \"9.0\"\nbroken = =\n", &ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Version);
    }

    #[rstest::rstest]
    fn test_version_gate_disabled() {
        let options = ParseOptions::new().with_check_version(false);
        let doc = parse_document("ftml_version = \"9.0\"\n", &options).unwrap();
        assert_eq!(doc.declared_version(), Some("9.0"));
    }

    #[rstest::rstest]
    fn test_encoding_mismatch_reported() {
        let options = ParseOptions::new().with_declared_encoding(Encoding::Utf8);
        let err =
            parse_document("ftml_encoding = \"latin-1\"\n", &options).unwrap_err();
        assert!(err.message.contains("latin-1"));
        assert!(err.message.contains("utf-8"));
    }

    #[rstest::rstest]
    fn test_encoding_match_passes() {
        let options = ParseOptions::new().with_declared_encoding(Encoding::Latin1);
        assert!(parse_document("ftml_encoding = \"ISO_8859_1\"\n", &options).is_ok());
    }

    #[rstest::rstest]
    fn test_unknown_encoding_label_reported() {
        let err = parse_document("ftml_encoding = \"ebcdic\"\n", &ParseOptions::default())
            .unwrap_err();
        assert!(err.message.contains("unknown encoding label"));
    }
}
