//! Purpose: Decode response bodies into the labelled tree.
//! Exports: `parse_tree`, `ParseFailureCategory`, `categorize_error`.
//! Role: Parser boundary over `serde_json`; maps failures into `ErrorKind::Parse`.
//! Invariants: Object member order is preserved, repeated members included.
//! Invariants: Parse hints carry category and position, never payload bytes.

use crate::core::error::{Error, ErrorKind};
use crate::core::tree::Node;
use serde_json::error::Category;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseFailureCategory {
    Syntax,
    Eof,
    Data,
    Io,
}

impl ParseFailureCategory {
    pub fn label(self) -> &'static str {
        match self {
            ParseFailureCategory::Syntax => "syntax",
            ParseFailureCategory::Eof => "eof",
            ParseFailureCategory::Data => "data",
            ParseFailureCategory::Io => "io",
        }
    }
}

pub(crate) fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    match err.classify() {
        Category::Syntax => ParseFailureCategory::Syntax,
        Category::Eof => ParseFailureCategory::Eof,
        Category::Data => ParseFailureCategory::Data,
        Category::Io => ParseFailureCategory::Io,
    }
}

pub(crate) fn parse_tree(input: &[u8]) -> Result<Node, Error> {
    let tree: Node = serde_json::from_slice(input).map_err(|err| {
        let category = categorize_error(&err);
        Error::new(ErrorKind::Parse)
            .with_message("response body is not valid json")
            .with_hint(format!(
                "parse category: {} (line {}, column {}, {} bytes)",
                category.label(),
                err.line(),
                err.column(),
                input.len()
            ))
            .with_source(err)
    })?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::{ParseFailureCategory, categorize_error, parse_tree};
    use crate::core::error::ErrorKind;

    #[test]
    fn category_mapping_handles_syntax_and_eof() {
        let syntax = serde_json::from_str::<serde_json::Value>(r#"{"a":}"#).unwrap_err();
        assert_eq!(categorize_error(&syntax), ParseFailureCategory::Syntax);

        let eof = serde_json::from_str::<serde_json::Value>(r#"{"a":[1,2"#).unwrap_err();
        assert_eq!(categorize_error(&eof), ParseFailureCategory::Eof);
    }

    #[test]
    fn parse_tree_reports_category_hint() {
        let err = parse_tree(b"<html>not json</html>").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
        let hint = err.hint().unwrap_or_default();
        assert!(hint.contains("parse category: syntax"));
        assert!(hint.contains("line 1"));
        assert!(!hint.contains("html"));
    }

    #[test]
    fn parse_tree_keeps_member_order() {
        let tree = parse_tree(br#"{"b":1,"a":2}"#).expect("tree");
        let labels: Vec<_> = tree.children().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["b", "a"]);
    }

    #[test]
    fn parse_tree_keeps_repeated_members_and_reads_the_first() {
        let tree = parse_tree(br#"{"features":[1],"features":"none"}"#).expect("tree");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get_child("features").expect("features").len(), 1);
    }
}
