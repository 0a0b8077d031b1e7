//! Persistent text format of a knowledge base.
//!
//! ```text
//! tree  := node
//! node  := '{' WS value WS node node WS '}' | '{nil}'
//! value := run of non-brace, non-newline characters
//! ```
//!
//! Every real node is written with both child slots; a leaf is
//! `{ value {nil} {nil} }`. Whitespace between tokens is insignificant.
//! Encoding and decoding both use explicit stacks, so very unbalanced trees do
//! not grow the call stack.

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{DecisionTree, NIL_TOKEN};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::path::Direction;

const INDENT: &str = "    ";

enum Emit {
    Node(Index, usize),
    Nil(usize),
    Close(usize),
}

/// Serialise the tree pre-order (value, No branch, Yes branch).
#[instrument(level = "debug", skip(tree), fields(nodes = tree.len()))]
pub fn encode(tree: &DecisionTree) -> String {
    let mut out = String::new();
    let mut stack = vec![match tree.first() {
        Some(first) => Emit::Node(first, 0),
        None => Emit::Nil(0),
    }];

    while let Some(item) = stack.pop() {
        match item {
            Emit::Nil(depth) => {
                out.push_str(&INDENT.repeat(depth));
                out.push_str("{nil}\n");
            }
            Emit::Close(depth) => {
                out.push_str(&INDENT.repeat(depth));
                out.push_str("}\n");
            }
            Emit::Node(idx, depth) => {
                let Some(node) = tree.node(idx) else {
                    continue;
                };
                out.push_str(&INDENT.repeat(depth));
                if node.is_leaf() {
                    out.push_str(&format!("{{ {} {{nil}} {{nil}} }}\n", node.value()));
                    continue;
                }
                out.push_str(&format!("{{ {}\n", node.value()));
                stack.push(Emit::Close(depth));
                for child in [node.right(), node.left()] {
                    stack.push(match child {
                        Some(c) => Emit::Node(c, depth + 1),
                        None => Emit::Nil(depth + 1),
                    });
                }
            }
        }
    }
    out
}

/// Parse a knowledge base into a fresh tree whose values may be up to
/// `max_value_len` characters long.
#[instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn decode(text: &str, max_value_len: usize) -> DomainResult<DecisionTree> {
    let mut tree = DecisionTree::with_max_value_len(max_value_len);
    let mut parser = Parser::new(text);

    let first = match parser.open()? {
        Token::Nil => {
            parser.finish()?;
            debug!("decoded empty knowledge base");
            return Ok(tree);
        }
        Token::Value { text, offset } => parser.alloc(&mut tree, &text, offset)?,
    };
    let root = tree.root();
    tree.link(root, Direction::No, Some(first))?;

    // (node, number of child slots already read)
    let mut stack: Vec<(Index, u8)> = vec![(first, 0)];
    while let Some((idx, filled)) = stack.last_mut() {
        let idx = *idx;
        if *filled == 2 {
            parser.close()?;
            let node = tree.get(idx)?;
            if !node.is_leaf() && !node.is_question() {
                return Err(parser.error(format!(
                    "'{}' has exactly one child",
                    node.value()
                )));
            }
            stack.pop();
            continue;
        }
        let direction = if *filled == 0 {
            Direction::No
        } else {
            Direction::Yes
        };
        *filled += 1;

        if let Token::Value { text, offset } = parser.open()? {
            let child = parser.alloc(&mut tree, &text, offset)?;
            tree.link(idx, direction, Some(child))?;
            stack.push((child, 0));
        }
    }

    parser.finish()?;
    debug!("decoded {} nodes", tree.len());
    Ok(tree)
}

/// Replace the contents of `tree` with the decoded text. On error the tree is
/// left as it was and the error is recorded in its last-error slot.
pub fn decode_into(tree: &mut DecisionTree, text: &str) -> DomainResult<()> {
    match decode(text, tree.max_value_len()) {
        Ok(decoded) => {
            tree.clear();
            *tree = decoded;
            Ok(())
        }
        Err(e) => Err(tree.record(e)),
    }
}

enum Token {
    Nil,
    Value { text: String, offset: usize },
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: String) -> DomainError {
        DomainError::Malformed {
            offset: self.pos,
            reason,
        }
    }

    fn expect(&mut self, byte: u8) -> DomainResult<()> {
        self.skip_ws();
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected '{}', found '{}'",
                byte as char, b as char
            ))),
            None => Err(self.error(format!("expected '{}', found end of input", byte as char))),
        }
    }

    fn finish(&mut self) -> DomainResult<()> {
        self.skip_ws();
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("trailing data after knowledge base".into()))
        }
    }

    fn close(&mut self) -> DomainResult<()> {
        self.expect(b'}')
    }

    /// Read `{` and the value that follows. `{nil}` is consumed whole.
    fn open(&mut self) -> DomainResult<Token> {
        self.expect(b'{')?;
        let start = self.pos;
        while self.peek().is_some_and(|b| b != b'{' && b != b'}') {
            self.pos += 1;
        }
        if self.at_end() {
            return Err(self.error("unterminated node".into()));
        }

        let raw = &self.src[start..self.pos];
        let value = raw.trim();
        let offset = start + (raw.len() - raw.trim_start().len());

        if value == NIL_TOKEN {
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Token::Nil);
            }
            return Err(DomainError::Malformed {
                offset,
                reason: format!("'{NIL_TOKEN}' cannot carry children"),
            });
        }
        if value.is_empty() {
            return Err(DomainError::Malformed {
                offset,
                reason: "node without a value".into(),
            });
        }
        if value.contains(['\n', '\r']) {
            return Err(DomainError::Malformed {
                offset,
                reason: "line break inside a value".into(),
            });
        }
        Ok(Token::Value {
            text: value.to_string(),
            offset,
        })
    }

    fn alloc(&self, tree: &mut DecisionTree, value: &str, offset: usize) -> DomainResult<Index> {
        tree.create_node(value).map_err(|e| match e {
            DomainError::NodeAlloc(reason) => DomainError::Malformed { offset, reason },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::DEFAULT_MAX_VALUE_LEN;

    const WHISKERS: &str = "\
{ has whiskers
    { Nothing {nil} {nil} }
    { Cat {nil} {nil} }
}
";

    #[test]
    fn given_single_subject_when_encoding_then_leaf_has_two_nil_slots() {
        let tree = DecisionTree::with_subject("Nothing", DEFAULT_MAX_VALUE_LEN).unwrap();
        assert_eq!(encode(&tree), "{ Nothing {nil} {nil} }\n");
    }

    #[test]
    fn given_question_tree_when_encoding_then_children_are_indented() {
        let tree = decode(WHISKERS, DEFAULT_MAX_VALUE_LEN).unwrap();
        assert_eq!(encode(&tree), WHISKERS);
    }

    #[test]
    fn given_compact_input_when_decoding_then_whitespace_is_insignificant() {
        let tree = decode(
            "{has whiskers{Nothing{nil}{nil}}{Cat{nil}{nil}}}",
            DEFAULT_MAX_VALUE_LEN,
        )
        .unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.subjects(), vec!["Nothing", "Cat"]);
        let first = tree.first().unwrap();
        assert_eq!(tree.value(first).unwrap(), "has whiskers");
        assert_eq!(tree.get(first).unwrap().parent(), Some(tree.root()));
    }

    #[test]
    fn given_unicode_values_when_decoding_then_values_survive() {
        let text = "{ Он(а) летает?\n\t{ Ничего {nil} {nil} }\n\t{ Птица {nil} {nil} }\n}";
        let tree = decode(text, DEFAULT_MAX_VALUE_LEN).unwrap();
        assert_eq!(tree.subjects(), vec!["Ничего", "Птица"]);
    }

    #[test]
    fn given_existing_tree_when_decoding_into_then_contents_are_replaced() {
        let mut tree = DecisionTree::with_subject("Old", DEFAULT_MAX_VALUE_LEN).unwrap();
        decode_into(&mut tree, WHISKERS).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.subjects(), vec!["Nothing", "Cat"]);
    }

    #[test]
    fn given_malformed_text_when_decoding_into_then_tree_unchanged_and_error_recorded() {
        let mut tree = DecisionTree::with_subject("Old", DEFAULT_MAX_VALUE_LEN).unwrap();
        let err = decode_into(&mut tree, "{ q { a {nil} {nil} }").unwrap_err();
        assert!(matches!(err, DomainError::Malformed { .. }));
        assert_eq!(tree.subjects(), vec!["Old"]);
        assert_eq!(tree.last_error(), Some(&err));
    }

    #[test]
    fn given_empty_tree_when_round_tripping_then_nil_document_is_read_back() {
        let text = encode(&DecisionTree::new());
        assert_eq!(text, "{nil}\n");

        let tree = decode(&text, DEFAULT_MAX_VALUE_LEN).unwrap();

        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.get(tree.root()).unwrap().left(), None);
        assert_eq!(encode(&tree), text);
    }

    #[test]
    fn given_nil_document_with_trailing_data_when_decoding_then_malformed() {
        let err = decode("{nil} { a {nil} {nil} }", DEFAULT_MAX_VALUE_LEN).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { offset: 6, .. }));
    }

    #[test]
    fn given_one_child_node_when_decoding_then_malformed() {
        let err = decode("{ q {nil} { a {nil} {nil} } }", DEFAULT_MAX_VALUE_LEN).unwrap_err();
        match err {
            DomainError::Malformed { reason, .. } => assert!(reason.contains("one child")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn given_oversized_value_when_decoding_then_malformed_at_value_offset() {
        let err = decode("  { abcdefghij {nil} {nil} }", 4).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { offset: 4, .. }));
    }

    #[test]
    fn given_trailing_data_when_decoding_then_malformed() {
        let err = decode("{ a {nil} {nil} } {", DEFAULT_MAX_VALUE_LEN).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { .. }));
    }

    #[test]
    fn given_value_split_by_newline_when_decoding_then_malformed() {
        let err = decode("{ two\nlines {nil} {nil} }", DEFAULT_MAX_VALUE_LEN).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { .. }));
    }

    #[test]
    fn given_deep_chain_when_round_tripping_then_shape_is_preserved() {
        let mut text = String::new();
        let depth = 1_000;
        for i in 0..depth {
            text.push_str(&format!("{{ q{i} {{ leaf{i} {{nil}} {{nil}} }}\n"));
        }
        text.push_str("{ bottom {nil} {nil} }");
        text.push_str(&"}".repeat(depth));

        let tree = decode(&text, DEFAULT_MAX_VALUE_LEN).unwrap();
        assert_eq!(tree.len(), 2 * depth + 1);
        let again = decode(&encode(&tree), DEFAULT_MAX_VALUE_LEN).unwrap();
        assert_eq!(again.len(), tree.len());
        assert_eq!(again.depth(), depth + 1);
    }
}
