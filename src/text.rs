//! Whitespace-separated text form of a digraph:
//!
//! ```text
//! 4 4
//! a b c d
//! a b
//! b c
//! c a
//! c d
//! ```
//!
//! The vertex count and edge count come first, followed by that many vertex
//! tokens and that many `source target` pairs.  Line breaks carry no meaning.
//! Vertices whose text form contains whitespace can't be represented.

use std::fmt::Display;
use std::hash::Hash;
use std::io::{Read, Write};
use std::str::{FromStr, SplitWhitespace};

use crate::error::ParseError;
use crate::Digraph;

/// Reads the whole of `reader` and parses it with [`parse_digraph`].
pub fn read_digraph<V, R>(mut reader: R) -> Result<Digraph<V>, ParseError>
where
    V: Clone + Eq + Hash + FromStr,
    R: Read,
{
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    parse_digraph(&input)
}

/// Edges that duplicate an earlier one or mention an undeclared vertex are
/// skipped with a warning.  Anything after the last edge is ignored.
pub fn parse_digraph<V>(input: &str) -> Result<Digraph<V>, ParseError>
where
    V: Clone + Eq + Hash + FromStr,
{
    let mut tokens = Tokens(input.split_whitespace());
    let vertex_count: usize = tokens.parse("vertex count")?;
    let edge_count: usize = tokens.parse("edge count")?;

    let mut digraph = Digraph::new();
    for _ in 0..vertex_count {
        let v: V = tokens.parse("vertex")?;
        if !digraph.add_vertex(v) {
            log::warn!("skipping repeated vertex");
        }
    }
    for index in 0..edge_count {
        let v: V = tokens.parse("edge source")?;
        let w: V = tokens.parse("edge target")?;
        if !digraph.add_edge(&v, &w) {
            log::warn!("skipping edge #{index}: undeclared endpoint or duplicate");
        }
    }
    Ok(digraph)
}

/// Writes `digraph` in the form accepted by [`parse_digraph`].
pub fn write_digraph<V, W>(digraph: &Digraph<V>, output: &mut W) -> std::io::Result<()>
where
    V: Clone + Eq + Hash + Display,
    W: Write,
{
    writeln!(
        output,
        "{} {}",
        digraph.get_vertex_count(),
        digraph.get_edge_count()
    )?;
    let mut separator = "";
    for v in digraph.iter_vertices() {
        write!(output, "{separator}{v}")?;
        separator = " ";
    }
    writeln!(output)?;
    for (v, w) in digraph.iter_edges() {
        writeln!(output, "{v} {w}")?;
    }
    Ok(())
}

struct Tokens<'a>(SplitWhitespace<'a>);

impl Tokens<'_> {
    fn parse<T: FromStr>(&mut self, expected: &'static str) -> Result<T, ParseError> {
        let token = self.0.next().ok_or(ParseError::UnexpectedEnd { expected })?;
        token.parse().map_err(|_| ParseError::InvalidToken {
            expected,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLE_WITH_TAIL: &str = "4 4\na b c d\na b\nb c\nc a\nc d\n";

    #[test]
    fn parse_cycle_with_tail() {
        let digraph: Digraph<String> = parse_digraph(CYCLE_WITH_TAIL).unwrap();
        assert_eq!(digraph.get_vertex_count(), 4);
        assert_eq!(digraph.get_edge_count(), 4);
        assert!(digraph.get_edge(&"c".to_string(), &"a".to_string()));
        assert!(!digraph.is_dag());
    }

    #[test]
    fn read_from_reader() {
        let digraph: Digraph<u32> = read_digraph("3 2 0 1 2 0 1 1 2".as_bytes()).unwrap();
        assert_eq!(
            digraph,
            Digraph::from_edges_iter(vec![0, 1, 2], vec![(0, 1), (1, 2)])
        );
    }

    #[test]
    fn written_text_parses_back() {
        let digraph: Digraph<String> = parse_digraph(CYCLE_WITH_TAIL).unwrap();
        let mut output = Vec::new();
        write_digraph(&digraph, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("4 4\n"));
        let reparsed: Digraph<String> = parse_digraph(&text).unwrap();
        assert_eq!(reparsed, digraph);
    }

    #[test]
    fn empty_digraph() {
        let digraph: Digraph<u32> = parse_digraph("0 0").unwrap();
        assert_eq!(digraph.get_vertex_count(), 0);
        let mut output = Vec::new();
        write_digraph(&digraph, &mut output).unwrap();
        assert_eq!(output, b"0 0\n\n");
    }

    #[test]
    fn undeclared_and_duplicate_edges_are_skipped() {
        let digraph: Digraph<u32> = parse_digraph("2 3  0 1  0 1  0 1  1 7").unwrap();
        assert_eq!(digraph.get_edge_count(), 1);
        assert!(digraph.get_edge(&0, &1));
    }

    #[test]
    fn truncated_input() {
        let result = parse_digraph::<u32>("2 1 0 1 0");
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedEnd {
                expected: "edge target"
            })
        ));
        let result = parse_digraph::<u32>("");
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedEnd {
                expected: "vertex count"
            })
        ));
    }

    #[test]
    fn invalid_token() {
        let result = parse_digraph::<u32>("2 0 0 x");
        match result {
            Err(ParseError::InvalidToken { expected, token }) => {
                assert_eq!(expected, "vertex");
                assert_eq!(token, "x");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
