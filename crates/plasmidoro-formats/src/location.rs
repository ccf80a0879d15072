//! GenBank feature location grammar.
//!
//! Supports `a..b`, fuzzy ends (`<a..>b`), single bases, `a^b` sites,
//! and arbitrarily nested `complement(...)`, `join(...)` and `order(...)`.
//! Remote references (`J00194.1:1..20`) are rejected.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt},
    multi::separated_list1,
    sequence::{delimited, preceded},
    IResult,
};
use plasmidoro_core::feature::{Location, Strand};

use crate::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Range(usize, usize),
    Complement(Box<Node>),
    Join(Vec<Node>),
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse)(input)
}

fn position(input: &str) -> IResult<&str, usize> {
    preceded(opt(alt((char('<'), char('>')))), number)(input)
}

fn range(input: &str) -> IResult<&str, Node> {
    let (rest, start) = position(input)?;
    let (rest, end) = opt(preceded(alt((tag(".."), tag("^"), tag("."))), position))(rest)?;
    Ok((rest, Node::Range(start, end.unwrap_or(start))))
}

fn complement(input: &str) -> IResult<&str, Node> {
    map(delimited(tag("complement("), node, char(')')), |n| {
        Node::Complement(Box::new(n))
    })(input)
}

fn join(input: &str) -> IResult<&str, Node> {
    map(
        delimited(
            alt((tag("join("), tag("order("))),
            separated_list1(char(','), node),
            char(')'),
        ),
        Node::Join,
    )(input)
}

fn node(input: &str) -> IResult<&str, Node> {
    alt((complement, join, range))(input)
}

fn flatten(node: &Node, reversed: bool, out: &mut Vec<((usize, usize), bool)>) {
    match node {
        // 1-based inclusive -> 0-based half-open
        Node::Range(start, end) => out.push(((start.saturating_sub(1), *end), reversed)),
        Node::Complement(inner) => flatten(inner, !reversed, out),
        Node::Join(parts) => {
            for part in parts {
                flatten(part, reversed, out);
            }
        }
    }
}

/// Parse a location string into a location and its strand.
///
/// A location whose parts are all complemented is on the reverse strand;
/// one mixing both orientations has no single strand.
pub fn parse_location(text: &str) -> Result<(Location, Strand), ParseError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let (_, tree) = all_consuming(node)(cleaned.as_str())
        .map_err(|e| ParseError::InvalidLocation(format!("{}: {}", text, e)))?;

    let mut parts = Vec::new();
    flatten(&tree, false, &mut parts);

    let strand = if parts.iter().all(|(_, rev)| *rev) {
        Strand::Reverse
    } else if parts.iter().all(|(_, rev)| !*rev) {
        Strand::Forward
    } else {
        Strand::None
    };

    let location = match parts.as_slice() {
        [((start, end), _)] => Location::simple(*start, *end),
        _ => Location::Join {
            ranges: parts.into_iter().map(|(r, _)| r).collect(),
        },
    };
    Ok((location, strand))
}
