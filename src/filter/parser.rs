//! Filter parser
//!
//! Parses LDAP-style match expressions such as
//! `(&(osgi.wiring.package=org.example)(version>=1.0.0))` into a [`FilterExpr`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, cut, map},
    error::{context, ContextError, ErrorKind, ParseError as NomParseError},
    multi::many1,
    sequence::{delimited, preceded},
    IResult,
};

use crate::filter::expr::{CompareOp, FilterExpr, ValuePart};

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete filter string
pub fn parse_filter(input: &str) -> Result<FilterExpr, String> {
    match all_consuming(delimited(
        multispace0::<_, nom::error::VerboseError<&str>>,
        filter,
        multispace0,
    ))(input)
    {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(nom::error::convert_error(input, e))
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete input".to_string()),
    }
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn filter<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, FilterExpr, E> {
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, expr) = cut(filter_component)(input)?;
    let (input, _) = cut(context("closing parenthesis", char(')')))(input)?;
    Ok((input, expr))
}

fn filter_component<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, FilterExpr, E> {
    alt((
        map(preceded(char('&'), filter_list), FilterExpr::And),
        map(preceded(char('|'), filter_list), FilterExpr::Or),
        map(preceded(char('!'), filter), |f| FilterExpr::Not(Box::new(f))),
        context("filter item", item),
    ))(input)
}

fn filter_list<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Vec<FilterExpr>, E> {
    let (input, items) = many1(filter)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, items))
}

fn item<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, FilterExpr, E> {
    let (input, attr) = context("attribute name", attribute_name)(input)?;
    let (input, op) = context(
        "comparison operator",
        alt((
            map(tag("~="), |_| CompareOp::Approx),
            map(tag(">="), |_| CompareOp::GreaterEq),
            map(tag("<="), |_| CompareOp::LessEq),
            map(tag("="), |_| CompareOp::Equal),
        )),
    )(input)?;
    let (input, parts) = value(input)?;
    Ok((input, build_item(attr, op, parts)))
}

fn attribute_name<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    let (rest, raw) = take_while1(|c: char| !matches!(c, '=' | '<' | '>' | '~' | '(' | ')'))(input)?;
    let name = raw.trim();
    if name.is_empty() {
        return Err(nom::Err::Error(E::from_error_kind(input, ErrorKind::Alpha)));
    }
    Ok((rest, name.to_string()))
}

/// Raw value up to the closing parenthesis, honouring `\` escapes
fn value<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Vec<ValuePart>, E> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = input.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            ')' => {
                if !literal.is_empty() {
                    parts.push(ValuePart::Literal(literal));
                }
                return Ok((&input[idx..], parts));
            }
            '(' => {
                return Err(nom::Err::Failure(E::from_error_kind(
                    &input[idx..],
                    ErrorKind::Char,
                )))
            }
            '*' => {
                if !literal.is_empty() {
                    parts.push(ValuePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(ValuePart::Star);
            }
            '\\' => match chars.next() {
                Some((_, escaped)) => literal.push(escaped),
                None => {
                    return Err(nom::Err::Failure(E::from_error_kind(
                        &input[idx..],
                        ErrorKind::Escaped,
                    )))
                }
            },
            other => literal.push(other),
        }
    }

    Err(nom::Err::Failure(E::from_error_kind(
        &input[input.len()..],
        ErrorKind::Eof,
    )))
}

fn build_item(attr: String, op: CompareOp, parts: Vec<ValuePart>) -> FilterExpr {
    let has_star = parts.iter().any(|p| matches!(p, ValuePart::Star));

    if op == CompareOp::Equal && has_star {
        if parts == [ValuePart::Star] {
            return FilterExpr::Present(attr);
        }
        return FilterExpr::Substring { attr, parts };
    }

    let value = parts
        .into_iter()
        .map(|p| match p {
            ValuePart::Literal(s) => s,
            ValuePart::Star => "*".to_string(),
        })
        .collect();
    FilterExpr::Compare { attr, op, value }
}
