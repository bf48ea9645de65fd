use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize, value},
    sequence::{pair, tuple},
    IResult,
};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{Result, SpiceError};

/// Recognizes a SPICE numeric literal: optional sign, digits, optional
/// fraction, optional signed exponent.
fn numeric_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), digit0)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

/// Matches an engineering suffix and yields its exact multiplier.
///
/// Longest suffixes first so 'meg' and 'mil' win over 'm'.
fn suffix(input: &str) -> IResult<&str, Decimal> {
    alt((
        value(Decimal::new(1_000_000, 0), tag_no_case("meg")),
        value(Decimal::new(254, 7), tag_no_case("mil")),
        value(Decimal::new(1_000_000_000_000, 0), tag_no_case("t")),
        value(Decimal::new(1_000_000_000, 0), tag_no_case("g")),
        value(Decimal::new(1_000_000, 0), tag_no_case("x")),
        value(Decimal::new(1_000, 0), tag_no_case("k")),
        value(Decimal::new(1, 3), tag_no_case("m")),
        value(Decimal::new(1, 6), tag_no_case("u")),
        value(Decimal::new(1, 9), tag_no_case("n")),
        value(Decimal::new(1, 12), tag_no_case("p")),
        value(Decimal::new(1, 15), tag_no_case("f")),
        value(Decimal::new(1, 18), tag_no_case("a")),
    ))(input)
}

fn literal_to_decimal(lit: &str) -> Result<Decimal> {
    let parsed = if lit.contains('e') || lit.contains('E') {
        Decimal::from_scientific(lit)
    } else {
        Decimal::from_str(lit)
    };
    parsed.map_err(|_| SpiceError::InvalidUnit(lit.to_string()))
}

/// Parse a value with an optional engineering suffix into an exact decimal.
///
/// `"3.3u"` -> `3.3e-6`, `"10MEG"` -> `1.0e7`, `"1MIL"` -> `25.4e-6`.
/// Characters after a recognized numeric+suffix prefix are ignored, so a
/// trailing dimension annotation like the `F` in `"10pF"` is harmless.
pub fn unit(s: &str) -> Result<Decimal> {
    let (rest, lit) = numeric_literal(s).map_err(|_| SpiceError::InvalidUnit(s.to_string()))?;
    let val = literal_to_decimal(lit)?;
    let mult = suffix(rest).map(|(_, m)| m).unwrap_or(Decimal::ONE);
    Ok(val * mult)
}
