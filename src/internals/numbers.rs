//! Recognizers for TOML's integer and float literals.
//!
//! Unlike the hand-rolled string scanners, these grammars are flat enough that `nom`'s
//! combinators read more clearly than manual loops: each numeric base is "a sign, then digits
//! with single interior underscores", and floats are "an integer part plus an optional fraction
//! and/or exponent" — exactly the shape `tuple`/`alt`/`recognize` are built for.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit1, hex_digit1, oct_digit1, one_of};
use nom::combinator::{not, opt, peek, recognize};
use nom::multi::many0;
use nom::sequence::{pair, preceded, terminated, tuple};
use nom::IResult;

use crate::types::{TomlError, Value};

/// Parses either an integer or a float literal starting at `pos`. Floats are tried first since
/// `1e10`/`1.0` share a prefix with integers but integers never contain `.`/`e`/`inf`/`nan`.
pub(crate) fn parse_number(source: &str, pos: usize) -> Result<(Value, usize), TomlError> {
    let rest = &source[pos..];
    if let Ok((tail, f)) = float(rest) {
        return Ok((Value::Float(f), source.len() - tail.len()));
    }
    match integer(rest) {
        Ok((tail, i)) => Ok((Value::Integer(i), source.len() - tail.len())),
        Err(_) => Err(TomlError::new("expected an integer or float", pos)),
    }
}

fn sign(input: &str) -> IResult<&str, Option<char>> {
    opt(one_of("+-"))(input)
}

fn dec_digits(input: &str) -> IResult<&str, &str> {
    recognize(tuple((digit1, many0(pair(char('_'), digit1)))))(input)
}

fn hex_digits(input: &str) -> IResult<&str, &str> {
    recognize(tuple((hex_digit1, many0(pair(char('_'), hex_digit1)))))(input)
}

fn oct_digits(input: &str) -> IResult<&str, &str> {
    recognize(tuple((oct_digit1, many0(pair(char('_'), oct_digit1)))))(input)
}

fn bin_digits(input: &str) -> IResult<&str, &str> {
    let one_bin = |i| take_while1(|c: char| c == '0' || c == '1')(i);
    recognize(tuple((one_bin, many0(pair(char('_'), one_bin)))))(input)
}

/// `dec-int = [ "-" / "+" ] unsigned-dec-int`, with the additional rule that a multi-digit value
/// may not have a leading zero. `0`, `-0`, and `+0` are fine; `01` is not. The lone-`'0'` branch is
/// guarded with a lookahead so it only matches when no further digit (or underscore introducing
/// one) follows — otherwise `alt` would happily accept the `0` prefix of `0123` and leave `123`
/// unconsumed instead of rejecting the literal outright.
fn dec_int(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        sign,
        alt((
            terminated(recognize(char('0')), peek(not(one_of("0123456789_")))),
            recognize(tuple((one_of("123456789"), many0(pair(opt(char('_')), digit1))))),
        )),
    )))(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    if let Ok((tail, digits)) = preceded(tag("0x"), hex_digits)(input) {
        let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
        return match i64::from_str_radix(&cleaned, 16) {
            Ok(v) => Ok((tail, v)),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))),
        };
    }
    if let Ok((tail, digits)) = preceded(tag("0o"), oct_digits)(input) {
        let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
        return match i64::from_str_radix(&cleaned, 8) {
            Ok(v) => Ok((tail, v)),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))),
        };
    }
    if let Ok((tail, digits)) = preceded(tag("0b"), bin_digits)(input) {
        let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
        return match i64::from_str_radix(&cleaned, 2) {
            Ok(v) => Ok((tail, v)),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))),
        };
    }
    let (tail, raw) = dec_int(input)?;
    let cleaned: String = raw.chars().filter(|&c| c != '_').collect();
    match cleaned.parse::<i64>() {
        Ok(v) => Ok((tail, v)),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge))),
    }
}

fn float_numeral(input: &str) -> IResult<&str, &str> {
    let frac = tuple((char('.'), dec_digits));
    let exp = tuple((one_of("eE"), sign, dec_digits));
    recognize(tuple((
        dec_int,
        alt((
            recognize(tuple((frac, opt(exp)))),
            recognize(exp),
        )),
    )))(input)
}

fn float_special(input: &str) -> IResult<&str, f64> {
    let (tail, (s, word)) = pair(sign, alt((tag("inf"), tag("nan"))))(input)?;
    let value = match (s, word) {
        (Some('-'), "inf") => f64::NEG_INFINITY,
        (_, "inf") => f64::INFINITY,
        (Some('-'), "nan") => -f64::NAN,
        (_, "nan") => f64::NAN,
        _ => unreachable!(),
    };
    Ok((tail, value))
}

fn float(input: &str) -> IResult<&str, f64> {
    if let Ok((tail, v)) = float_special(input) {
        return Ok((tail, v));
    }
    let (tail, raw) = float_numeral(input)?;
    let cleaned: String = raw.chars().filter(|&c| c != '_').collect();
    match cleaned.parse::<f64>() {
        // TOML requires "-0.0" to parse but not to be distinguishable from "0.0".
        Ok(v) => Ok((tail, if v == 0.0 { 0.0 } else { v })),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Float))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn num(s: &str) -> Value {
        parse_number(s, 0).unwrap().0
    }

    #[test]
    fn parses_decimal_integers_with_underscores() {
        assert_eq!(num("1_000"), Value::Integer(1000));
        assert_eq!(num("-17"), Value::Integer(-17));
        assert_eq!(num("+0"), Value::Integer(0));
    }

    #[test]
    fn rejects_leading_zero() {
        assert!(integer("0123").is_err());
        assert!(integer("00").is_err());
        assert!(parse_number("01.5", 0).is_err());
        assert!(integer("0").is_ok());
    }

    #[test]
    fn parses_hex_octal_binary() {
        assert_eq!(num("0xDEAD_BEEF"), Value::Integer(0xDEADBEEF));
        assert_eq!(num("0o755"), Value::Integer(0o755));
        assert_eq!(num("0b1010"), Value::Integer(0b1010));
    }

    #[test]
    fn parses_floats_with_exponent_and_fraction() {
        assert_eq!(num("6.626e-34"), Value::Float(6.626e-34));
        assert_eq!(num("1e10"), Value::Float(1e10));
    }

    #[test]
    fn parses_special_floats() {
        assert_eq!(num("inf"), Value::Float(f64::INFINITY));
        assert_eq!(num("-inf"), Value::Float(f64::NEG_INFINITY));
        assert!(matches!(num("nan"), Value::Float(f) if f.is_nan()));
    }

    #[test]
    fn negative_zero_float_normalizes_to_positive_zero() {
        let v = num("-0.0");
        match v {
            Value::Float(f) => assert!(f == 0.0 && f.is_sign_positive()),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn out_of_range_integer_is_rejected() {
        assert!(integer("99999999999999999999").is_err());
    }
}
