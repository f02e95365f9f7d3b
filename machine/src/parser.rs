//! Program load format parsing.
//!
//! A program is a sequence of signed decimal integers separated by commas,
//! with optional surrounding whitespace. The parsing is handled by the `nom`
//! library.

use std::str::FromStr;

use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, map_res, opt, recognize};
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded};
use nom::{Finish, IResult, Offset};
use thiserror::Error;

use crate::constants::Word;

/// Failure to parse a program source.
///
/// The whole load fails on the first malformed token; no partial program is
/// ever returned. The byte offset points at the offending token in the
/// original input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed token {token:?} at offset {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub token: String,
}

/// Check if character is a decimal digit
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Parse a signed decimal word
fn parse_word(input: &str) -> IResult<&str, Word> {
    map_res(
        recognize(preceded(opt(char('-')), take_while1(is_digit))),
        Word::from_str,
    )(input)
}

/// Parse a whole program
///
/// # Errors
///
/// This function will return an error if any token is not a signed decimal
/// integer, or if the input is empty.
pub fn parse_program(input: &str) -> Result<Vec<Word>, ParseError> {
    let result: Result<(&str, Vec<Word>), nom::error::Error<&str>> =
        all_consuming(delimited(
            multispace0,
            separated_list1(
                delimited(multispace0, char(','), multispace0),
                parse_word,
            ),
            multispace0,
        ))(input)
        .finish();

    match result {
        Ok((_, words)) => Ok(words),
        Err(e) => {
            // The remaining input may still start with the separator the
            // list combinator backtracked over; skip it to point at the
            // offending token itself.
            let rest = e
                .input
                .trim_start_matches(|c: char| c == ',' || c.is_ascii_whitespace());
            Err(ParseError {
                offset: input.offset(rest),
                token: rest
                    .split(|c: char| c == ',' || c.is_ascii_whitespace())
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            })
        }
    }
}

/// Render a memory image back to the load format.
///
/// `parse_program` followed by `display_program` reproduces the original
/// input, modulo whitespace normalization.
#[must_use]
pub fn display_program(words: &[Word]) -> String {
    words
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_word_test() {
        assert_eq!(parse_word("42"), Ok(("", 42)));
        assert_eq!(parse_word("-17,3"), Ok((",3", -17)));
        assert!(parse_word("foo").is_err());
        assert!(parse_word("-").is_err());
    }

    #[test]
    fn parse_program_test() {
        assert_eq!(parse_program("1,0,0,0,99"), Ok(vec![1, 0, 0, 0, 99]));
        assert_eq!(parse_program("3,9,-1,8"), Ok(vec![3, 9, -1, 8]));
        assert_eq!(parse_program("42"), Ok(vec![42]));
        // A trailing newline is the common case for files
        assert_eq!(parse_program("1,2,3\n"), Ok(vec![1, 2, 3]));
        assert_eq!(parse_program("  1, 2 ,3 "), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn parse_program_error_test() {
        assert_eq!(
            parse_program("1,x,3"),
            Err(ParseError {
                offset: 2,
                token: "x".to_string(),
            })
        );
        // The load fails as a whole, even when the prefix is valid
        assert_eq!(
            parse_program("1,2,3,oops"),
            Err(ParseError {
                offset: 6,
                token: "oops".to_string(),
            })
        );
        assert!(parse_program("").is_err());
        assert!(parse_program("1,,2").is_err());
    }

    #[test]
    fn multi_line_test() {
        let source = indoc::indoc! {"
            1,9,10,3,
            2,3,11,0,
            99,30,40,50
        "};
        assert_eq!(
            parse_program(source),
            Ok(vec![1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50])
        );
    }

    #[test]
    fn round_trip_test() {
        let source = "1,9,10,3,2,3,11,0,99,30,40,50";
        let words = parse_program(source).unwrap();
        assert_eq!(display_program(&words), source);

        let normalized = parse_program("1, -2,\n3\n").unwrap();
        assert_eq!(display_program(&normalized), "1,-2,3");
    }
}
