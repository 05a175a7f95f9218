//! Nom-based IRC message parser.
//!
//! Splits a single protocol line into borrowed slices; ownership and
//! interpretation happen in [`super::parse`].

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::MessageParseError;

/// Skip IRCv3 message tags (the part after `@` and before the first space).
fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

/// Parse message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Parse the command name (1*letter or 3digit).
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let is_all_letters = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let is_three_digits = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());

    let at_boundary = rest.is_empty() || rest.starts_with([' ', '\r', '\n']);

    if (is_all_letters || is_three_digits) && at_boundary {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Middle parameters and the optional trailing parameter.
type Params<'a> = (SmallVec<[&'a str; 15]>, Option<&'a str>);

/// Parse IRC message parameters from the remaining input after the command.
///
/// Multiple consecutive spaces are treated as a single separator. The
/// trailing parameter (introduced by ` :`) runs to the end of the line and is
/// kept apart from the middle parameters, even when empty.
fn parse_params(input: &str) -> (&str, Params<'_>) {
    let mut middle: SmallVec<[&str; 15]> = SmallVec::new();
    let mut trailing = None;
    let mut rest = input;

    while rest.starts_with(' ') {
        rest = rest.trim_start_matches(' ');

        if rest.is_empty() || rest.starts_with(['\r', '\n']) {
            break;
        }

        if let Some(after_colon) = rest.strip_prefix(':') {
            let end = after_colon.find(['\r', '\n']).unwrap_or(after_colon.len());
            trailing = Some(&after_colon[..end]);
            rest = &after_colon[end..];
            break;
        }

        let end = rest.find([' ', '\r', '\n']).unwrap_or(rest.len());
        middle.push(&rest[..end]);
        rest = &rest[end..];
    }

    (rest, (middle, trailing))
}

/// Parse a complete IRC message into its components.
///
/// ```text
/// [@tags] [:prefix] <command> [params...] [:trailing]
/// ```
pub(crate) fn parse_message(input: &str) -> IResult<&str, ParsedMessage<'_>> {
    let (input, _tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;

    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;

    let (input, command) = parse_command(input)?;

    let (rest, (params, trailing)) = parse_params(input);

    Ok((
        rest,
        ParsedMessage {
            prefix,
            command,
            params,
            trailing,
        },
    ))
}

/// A parsed IRC message with borrowed string slices.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedMessage<'a> {
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name.
    pub command: &'a str,
    /// Middle parameters.
    pub params: SmallVec<[&'a str; 15]>,
    /// Trailing parameter (without the leading `:`), if present.
    pub trailing: Option<&'a str>,
}

impl<'a> ParsedMessage<'a> {
    /// Parse an IRC message string, reporting the byte position of a failure.
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        match parse_message(input) {
            Ok((_remaining, msg)) => Ok(msg),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(MessageParseError::ParseContext {
                    position: input.len() - e.input.len(),
                    context: format!("expected command ({:?})", e.code),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::ParseContext {
                position: input.len(),
                context: "unexpected end of line".to_owned(),
            }),
        }
    }
}
