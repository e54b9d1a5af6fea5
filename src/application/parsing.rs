//! # Change Parser
//!
//! Turns a feed line into a [`ChangeRecord`]. A line is tried against the edit pattern first and
//! only falls back to the log-action pattern when that fails; a line matching neither is reported
//! as a [`ParseError`] rather than a partially filled record.

use regex::{Captures, Regex};
use std::fmt;
use std::num::ParseIntError;
use std::sync::LazyLock;

use crate::application::formatting::strip_formatting;
use crate::domain::types::{ActionChange, ChangeRecord, EditChange};

/// Reason attached to every parse failure.
pub const PARSE_ERROR_REASON: &str = "Error parsing";

// [[page]] <flags> <url> * user * (+12) summary
// The flag/url block is optional; each flag only counts at its own position.
// A title never contains `]`, so the first `]] ` closes it and summaries may hold links.
static EDIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\[\[(?P<page>[^\]]*)\]\] ",
        r"(?:(?P<patrolled>!)? ?(?P<new>N)? ?(?P<minor>M)? ?(?P<bot>B)? (?P<url>.*?) )?",
        r"\* (?P<user>.*?) \* ",
        r"\((?P<diff>[+-][0-9]*)\) ?",
        r"(?P<summary>.*)$",
    ))
    .expect("edit pattern is valid")
});

// [[page]] log text  * user *  summary
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\[(?P<page>[^\]]+)\]\] (?P<log>.+?)  \* (?P<user>.+?) \*  (?P<summary>.*)$")
        .expect("action pattern is valid")
});

/// Why a line could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Neither the edit nor the action pattern matched.
    Mismatch,
    /// A matched field could not be converted to its target type.
    Coercion {
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
}

/// A feed line that produced no record, with the original message kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    failure: ParseFailure,
    raw: String,
}

impl ParseError {
    pub fn new(failure: ParseFailure, raw: impl Into<String>) -> Self {
        Self {
            failure,
            raw: raw.into(),
        }
    }

    pub fn reason(&self) -> &'static str {
        PARSE_ERROR_REASON
    }

    /// The underlying conversion error, if the line matched but a field did not coerce.
    pub fn cause(&self) -> Option<&ParseIntError> {
        match &self.failure {
            ParseFailure::Mismatch => None,
            ParseFailure::Coercion { source, .. } => Some(source),
        }
    }

    /// The message as it was received, control sequences included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn failure(&self) -> &ParseFailure {
        &self.failure
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            ParseFailure::Mismatch => write!(f, "{}: {:?}", self.reason(), self.raw),
            ParseFailure::Coercion {
                field,
                value,
                source,
            } => write!(
                f,
                "{}: field '{}' value {:?} ({}): {:?}",
                self.reason(),
                field,
                value,
                source,
                self.raw
            ),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Strips formatting from a raw feed message and parses it.
pub fn parse_change(message: &str) -> Result<ChangeRecord, ParseError> {
    let cleaned = strip_formatting(message);
    parse_cleaned(&cleaned).map_err(|failure| ParseError::new(failure, message))
}

/// Parses a line that has already been stripped of formatting.
pub fn parse_cleaned(line: &str) -> Result<ChangeRecord, ParseFailure> {
    if let Some(caps) = EDIT_RE.captures(line) {
        return extract_edit(&Fields(caps)).map(ChangeRecord::Edit);
    }

    if let Some(caps) = ACTION_RE.captures(line) {
        return Ok(ChangeRecord::Action(extract_action(&Fields(caps))));
    }

    tracing::debug!("{:?} was not matched", line);
    Err(ParseFailure::Mismatch)
}

fn extract_edit(fields: &Fields<'_>) -> Result<EditChange, ParseFailure> {
    Ok(EditChange {
        page: fields.text("page"),
        patrolled: fields.flag("patrolled"),
        new: fields.flag("new"),
        minor: fields.flag("minor"),
        bot: fields.flag("bot"),
        url: fields.text("url"),
        user: fields.text("user"),
        diff: fields.signed("diff")?,
        summary: fields.text("summary"),
    })
}

fn extract_action(fields: &Fields<'_>) -> ActionChange {
    ActionChange {
        log: fields.text("log"),
        user: fields.text("user"),
        summary: fields.text("summary"),
    }
}

/// Named captures of a successful match.
///
/// `get` is `None` when the group did not take part in the match and `Some("")` when it matched
/// empty text; the coercions below decide what each case means for their type.
struct Fields<'h>(Captures<'h>);

impl<'h> Fields<'h> {
    fn get(&self, name: &str) -> Option<&'h str> {
        self.0.name(name).map(|m| m.as_str())
    }

    fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_empty())
    }

    /// `+12` / `-3`; a bare sign counts as zero.
    fn signed(&self, name: &'static str) -> Result<Option<i64>, ParseFailure> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };

        if value == "+" || value == "-" {
            return Ok(Some(0));
        }

        value
            .parse::<i64>()
            .map(Some)
            .map_err(|source| ParseFailure::Coercion {
                field: name,
                value: value.to_string(),
                source,
            })
    }
}
