//! # Formatting
//!
//! Strips IRC inline formatting (bold and color codes) from feed lines before they are parsed.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Bold marker, or a color marker with optional `fg` and `fg,bg` digits.
static FORMATTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x02|\x03(?:[0-9]{1,2}(?:,[0-9]{1,2})?)?").expect("formatting pattern is valid")
});

/// Removes bold and color control sequences from `message`.
///
/// Everything else is left in place and in order. When the message carries no control
/// sequences the input is returned borrowed.
pub fn strip_formatting(message: &str) -> Cow<'_, str> {
    FORMATTING_RE.replace_all(message, "")
}
