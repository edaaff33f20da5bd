//! Field splitting, separator inference and numeric parsing.
//!
//! The rules are deliberately simple:
//!
//! - The separator is the first `\t`, `,` or space found outside quotes in the
//!   first line, and it is fixed for the whole file.
//! - Unquoted fields are trimmed of leading and trailing plain spaces.
//! - A `"` opens a quoted field only as the first character of a field; the
//!   content up to the closing quote is taken verbatim (separators included)
//!   and anything between the closing quote and the next separator is dropped.
//! - With a space separator, runs of separators collapse into one.
//! - A line ending in the separator has a trailing empty field.

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

/// Field separator of a delimited table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Separator {
    Tab,
    Comma,
    Space,
}

impl Separator {
    /// The separator byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Separator::Tab => b'\t',
            Separator::Comma => b',',
            Separator::Space => b' ',
        }
    }

    /// Regular expression describing the separator as it appears in the data,
    /// as written to the profile report.
    pub fn pretty(self) -> &'static str {
        match self {
            Separator::Comma => "\\s*,\\s*",
            Separator::Tab | Separator::Space => "\\s+",
        }
    }

    /// Infers the separator from the first line of a table.
    pub fn infer(line: &str) -> Option<Self> {
        let mut in_quotes = false;
        for b in line.bytes() {
            if b == b'"' {
                in_quotes = !in_quotes;
            }
            if in_quotes {
                continue;
            }
            match b {
                b'\t' => return Some(Separator::Tab),
                b',' => return Some(Separator::Comma),
                b' ' => return Some(Separator::Space),
                _ => {}
            }
        }
        None
    }
}

/// Message used when the first line contains no usable separator.
pub const NO_DELIMITER_MESSAGE: &str = "CSV doesn't contain a valid delimiter.\nThis means your file isn't properly formatted\n(or you submitted another type of file).";

/// Splits lines into fields for a fixed separator.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    separator: Separator,
}

impl Tokenizer {
    pub fn new(separator: Separator) -> Self {
        Self { separator }
    }

    /// Builds a tokenizer from the first line of a table.
    pub fn from_first_line(line: &str) -> Result<Self> {
        Separator::infer(line)
            .map(Self::new)
            .ok_or_else(|| PrepError::input(NO_DELIMITER_MESSAGE))
    }

    pub fn separator(&self) -> Separator {
        self.separator
    }

    /// Splits `line` into `fields`, replacing its previous contents.
    pub fn split_into<'a>(&self, line: &'a str, fields: &mut Vec<&'a str>) {
        fields.clear();
        let bytes = line.as_bytes();
        let sep = self.separator.as_byte();
        let collapse = self.separator == Separator::Space;
        let end = bytes.len();
        let find_sep = |from: usize| bytes[from..].iter().position(|&b| b == sep).map(|i| i + from);
        let skip_run = |mut p: usize| {
            if collapse {
                while p < end && bytes[p] == sep {
                    p += 1;
                }
            }
            p
        };

        let mut p = 0;
        while p < end {
            if bytes[p] == b'"' {
                let start = p + 1;
                match bytes[start..].iter().position(|&b| b == b'"') {
                    Some(i) => {
                        let close = start + i;
                        fields.push(&line[start..close]);
                        match find_sep(close + 1) {
                            Some(q) => p = skip_run(q + 1),
                            None => return,
                        }
                    }
                    None => {
                        fields.push(&line[start..]);
                        return;
                    }
                }
            } else {
                match find_sep(p) {
                    Some(q) => {
                        fields.push(trim_spaces(&line[p..q]));
                        p = skip_run(q + 1);
                    }
                    None => {
                        fields.push(trim_spaces(&line[p..]));
                        return;
                    }
                }
            }
        }
        if end > 0 && bytes[end - 1] == sep {
            fields.push("");
        }
    }

    /// Splits `line` into a new vector of fields.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let mut fields = Vec::new();
        self.split_into(line, &mut fields);
        fields
    }
}

fn trim_spaces(s: &str) -> &str {
    s.trim_matches(' ')
}

/// A row is a header when none of its fields parses as a number.
pub fn is_header(fields: &[&str]) -> bool {
    fields.iter().all(|f| parse_real(f).is_none())
}

const MAX_EXPONENT10: i32 = 308;
const MIN_EXPONENT10: i32 = -307;

/// Parses a real number.
///
/// Accepts optional leading and trailing plain spaces, an optional sign,
/// digits with an optional fractional part (at least one digit overall) and
/// an optional exponent with at least one digit. Anything else is rejected,
/// including `inf`, `nan`, exponents outside the `f64` decimal range and
/// text whose value overflows to infinity.
pub fn parse_real(s: &str) -> Option<f64> {
    let body = trim_spaces(s);
    let bytes = body.as_bytes();
    let mut p = 0;

    if p < bytes.len() && (bytes[p] == b'+' || bytes[p] == b'-') {
        p += 1;
    }
    let mut digits = 0;
    while p < bytes.len() && bytes[p].is_ascii_digit() {
        p += 1;
        digits += 1;
    }
    if p < bytes.len() && bytes[p] == b'.' {
        p += 1;
        while p < bytes.len() && bytes[p].is_ascii_digit() {
            p += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    if p < bytes.len() && (bytes[p] == b'e' || bytes[p] == b'E') {
        p += 1;
        let neg = match bytes.get(p) {
            Some(b'-') => {
                p += 1;
                true
            }
            Some(b'+') => {
                p += 1;
                false
            }
            _ => false,
        };
        let exp_start = p;
        let mut exponent: i64 = 0;
        while p < bytes.len() && bytes[p].is_ascii_digit() {
            exponent = (exponent * 10 + i64::from(bytes[p] - b'0')).min(i64::from(i32::MAX));
            p += 1;
        }
        if p == exp_start {
            return None;
        }
        let exponent = if neg { -exponent } else { exponent };
        if exponent > i64::from(MAX_EXPONENT10) || exponent < i64::from(MIN_EXPONENT10) {
            return None;
        }
    }
    if p != bytes.len() {
        return None;
    }
    body.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// True when `s` parses as a number without fractional part.
pub fn is_integer_text(s: &str) -> bool {
    parse_real(s).is_some_and(|x| x.fract() == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comma() -> Tokenizer {
        Tokenizer::new(Separator::Comma)
    }

    #[test]
    fn test_separator_inference_order() {
        assert_eq!(Separator::infer("a,b\tc"), Some(Separator::Comma));
        assert_eq!(Separator::infer("a\tb,c"), Some(Separator::Tab));
        assert_eq!(Separator::infer("a b,c"), Some(Separator::Space));
        assert_eq!(Separator::infer("\"a,b\"\tc"), Some(Separator::Tab));
        assert_eq!(Separator::infer("abc"), None);
    }

    #[test]
    fn test_no_delimiter_is_fatal() {
        let err = Tokenizer::from_first_line("single").unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn test_unquoted_fields_are_trimmed() {
        assert_eq!(comma().split(" a , b ,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(comma().split("\"a,b\",c"), vec!["a,b", "c"]);
        assert_eq!(comma().split("\" x \",y"), vec![" x ", "y"]);
        // text after the closing quote is dropped
        assert_eq!(comma().split("\"a\"junk,b"), vec!["a", "b"]);
        // unterminated quote runs to end of line
        assert_eq!(comma().split("x,\"open,end"), vec!["x", "open,end"]);
        // a quote after leading spaces is not special
        assert_eq!(comma().split(" \"a,b\""), vec!["\"a", "b\""]);
    }

    #[test]
    fn test_trailing_separator() {
        assert_eq!(comma().split("a,b,"), vec!["a", "b", ""]);
        assert_eq!(comma().split(",z"), vec!["", "z"]);
        assert_eq!(comma().split("\"q\","), vec!["q", ""]);
        assert!(comma().split("").is_empty());
    }

    #[test]
    fn test_comma_and_tab_do_not_collapse() {
        assert_eq!(comma().split("a,,b"), vec!["a", "", "b"]);
        let tab = Tokenizer::new(Separator::Tab);
        assert_eq!(tab.split("a\t\tb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_space_collapses() {
        let space = Tokenizer::new(Separator::Space);
        assert_eq!(space.split("a   b c"), vec!["a", "b", "c"]);
        assert_eq!(space.split("\"x y\"   z"), vec!["x y", "z"]);
    }

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real("42"), Some(42.0));
        assert_eq!(parse_real(" -1.5 "), Some(-1.5));
        assert_eq!(parse_real("+.5"), Some(0.5));
        assert_eq!(parse_real("3."), Some(3.0));
        assert_eq!(parse_real("1e3"), Some(1000.0));
        assert_eq!(parse_real("2.5E-2"), Some(0.025));
        assert_eq!(parse_real(""), None);
        assert_eq!(parse_real("."), None);
        assert_eq!(parse_real("-"), None);
        assert_eq!(parse_real("1e"), None);
        assert_eq!(parse_real("1e400"), None);
        assert_eq!(parse_real("12abc"), None);
        assert_eq!(parse_real("inf"), None);
        assert_eq!(parse_real("NaN"), None);
        assert_eq!(parse_real("0x10"), None);
        assert_eq!(parse_real("1 2"), None);
    }

    #[test]
    fn test_overflowing_numbers_are_rejected() {
        assert_eq!(parse_real("2e308"), None);
        assert_eq!(parse_real("-1.8e308"), None);
        assert_eq!(parse_real(&"9".repeat(400)), None);
        assert!(!is_integer_text(&"9".repeat(400)));
        assert_eq!(parse_real("1.7e308"), Some(1.7e308));
    }

    #[test]
    fn test_header_detection() {
        assert!(is_header(&["a", "b", ""]));
        assert!(!is_header(&["a", "1"]));
        assert!(is_header(&[]));
    }

    #[test]
    fn test_integer_text() {
        assert!(is_integer_text("7"));
        assert!(is_integer_text("7.0"));
        assert!(is_integer_text("1e2"));
        assert!(!is_integer_text("7.5"));
        assert!(!is_integer_text("x"));
    }
}
