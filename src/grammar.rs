//! Parser for the shorthand declaration grammar `TYPE[ARRAY](DEFAULT)`.
//!
//! Parsing only splits the declaration into its parts. Resolving the type
//! token and coercing the default happen in [`crate::compile`].

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CompileError;

static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*([A-Za-z][A-Za-z_-]*)\s*(\[\s*\])?\s*(?:\((.*)\))?\s*$")
        .expect("shorthand pattern is valid")
});

/// The parts of a shorthand declaration, before type resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shorthand<'a> {
    /// Type token as written, e.g. `"Integer"`
    pub type_token: &'a str,
    /// `true` if the `[]` marker was present
    pub array: bool,
    /// `None` without parentheses, `Some("")` for `()`, else the enclosed text
    pub default: Option<&'a str>,
}

impl Shorthand<'_> {
    /// Parentheses (even empty ones) make a parameter optional.
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Splits a shorthand declaration into type token, array marker and default.
///
/// # Errors
///
/// Returns [`CompileError::InvalidParamShape`] if `input` does not follow the
/// grammar.
///
/// # Examples
///
/// ```
/// use param_gate::grammar::parse_shorthand;
///
/// let parsed = parse_shorthand("number[](1,2)").unwrap();
/// assert_eq!(parsed.type_token, "number");
/// assert!(parsed.array);
/// assert_eq!(parsed.default, Some("1,2"));
///
/// assert_eq!(parse_shorthand("string()").unwrap().default, Some(""));
/// assert!(parse_shorthand("(oops)").is_err());
/// ```
pub fn parse_shorthand(input: &str) -> Result<Shorthand<'_>, CompileError> {
    let caps = SHORTHAND
        .captures(input)
        .ok_or_else(|| CompileError::shape(format!("'{}' is not a parameter shorthand", input)))?;

    // Group 1 is mandatory in the pattern.
    let type_token = caps.get(1).map_or("", |m| m.as_str());

    Ok(Shorthand {
        type_token,
        array: caps.get(2).is_some(),
        default: caps.get(3).map(|m| m.as_str()),
    })
}
