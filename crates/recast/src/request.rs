use std::fmt;

use bson::Bson;
use regex::{Regex, RegexBuilder};

use crate::error::MutatorError;

// ── Pattern ─────────────────────────────────────────────────────

/// What to search for in every string field.
#[derive(Debug, Clone)]
pub enum Pattern {
    Text(Regex),
}

impl Pattern {
    pub fn regex(&self) -> &Regex {
        match self {
            Pattern::Text(re) => re,
        }
    }

    /// Compile a BSON regular expression. Option letters follow MongoDB:
    /// `i`, `m`, `s` and `x` set the matching flag, `g` and `u` are accepted
    /// and ignored since every replacement is global.
    pub fn from_bson_regex(regex: &bson::Regex) -> Result<Self, MutatorError> {
        let mut builder = RegexBuilder::new(&regex.pattern);
        for flag in regex.options.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                'g' | 'u' => {}
                other => return Err(MutatorError::RegexFlag(other)),
            }
        }
        Ok(Pattern::Text(builder.build()?))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex().as_str() == other.regex().as_str()
    }
}

/// Values accepted by [`MutationRequestBuilder::find`].
///
/// Only regular expressions qualify; at the untyped [`Bson`] boundary any
/// other variant is rejected with [`MutatorError::InvalidPattern`].
pub trait IntoPattern {
    fn into_pattern(self) -> Result<Pattern, MutatorError>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> Result<Pattern, MutatorError> {
        Ok(self)
    }
}

impl IntoPattern for Regex {
    fn into_pattern(self) -> Result<Pattern, MutatorError> {
        Ok(Pattern::Text(self))
    }
}

impl IntoPattern for bson::Regex {
    fn into_pattern(self) -> Result<Pattern, MutatorError> {
        Pattern::from_bson_regex(&self)
    }
}

impl IntoPattern for Bson {
    fn into_pattern(self) -> Result<Pattern, MutatorError> {
        match self {
            Bson::RegularExpression(re) => re.into_pattern(),
            _ => Err(MutatorError::InvalidPattern),
        }
    }
}

// ── Replacement ─────────────────────────────────────────────────

/// The scalar substituted for every match, inserted as literal text.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Text(s) => f.write_str(s),
            Replacement::Integer(n) => write!(f, "{n}"),
            Replacement::Float(n) => write!(f, "{n}"),
            Replacement::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Replacement {
    fn from(s: &str) -> Self {
        Replacement::Text(s.to_string())
    }
}

impl From<String> for Replacement {
    fn from(s: String) -> Self {
        Replacement::Text(s)
    }
}

impl From<i32> for Replacement {
    fn from(n: i32) -> Self {
        Replacement::Integer(i64::from(n))
    }
}

impl From<i64> for Replacement {
    fn from(n: i64) -> Self {
        Replacement::Integer(n)
    }
}

impl From<f64> for Replacement {
    fn from(n: f64) -> Self {
        Replacement::Float(n)
    }
}

impl From<bool> for Replacement {
    fn from(b: bool) -> Self {
        Replacement::Boolean(b)
    }
}

/// Values accepted by [`MutationRequestBuilder::replace_with`].
pub trait IntoReplacement {
    fn into_replacement(self) -> Result<Replacement, MutatorError>;
}

macro_rules! scalar_replacement {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReplacement for $ty {
                fn into_replacement(self) -> Result<Replacement, MutatorError> {
                    Ok(self.into())
                }
            }
        )*
    };
}

scalar_replacement!(Replacement, &str, String, i32, i64, f64, bool);

impl IntoReplacement for Bson {
    fn into_replacement(self) -> Result<Replacement, MutatorError> {
        match self {
            Bson::String(s) => Ok(Replacement::Text(s)),
            Bson::Int32(n) => Ok(Replacement::Integer(i64::from(n))),
            Bson::Int64(n) => Ok(Replacement::Integer(n)),
            Bson::Double(n) => Ok(Replacement::Float(n)),
            Bson::Boolean(b) => Ok(Replacement::Boolean(b)),
            _ => Err(MutatorError::InvalidReplacement),
        }
    }
}

// ── Request ─────────────────────────────────────────────────────

/// A complete, immutable find-and-replace instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pattern: Pattern,
    replacement: Replacement,
    replacement_text: String,
}

impl MutationRequest {
    pub fn builder() -> MutationRequestBuilder {
        MutationRequestBuilder::default()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    /// The replacement as it is written into documents.
    pub fn replacement_text(&self) -> &str {
        &self.replacement_text
    }
}

/// Accumulates a pattern and a replacement. Each setter validates its input
/// before storing it, so a rejected call leaves the builder as it was.
#[derive(Debug, Clone, Default)]
pub struct MutationRequestBuilder {
    pattern: Option<Pattern>,
    replacement: Option<Replacement>,
}

impl MutationRequestBuilder {
    pub fn find(&mut self, pattern: impl IntoPattern) -> Result<&mut Self, MutatorError> {
        self.pattern = Some(pattern.into_pattern()?);
        Ok(self)
    }

    /// Store the replacement. Fails with [`MutatorError::MissingPattern`]
    /// (after storing) when `find` has not been called yet.
    pub fn replace_with(
        &mut self,
        replacement: impl IntoReplacement,
    ) -> Result<&mut Self, MutatorError> {
        self.replacement = Some(replacement.into_replacement()?);
        if self.pattern.is_none() {
            return Err(MutatorError::MissingPattern);
        }
        Ok(self)
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    pub fn replacement(&self) -> Option<&Replacement> {
        self.replacement.as_ref()
    }

    pub fn build(&self) -> Result<MutationRequest, MutatorError> {
        let pattern = self.pattern.clone().ok_or(MutatorError::MissingPattern)?;
        let replacement = self
            .replacement
            .clone()
            .ok_or(MutatorError::MissingReplacement)?;
        Ok(MutationRequest {
            replacement_text: replacement.to_string(),
            pattern,
            replacement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn bson_regex(pattern: &str, options: &str) -> bson::Regex {
        bson::Regex {
            pattern: pattern.into(),
            options: options.into(),
        }
    }

    #[test]
    fn find_is_chainable() {
        let request = MutationRequest::builder()
            .find(Regex::new("something").unwrap())
            .unwrap()
            .replace_with("x")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.pattern().regex().as_str(), "something");
        assert_eq!(request.replacement_text(), "x");
    }

    #[test]
    fn find_rejects_non_patterns_and_keeps_state_unset() {
        let mut builder = MutationRequest::builder();
        for value in [
            Bson::String("invalid input".into()),
            Bson::Int32(4),
            Bson::Array(vec![]),
            Bson::Document(doc! { "invalid": "input" }),
        ] {
            let err = builder.find(value).unwrap_err();
            assert!(matches!(err, MutatorError::InvalidPattern));
            assert_eq!(
                err.to_string(),
                "Invalid input: find takes a regular expression as an argument"
            );
        }
        assert!(builder.pattern().is_none());
    }

    #[test]
    fn find_accepts_bson_regular_expressions() {
        let mut builder = MutationRequest::builder();
        builder
            .find(Bson::RegularExpression(bson_regex("(\\r\\n|\\r|\\n)", "gm")))
            .unwrap();
        let re = builder.pattern().unwrap().regex();
        assert!(re.is_match("a\r\nb"));
    }

    #[test]
    fn bson_regex_options_set_flags() {
        let pattern = Pattern::from_bson_regex(&bson_regex("^abc$", "im")).unwrap();
        assert!(pattern.regex().is_match("x\nABC\ny"));

        let err = Pattern::from_bson_regex(&bson_regex("abc", "q")).unwrap_err();
        assert!(matches!(err, MutatorError::RegexFlag('q')));
    }

    #[test]
    fn uncompilable_regex_is_reported() {
        let err = Pattern::from_bson_regex(&bson_regex("(unclosed", "")).unwrap_err();
        assert!(matches!(err, MutatorError::InvalidRegex(_)));
    }

    #[test]
    fn failed_find_keeps_previous_pattern() {
        let mut builder = MutationRequest::builder();
        builder.find(Regex::new("first").unwrap()).unwrap();
        assert!(builder.find(Bson::Null).is_err());
        assert_eq!(builder.pattern().unwrap().regex().as_str(), "first");
    }

    #[test]
    fn replace_with_accepts_scalars() {
        let cases: Vec<(Replacement, &str)> = vec![
            ("valid input".into(), "valid input"),
            (7_i32.into(), "7"),
            (9_000_000_000_i64.into(), "9000000000"),
            (2.5_f64.into(), "2.5"),
            (1.0_f64.into(), "1"),
            (true.into(), "true"),
        ];
        for (replacement, text) in cases {
            let mut builder = MutationRequest::builder();
            builder.find(Regex::new("test").unwrap()).unwrap();
            builder.replace_with(replacement.clone()).unwrap();
            let request = builder.build().unwrap();
            assert_eq!(request.replacement(), &replacement);
            assert_eq!(request.replacement_text(), text);
        }
    }

    #[test]
    fn replace_with_rejects_non_scalars() {
        let mut builder = MutationRequest::builder();
        builder.find(Regex::new("test").unwrap()).unwrap();
        for value in [
            Bson::Array(vec![Bson::String("invalid input".into())]),
            Bson::Document(doc! { "invalid": "input" }),
            Bson::Null,
        ] {
            let err = builder.replace_with(value).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid input: replace_with takes a string, number, or boolean as input"
            );
        }
        assert!(builder.replacement().is_none());
        assert!(matches!(
            builder.build().unwrap_err(),
            MutatorError::MissingReplacement
        ));
    }

    #[test]
    fn replace_with_before_find_is_missing_pattern() {
        let mut builder = MutationRequest::builder();
        let err = builder.replace_with("test").unwrap_err();
        assert!(matches!(err, MutatorError::MissingPattern));
        assert!(matches!(
            builder.build().unwrap_err(),
            MutatorError::MissingPattern
        ));

        builder.find(Regex::new("test").unwrap()).unwrap();
        let request = builder.build().unwrap();
        assert_eq!(request.replacement_text(), "test");
    }

    #[test]
    fn bson_scalars_convert_to_replacements() {
        assert_eq!(
            Bson::Int32(3).into_replacement().unwrap(),
            Replacement::Integer(3)
        );
        assert_eq!(
            Bson::Boolean(false).into_replacement().unwrap(),
            Replacement::Boolean(false)
        );
    }
}
