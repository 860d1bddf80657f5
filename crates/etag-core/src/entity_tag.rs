//! HTTP entity tags (RFC 9110 §8.8.3).

use std::fmt;
use std::str::FromStr;

use http::HeaderValue;
use serde::{Deserialize, Serialize};

/// Error returned when a string is not a valid entity tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityTagError {
    #[error("entity tag must be a quoted string: {0}")]
    NotQuoted(String),

    #[error("entity tag contains an invalid character: {0:?}")]
    InvalidCharacter(char),
}

/// An opaque validator identifying one representation of a resource.
///
/// Rendered in header form, e.g. `"abc"` or `W/"abc"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityTag {
    tag: String,
    weak: bool,
}

impl EntityTag {
    /// Create a strong entity tag from the unquoted opaque value.
    pub fn strong(tag: impl Into<String>) -> Result<Self, EntityTagError> {
        let tag = tag.into();
        validate_opaque(&tag)?;
        Ok(Self { tag, weak: false })
    }

    /// Create a weak entity tag from the unquoted opaque value.
    pub fn weak(tag: impl Into<String>) -> Result<Self, EntityTagError> {
        let tag = tag.into();
        validate_opaque(&tag)?;
        Ok(Self { tag, weak: true })
    }

    /// Mint a fresh, globally unique strong entity tag.
    pub fn generate() -> Self {
        Self {
            tag: uuid::Uuid::new_v4().to_string(),
            weak: false,
        }
    }

    /// Parse the header form (`"abc"` or `W/"abc"`).
    pub fn parse(value: &str) -> Result<Self, EntityTagError> {
        let value = value.trim();
        let (weak, quoted) = match value.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        let tag = quoted
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .ok_or_else(|| EntityTagError::NotQuoted(value.to_string()))?;

        validate_opaque(tag)?;

        Ok(Self {
            tag: tag.to_string(),
            weak,
        })
    }

    /// The opaque value without quotes or weakness prefix.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether this is a weak validator.
    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// Render as a header value.
    pub fn to_header_value(&self) -> HeaderValue {
        // The opaque value is restricted to visible ASCII on construction.
        HeaderValue::from_str(&self.to_string()).unwrap_or_else(|_| HeaderValue::from_static("\"\""))
    }
}

fn validate_opaque(tag: &str) -> Result<(), EntityTagError> {
    match tag
        .chars()
        .find(|c| !matches!(*c, '\x21' | '\x23'..='\x7e'))
    {
        Some(c) => Err(EntityTagError::InvalidCharacter(c)),
        None => Ok(()),
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.tag)
        } else {
            write!(f, "\"{}\"", self.tag)
        }
    }
}

impl FromStr for EntityTag {
    type Err = EntityTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityTag {
    type Error = EntityTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntityTag> for String {
    fn from(etag: EntityTag) -> Self {
        etag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strong() {
        let etag = EntityTag::parse("\"abc\"").unwrap();
        assert_eq!(etag.tag(), "abc");
        assert!(!etag.is_weak());
        assert_eq!(etag.to_string(), "\"abc\"");
    }

    #[test]
    fn test_parse_weak() {
        let etag = EntityTag::parse("W/\"v1\"").unwrap();
        assert_eq!(etag.tag(), "v1");
        assert!(etag.is_weak());
        assert_eq!(etag.to_string(), "W/\"v1\"");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let etag = EntityTag::parse("  \"abc\" ").unwrap();
        assert_eq!(etag.tag(), "abc");
    }

    #[test]
    fn test_parse_empty_opaque_value() {
        let etag = EntityTag::parse("\"\"").unwrap();
        assert_eq!(etag.tag(), "");
    }

    #[test]
    fn test_parse_rejects_unquoted() {
        assert!(matches!(
            EntityTag::parse("abc"),
            Err(EntityTagError::NotQuoted(_))
        ));
        assert!(EntityTag::parse("\"abc").is_err());
        assert!(EntityTag::parse("*").is_err());
    }

    #[test]
    fn test_parse_rejects_inner_quote_and_space() {
        assert_eq!(
            EntityTag::parse("\"a\"b\""),
            Err(EntityTagError::InvalidCharacter('"'))
        );
        assert_eq!(
            EntityTag::parse("\"a b\""),
            Err(EntityTagError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn test_generate_is_unique_and_quoted() {
        let a = EntityTag::generate();
        let b = EntityTag::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with('"'));
        assert!(a.to_string().ends_with('"'));
    }

    #[test]
    fn test_header_value() {
        let etag = EntityTag::strong("123").unwrap();
        assert_eq!(etag.to_header_value(), "\"123\"");
    }

    #[test]
    fn test_serde_uses_header_form() {
        let etag = EntityTag::strong("abc").unwrap();
        let json = serde_json::to_string(&etag).unwrap();
        assert_eq!(json, r#""\"abc\"""#);

        let back: EntityTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, etag);
    }
}
