//! `xsd:token` string rules
//!
//! KSeF schema types such as `TZnakowy` restrict `xsd:token`, not
//! `xsd:string`. A token value is compared after whitespace normalization:
//!
//! - leading whitespace is removed,
//! - trailing whitespace is removed,
//! - internal whitespace runs collapse to a single space.
//!
//! ```xml
//! <xsd:simpleType name="TZnakowy">
//!   <xsd:restriction base="xsd:token">
//!     <xsd:minLength value="1"/>
//!     <xsd:maxLength value="256"/>
//!   </xsd:restriction>
//! </xsd:simpleType>
//! ```
//!
//! Length bounds are checked against the normalized value, so `"   "` is empty
//! and `"a    b"` is three characters long.

use serde_json::Value;
use thiserror::Error;

/// Collapse whitespace the way `xsd:token` does.
pub fn normalize_token(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    for segment in value.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}

/// Why a token value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenViolation {
    #[error("is required")]
    RequiredFieldMissing,
    #[error("must be at least {min} characters")]
    TooShort { min: usize },
    #[error("must be at most {max} characters")]
    TooLong { max: usize },
    #[error("must be a string")]
    TypeMismatch,
}

impl TokenViolation {
    pub fn kind(&self) -> &'static str {
        match self {
            TokenViolation::RequiredFieldMissing => "required_field_missing",
            TokenViolation::TooShort { .. } => "too_short",
            TokenViolation::TooLong { .. } => "too_long",
            TokenViolation::TypeMismatch => "type_mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid token rule: min_length {min_length} exceeds max_length {max_length}")]
pub struct RuleConfigError {
    pub min_length: usize,
    pub max_length: usize,
}

/// Length-bounded `xsd:token` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenRule {
    min_length: usize,
    max_length: usize,
}

impl TokenRule {
    /// `TZnakowy`: required, up to 256 characters
    pub const TZNAKOWY: TokenRule = TokenRule::new(1, 256);
    /// `TZnakowy2`: optional, up to 256 characters
    pub const TZNAKOWY2: TokenRule = TokenRule::new(0, 256);
    /// `TZnakowy20`
    pub const TZNAKOWY20: TokenRule = TokenRule::new(1, 20);
    /// `TZnakowy50`
    pub const TZNAKOWY50: TokenRule = TokenRule::new(1, 50);
    /// `TZnakowy512`
    pub const TZNAKOWY512: TokenRule = TokenRule::new(1, 512);

    /// Builds a rule in constant context.
    ///
    /// # Panics
    ///
    /// Panics when `min_length > max_length`. Used from a `const` item this is
    /// a compile error rather than a runtime panic; use [`TokenRule::try_new`]
    /// for bounds that come from runtime input.
    pub const fn new(min_length: usize, max_length: usize) -> Self {
        assert!(
            min_length <= max_length,
            "token rule min_length exceeds max_length"
        );
        Self {
            min_length,
            max_length,
        }
    }

    pub fn try_new(min_length: usize, max_length: usize) -> Result<Self, RuleConfigError> {
        if min_length > max_length {
            return Err(RuleConfigError {
                min_length,
                max_length,
            });
        }
        Ok(Self {
            min_length,
            max_length,
        })
    }

    pub const fn min_length(&self) -> usize {
        self.min_length
    }

    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    /// Whether an absent value is acceptable
    pub const fn is_optional(&self) -> bool {
        self.min_length == 0
    }

    pub fn normalize(&self, value: &str) -> String {
        normalize_token(value)
    }

    /// Check a possibly absent value against the rule.
    pub fn validate(&self, value: Option<&str>) -> Result<(), TokenViolation> {
        let Some(raw) = value else {
            return if self.is_optional() {
                Ok(())
            } else {
                Err(TokenViolation::RequiredFieldMissing)
            };
        };

        let len = normalize_token(raw).chars().count();
        if len < self.min_length {
            return Err(TokenViolation::TooShort {
                min: self.min_length,
            });
        }
        if len > self.max_length {
            return Err(TokenViolation::TooLong {
                max: self.max_length,
            });
        }
        Ok(())
    }

    /// Check an untyped JSON value, for payloads that are not bound to a DTO.
    pub fn validate_value(&self, value: &Value) -> Result<(), TokenViolation> {
        match value {
            Value::Null => self.validate(None),
            Value::String(s) => self.validate(Some(s)),
            _ => Err(TokenViolation::TypeMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_token("  a   b\tc\n"), "a b c");
        assert_eq!(
            normalize_token("  Firma   XYZ   Sp.   z   o.o.  "),
            "Firma XYZ Sp. z o.o."
        );
        assert_eq!(normalize_token("\u{00A0}non\u{2003}breaking\u{00A0}"), "non breaking");
        assert_eq!(normalize_token("plain"), "plain");
    }

    #[test]
    fn test_normalize_whitespace_only_is_empty() {
        assert_eq!(normalize_token(""), "");
        assert_eq!(normalize_token(" "), "");
        assert_eq!(normalize_token("\r\n\t  "), "");
    }

    /// Strings mixing words with ASCII and Unicode whitespace
    fn spaced_text() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            "[a-zA-Z0-9ąęłóśżź.,-]{1,6}",
            Just(" ".to_string()),
            Just("\t".to_string()),
            Just("\r\n".to_string()),
            Just("\u{000B}".to_string()),
            Just("\u{00A0}".to_string()),
            Just("\u{2003}".to_string()),
            Just("\u{3000}".to_string()),
        ];
        prop::collection::vec(piece, 0..24).prop_map(|pieces| pieces.concat())
    }

    proptest! {
        #[test]
        fn test_normalize_is_idempotent(value in any::<String>()) {
            let once = normalize_token(&value);
            prop_assert_eq!(normalize_token(&once), once);
        }

        #[test]
        fn test_normalize_is_idempotent_on_spaced_text(value in spaced_text()) {
            let once = normalize_token(&value);
            prop_assert_eq!(normalize_token(&once), once.clone());
            prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
            prop_assert!(!once.contains("  "));
            prop_assert!(once.chars().all(|c| c == ' ' || !c.is_whitespace()));
        }
    }

    #[test]
    fn test_rule_method_matches_free_function() {
        let rule = TokenRule::TZNAKOWY50;
        assert_eq!(rule.normalize(" x  y "), normalize_token(" x  y "));
    }

    #[test]
    fn test_presets() {
        assert_eq!((TokenRule::TZNAKOWY.min_length(), TokenRule::TZNAKOWY.max_length()), (1, 256));
        assert_eq!((TokenRule::TZNAKOWY2.min_length(), TokenRule::TZNAKOWY2.max_length()), (0, 256));
        assert_eq!((TokenRule::TZNAKOWY20.min_length(), TokenRule::TZNAKOWY20.max_length()), (1, 20));
        assert_eq!((TokenRule::TZNAKOWY50.min_length(), TokenRule::TZNAKOWY50.max_length()), (1, 50));
        assert_eq!(
            (TokenRule::TZNAKOWY512.min_length(), TokenRule::TZNAKOWY512.max_length()),
            (1, 512)
        );
        assert!(TokenRule::TZNAKOWY2.is_optional());
        assert!(!TokenRule::TZNAKOWY.is_optional());
    }

    #[test]
    fn test_try_new_rejects_inverted_bounds() {
        let err = TokenRule::try_new(10, 5).unwrap_err();
        assert_eq!(err.min_length, 10);
        assert_eq!(err.max_length, 5);
        assert!(TokenRule::try_new(5, 5).is_ok());
        assert_eq!(TokenRule::try_new(1, 512).unwrap(), TokenRule::TZNAKOWY512);
    }

    #[test]
    fn test_absent_value() {
        assert_eq!(TokenRule::TZNAKOWY2.validate(None), Ok(()));
        assert_eq!(
            TokenRule::TZNAKOWY.validate(None),
            Err(TokenViolation::RequiredFieldMissing)
        );
    }

    #[test]
    fn test_whitespace_only_is_too_short() {
        assert_eq!(
            TokenRule::TZNAKOWY512.validate(Some(" ")),
            Err(TokenViolation::TooShort { min: 1 })
        );
        assert_eq!(TokenRule::TZNAKOWY2.validate(Some("   ")), Ok(()));
    }

    #[test]
    fn test_length_uses_normalized_value() {
        let rule = TokenRule::TZNAKOWY20;

        // "aaaaaaaaa bbbbbbbbbb" is exactly 20 characters once collapsed
        let padded = format!("   {}     {}   ", "a".repeat(9), "b".repeat(10));
        assert_eq!(rule.validate(Some(&padded)), Ok(()));

        let over = format!("   {}     {}   ", "a".repeat(10), "b".repeat(10));
        assert_eq!(
            rule.validate(Some(&over)),
            Err(TokenViolation::TooLong { max: 20 })
        );

        let exact = "x".repeat(20);
        assert_eq!(rule.validate(Some(&exact)), Ok(()));
        let one_over = "x".repeat(21);
        assert_eq!(
            rule.validate(Some(&one_over)),
            Err(TokenViolation::TooLong { max: 20 })
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let rule = TokenRule::new(1, 5);
        assert_eq!(rule.validate(Some("ąęśćż")), Ok(()));
    }

    #[test]
    fn test_validate_value() {
        let rule = TokenRule::TZNAKOWY;
        assert_eq!(rule.validate_value(&json!("  ok  ")), Ok(()));
        assert_eq!(
            rule.validate_value(&json!(null)),
            Err(TokenViolation::RequiredFieldMissing)
        );
        assert_eq!(rule.validate_value(&json!(12)), Err(TokenViolation::TypeMismatch));
        assert_eq!(
            rule.validate_value(&json!(["a"])),
            Err(TokenViolation::TypeMismatch)
        );
        assert_eq!(TokenRule::TZNAKOWY2.validate_value(&json!(null)), Ok(()));
    }

    #[test]
    fn test_violation_messages() {
        assert_eq!(TokenViolation::RequiredFieldMissing.to_string(), "is required");
        assert_eq!(
            TokenViolation::TooShort { min: 1 }.to_string(),
            "must be at least 1 characters"
        );
        assert_eq!(
            TokenViolation::TooLong { max: 512 }.to_string(),
            "must be at most 512 characters"
        );
        assert_eq!(TokenViolation::TypeMismatch.kind(), "type_mismatch");
    }
}
