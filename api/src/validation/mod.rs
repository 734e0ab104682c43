//! Input Validation Module
//!
//! Incoming JSON goes through three steps before a handler sees it:
//!
//! 1. **Extractors** - `ValidatedJson<T>` parses the body
//! 2. **Normalizer** - every `xsd:token` field in the object graph is trimmed
//!    and its whitespace runs collapsed, in place
//! 3. **Checks** - token rules (`TokenRule`) plus per-request validators run
//!    against the normalized values and all failures are reported together
//!
//! # Usage
//!
//! ```ignore
//! use crate::token_graph;
//! use crate::validation::{TokenRule, Validatable, ValidatedJson};
//!
//! token_graph! {
//!     MyRequest {
//!         name ("name"): token(TokenRule::TZNAKOWY512),
//!         address ("address"): nested,
//!     }
//! }
//!
//! impl Validatable for MyRequest {}
//!
//! pub async fn create_item(
//!     ValidatedJson(req): ValidatedJson<MyRequest>,
//! ) -> impl IntoResponse {
//!     // req.name is normalized and within 1..=512 characters
//! }
//! ```
//!
//! ## Validation Error Response
//!
//! ```json
//! {
//!   "error": "ValidationError",
//!   "message": "Validation failed for 2 fields",
//!   "errors": [
//!     {"field": "identificationData.name", "message": "must be at least 1 characters"},
//!     {"field": "address.contactInfos", "message": "must contain at most 3 items"}
//!   ],
//!   "code": 400,
//!   "timestamp": "2026-02-20T10:30:00Z",
//!   "correlation_id": "uuid-here"
//! }
//! ```

pub mod checker;
pub mod extractors;
pub mod normalizer;
pub mod requests;
pub mod token;
pub mod validators;

pub use checker::{check_token_graph, TokenChecker, TokenFailure};
pub use extractors::{FieldError, Validatable, ValidatedJson, ValidationBuilder, ValidationError};
pub use normalizer::{
    normalize_graph, GraphWalker, Normalizable, TokenField, TokenSchema, TokenValue, WalkStats,
    DEFAULT_MAX_DEPTH,
};
pub use token::{normalize_token, RuleConfigError, TokenRule, TokenViolation};
pub use validators::{validate_item_count, validate_required};
