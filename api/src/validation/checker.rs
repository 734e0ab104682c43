//! Rule checks over an object graph
//!
//! `TokenChecker` mirrors `GraphWalker` for the read-only validation pass: it
//! visits the same fields, tracks the JSON path of each one and records every
//! rule violation instead of stopping at the first.

use std::collections::HashSet;
use std::fmt::{self, Display};

use super::extractors::FieldError;
use super::normalizer::{Normalizable, DEFAULT_MAX_DEPTH};
use super::token::{TokenRule, TokenViolation};

#[derive(Debug, Clone)]
enum Segment {
    Field(&'static str),
    Index(usize),
    Key(String),
}

/// A rule violation at a JSON path such as `address.contactInfos[1].email`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFailure {
    pub field: String,
    pub violation: TokenViolation,
}

impl From<TokenFailure> for FieldError {
    fn from(failure: TokenFailure) -> Self {
        FieldError::new(failure.field, failure.violation.to_string())
    }
}

#[derive(Debug)]
pub struct TokenChecker {
    path: Vec<Segment>,
    visited: HashSet<usize>,
    failures: Vec<TokenFailure>,
    max_depth: usize,
    depth_limited: usize,
}

impl Default for TokenChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenChecker {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            path: Vec::new(),
            visited: HashSet::new(),
            failures: Vec::new(),
            max_depth,
            depth_limited: 0,
        }
    }

    /// Validate a tagged field against its rule.
    pub fn token(&mut self, name: &'static str, value: Option<&str>, rule: &TokenRule) {
        if let Err(violation) = rule.validate(value) {
            self.path.push(Segment::Field(name));
            let field = self.current_path();
            self.path.pop();
            self.failures.push(TokenFailure { field, violation });
        }
    }

    pub fn field<T: Normalizable + ?Sized>(&mut self, name: &'static str, value: &T) {
        self.descend(Segment::Field(name), value);
    }

    pub fn element<T: Normalizable + ?Sized>(&mut self, index: usize, value: &T) {
        self.descend(Segment::Index(index), value);
    }

    pub fn entry<K: Display + ?Sized, T: Normalizable + ?Sized>(&mut self, key: &K, value: &T) {
        self.descend(Segment::Key(key.to_string()), value);
    }

    /// Record a shared node. Returns `false` if it was already checked.
    pub fn enter_shared(&mut self, identity: usize) -> bool {
        self.visited.insert(identity)
    }

    pub fn failures(&self) -> &[TokenFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<TokenFailure> {
        self.failures
    }

    /// Subtrees skipped because they were nested past the depth limit
    pub fn depth_limited(&self) -> usize {
        self.depth_limited
    }

    fn descend<T: Normalizable + ?Sized>(&mut self, segment: Segment, value: &T) {
        // the path length is the current depth
        if self.path.len() >= self.max_depth {
            if self.depth_limited == 0 {
                tracing::warn!(
                    max_depth = self.max_depth,
                    "object graph exceeds maximum depth, skipping nested checks"
                );
            }
            self.depth_limited += 1;
            return;
        }
        self.path.push(segment);
        value.check_tokens(self);
        self.path.pop();
    }

    fn current_path(&self) -> String {
        PathDisplay(&self.path).to_string()
    }
}

struct PathDisplay<'a>(&'a [Segment]);

impl Display for PathDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Field(name) if i == 0 => f.write_str(name)?,
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
            }
        }
        Ok(())
    }
}

/// Collect every rule violation reachable from `root`.
pub fn check_token_graph<T: Normalizable + ?Sized>(root: &T) -> Vec<TokenFailure> {
    let mut checker = TokenChecker::new();
    root.check_tokens(&mut checker);
    checker.into_failures()
}
