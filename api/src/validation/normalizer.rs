//! Object-graph token normalization
//!
//! Request types declare which of their string fields are `xsd:token` values
//! with [`token_graph!`](crate::token_graph). The declaration generates a
//! [`Normalizable`] implementation that rewrites tagged fields in place and
//! descends into every other field, plus a [`TokenSchema`] field table.
//!
//! Owned trees (`Box`, `Vec`, maps, `Option`) are walked directly. Shared
//! nodes (`Rc<RefCell<_>>`, `Arc<Mutex<_>>`, ...) are tracked by allocation
//! address so that cyclic graphs are visited exactly once.
//!
//! Only `String` and `Option<String>` fields can carry a rule. Tagging any
//! other field type is rejected by the compiler:
//!
//! ```compile_fail
//! use simple_ksef_api::token_graph;
//! use simple_ksef_api::validation::TokenRule;
//!
//! struct Line {
//!     quantity: u32,
//! }
//!
//! token_graph! {
//!     Line {
//!         quantity ("quantity"): token(TokenRule::TZNAKOWY),
//!     }
//! }
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, RwLock, TryLockError};

use super::checker::TokenChecker;
use super::token::TokenRule;

/// Maximum nesting the walker descends before skipping a subtree.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// A value whose token fields can be normalized and checked.
pub trait Normalizable {
    /// Rewrite every tagged string reachable from `self`.
    fn normalize_graph(&mut self, walker: &mut GraphWalker);

    /// Report every tagged string reachable from `self` that breaks its rule.
    fn check_tokens(&self, checker: &mut TokenChecker);
}

/// String slots a [`TokenRule`] may be attached to
pub trait TokenValue {
    fn token(&self) -> Option<&str>;
    fn token_mut(&mut self) -> Option<&mut String>;
}

impl TokenValue for String {
    fn token(&self) -> Option<&str> {
        Some(self)
    }

    fn token_mut(&mut self) -> Option<&mut String> {
        Some(self)
    }
}

impl TokenValue for Option<String> {
    fn token(&self) -> Option<&str> {
        self.as_deref()
    }

    fn token_mut(&mut self) -> Option<&mut String> {
        self.as_mut()
    }
}

/// One entry of a type's field/rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenField {
    pub name: &'static str,
    pub rule: Option<TokenRule>,
}

impl TokenField {
    pub const fn token(name: &'static str, rule: TokenRule) -> Self {
        Self {
            name,
            rule: Some(rule),
        }
    }

    pub const fn nested(name: &'static str) -> Self {
        Self { name, rule: None }
    }
}

/// Static description of a type's fields, in declaration order
pub trait TokenSchema {
    fn token_fields() -> &'static [TokenField];

    fn rule_for(name: &str) -> Option<TokenRule> {
        Self::token_fields()
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.rule)
    }
}

/// Counters collected during one traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Tagged fields holding a value
    pub tokens_normalized: usize,
    /// Tagged fields whose value was rewritten
    pub tokens_changed: usize,
    pub shared_nodes: usize,
    pub cycles_skipped: usize,
    pub depth_limited: usize,
}

/// Mutable traversal state: visited shared nodes, depth and counters.
#[derive(Debug)]
pub struct GraphWalker {
    visited: HashSet<usize>,
    depth: usize,
    max_depth: usize,
    stats: WalkStats,
}

impl Default for GraphWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphWalker {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            visited: HashSet::new(),
            depth: 0,
            max_depth,
            stats: WalkStats::default(),
        }
    }

    /// Descend into a child value.
    pub fn walk<T: Normalizable + ?Sized>(&mut self, value: &mut T) {
        if self.depth >= self.max_depth {
            if self.stats.depth_limited == 0 {
                tracing::warn!(
                    max_depth = self.max_depth,
                    "object graph exceeds maximum depth, skipping nested values"
                );
            }
            self.stats.depth_limited += 1;
            return;
        }
        self.depth += 1;
        value.normalize_graph(self);
        self.depth -= 1;
    }

    /// Normalize a tagged field in place. Absent values stay absent.
    pub fn token<V: TokenValue + ?Sized>(&mut self, value: &mut V, rule: &TokenRule) {
        let Some(current) = value.token_mut() else {
            return;
        };
        self.stats.tokens_normalized += 1;
        let normalized = rule.normalize(current);
        if normalized != *current {
            self.stats.tokens_changed += 1;
            *current = normalized;
        }
    }

    /// Record a shared node. Returns `false` if it was already visited.
    pub fn enter_shared(&mut self, identity: usize) -> bool {
        if self.visited.insert(identity) {
            self.stats.shared_nodes += 1;
            true
        } else {
            self.stats.cycles_skipped += 1;
            false
        }
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }
}

/// Normalize every tagged string reachable from `root`.
pub fn normalize_graph<T: Normalizable + ?Sized>(root: &mut T) -> WalkStats {
    let mut walker = GraphWalker::new();
    walker.walk(root);
    walker.stats()
}

/// Address of a shared allocation, used as its identity.
pub(crate) fn identity<T: ?Sized>(ptr: *const T) -> usize {
    ptr.cast::<()>() as usize
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminals
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! terminal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Normalizable for $ty {
                fn normalize_graph(&mut self, _walker: &mut GraphWalker) {}

                fn check_tokens(&self, _checker: &mut TokenChecker) {}
            }
        )*
    };
}

terminal!(
    String,
    str,
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    uuid::Uuid,
    serde_json::Value,
);

// ─────────────────────────────────────────────────────────────────────────────
// Owned containers
// ─────────────────────────────────────────────────────────────────────────────

impl<T: Normalizable> Normalizable for Option<T> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        if let Some(value) = self {
            value.normalize_graph(walker);
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        if let Some(value) = self {
            value.check_tokens(checker);
        }
    }
}

impl<T: Normalizable + ?Sized> Normalizable for Box<T> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        walker.walk(&mut **self);
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        (**self).check_tokens(checker);
    }
}

impl<T: Normalizable> Normalizable for [T] {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        for item in self.iter_mut() {
            walker.walk(item);
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        for (index, item) in self.iter().enumerate() {
            checker.element(index, item);
        }
    }
}

impl<T: Normalizable, const N: usize> Normalizable for [T; N] {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        self.as_mut_slice().normalize_graph(walker);
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        self.as_slice().check_tokens(checker);
    }
}

impl<T: Normalizable> Normalizable for Vec<T> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        self.as_mut_slice().normalize_graph(walker);
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        self.as_slice().check_tokens(checker);
    }
}

impl<T: Normalizable> Normalizable for VecDeque<T> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        for item in self.iter_mut() {
            walker.walk(item);
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        for (index, item) in self.iter().enumerate() {
            checker.element(index, item);
        }
    }
}

impl<K: std::fmt::Display, V: Normalizable, S> Normalizable for HashMap<K, V, S> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        for value in self.values_mut() {
            walker.walk(value);
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        for (key, value) in self {
            checker.entry(key, value);
        }
    }
}

impl<K: std::fmt::Display, V: Normalizable> Normalizable for BTreeMap<K, V> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        for value in self.values_mut() {
            walker.walk(value);
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        for (key, value) in self {
            checker.entry(key, value);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared nodes
// ─────────────────────────────────────────────────────────────────────────────

impl<T: Normalizable + ?Sized> Normalizable for Rc<RefCell<T>> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        if !walker.enter_shared(identity(Rc::as_ptr(self))) {
            return;
        }
        match self.try_borrow_mut() {
            Ok(mut inner) => walker.walk(&mut *inner),
            Err(_) => tracing::debug!("skipping shared node that is already borrowed"),
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        if !checker.enter_shared(identity(Rc::as_ptr(self))) {
            return;
        }
        if let Ok(inner) = self.try_borrow() {
            inner.check_tokens(checker);
        }
    }
}

impl<T: Normalizable + ?Sized> Normalizable for Weak<RefCell<T>> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        if let Some(mut node) = self.upgrade() {
            node.normalize_graph(walker);
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        if let Some(node) = self.upgrade() {
            node.check_tokens(checker);
        }
    }
}

impl<T: Normalizable + ?Sized> Normalizable for Arc<Mutex<T>> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        if !walker.enter_shared(identity(Arc::as_ptr(self))) {
            return;
        }
        match self.try_lock() {
            Ok(mut inner) => walker.walk(&mut *inner),
            Err(TryLockError::Poisoned(poisoned)) => walker.walk(&mut *poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("skipping shared node that is locked elsewhere")
            }
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        if !checker.enter_shared(identity(Arc::as_ptr(self))) {
            return;
        }
        match self.try_lock() {
            Ok(inner) => inner.check_tokens(checker),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().check_tokens(checker),
            Err(TryLockError::WouldBlock) => {}
        }
    }
}

impl<T: Normalizable + ?Sized> Normalizable for Arc<RwLock<T>> {
    fn normalize_graph(&mut self, walker: &mut GraphWalker) {
        if !walker.enter_shared(identity(Arc::as_ptr(self))) {
            return;
        }
        match self.try_write() {
            Ok(mut inner) => walker.walk(&mut *inner),
            Err(TryLockError::Poisoned(poisoned)) => walker.walk(&mut *poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("skipping shared node that is locked elsewhere")
            }
        }
    }

    fn check_tokens(&self, checker: &mut TokenChecker) {
        if !checker.enter_shared(identity(Arc::as_ptr(self))) {
            return;
        }
        match self.try_read() {
            Ok(inner) => inner.check_tokens(checker),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().check_tokens(checker),
            Err(TryLockError::WouldBlock) => {}
        }
    }
}

/// Declare the token fields of a struct.
///
/// Each listed field names its JSON key and is either `token(<rule>)`, which
/// normalizes and validates it, or `nested`, which descends into it. Fields
/// that are not listed are left alone.
///
/// ```ignore
/// token_graph! {
///     Address {
///         address_line1 ("addressLine1"): token(TokenRule::TZNAKOWY512),
///         contact_infos ("contactInfos"): nested,
///     }
/// }
/// ```
#[macro_export]
macro_rules! token_graph {
    (
        $ty:ty {
            $( $field:ident ($name:literal) : $kind:ident $( ($rule:expr) )? ),* $(,)?
        }
    ) => {
        impl $crate::validation::Normalizable for $ty {
            #[allow(unused_variables)]
            fn normalize_graph(&mut self, walker: &mut $crate::validation::GraphWalker) {
                $( $crate::token_graph!(@normalize walker, self.$field, $kind $(, $rule)?); )*
            }

            #[allow(unused_variables)]
            fn check_tokens(&self, checker: &mut $crate::validation::TokenChecker) {
                $( $crate::token_graph!(@check checker, self.$field, $name, $kind $(, $rule)?); )*
            }
        }

        impl $crate::validation::TokenSchema for $ty {
            fn token_fields() -> &'static [$crate::validation::TokenField] {
                const FIELDS: &[$crate::validation::TokenField] = &[
                    $( $crate::token_graph!(@field $name, $kind $(, $rule)?) ),*
                ];
                FIELDS
            }
        }
    };

    (@normalize $walker:ident, $value:expr, token, $rule:expr) => {{
        const RULE: $crate::validation::TokenRule = $rule;
        $walker.token(&mut $value, &RULE);
    }};
    (@normalize $walker:ident, $value:expr, nested) => {
        $walker.walk(&mut $value)
    };

    (@check $checker:ident, $value:expr, $name:literal, token, $rule:expr) => {{
        const RULE: $crate::validation::TokenRule = $rule;
        $checker.token($name, $crate::validation::TokenValue::token(&$value), &RULE);
    }};
    (@check $checker:ident, $value:expr, $name:literal, nested) => {
        $checker.field($name, &$value)
    };

    (@field $name:literal, token, $rule:expr) => {
        $crate::validation::TokenField::token($name, $rule)
    };
    (@field $name:literal, nested) => {
        $crate::validation::TokenField::nested($name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_graph;

    #[derive(Debug, Default)]
    struct Contact {
        label: String,
        note: Option<String>,
        raw: String,
    }

    token_graph! {
        Contact {
            label ("label"): token(TokenRule::TZNAKOWY50),
            note ("note"): token(TokenRule::TZNAKOWY2),
        }
    }

    #[derive(Debug, Default)]
    struct Directory {
        title: String,
        contacts: Vec<Contact>,
        groups: Vec<Vec<Contact>>,
        by_key: BTreeMap<String, Contact>,
        archived: Option<Box<Contact>>,
    }

    token_graph! {
        Directory {
            title ("title"): token(TokenRule::TZNAKOWY),
            contacts ("contacts"): nested,
            groups ("groups"): nested,
            by_key ("byKey"): nested,
            archived ("archived"): nested,
        }
    }

    #[derive(Debug, Default)]
    struct Node {
        name: String,
        parent: Option<Weak<RefCell<Node>>>,
        children: Vec<Rc<RefCell<Node>>>,
        peer: Option<Rc<RefCell<Node>>>,
    }

    token_graph! {
        Node {
            name ("name"): token(TokenRule::TZNAKOWY),
            parent ("parent"): nested,
            children ("children"): nested,
            peer ("peer"): nested,
        }
    }

    struct Chain {
        label: String,
        next: Option<Box<Chain>>,
    }

    token_graph! {
        Chain {
            label ("label"): token(TokenRule::TZNAKOWY),
            next ("next"): nested,
        }
    }

    fn contact(label: &str) -> Contact {
        Contact {
            label: label.to_string(),
            note: None,
            raw: "  untouched  ".to_string(),
        }
    }

    fn node(name: &str) -> Rc<RefCell<Node>> {
        Rc::new(RefCell::new(Node {
            name: name.to_string(),
            ..Node::default()
        }))
    }

    #[test]
    fn test_tagged_fields_are_normalized_in_place() {
        let mut value = Contact {
            label: "  Jan   Kowalski ".to_string(),
            note: Some("\tsee \n attached ".to_string()),
            raw: "  keep   me ".to_string(),
        };

        let stats = normalize_graph(&mut value);

        assert_eq!(value.label, "Jan Kowalski");
        assert_eq!(value.note.as_deref(), Some("see attached"));
        assert_eq!(value.raw, "  keep   me ");
        assert_eq!(stats.tokens_normalized, 2);
        assert_eq!(stats.tokens_changed, 2);
    }

    #[test]
    fn test_absent_tagged_field_stays_absent() {
        let mut value = contact("name");
        let stats = normalize_graph(&mut value);

        assert!(value.note.is_none());
        assert_eq!(stats.tokens_normalized, 1);
        assert_eq!(stats.tokens_changed, 0);
    }

    #[test]
    fn test_none_root_is_noop() {
        let mut root: Option<Contact> = None;
        assert_eq!(normalize_graph(&mut root), WalkStats::default());
    }

    #[test]
    fn test_collection_elements_normalized_independently() {
        let mut contacts = vec![contact(" a  1 "), contact("b   2"), contact("\nc 3\t")];

        normalize_graph(&mut contacts);

        let labels: Vec<&str> = contacts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["a 1", "b 2", "c 3"]);
        assert!(contacts.iter().all(|c| c.raw == "  untouched  "));
    }

    #[test]
    fn test_nested_collections_are_unwound() {
        let mut directory = Directory {
            title: "  Main  book ".to_string(),
            groups: vec![
                vec![contact(" x "), contact(" y  z ")],
                vec![],
                vec![contact("  w")],
            ],
            ..Directory::default()
        };
        directory
            .by_key
            .insert("first".to_string(), contact(" keyed   entry "));
        directory.archived = Some(Box::new(contact(" old   one ")));

        let stats = normalize_graph(&mut directory);

        assert_eq!(directory.title, "Main book");
        assert_eq!(directory.groups[0][0].label, "x");
        assert_eq!(directory.groups[0][1].label, "y z");
        assert_eq!(directory.groups[2][0].label, "w");
        assert_eq!(directory.by_key["first"].label, "keyed entry");
        assert_eq!(directory.archived.as_ref().unwrap().label, "old one");
        assert_eq!(stats.tokens_changed, 6);
        assert_eq!(stats.shared_nodes, 0);
    }

    #[test]
    fn test_self_referential_graph_terminates() {
        let root = node("  root  ");
        let child = node(" child   one ");
        child.borrow_mut().parent = Some(Rc::downgrade(&root));
        child.borrow_mut().peer = Some(Rc::clone(&root));
        root.borrow_mut().children.push(Rc::clone(&child));
        root.borrow_mut().peer = Some(Rc::clone(&root));

        let mut graph = Rc::clone(&root);
        let stats = normalize_graph(&mut graph);

        assert_eq!(root.borrow().name, "root");
        assert_eq!(child.borrow().name, "child one");
        assert_eq!(stats.shared_nodes, 2);
        assert_eq!(stats.tokens_normalized, 2);
        // root.peer, child.parent and child.peer all lead back to a visited node
        assert_eq!(stats.cycles_skipped, 3);

        // break the cycle so the test does not leak
        root.borrow_mut().children.clear();
        root.borrow_mut().peer = None;
    }

    #[test]
    fn test_shared_node_reached_twice_is_visited_once() {
        let shared = node(" shared ");
        let mut roots = vec![Rc::clone(&shared), Rc::clone(&shared)];

        let stats = normalize_graph(&mut roots);

        assert_eq!(shared.borrow().name, "shared");
        assert_eq!(stats.shared_nodes, 1);
        assert_eq!(stats.cycles_skipped, 1);
        assert_eq!(stats.tokens_normalized, 1);
    }

    #[test]
    fn test_arc_mutex_nodes() {
        #[derive(Default)]
        struct Team {
            name: String,
            members: Vec<Arc<Mutex<Team>>>,
        }

        token_graph! {
            Team {
                name ("name"): token(TokenRule::TZNAKOWY),
                members ("members"): nested,
            }
        }

        let lead = Arc::new(Mutex::new(Team {
            name: " lead  team ".to_string(),
            members: vec![],
        }));
        let mut root = vec![Arc::clone(&lead), Arc::clone(&lead)];

        let stats = normalize_graph(&mut root);

        assert_eq!(lead.lock().unwrap().name, "lead team");
        assert_eq!(stats.cycles_skipped, 1);
    }

    #[test]
    fn test_depth_limit_skips_deep_subtrees() {
        let mut chain = Chain {
            label: " 0 ".to_string(),
            next: None,
        };
        for i in 1..10 {
            chain = Chain {
                label: format!(" {i} "),
                next: Some(Box::new(chain)),
            };
        }

        let mut walker = GraphWalker::with_max_depth(4);
        walker.walk(&mut chain);
        let stats = walker.stats();

        assert_eq!(chain.label, "9");
        assert!(stats.depth_limited > 0);
        assert!(stats.tokens_normalized < 10);

        let full = normalize_graph(&mut chain);
        assert_eq!(full.depth_limited, 0);
        assert_eq!(full.tokens_normalized, 10);
    }

    #[test]
    fn test_normalization_is_idempotent_on_graph() {
        let mut contacts = vec![contact("  a   b "), contact("c")];
        normalize_graph(&mut contacts);
        let second = normalize_graph(&mut contacts);

        assert_eq!(second.tokens_normalized, 2);
        assert_eq!(second.tokens_changed, 0);
    }

    #[test]
    fn test_schema_table() {
        let fields = Directory::token_fields();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], TokenField::token("title", TokenRule::TZNAKOWY));
        assert_eq!(fields[1], TokenField::nested("contacts"));

        assert_eq!(Contact::rule_for("label"), Some(TokenRule::TZNAKOWY50));
        assert_eq!(Contact::rule_for("raw"), None);
        assert_eq!(Directory::rule_for("contacts"), None);
    }
}
