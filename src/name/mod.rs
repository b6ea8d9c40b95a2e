//! # Property Names
//!
//! A property name is a sequence of elements separated by dots, with
//! bracketed indexes for collection positions and map keys:
//!
//! - `spring.main.banner-mode`
//! - `server.hosts[0].name`
//! - `log[org.Foo].level`
//!
//! Canonical (strict) names use `a-z`, `0-9` and interior `-`. The dash is
//! purely cosmetic: `foo-bar` and `foobar` are the same name. Names adapted
//! from loosely formatted sources (`FOO_BAR`, `fooBar`) compare equal to
//! their canonical form as well. Index content is kept verbatim and compared
//! case-sensitively.
//!
//! Every non-indexed element can be rendered in three [`Form`]s; indexed
//! elements render the same in all of them.

mod elements;
mod parser;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, LazyLock, OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use elements::ElementKind;
use elements::Elements;
use parser::{ElementsParser, Scanned, is_alpha_numeric, is_valid_char};

// ============================================================================
// Forms
// ============================================================================

/// Rendering of a non-indexed element.
///
/// | Input | `Original` | `Dashed` | `Uniform` |
/// |-------|------------|----------|-----------|
/// | `foo-bar` | `foo-bar` | `foo-bar` | `foobar` |
/// | `fooBar` | `fooBar` | `foobar` | `foobar` |
/// | `foo_bar` | `foo_bar` | `foobar` | `foobar` |
/// | `[Foo.bar]` | `Foo.bar` | `Foo.bar` | `Foo.bar` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Original,
    Dashed,
    Uniform,
}

// ============================================================================
// Errors
// ============================================================================

/// A name failed strict parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Configuration property name '{name}' is not valid: invalid characters {invalid_chars:?} at position {position} \
     (canonical names are lowercase alphanumeric, '-' separated, and start with a letter or digit)"
)]
pub struct InvalidNameError {
    pub name: String,
    pub invalid_chars: Vec<char>,
    /// Byte offset of the first offending character.
    pub position: usize,
}

impl InvalidNameError {
    fn new(name: &str, invalid_chars: Vec<char>, position: usize) -> Self {
        Self { name: name.to_owned(), invalid_chars, position }
    }
}

// ============================================================================
// PropertyName
// ============================================================================

/// Immutable hierarchical configuration property name.
///
/// Cloning is cheap; derived names (`parent`, `chop`, `sub_name`) share the
/// original text. Hash code, string form and uniform element forms are
/// computed once on first use.
#[derive(Clone)]
pub struct PropertyName(Arc<NameInner>);

struct NameInner {
    elements: Elements,
    uniform: Box<[OnceLock<Box<str>>]>,
    string: OnceLock<String>,
    hash: OnceLock<u32>,
}

static EMPTY: LazyLock<PropertyName> = LazyLock::new(|| PropertyName::from_elements(Elements::empty()));

impl PropertyName {
    fn from_elements(elements: Elements) -> Self {
        let uniform = (0..elements.len()).map(|_| OnceLock::new()).collect();
        Self(Arc::new(NameInner {
            elements,
            uniform,
            string: OnceLock::new(),
            hash: OnceLock::new(),
        }))
    }

    /// The empty (root) name.
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    fn elements(&self) -> &Elements {
        &self.0.elements
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Strictly parse a canonical name.
    ///
    /// Rejects upper case, `_`, leading or trailing separators and unclosed
    /// brackets. The empty string is the empty name.
    pub fn parse(name: &str) -> Result<Self, InvalidNameError> {
        if name.is_empty() {
            return Ok(Self::empty());
        }
        if name.starts_with('.') {
            return Err(InvalidNameError::new(name, vec!['.'], 0));
        }
        if name.ends_with('.') {
            return Err(InvalidNameError::new(name, vec!['.'], name.len() - 1));
        }
        let scanned = scan(name, '.');
        if let Some(position) = scanned.unclosed_bracket {
            return Err(InvalidNameError::new(name, vec!['['], position));
        }
        if let Some(span) = scanned.dropped.first() {
            let chars = name[span.start..span.end].chars().collect();
            return Err(InvalidNameError::new(name, chars, span.start));
        }
        let elements = scanned.elements;
        for i in 0..elements.len() {
            if elements.kind(i) == ElementKind::NonUniform {
                return Err(invalid_element(name, &elements, i));
            }
        }
        Ok(Self::from_elements(elements))
    }

    /// Parse in "return-invalid-as-none" mode.
    pub fn parse_or_none(name: &str) -> Option<Self> {
        Self::parse(name).ok()
    }

    /// Whether `name` would be accepted by [`PropertyName::parse`].
    pub fn is_valid(name: &str) -> bool {
        Self::parse(name).is_ok()
    }

    /// Leniently adapt a name from a loosely formatted source.
    ///
    /// Elements are split on `separator`; mixed case and `_` are kept in the
    /// original form and ignored for equality, other invalid characters are
    /// stripped from the dashed and uniform forms.
    pub fn adapt(name: &str, separator: char) -> Self {
        if name.is_empty() {
            return Self::empty();
        }
        let elements = scan(name, separator).elements;
        if elements.len() == 0 {
            return Self::empty();
        }
        Self::from_elements(elements)
    }

    /// Like [`PropertyName::adapt`], passing each raw element through
    /// `mapper` first. The mapped text must form exactly one element.
    pub fn adapt_with(
        name: &str,
        separator: char,
        mut mapper: impl FnMut(&str) -> String,
    ) -> Result<Self, InvalidNameError> {
        if name.is_empty() {
            return Ok(Self::empty());
        }
        let scanned = ElementsParser::new(name, separator).parse(Some(&mut mapper));
        if let Some(err) = scanned.mapper_error {
            return Err(InvalidNameError::new(name, err.mapped.chars().collect(), err.start));
        }
        if scanned.elements.len() == 0 {
            return Ok(Self::empty());
        }
        Ok(Self::from_elements(scanned.elements))
    }

    // ------------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------------

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_indexed(&self, index: usize) -> bool {
        self.elements().kind(index).is_indexed()
    }

    pub fn is_numeric_index(&self, index: usize) -> bool {
        self.elements().kind(index) == ElementKind::NumericallyIndexed
    }

    pub fn is_last_element_indexed(&self) -> bool {
        let len = self.len();
        len > 0 && self.is_indexed(len - 1)
    }

    pub fn has_indexed_element(&self) -> bool {
        (0..self.len()).any(|i| self.is_indexed(i))
    }

    pub fn element_kind(&self, index: usize) -> ElementKind {
        self.elements().kind(index)
    }

    /// The element at `index` in the requested form.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn element(&self, index: usize, form: Form) -> Cow<'_, str> {
        let elements = self.elements();
        let text = elements.text(index);
        let kind = elements.kind(index);
        if kind.is_indexed() {
            return Cow::Borrowed(text);
        }
        match form {
            Form::Original if kind != ElementKind::NonUniform => Cow::Borrowed(text),
            Form::Original => Cow::Owned(convert_to_original(text)),
            Form::Dashed if matches!(kind, ElementKind::Uniform | ElementKind::Dashed) => Cow::Borrowed(text),
            Form::Dashed => Cow::Owned(convert_to_dashed(text)),
            Form::Uniform if kind == ElementKind::Uniform => Cow::Borrowed(text),
            Form::Uniform => {
                let cached = self.0.uniform[index].get_or_init(|| uniform_chars(text).collect::<String>().into());
                Cow::Borrowed(&**cached)
            }
        }
    }

    /// The last element in the requested form, or `""` for the empty name.
    pub fn last_element(&self, form: Form) -> Cow<'_, str> {
        match self.len() {
            0 => Cow::Borrowed(""),
            len => self.element(len - 1, form),
        }
    }

    // ------------------------------------------------------------------------
    // Derived names
    // ------------------------------------------------------------------------

    /// Append strictly parsed `suffix` elements. An empty suffix returns
    /// this name unchanged.
    pub fn append(&self, suffix: &str) -> Result<Self, InvalidNameError> {
        if suffix.is_empty() {
            return Ok(self.clone());
        }
        let suffix = Self::parse(suffix)?;
        Ok(self.append_name(&suffix))
    }

    /// Append all elements of `suffix`.
    pub fn append_name(&self, suffix: &PropertyName) -> Self {
        if suffix.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return suffix.clone();
        }
        Self::from_elements(self.elements().append(suffix.elements()))
    }

    /// Append a single index element, e.g. `name[0]` or `name[key]`.
    ///
    /// The key is kept verbatim, even when it contains brackets or dots.
    pub fn append_index(&self, key: &str) -> Self {
        let kind = if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            ElementKind::NumericallyIndexed
        } else {
            ElementKind::Indexed
        };
        let span = elements::Span { start: 0, end: key.len(), kind };
        let index = Elements::new(Arc::from(key), vec![span], None);
        Self::from_elements(self.elements().append(&index))
    }

    /// The parent name, or the empty name for names of one element or less.
    pub fn parent(&self) -> Self {
        match self.len() {
            0 | 1 => Self::empty(),
            len => self.chop(len - 1),
        }
    }

    /// Keep only the first `len` elements.
    pub fn chop(&self, len: usize) -> Self {
        if len >= self.len() {
            return self.clone();
        }
        if len == 0 {
            return Self::empty();
        }
        Self::from_elements(self.elements().chop(len))
    }

    /// Drop the first `offset` elements: `foo.bar.baz` → `sub_name(1)` →
    /// `bar.baz`.
    ///
    /// # Panics
    ///
    /// Panics if `offset > self.len()`.
    pub fn sub_name(&self, offset: usize) -> Self {
        let len = self.len();
        assert!(offset <= len, "offset {offset} out of bounds for name with {len} elements");
        match offset {
            0 => self.clone(),
            o if o == len => Self::empty(),
            o => Self::from_elements(self.elements().sub_elements(o)),
        }
    }

    /// Whether this name is the immediate parent of `name`.
    pub fn is_parent_of(&self, name: &PropertyName) -> bool {
        self.len() + 1 == name.len() && self.is_ancestor_of(name)
    }

    /// Whether this name is a (possibly indirect) ancestor of `name`.
    pub fn is_ancestor_of(&self, name: &PropertyName) -> bool {
        self.len() < name.len() && self.leading_elements_equal(name)
    }

    fn leading_elements_equal(&self, other: &PropertyName) -> bool {
        let (e1, e2) = (self.elements(), other.elements());
        (0..e1.len()).rev().all(|i| element_equals(e1, e2, i))
    }

    fn build_string(&self) -> String {
        let elements = self.elements();
        if let Some(text) = elements.source_shortcut(|k| matches!(k, ElementKind::Uniform | ElementKind::Dashed)) {
            return text.to_owned();
        }
        let mut result = String::with_capacity(self.len() * 8);
        for i in 0..self.len() {
            if self.is_indexed(i) {
                result.push('[');
                result.push_str(&self.element(i, Form::Original));
                result.push(']');
            } else {
                if !result.is_empty() {
                    result.push('.');
                }
                result.push_str(&self.element(i, Form::Dashed));
            }
        }
        result
    }

    /// The dashed string form (cached).
    pub fn as_str(&self) -> &str {
        self.0.string.get_or_init(|| self.build_string())
    }
}

fn scan(name: &str, separator: char) -> Scanned {
    ElementsParser::new(name, separator).parse(None)
}

fn invalid_element(name: &str, elements: &Elements, index: usize) -> InvalidNameError {
    let text = elements.text(index);
    let offset = elements.source_start(index).unwrap_or(0);
    let mut position = None;
    let mut invalid = Vec::new();
    for (i, ch) in text.char_indices() {
        if !is_valid_char(ch, i) {
            position.get_or_insert(offset + i);
            invalid.push(ch);
        }
    }
    InvalidNameError::new(name, invalid, position.unwrap_or(offset))
}

// ============================================================================
// Element conversion
// ============================================================================

fn uniform_char(ch: char) -> Option<char> {
    let lower = ch.to_ascii_lowercase();
    is_alpha_numeric(lower).then_some(lower)
}

fn uniform_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter_map(uniform_char)
}

/// Lowercase alphanumeric rendering of arbitrary text, as used for
/// element equality.
pub(crate) fn uniform_form(text: &str) -> String {
    uniform_chars(text).collect()
}

fn convert_to_original(text: &str) -> String {
    text.char_indices()
        .filter(|&(i, ch)| ch == '_' || is_valid_char(ch.to_ascii_lowercase(), i))
        .map(|(_, ch)| ch)
        .collect()
}

fn convert_to_dashed(text: &str) -> String {
    text.char_indices()
        .map(|(i, ch)| (i, ch.to_ascii_lowercase()))
        .filter(|&(i, ch)| is_valid_char(ch, i))
        .map(|(_, ch)| ch)
        .collect()
}

/// Convert an identifier such as `maxRetries` or `max_retries` into the
/// dashed form `max-retries`. Bracketed sections are copied verbatim.
pub fn to_dashed_form(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut in_index = false;
    for ch in name.chars() {
        if in_index {
            result.push(ch);
            in_index = ch != ']';
            continue;
        }
        if ch == '[' {
            in_index = true;
            result.push(ch);
            continue;
        }
        let ch = if ch == '_' { '-' } else { ch };
        if ch.is_uppercase() && !result.is_empty() && !result.ends_with('-') {
            result.push('-');
        }
        result.extend(ch.to_lowercase());
    }
    result
}

// ============================================================================
// Equality
// ============================================================================

fn element_equals(e1: &Elements, e2: &Elements, i: usize) -> bool {
    let (k1, k2) = (e1.kind(i), e2.kind(i));
    if k1.is_indexed() != k2.is_indexed() {
        return false;
    }
    let (t1, t2) = (e1.text(i), e2.text(i));
    if k1.is_indexed() || (k1.allows_fast_equality() && k2.allows_fast_equality()) {
        return t1 == t2;
    }
    if k1.allows_dash_ignoring_equality() && k2.allows_dash_ignoring_equality() {
        return dash_ignoring_equals(t1, t2);
    }
    uniform_chars(t1).eq(uniform_chars(t2))
}

fn dash_ignoring_equals(t1: &str, t2: &str) -> bool {
    t1.bytes().filter(|&b| b != b'-').eq(t2.bytes().filter(|&b| b != b'-'))
}

impl PartialEq for PropertyName {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        let uniform_only = |k: ElementKind| k == ElementKind::Uniform;
        if let (Some(a), Some(b)) = (
            self.elements().source_shortcut(uniform_only),
            other.elements().source_shortcut(uniform_only),
        ) {
            return a == b;
        }
        let (e1, e2) = (self.elements(), other.elements());
        (0..e1.len()).rev().all(|i| element_equals(e1, e2, i))
    }
}

impl Eq for PropertyName {}

impl Hash for PropertyName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_code());
    }
}

impl PropertyName {
    /// Positional hash over the uniform characters of every element.
    pub fn hash_code(&self) -> u32 {
        *self.0.hash.get_or_init(|| {
            let elements = self.elements();
            (0..elements.len()).fold(0u32, |hash, i| {
                let text = elements.text(i);
                let element_hash = if elements.kind(i).is_indexed() {
                    text.chars()
                        .filter(|&c| is_alpha_numeric(c))
                        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
                } else {
                    uniform_chars(text).fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32))
                };
                hash.wrapping_mul(31).wrapping_add(element_hash)
            })
        })
    }
}

// ============================================================================
// Ordering
// ============================================================================

impl Ord for PropertyName {
    fn cmp(&self, other: &Self) -> Ordering {
        let (e1, e2) = (self.elements(), other.elements());
        let shared = e1.len().min(e2.len());
        for i in 0..shared {
            let result = compare_element(e1.kind(i), e1.text(i), e2.kind(i), e2.text(i));
            if result != Ordering::Equal {
                return result;
            }
        }
        e1.len().cmp(&e2.len())
    }
}

impl PartialOrd for PropertyName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_element(k1: ElementKind, t1: &str, k2: ElementKind, t2: &str) -> Ordering {
    use ElementKind::NumericallyIndexed as Numeric;
    // indexed before named, numeric indexes before generic ones
    k2.is_indexed()
        .cmp(&k1.is_indexed())
        .then_with(|| (k2 == Numeric).cmp(&(k1 == Numeric)))
        .then_with(|| match (k1, k2) {
            (Numeric, Numeric) => compare_numeric(t1, t2),
            _ if k1.is_indexed() => t1.cmp(t2),
            _ => uniform_chars(t1).cmp(uniform_chars(t2)),
        })
}

fn compare_numeric(t1: &str, t2: &str) -> Ordering {
    let d1 = t1.trim_start_matches('0');
    let d2 = t2.trim_start_matches('0');
    d1.len()
        .cmp(&d2.len())
        .then_with(|| d1.cmp(d2))
        .then_with(|| t1.cmp(t2))
}

// ============================================================================
// Display / conversions
// ============================================================================

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyName({:?})", self.as_str())
    }
}

impl FromStr for PropertyName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for PropertyName {
    type Error = InvalidNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for PropertyName {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<&PropertyName> for PropertyName {
    fn from(value: &PropertyName) -> Self {
        value.clone()
    }
}

impl Serialize for PropertyName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
