//! Element storage for property names.
//!
//! A parsed name keeps its original text plus an arena of element spans.
//! Slicing operations (`chop`, `sub_elements`) share both and only move the
//! window. Operations that rewrite content (appending foreign elements,
//! element mappers used by lenient adaptation) record a per-index override
//! instead of touching the arena.

use std::sync::Arc;

// ============================================================================
// Element kinds
// ============================================================================

/// Classification of a single name element, decided while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Logically empty (no valid characters). Never stored in a name.
    Empty,
    /// `a-z`, `0-9`, no dashes.
    Uniform,
    /// Uniform apart from at least one interior dash.
    Dashed,
    /// Contains characters that need converting (upper case, `_`, ...).
    NonUniform,
    /// Bracketed index with arbitrary content.
    Indexed,
    /// Bracketed index made only of ASCII digits.
    NumericallyIndexed,
}

impl ElementKind {
    pub fn is_indexed(self) -> bool {
        matches!(self, ElementKind::Indexed | ElementKind::NumericallyIndexed)
    }

    pub(crate) fn allows_fast_equality(self) -> bool {
        matches!(self, ElementKind::Uniform | ElementKind::NumericallyIndexed)
    }

    pub(crate) fn allows_dash_ignoring_equality(self) -> bool {
        self.allows_fast_equality() || self == ElementKind::Dashed
    }
}

// ============================================================================
// Arena entries
// ============================================================================

/// Byte range of one element inside the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: ElementKind,
}

/// Replacement content for one element position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub text: Arc<str>,
    pub kind: ElementKind,
}

// ============================================================================
// Elements
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Elements {
    source: Arc<str>,
    spans: Arc<[Span]>,
    offset: usize,
    len: usize,
    /// One slot per element in the window, `None` meaning "read the arena".
    resolved: Option<Arc<[Option<Resolved>]>>,
}

impl Elements {
    pub fn empty() -> Self {
        Self {
            source: Arc::from(""),
            spans: Arc::from(Vec::new()),
            offset: 0,
            len: 0,
            resolved: None,
        }
    }

    pub fn new(source: Arc<str>, spans: Vec<Span>, resolved: Option<Vec<Option<Resolved>>>) -> Self {
        let len = spans.len();
        Self {
            source,
            spans: Arc::from(spans),
            offset: 0,
            len,
            resolved: resolved.map(Arc::from),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn resolved_at(&self, index: usize) -> Option<&Resolved> {
        self.resolved.as_ref().and_then(|r| r[index].as_ref())
    }

    /// Text of the element at `index`, as stored (no form conversion).
    pub fn text(&self, index: usize) -> &str {
        match self.resolved_at(index) {
            Some(resolved) => &resolved.text,
            None => {
                let span = self.spans[self.offset + index];
                &self.source[span.start..span.end]
            }
        }
    }

    /// Byte offset of the element in the source text, unless overridden.
    pub fn source_start(&self, index: usize) -> Option<usize> {
        match self.resolved_at(index) {
            Some(_) => None,
            None => Some(self.spans[self.offset + index].start),
        }
    }

    pub fn kind(&self, index: usize) -> ElementKind {
        match self.resolved_at(index) {
            Some(resolved) => resolved.kind,
            None => self.spans[self.offset + index].kind,
        }
    }

    /// Appends `additional`, recording every new element as an override.
    pub fn append(&self, additional: &Elements) -> Self {
        let len = self.len + additional.len;
        let mut resolved = self.resolved_vec(self.len);
        resolved.extend((0..additional.len).map(|i| {
            Some(Resolved {
                text: Arc::from(additional.text(i)),
                kind: additional.kind(i),
            })
        }));
        Self {
            source: Arc::clone(&self.source),
            spans: Arc::clone(&self.spans),
            offset: self.offset,
            len,
            resolved: Some(Arc::from(resolved)),
        }
    }

    /// Keeps the first `len` elements.
    pub fn chop(&self, len: usize) -> Self {
        let resolved = self
            .resolved
            .as_ref()
            .map(|r| r[..len].to_vec())
            .filter(|r| r.iter().any(Option::is_some));
        Self {
            source: Arc::clone(&self.source),
            spans: Arc::clone(&self.spans),
            offset: self.offset,
            len,
            resolved: resolved.map(Arc::from),
        }
    }

    /// Drops the first `offset` elements.
    pub fn sub_elements(&self, offset: usize) -> Self {
        let resolved = self
            .resolved
            .as_ref()
            .map(|r| r[offset..].to_vec())
            .filter(|r| r.iter().any(Option::is_some));
        Self {
            source: Arc::clone(&self.source),
            spans: Arc::clone(&self.spans),
            offset: self.offset + offset,
            len: self.len - offset,
            resolved: resolved.map(Arc::from),
        }
    }

    fn resolved_vec(&self, len: usize) -> Vec<Option<Resolved>> {
        match &self.resolved {
            Some(existing) => existing[..len].to_vec(),
            None => vec![None; len],
        }
    }

    /// Returns the dotted source text covering the whole window when it can
    /// stand in for the name itself: no overrides, every element of an
    /// accepted kind, and elements separated by exactly one `.`.
    pub fn source_shortcut(&self, accept: impl Fn(ElementKind) -> bool) -> Option<&str> {
        if self.resolved.is_some() {
            return None;
        }
        if self.len == 0 {
            return Some("");
        }
        let window = &self.spans[self.offset..self.offset + self.len];
        let bytes = self.source.as_bytes();
        for (i, span) in window.iter().enumerate() {
            if !accept(span.kind) {
                return None;
            }
            if i > 0 {
                let previous = window[i - 1];
                if previous.end + 1 != span.start || bytes[previous.end] != b'.' {
                    return None;
                }
            }
        }
        Some(&self.source[window[0].start..window[self.len - 1].end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dotted(source: &str) -> Elements {
        let mut spans = Vec::new();
        let mut start = 0;
        for part in source.split('.') {
            spans.push(Span { start, end: start + part.len(), kind: ElementKind::Uniform });
            start += part.len() + 1;
        }
        Elements::new(Arc::from(source), spans, None)
    }

    #[test]
    fn test_chop_keeps_shortcut() {
        let elements = dotted("foo.bar.baz").chop(2);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements.source_shortcut(|k| k == ElementKind::Uniform), Some("foo.bar"));
    }

    #[test]
    fn test_sub_elements_shifts_window() {
        let elements = dotted("foo.bar.baz").sub_elements(1);
        assert_eq!(elements.text(0), "bar");
        assert_eq!(elements.source_shortcut(|_| true), Some("bar.baz"));
    }

    #[test]
    fn test_append_disables_shortcut() {
        let elements = dotted("foo").append(&dotted("bar"));
        assert_eq!(elements.text(1), "bar");
        assert_eq!(elements.source_shortcut(|_| true), None);
        // chopping the foreign element off restores the plain arena view
        assert_eq!(elements.chop(1).source_shortcut(|_| true), Some("foo"));
    }
}
