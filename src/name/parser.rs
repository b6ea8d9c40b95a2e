//! Single-pass scanner turning name text into element spans.
//!
//! Tracks bracket depth: a `[` at depth 0 closes the running dotted element
//! and opens an index, the matching `]` closes it. Each element is classified
//! while it is scanned, so no second pass is needed to decide whether it is
//! already in uniform form.

use std::sync::Arc;

use smallvec::SmallVec;

use super::elements::{ElementKind, Elements, Resolved, Span};

const DEFAULT_CAPACITY: usize = 6;

/// Mapper applied to each raw element during lenient adaptation.
pub(crate) type ElementMapper<'m> = &'m mut dyn FnMut(&str) -> String;

/// Scanner output plus the diagnostics strict parsing needs.
#[derive(Debug)]
pub(crate) struct Scanned {
    pub elements: Elements,
    /// Byte position of a `[` that was never closed.
    pub unclosed_bracket: Option<usize>,
    /// Non-empty runs dropped because they held no valid character.
    pub dropped: SmallVec<[Span; 2]>,
    /// Set when an element mapper produced anything but a single element.
    pub mapper_error: Option<MapperError>,
}

pub(crate) struct ElementsParser<'s> {
    source: &'s str,
    separator: char,
    spans: SmallVec<[Span; DEFAULT_CAPACITY]>,
    resolved: Option<Vec<Option<Resolved>>>,
    dropped: SmallVec<[Span; 2]>,
    mapper_error: Option<MapperError>,
}

impl<'s> ElementsParser<'s> {
    pub fn new(source: &'s str, separator: char) -> Self {
        Self {
            source,
            separator,
            spans: SmallVec::new(),
            resolved: None,
            dropped: SmallVec::new(),
            mapper_error: None,
        }
    }

    pub fn parse(mut self, mut mapper: Option<ElementMapper<'_>>) -> Scanned {
        let mut depth: usize = 0;
        let mut start = 0;
        let mut kind = ElementKind::Empty;
        let mut unclosed_at = None;

        for (pos, ch) in self.source.char_indices() {
            match ch {
                '[' => {
                    if depth == 0 {
                        self.add(start, pos, kind, mapper.as_deref_mut());
                        start = pos + 1;
                        kind = ElementKind::NumericallyIndexed;
                        unclosed_at = Some(pos);
                    } else {
                        kind = ElementKind::Indexed;
                    }
                    depth += 1;
                }
                ']' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        self.add(start, pos, kind, mapper.as_deref_mut());
                        start = pos + 1;
                        kind = ElementKind::Empty;
                        unclosed_at = None;
                    } else {
                        kind = ElementKind::Indexed;
                    }
                }
                ']' => {
                    // stray close bracket outside any index
                    kind = ElementKind::NonUniform;
                }
                c if c == self.separator && !kind.is_indexed() => {
                    self.add(start, pos, kind, mapper.as_deref_mut());
                    start = pos + c.len_utf8();
                    kind = ElementKind::Empty;
                }
                c => kind = update_kind(kind, c, pos - start),
            }
        }

        let unclosed_bracket = if depth != 0 {
            kind = ElementKind::NonUniform;
            unclosed_at
        } else {
            None
        };
        self.add(start, self.source.len(), kind, mapper.as_deref_mut());

        let source: Arc<str> = Arc::from(self.source);
        Scanned {
            elements: Elements::new(source, self.spans.into_vec(), self.resolved),
            unclosed_bracket,
            dropped: self.dropped,
            mapper_error: self.mapper_error,
        }
    }

    fn add<'m>(
        &mut self,
        start: usize,
        end: usize,
        kind: ElementKind,
        mapper: Option<&mut (dyn FnMut(&str) -> String + 'm)>,
    ) {
        if end <= start {
            return;
        }
        if kind == ElementKind::Empty {
            self.dropped.push(Span { start, end, kind });
            return;
        }
        let mut kind = kind;
        if let Some(mapper) = mapper {
            let raw = &self.source[start..end];
            let mapped = mapper(raw);
            let single = ElementsParser::new(&mapped, '.').parse(None).elements;
            if single.len() != 1 {
                self.mapper_error.get_or_insert(MapperError { start, mapped, count: single.len() });
                return;
            }
            kind = single.kind(0);
            let slot = Some(Resolved { text: Arc::from(single.text(0)), kind });
            let resolved = self.resolved.get_or_insert_with(|| vec![None; self.spans.len()]);
            resolved.push(slot);
        } else if let Some(resolved) = self.resolved.as_mut() {
            resolved.push(None);
        }
        self.spans.push(Span { start, end, kind });
    }
}

/// A lenient element mapper produced something other than one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MapperError {
    /// Byte offset of the raw element in the source.
    pub start: usize,
    pub mapped: String,
    pub count: usize,
}

fn update_kind(existing: ElementKind, ch: char, index: usize) -> ElementKind {
    if existing.is_indexed() {
        if existing == ElementKind::NumericallyIndexed && !ch.is_ascii_digit() {
            return ElementKind::Indexed;
        }
        return existing;
    }
    if existing == ElementKind::Empty && is_valid_char(ch, index) {
        return if index == 0 { ElementKind::Uniform } else { ElementKind::NonUniform };
    }
    if existing == ElementKind::Uniform && ch == '-' {
        return ElementKind::Dashed;
    }
    if !is_valid_char(ch, index) {
        if existing == ElementKind::Empty && !is_valid_char(ch.to_ascii_lowercase(), index) {
            return ElementKind::Empty;
        }
        return ElementKind::NonUniform;
    }
    existing
}

/// `a-z`, `0-9`, and `-` anywhere but the first position.
pub(crate) fn is_valid_char(ch: char, index: usize) -> bool {
    is_alpha_numeric(ch) || (index != 0 && ch == '-')
}

pub(crate) fn is_alpha_numeric(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<ElementKind> {
        let scanned = ElementsParser::new(source, '.').parse(None);
        (0..scanned.elements.len()).map(|i| scanned.elements.kind(i)).collect()
    }

    fn texts(source: &str, separator: char) -> Vec<String> {
        let scanned = ElementsParser::new(source, separator).parse(None);
        (0..scanned.elements.len()).map(|i| scanned.elements.text(i).to_owned()).collect()
    }

    #[test]
    fn test_classifies_elements() {
        assert_eq!(
            kinds("foo.foo-bar.fooBar[0][key]"),
            vec![
                ElementKind::Uniform,
                ElementKind::Dashed,
                ElementKind::NonUniform,
                ElementKind::NumericallyIndexed,
                ElementKind::Indexed,
            ]
        );
    }

    #[test]
    fn test_consecutive_separators_collapse() {
        assert_eq!(texts("foo..bar", '.'), vec!["foo", "bar"]);
    }

    #[test]
    fn test_index_content_is_verbatim() {
        assert_eq!(texts("log[org.Foo].level", '.'), vec!["log", "org.Foo", "level"]);
        assert_eq!(texts("a[b[c]]", '.'), vec!["a", "b[c]"]);
    }

    #[test]
    fn test_nested_brackets_are_not_numeric() {
        assert_eq!(kinds("a[[1]]"), vec![ElementKind::Uniform, ElementKind::Indexed]);
        assert_eq!(kinds("a[1[2]]"), vec![ElementKind::Uniform, ElementKind::Indexed]);
        assert_eq!(texts("a[[1]]", '.'), vec!["a", "[1]"]);
    }

    #[test]
    fn test_mapper_applies_to_every_element() {
        let mut calls = 0;
        let mut lower = |raw: &str| {
            calls += 1;
            raw.to_ascii_lowercase()
        };
        let scanned = ElementsParser::new("Foo.Bar.Baz", '.').parse(Some(&mut lower));
        assert_eq!(scanned.elements.len(), 3);
        assert!(scanned.mapper_error.is_none());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_custom_separator() {
        assert_eq!(texts("SERVER_PORT", '_'), vec!["SERVER", "PORT"]);
    }

    #[test]
    fn test_unclosed_bracket_is_reported() {
        let scanned = ElementsParser::new("foo[bar", '.').parse(None);
        assert_eq!(scanned.unclosed_bracket, Some(3));
        assert_eq!(scanned.elements.kind(1), ElementKind::NonUniform);
    }

    #[test]
    fn test_leading_dash_is_not_uniform() {
        assert_eq!(kinds("-foo"), vec![ElementKind::NonUniform]);
    }

    #[test]
    fn test_mapper_rewrites_elements() {
        let mut upper_to_lower = |raw: &str| raw.to_lowercase();
        let scanned = ElementsParser::new("MY_APP", '_')
            .parse(Some(&mut upper_to_lower));
        assert_eq!(scanned.elements.text(0), "my");
        assert_eq!(scanned.elements.kind(0), ElementKind::Uniform);
        assert_eq!(scanned.elements.text(1), "app");
    }

    #[test]
    fn test_mapper_must_yield_single_element() {
        let mut split = |_: &str| "a.b".to_owned();
        let scanned = ElementsParser::new("x", '.').parse(Some(&mut split));
        let err = scanned.mapper_error.unwrap();
        assert_eq!(err.count, 2);
        assert_eq!(err.start, 0);
    }
}
