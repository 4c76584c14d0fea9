//! Topic selectors and matching
//!
//! Topics are URIs: `https://example.com/books/1`
//!
//! A selector is one of:
//! - `*` : matches every topic
//! - a URI template (contains `{`): `https://example.com/books/{id}`
//! - anything else: exact string match
//!
//! Template variables follow URI-template expansion semantics: a topic matches
//! when some set of variable bindings expands to exactly that topic string.
//! `{var}` consumes one or more characters excluding `/`; `{+var}` consumes
//! one or more of any character.
//!
//! Selectors fail closed: the empty pattern and malformed templates never
//! match anything, so a broken pattern cannot silently grant access.

use std::fmt;

/// A compiled topic selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicSelector {
    raw: String,
    kind: SelectorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SelectorKind {
    /// `*` — matches every topic.
    All,
    /// Exact string match.
    Exact,
    /// Parsed URI template.
    Template(Vec<Part>),
    /// Empty or malformed pattern; matches nothing.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Part {
    Literal(String),
    /// `{var}` (slash excluded) or `{+var}` (slash allowed).
    Var { allow_slash: bool },
}

impl TopicSelector {
    /// Compile a selector from a pattern string. Never fails: patterns that
    /// cannot be compiled yield a selector that matches nothing.
    pub fn new(pattern: &str) -> Self {
        let kind = if pattern.is_empty() {
            SelectorKind::Never
        } else if pattern == "*" {
            SelectorKind::All
        } else if pattern.contains('{') || pattern.contains('}') {
            match parse_template(pattern) {
                Some(parts) => SelectorKind::Template(parts),
                None => SelectorKind::Never,
            }
        } else {
            SelectorKind::Exact
        };

        Self {
            raw: pattern.to_string(),
            kind,
        }
    }

    /// Compile a list of patterns.
    pub fn compile(patterns: &[String]) -> Vec<Self> {
        patterns.iter().map(|p| Self::new(p)).collect()
    }

    /// Check whether this selector matches a concrete topic.
    pub fn matches(&self, topic: &str) -> bool {
        if topic.is_empty() {
            return false;
        }

        match &self.kind {
            SelectorKind::All => true,
            SelectorKind::Exact => self.raw == topic,
            SelectorKind::Template(parts) => match_parts(parts, topic),
            SelectorKind::Never => false,
        }
    }

    /// `true` for the `*` selector that matches every topic.
    pub fn is_all(&self) -> bool {
        matches!(self.kind, SelectorKind::All)
    }

    /// The original pattern string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for TopicSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn is_varname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '%'
}

/// Parse a URI template into literal and variable parts.
/// Returns None for malformed templates (unbalanced braces, empty or invalid
/// variable names, nested expressions).
fn parse_template(pattern: &str) -> Option<Vec<Part>> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }

                let allow_slash = if chars.peek() == Some(&'+') {
                    chars.next();
                    true
                } else {
                    false
                };

                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) if is_varname_char(c) => name.push(c),
                        // '{' inside an expression, unexpected char, or end
                        // of input before '}'
                        _ => return None,
                    }
                }

                if name.is_empty() {
                    return None;
                }

                parts.push(Part::Var { allow_slash });
            }
            '}' => return None,
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }

    Some(parts)
}

/// Backtracking match of template parts against a topic string.
fn match_parts(parts: &[Part], input: &str) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return input.is_empty();
    };

    match first {
        Part::Literal(lit) => match input.strip_prefix(lit.as_str()) {
            Some(remaining) => match_parts(rest, remaining),
            None => false,
        },
        Part::Var { allow_slash } => {
            // The variable must consume at least one character; try every
            // split point until one lets the remaining parts match.
            for (i, c) in input.char_indices() {
                if !allow_slash && c == '/' {
                    break;
                }
                let next = i + c.len_utf8();
                if match_parts(rest, &input[next..]) {
                    return true;
                }
            }
            false
        }
    }
}
