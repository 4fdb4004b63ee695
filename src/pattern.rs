//! Subscription patterns and event-name matching.
//!
//! A pattern is an event name that may carry the [`WILDCARD`] marker at its
//! start, its end, or both:
//!
//! | Pattern     | Kind                         | Matches                        |
//! |-------------|------------------------------|--------------------------------|
//! | `*`         | [`PatternKind::Universal`]   | every name, including `""`     |
//! | `*mid*`     | [`PatternKind::Contains`]    | names containing `mid`         |
//! | `*.paid`    | [`PatternKind::Suffix`]      | names ending with `.paid`      |
//! | `user.*`    | [`PatternKind::Prefix`]      | names starting with `user.`    |
//! | `user.paid` | [`PatternKind::Exact`]       | exactly `user.paid`            |
//!
//! Matching is byte-exact and case-sensitive. There is no escaping and no
//! interior wildcard support.

use std::fmt;

/// The wildcard marker.
pub const WILDCARD: char = '*';

/// How a pattern is matched against event names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Byte-for-byte equality.
    Exact,
    /// `literal*`: name starts with the literal.
    Prefix,
    /// `*literal`: name ends with the literal.
    Suffix,
    /// `*literal*`: name contains the literal.
    Contains,
    /// `*`: matches everything.
    Universal,
}

/// A compiled subscription pattern.
///
/// The kind is derived once in [`Pattern::compile`] and never recomputed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    literal: String,
    kind: PatternKind,
}

impl Pattern {
    /// Classify a pattern string. Rules are tried in order; the first hit wins.
    pub fn compile(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let starts = source.starts_with(WILDCARD);
        let ends = source.ends_with(WILDCARD);

        let (kind, literal) = if source.len() == 1 && starts {
            (PatternKind::Universal, "")
        } else if source.len() > 1 && starts && ends {
            (PatternKind::Contains, &source[1..source.len() - 1])
        } else if starts {
            (PatternKind::Suffix, &source[1..])
        } else if ends {
            (PatternKind::Prefix, &source[..source.len() - 1])
        } else {
            (PatternKind::Exact, source.as_str())
        };

        let literal = literal.to_string();
        Self {
            source,
            literal,
            kind,
        }
    }

    /// Check whether `name` matches this pattern.
    pub fn matches(&self, name: &str) -> bool {
        let literal = self.literal.as_bytes();
        let name = name.as_bytes();

        match self.kind {
            PatternKind::Universal => true,
            PatternKind::Exact => name == literal,
            PatternKind::Prefix => {
                name.len() >= literal.len() && &name[..literal.len()] == literal
            }
            PatternKind::Suffix => {
                name.len() >= literal.len() && &name[name.len() - literal.len()..] == literal
            }
            PatternKind::Contains => {
                literal.is_empty()
                    || (name.len() >= literal.len()
                        && name.windows(literal.len()).any(|w| w == literal))
            }
        }
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// The pattern with its wildcard markers stripped.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// The pattern as it was registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?}, {:?})", self.source, self.kind)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::compile(s)
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Pattern::compile(s)
    }
}
