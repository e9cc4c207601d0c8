//! Deterministic identity generator
//!
//! Content tables are dropped and recreated on every promotion, so a row's
//! primary key cannot come from the database. Loaders derive it from the
//! row's semantic key instead: the same `(tag, parts)` always yields the same
//! UUID, in any process, before and after any number of reseeds. Tables that
//! are never swapped (user progress, bookmarks) can therefore keep foreign
//! keys into swapped tables.
//!
//! The identifier is a UUID version 5: SHA-1 over [`CONTENT_NAMESPACE`] and
//! the encoded name, with the version and variant bits set per RFC 4122.

use crate::errors::{Result, SwapError};
use crate::ident::Ident;
use std::collections::HashMap;
use std::fmt::Display;
use uuid::Uuid;

/// Project namespace all content identities are derived under
pub const CONTENT_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_3c2e_94d7_4a0b_8e55_2f1c_7d3a_90e4);

const SEPARATOR: char = '\u{1f}';
const ESCAPE: char = '\u{1b}';

/// Namespaces one kind of entity so equal parts under different tags differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainTag(Ident);

impl DomainTag {
    pub const LESSON: DomainTag = DomainTag::new("lesson");
    pub const STEP: DomainTag = DomainTag::new("step");
    pub const PATTERN: DomainTag = DomainTag::new("pattern");
    pub const PATTERN_EXAMPLE: DomainTag = DomainTag::new("pattern_example");
    pub const RULE: DomainTag = DomainTag::new("rule");

    pub const fn new(tag: &'static str) -> Self {
        Self(Ident::new(tag))
    }

    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }
}

fn push_escaped(name: &mut String, part: &str) {
    for c in part.chars() {
        if c == SEPARATOR || c == ESCAPE {
            name.push(ESCAPE);
        }
        name.push(c);
    }
}

/// Encode tag and parts into the hashed name: `tag␟part␟part`, with any
/// separator or escape character inside a part escaped.
fn encode_name(tag: DomainTag, parts: &[&dyn Display]) -> String {
    let mut name = String::from(tag.as_str());
    for part in parts {
        name.push(SEPARATOR);
        push_escaped(&mut name, &part.to_string());
    }
    name
}

/// Stable identifier for a semantic key
///
/// ```
/// use contentswap_core::identity::{identity, DomainTag};
///
/// let a = identity(DomainTag::STEP, &[&"lesson-a", &1]);
/// let b = identity(DomainTag::STEP, &[&"lesson-a", &"1"]);
/// assert_eq!(a, b);
/// assert_eq!(a.get_version_num(), 5);
/// ```
pub fn identity(tag: DomainTag, parts: &[&dyn Display]) -> Uuid {
    Uuid::new_v5(&CONTENT_NAMESPACE, encode_name(tag, parts).as_bytes())
}

/// Canonical hyphenated lowercase form of [`identity`]
pub fn identity_string(tag: DomainTag, parts: &[&dyn Display]) -> String {
    identity(tag, parts).hyphenated().to_string()
}

pub fn lesson_id(slug: &str) -> Uuid {
    identity(DomainTag::LESSON, &[&slug])
}

/// Identity of step `ordinal` of lesson `lesson_slug`
pub fn step_id(lesson_slug: &str, ordinal: u32) -> Uuid {
    identity(DomainTag::STEP, &[&lesson_slug, &ordinal])
}

pub fn pattern_id(slug: &str) -> Uuid {
    identity(DomainTag::PATTERN, &[&slug])
}

pub fn pattern_example_id(pattern_slug: &str, ordinal: u32) -> Uuid {
    identity(DomainTag::PATTERN_EXAMPLE, &[&pattern_slug, &ordinal])
}

pub fn rule_id(slug: &str) -> Uuid {
    identity(DomainTag::RULE, &[&slug])
}

/// Title-to-identity lookup owned by one loader run
///
/// Loaders resolve cross-references by title ("the step titled X in lesson
/// Y") while writing staging rows. The lookup lives exactly as long as the
/// load that built it and is passed explicitly to whatever needs it.
#[derive(Debug, Default)]
pub struct IdentityScope {
    entries: HashMap<(DomainTag, String), Uuid>,
}

impl IdentityScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the identity for `parts` and remember it under `title`.
    ///
    /// Re-registering a title with the same parts is a no-op; with different
    /// parts it is an error, since two rows would claim one title.
    pub fn register(
        &mut self,
        tag: DomainTag,
        title: &str,
        parts: &[&dyn Display],
    ) -> Result<Uuid> {
        let id = identity(tag, parts);
        match self.entries.get(&(tag, title.to_string())) {
            Some(existing) if *existing != id => Err(SwapError::ConflictingIdentity {
                tag: tag.as_str().to_string(),
                title: title.to_string(),
            }
            .into()),
            Some(existing) => Ok(*existing),
            None => {
                self.entries.insert((tag, title.to_string()), id);
                Ok(id)
            }
        }
    }

    pub fn resolve(&self, tag: DomainTag, title: &str) -> Option<Uuid> {
        self.entries.get(&(tag, title.to_string())).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
