//! SQL identifier validation and quoting
//!
//! Table, trigger and constraint names are interpolated into DDL text, which
//! cannot be parameterised. Names therefore only ever come from [`Ident`]
//! values (validated lowercase identifiers) and are always emitted through
//! [`quote_ident`]. String literals in DDL (trigger messages) go through
//! [`quote_literal`].

use crate::errors::{Result, SwapError};

/// Longest accepted identifier, leaving room for role and trigger suffixes
pub const MAX_IDENT_LEN: usize = 48;

/// A validated SQL identifier: `[a-z_][a-z0-9_]*`, at most [`MAX_IDENT_LEN`] bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(&'static str);

const fn is_valid(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_IDENT_LEN {
        return false;
    }
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let ok = matches!(b, b'a'..=b'z' | b'_') || (i > 0 && b.is_ascii_digit());
        if !ok {
            return false;
        }
        i += 1;
    }
    true
}

impl Ident {
    /// Build an identifier in a constant context.
    ///
    /// Evaluated in a `const` item, an invalid name fails compilation.
    pub const fn new(name: &'static str) -> Self {
        assert!(is_valid(name), "invalid SQL identifier");
        Self(name)
    }

    /// Runtime counterpart of [`Ident::new`].
    pub fn parse(name: &'static str) -> Result<Self> {
        if is_valid(name) {
            Ok(Self(name))
        } else {
            Err(SwapError::InvalidIdentifier {
                name: name.to_string(),
            }
            .into())
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Quoted form for SQL text
    pub fn quoted(&self) -> String {
        quote_ident(self.0)
    }

    /// Identifier with a suffix appended, e.g. a trigger per event
    pub fn suffixed(&self, suffix: &str) -> String {
        format!("{}_{}", self.0, suffix)
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Which physical copy of a logical table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    Live,
    Staging,
    Retired,
}

impl TableRole {
    fn suffix(self) -> Option<&'static str> {
        match self {
            TableRole::Live => None,
            TableRole::Staging => Some("staging"),
            TableRole::Retired => Some("retired"),
        }
    }
}

/// A physical table: a logical name in one of its three roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalTable {
    pub logical: Ident,
    pub role: TableRole,
}

impl PhysicalTable {
    pub fn live(logical: Ident) -> Self {
        Self {
            logical,
            role: TableRole::Live,
        }
    }

    pub fn staging(logical: Ident) -> Self {
        Self {
            logical,
            role: TableRole::Staging,
        }
    }

    pub fn retired(logical: Ident) -> Self {
        Self {
            logical,
            role: TableRole::Retired,
        }
    }

    /// Unquoted physical name, as stored in `sqlite_master`
    pub fn name(&self) -> String {
        match self.role.suffix() {
            None => self.logical.as_str().to_string(),
            Some(suffix) => self.logical.suffixed(suffix),
        }
    }

    /// Quoted physical name for SQL text
    pub fn quoted(&self) -> String {
        quote_ident(&self.name())
    }
}

impl std::fmt::Display for PhysicalTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Quote an identifier: wrap in double quotes, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal: wrap in single quotes, doubling embedded quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
