//! Swap group registry
//!
//! A swap group is the set of tables promoted together in one transaction,
//! with their write-lock triggers and the foreign keys from outside the
//! group that point into it. The registry is closed: each content domain is
//! one variant, and every name in it is a compile-time validated [`Ident`].

use crate::errors::{ExError, Result, SwapError};
use crate::ident::Ident;
use std::str::FromStr;

/// One table of a swap group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapTable {
    /// Logical (live) table name
    pub name: Ident,
    /// Write-protection trigger installed on the live table
    pub lock_trigger: Ident,
}

/// A foreign key from a table outside the group to a table inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossForeignKey {
    pub name: Ident,
    pub source_table: Ident,
    pub source_column: Ident,
    pub target_table: Ident,
    pub target_column: Ident,
}

const fn table(name: &'static str, lock_trigger: &'static str) -> SwapTable {
    SwapTable {
        name: Ident::new(name),
        lock_trigger: Ident::new(lock_trigger),
    }
}

const PATTERNS_TABLES: &[SwapTable] = &[
    table("patterns", "patterns_write_lock"),
    table("pattern_examples", "pattern_examples_write_lock"),
];

const PATTERNS_FOREIGN_KEYS: &[CrossForeignKey] = &[CrossForeignKey {
    name: Ident::new("fk_user_pattern_bookmarks_pattern"),
    source_table: Ident::new("user_pattern_bookmarks"),
    source_column: Ident::new("pattern_id"),
    target_table: Ident::new("patterns"),
    target_column: Ident::new("id"),
}];

const RULES_TABLES: &[SwapTable] = &[table("rules", "rules_write_lock")];

const TOUR_TABLES: &[SwapTable] = &[
    table("tour_lessons", "tour_lessons_write_lock"),
    table("tour_steps", "tour_steps_write_lock"),
];

const TOUR_FOREIGN_KEYS: &[CrossForeignKey] = &[CrossForeignKey {
    name: Ident::new("fk_user_tour_progress_step"),
    source_table: Ident::new("user_tour_progress"),
    source_column: Ident::new("step_id"),
    target_table: Ident::new("tour_steps"),
    target_column: Ident::new("id"),
}];

/// Content domains that are promoted as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwapGroup {
    Patterns,
    Rules,
    Tour,
}

impl SwapGroup {
    /// Every group, in the order `all` promotes them
    pub const ALL: [SwapGroup; 3] = [SwapGroup::Patterns, SwapGroup::Rules, SwapGroup::Tour];

    pub fn name(&self) -> &'static str {
        match self {
            SwapGroup::Patterns => "patterns",
            SwapGroup::Rules => "rules",
            SwapGroup::Tour => "tour",
        }
    }

    /// Tables swapped together, in dependency order (referenced tables first)
    pub fn tables(&self) -> &'static [SwapTable] {
        match self {
            SwapGroup::Patterns => PATTERNS_TABLES,
            SwapGroup::Rules => RULES_TABLES,
            SwapGroup::Tour => TOUR_TABLES,
        }
    }

    pub fn foreign_keys(&self) -> &'static [CrossForeignKey] {
        match self {
            SwapGroup::Patterns => PATTERNS_FOREIGN_KEYS,
            SwapGroup::Rules => &[],
            SwapGroup::Tour => TOUR_FOREIGN_KEYS,
        }
    }

    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables().iter().map(|t| t.name.as_str()).collect()
    }

    /// Group owning a logical table, if any
    pub fn owning(table: &str) -> Option<SwapGroup> {
        Self::ALL
            .into_iter()
            .find(|g| g.tables().iter().any(|t| t.name.as_str() == table))
    }
}

impl std::fmt::Display for SwapGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SwapGroup {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.name() == s)
            .ok_or_else(|| {
                SwapError::UnknownGroup {
                    name: s.to_string(),
                }
                .into()
            })
    }
}

/// What an operator asked to promote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSelection {
    One(SwapGroup),
    All,
}

impl GroupSelection {
    pub fn groups(&self) -> Vec<SwapGroup> {
        match self {
            GroupSelection::One(group) => vec![*group],
            GroupSelection::All => SwapGroup::ALL.to_vec(),
        }
    }
}

impl FromStr for GroupSelection {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            Ok(GroupSelection::All)
        } else {
            s.parse().map(GroupSelection::One)
        }
    }
}
