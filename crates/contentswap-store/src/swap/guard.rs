//! Write-protection triggers for live tables
//!
//! A registry lock trigger is realised as one SQLite trigger per event,
//! because a SQLite trigger fires for a single event. Each raises an abort
//! naming the staging table loaders should write to instead.

use contentswap_core::ident::{quote_ident, quote_literal, PhysicalTable};
use contentswap_core::registry::SwapTable;

/// Statement kinds the guard rejects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardEvent {
    Insert,
    Update,
    Delete,
}

impl GuardEvent {
    pub const ALL: [GuardEvent; 3] = [GuardEvent::Insert, GuardEvent::Update, GuardEvent::Delete];

    fn keyword(self) -> &'static str {
        match self {
            GuardEvent::Insert => "INSERT",
            GuardEvent::Update => "UPDATE",
            GuardEvent::Delete => "DELETE",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            GuardEvent::Insert => "insert",
            GuardEvent::Update => "update",
            GuardEvent::Delete => "delete",
        }
    }
}

/// The write guard of one swap table
#[derive(Debug, Clone, Copy)]
pub struct WriteGuard {
    table: SwapTable,
}

impl WriteGuard {
    pub fn new(table: SwapTable) -> Self {
        Self { table }
    }

    /// Physical trigger name for one event
    pub fn trigger_name(&self, event: GuardEvent) -> String {
        self.table.lock_trigger.suffixed(event.suffix())
    }

    pub fn trigger_names(&self) -> Vec<String> {
        GuardEvent::ALL
            .iter()
            .map(|event| self.trigger_name(*event))
            .collect()
    }

    /// Abort message raised on a direct write to the live table
    pub fn message(&self) -> String {
        format!(
            "{} is live content; write to {} instead",
            PhysicalTable::live(self.table.name),
            PhysicalTable::staging(self.table.name)
        )
    }

    /// Trigger body shared by all three events
    pub fn body_sql(&self) -> String {
        format!("SELECT RAISE(ABORT, {});", quote_literal(&self.message()))
    }

    /// `CREATE TRIGGER` statements attaching the guard to the live table
    pub fn create_sql(&self) -> Vec<String> {
        let live = PhysicalTable::live(self.table.name).quoted();
        let body = self.body_sql();
        GuardEvent::ALL
            .iter()
            .map(|event| {
                format!(
                    "CREATE TRIGGER {} BEFORE {} ON {} BEGIN {} END",
                    quote_ident(&self.trigger_name(*event)),
                    event.keyword(),
                    live,
                    body
                )
            })
            .collect()
    }

    pub fn drop_sql(trigger_name: &str) -> String {
        format!("DROP TRIGGER {}", quote_ident(trigger_name))
    }
}
