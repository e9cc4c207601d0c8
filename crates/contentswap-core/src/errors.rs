use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure the engine can surface falls into one of three families:
///
/// - **Validation** (`StagingMissing`, `StagingEmpty`): raised before any
///   mutation; safe to retry once the staging content is fixed.
/// - **Transaction** (`Transaction`, `ConstraintViolation`): a statement
///   inside the swap transaction failed and the transaction rolled back.
/// - **Configuration** (`UnknownGroup`, `InvalidIdentifier`): rejected before
///   any database call.
///
/// Each kind maps to a stable error code for programmatic handling and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    StagingMissing,
    StagingEmpty,

    // Transaction
    Transaction,
    ConstraintViolation,

    // Configuration
    UnknownGroup,
    InvalidIdentifier,

    // General
    InvalidInput,
    NotFound,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::StagingMissing => "ERR_STAGING_MISSING",
            ExErrorKind::StagingEmpty => "ERR_STAGING_EMPTY",
            ExErrorKind::Transaction => "ERR_TRANSACTION",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::UnknownGroup => "ERR_UNKNOWN_GROUP",
            ExErrorKind::InvalidIdentifier => "ERR_INVALID_IDENTIFIER",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Staging content was missing or empty; nothing was mutated.
    pub fn is_validation(&self) -> bool {
        matches!(self, ExErrorKind::StagingMissing | ExErrorKind::StagingEmpty)
    }

    /// The swap transaction failed and was rolled back.
    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Transaction | ExErrorKind::ConstraintViolation
        )
    }

    /// The request named something the registry does not know.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExErrorKind::UnknownGroup | ExErrorKind::InvalidIdentifier
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus the context an operator needs to act
/// on a failed promotion: which group, which table, which step.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    group: Option<String>,
    table: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            group: None,
            table: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add swap group context
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Add table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the swap group context, if any
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Get the table context, if any
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(group) = &self.group {
            write!(f, " (group: {})", group)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures of the deployment engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwapError {
    /// The staging copy of a table does not exist
    #[error("Staging table {staging} is missing; run the content loader for group {group}")]
    StagingMissing { group: String, staging: String },

    /// The staging copy of a table has no rows
    #[error("Staging table {staging} is empty; refusing to promote group {group}")]
    StagingEmpty { group: String, staging: String },

    /// Group name is not in the registry
    #[error("Unknown swap group: {name}")]
    UnknownGroup { name: String },

    /// Identifier is not acceptable in SQL text
    #[error("Invalid identifier: {name}")]
    InvalidIdentifier { name: String },

    /// The live table a staging copy is cloned from does not exist
    #[error("Live table {table} does not exist")]
    LiveTableMissing { group: String, table: String },

    /// Rows in a table outside the group reference rows the new live table lacks
    #[error("{violations} row(s) in {source_table} reference missing {target_table} rows")]
    DanglingReferences {
        group: String,
        source_table: String,
        target_table: String,
        violations: u64,
    },

    /// The same loader key was registered with two different identities
    #[error("Identity for {tag}:{title} registered twice with different parts")]
    ConflictingIdentity { tag: String, title: String },
}

impl From<SwapError> for ExError {
    fn from(err: SwapError) -> Self {
        let message = err.to_string();
        match err {
            SwapError::StagingMissing { group, staging } => {
                ExError::new(ExErrorKind::StagingMissing)
                    .with_op("validate_staging")
                    .with_group(group)
                    .with_table(staging)
                    .with_message(message)
            }
            SwapError::StagingEmpty { group, staging } => ExError::new(ExErrorKind::StagingEmpty)
                .with_op("validate_staging")
                .with_group(group)
                .with_table(staging)
                .with_message(message),
            SwapError::UnknownGroup { .. } => ExError::new(ExErrorKind::UnknownGroup)
                .with_op("resolve_group")
                .with_message(message),
            SwapError::InvalidIdentifier { .. } => ExError::new(ExErrorKind::InvalidIdentifier)
                .with_op("parse_identifier")
                .with_message(message),
            SwapError::LiveTableMissing { group, table } => ExError::new(ExErrorKind::NotFound)
                .with_op("recreate_staging")
                .with_group(group)
                .with_table(table)
                .with_message(message),
            SwapError::DanglingReferences {
                group,
                source_table,
                ..
            } => ExError::new(ExErrorKind::ConstraintViolation)
                .with_op("restore_foreign_keys")
                .with_group(group)
                .with_table(source_table)
                .with_message(message),
            SwapError::ConflictingIdentity { .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("register_identity")
                .with_message(message),
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}
