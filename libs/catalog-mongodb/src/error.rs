//! Error types for the catalog engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A query or update referenced a field the entity's registry does not
    /// know. Never silently dropped: an ignored filter key would turn a
    /// selective query into a full scan.
    #[error("unknown parameter '{param}': the parameter does not exist or cannot be queried for")]
    UnknownParameter { param: String },

    /// A comparison expression could not be parsed. Carries the offending
    /// field and caller value so the failure is attributable.
    #[error("malformed expression '{value}' for parameter '{param}': {reason}")]
    MalformedExpression {
        param: String,
        value: String,
        reason: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness violation or ambiguous update target.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A nested reference points at a record that does not exist.
    #[error("{entity} uid {uid} does not exist")]
    DanglingReference { entity: &'static str, uid: i64 },

    /// The principal has no relationship to the study at all. Reads by
    /// principals who are members but lack grants do not produce this;
    /// they just see fewer documents.
    #[error("permission denied: user '{user}' cannot view entries of study {study_uid}")]
    AuthorizationDenied { user: String, study_uid: i64 },

    /// Invalid caller-supplied value outside the query grammar (bad uid,
    /// unparseable date payload, missing required query key).
    #[error("validation error: {0}")]
    Validation(String),

    /// The underlying store failed or timed out. Propagated as-is, never
    /// masked as an empty result.
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn malformed(
        param: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::MalformedExpression {
            param: param.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether a store error is a unique-index violation. The unique index
    /// is the authoritative guard against duplicate-id races; the advisory
    /// pre-checks in the adaptors can always lose the race.
    pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        use mongodb::error::{ErrorKind, WriteFailure};
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
            ErrorKind::BulkWrite(failure) => failure
                .write_errors
                .as_ref()
                .is_some_and(|errors| errors.iter().any(|e| e.code == 11000)),
            _ => false,
        }
    }
}
