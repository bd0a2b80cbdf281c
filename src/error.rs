use aws_sdk_dynamodb::{
    error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types,
};
use std::{error, fmt};
use thiserror::Error;

/// Cancellation reason code reported when a transaction item's condition was not met.
pub const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// Result type for every model, batch and transaction operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Store-reported error kinds, passed through verbatim.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum StoreErrorKind {
    /// The table or index does not exist.
    ResourceNotFound,
    /// The caller is not authorized for the operation.
    AccessDenied,
    /// The request was rejected by the store's validation.
    Validation,
    /// The table's provisioned throughput was exceeded.
    ProvisionedThroughputExceeded,
    /// The request was throttled.
    Throttling,
    /// The account-level request limit was exceeded.
    RequestLimitExceeded,
    /// An item collection grew past its size limit.
    ItemCollectionSizeLimitExceeded,
    /// The item already exists.
    DuplicateItem,
    /// Another transaction touched one of the items.
    TransactionConflict,
    /// A transaction with the same idempotency token is still running.
    TransactionInProgress,
    /// The idempotency token was reused with different parameters.
    IdempotentParameterMismatch,
    /// The store failed internally.
    InternalServer,
    /// Any other wire error code.
    Other(String),
}

impl StoreErrorKind {
    /// Maps a wire-level error code onto its kind.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ResourceNotFoundException" => Self::ResourceNotFound,
            "AccessDeniedException" | "UnrecognizedClientException" => Self::AccessDenied,
            "ValidationException" => Self::Validation,
            "ProvisionedThroughputExceededException" => Self::ProvisionedThroughputExceeded,
            "ThrottlingException" => Self::Throttling,
            "RequestLimitExceeded" => Self::RequestLimitExceeded,
            "ItemCollectionSizeLimitExceededException" => Self::ItemCollectionSizeLimitExceeded,
            "DuplicateItemException" => Self::DuplicateItem,
            "TransactionConflictException" => Self::TransactionConflict,
            "TransactionInProgressException" => Self::TransactionInProgress,
            "IdempotentParameterMismatchException" => Self::IdempotentParameterMismatch,
            "InternalServerError" => Self::InternalServer,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceNotFound => f.write_str("resource not found"),
            Self::AccessDenied => f.write_str("access denied"),
            Self::Validation => f.write_str("validation error"),
            Self::ProvisionedThroughputExceeded => f.write_str("provisioned throughput exceeded"),
            Self::Throttling => f.write_str("throttled"),
            Self::RequestLimitExceeded => f.write_str("request limit exceeded"),
            Self::ItemCollectionSizeLimitExceeded => {
                f.write_str("item collection size limit exceeded")
            }
            Self::DuplicateItem => f.write_str("duplicate item"),
            Self::TransactionConflict => f.write_str("transaction conflict"),
            Self::TransactionInProgress => f.write_str("transaction in progress"),
            Self::IdempotentParameterMismatch => f.write_str("idempotent parameter mismatch"),
            Self::InternalServer => f.write_str("internal server error"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// One entry of a cancelled transaction's reason list, positionally aligned with its items.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CancellationReason {
    /// The reason code, e.g. `ConditionalCheckFailed` or `None`.
    pub code: Option<String>,
    /// The store's message for this item.
    pub message: Option<String>,
}

impl From<&types::CancellationReason> for CancellationReason {
    fn from(reason: &types::CancellationReason) -> Self {
        Self {
            code: reason.code().map(str::to_string),
            message: reason.message().map(str::to_string),
        }
    }
}

/// Errors surfaced by models, batches and transactions.
#[derive(Debug, Error)]
pub enum Error {
    /// A conditioned single-item write was rejected because its condition was not met.
    #[error("conditional check failed: {0}")]
    ConditionalCheckFailed(String),
    /// A multi-item transaction was aborted.
    #[error("transaction cancelled: {message}")]
    TransactionCancelled {
        /// The store's message.
        message: String,
        /// Per-item cancellation reasons.
        reasons: Vec<CancellationReason>,
    },
    /// Any other store-reported error.
    #[error("{kind}: {message}")]
    Store {
        /// The classified kind.
        kind: StoreErrorKind,
        /// The store's message.
        message: String,
    },
    /// A model was materialized without a resolvable client, name or key.
    #[error("missing configuration: {0}")]
    MissingConfiguration(&'static str),
    /// An atomic action kept losing the optimistic concurrency race.
    #[error("atomic action exhausted after {0} attempts")]
    AtomicActionExhausted(u32),
    /// The caller passed parameters that cannot be turned into a request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A store response could not be mapped back onto its request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The request never got a service response (timeout, dispatch or cancellation).
    #[error("transport error: {0}")]
    Transport(String),
    /// A typed value could not be converted to or from attribute values.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),
    /// A page token could not be encoded or decoded.
    #[error("invalid page token: {0}")]
    Token(#[from] serde_json::Error),
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl Error {
    /// Classifies a wire-level error code and message.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "ConditionalCheckFailedException" => Self::ConditionalCheckFailed(message),
            "TransactionCanceledException" => Self::TransactionCancelled {
                message,
                reasons: Vec::new(),
            },
            code => Self::Store {
                kind: StoreErrorKind::from_code(code),
                message,
            },
        }
    }

    /// Classifies an SDK failure: service errors by code, everything else as transport.
    pub(crate) fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + error::Error + 'static,
        R: fmt::Debug,
    {
        match err.code() {
            Some(code) => Self::from_code(code, err.message().unwrap_or_default()),
            None => Self::Transport(DisplayErrorContext(&err).to_string()),
        }
    }

    /// The store error kind, when the store reported one.
    pub fn kind(&self) -> Option<&StoreErrorKind> {
        match self {
            Self::Store { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Whether a condition was not met, either on a single item or inside a transaction.
    pub fn is_conditional_check_failed(&self) -> bool {
        match self {
            Self::ConditionalCheckFailed(_) => true,
            Self::TransactionCancelled { reasons, .. } => reasons
                .iter()
                .any(|reason| reason.code.as_deref() == Some(CONDITIONAL_CHECK_FAILED)),
            _ => false,
        }
    }

    /// Whether a transaction was aborted for any reason.
    pub fn is_transaction_cancelled(&self) -> bool {
        matches!(self, Self::TransactionCancelled { .. })
    }

    /// Whether the store pushed back on capacity.
    pub fn is_throttling(&self) -> bool {
        matches!(
            self.kind(),
            Some(
                StoreErrorKind::ProvisionedThroughputExceeded
                    | StoreErrorKind::Throttling
                    | StoreErrorKind::RequestLimitExceeded
            )
        )
    }
}
