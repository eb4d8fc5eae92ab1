//! Errors raised while adapting or invoking through an adapter.

use shimr_core::{CoreError, TypeId};
use thiserror::Error;

/// Failure of a deferred adaptation or of a call through an adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("{contract} is not an interface and cannot be used as a contract")]
    NotAContract { contract: String },

    /// The value has no object identity to adapt (a primitive or string).
    #[error("cannot adapt a {value} value to {contract}")]
    UnresolvedTarget { contract: String, value: String },

    #[error("{target} has no member matching {contract}.{member}")]
    MissingMember {
        contract: String,
        member: String,
        target: String,
    },

    #[error("{members} members of {target} match {contract}.{member} equally well")]
    AmbiguousMatch {
        contract: String,
        member: String,
        target: String,
        members: usize,
    },

    /// Static, proxy and constructor redirection need ahead-of-time resolution.
    #[error("{contract}.{member} is redirected and cannot be adapted at runtime")]
    UnsupportedRedirect { contract: String, member: String },

    /// None of the overloads sharing a name and arity accepts the arguments.
    #[error("no overload of {contract}.{member} accepts ({args})")]
    NoMatchingOverload {
        contract: String,
        member: String,
        args: String,
    },

    /// A lenient adapter's stub was invoked.
    #[error("{contract}.{member} is not implemented by {target}")]
    NotImplemented {
        contract: String,
        member: String,
        target: String,
    },

    /// The caller named a member the contract does not declare.
    #[error("{contract} has no member {member} taking {arity} argument(s)")]
    UnknownMember {
        contract: String,
        member: String,
        arity: usize,
    },

    /// The wrapped object refused or failed the forwarded operation.
    #[error("target {target} failed on {member}: {message}")]
    TargetFault {
        target: TypeId,
        member: String,
        message: String,
    },

    #[error(transparent)]
    Catalog(#[from] CoreError),
}

impl RuntimeError {
    /// Convenience constructor for [`DynObject`](crate::DynObject) implementors.
    pub fn fault(target: TypeId, member: &str, message: impl Into<String>) -> Self {
        RuntimeError::TargetFault {
            target,
            member: member.to_string(),
            message: message.into(),
        }
    }
}
