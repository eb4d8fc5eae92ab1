//! Resolution diagnostics and the shared error reporter.
//!
//! [`ShimError`] is a member- or request-level problem: it is recorded and
//! resolution carries on, so one run surfaces every problem. Each variant
//! names its [`Site`] so the emitter can point at the original declaration.
//!
//! [`ResolveError`] is the other kind: an internal fault (the catalog does
//! not know a type it handed out) that aborts the whole run.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shimr_core::{CoreError, MemberId, TypeId};

use crate::contract::Flavor;

/// Where a diagnostic points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// A whole contract or a discovery request naming it.
    Contract(TypeId),
    /// One member of a contract.
    Member { contract: TypeId, member: MemberId },
}

/// Canonical taxonomy of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NonContractArgument,
    UnresolvedTarget,
    MissingMember,
    ConflictingAdd,
    InvalidExplicitTarget,
    ReturnTypeMismatch,
    ContractIdentityConflict,
    AmbiguousMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem found while discovering or resolving contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ShimError {
    /// A requested adaptation target is not interface-shaped.
    #[error("{contract} is not an interface and cannot be used as a contract")]
    NonContractArgument { site: Site, contract: String },

    /// No concrete target type could be determined.
    #[error("cannot determine a target type for {contract}: {reason}")]
    UnresolvedTarget {
        site: Site,
        contract: String,
        reason: String,
    },

    /// The target lacks a member the contract requires.
    #[error("{target} has no member matching {contract}.{member}")]
    MissingMember {
        site: Site,
        contract: String,
        member: String,
        target: String,
    },

    /// Same as `MissingMember`, downgraded because the contract opted into leniency.
    #[error("{target} has no member matching {contract}.{member}; a throwing stub will be generated")]
    StubbedMember {
        site: Site,
        contract: String,
        member: String,
        target: String,
    },

    /// An Add proxy found the member already present on its target.
    #[error("proxy for {contract}.{member} adds a member that already exists on {target}")]
    ConflictingAdd {
        site: Site,
        contract: String,
        member: String,
        target: String,
    },

    /// An explicit static/proxy target is not a concrete type.
    #[error("explicit target {target} of {contract}.{member} must be a concrete type")]
    InvalidExplicitTarget {
        site: Site,
        contract: String,
        member: String,
        target: String,
    },

    /// A constructor-factory member returns something the constructed type cannot become.
    #[error("{contract}.{member} returns {declared}, which is neither {target} nor an interface")]
    ReturnTypeMismatch {
        site: Site,
        contract: String,
        member: String,
        declared: String,
        target: String,
    },

    /// The same contract was requested both as instance and as factory.
    #[error("{contract} was requested as {requested} contract but is registered as {existing}")]
    ContractIdentityConflict {
        site: Site,
        contract: String,
        existing: Flavor,
        requested: Flavor,
    },

    /// Several overloads match equally well.
    #[error("{candidates} members of {target} match {contract}.{member} equally well")]
    AmbiguousMatch {
        site: Site,
        contract: String,
        member: String,
        target: String,
        candidates: usize,
    },
}

impl ShimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShimError::NonContractArgument { .. } => ErrorKind::NonContractArgument,
            ShimError::UnresolvedTarget { .. } => ErrorKind::UnresolvedTarget,
            ShimError::MissingMember { .. } | ShimError::StubbedMember { .. } => {
                ErrorKind::MissingMember
            }
            ShimError::ConflictingAdd { .. } => ErrorKind::ConflictingAdd,
            ShimError::InvalidExplicitTarget { .. } => ErrorKind::InvalidExplicitTarget,
            ShimError::ReturnTypeMismatch { .. } => ErrorKind::ReturnTypeMismatch,
            ShimError::ContractIdentityConflict { .. } => ErrorKind::ContractIdentityConflict,
            ShimError::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
        }
    }

    pub fn site(&self) -> Site {
        match self {
            ShimError::NonContractArgument { site, .. }
            | ShimError::UnresolvedTarget { site, .. }
            | ShimError::MissingMember { site, .. }
            | ShimError::StubbedMember { site, .. }
            | ShimError::ConflictingAdd { site, .. }
            | ShimError::InvalidExplicitTarget { site, .. }
            | ShimError::ReturnTypeMismatch { site, .. }
            | ShimError::ContractIdentityConflict { site, .. }
            | ShimError::AmbiguousMatch { site, .. } => *site,
        }
    }

    /// Stubbed members and adaptation requests left to the runtime do not
    /// fail a build. An unresolved target for a single member does.
    pub fn severity(&self) -> Severity {
        match self {
            ShimError::UnresolvedTarget {
                site: Site::Contract(_),
                ..
            }
            | ShimError::StubbedMember { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// An internal fault that aborts resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Catalog(#[from] CoreError),

    /// A discovery request referred to a member its contract does not declare.
    #[error("member {member} is not part of contract {contract}")]
    UnknownContractMember { contract: TypeId, member: MemberId },
}

/// Append-only, thread-safe collection of diagnostics.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    errors: Mutex<Vec<ShimError>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, error: ShimError) {
        tracing::warn!(kind = ?error.kind(), "{}", error);
        self.errors.lock().push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Copy of everything reported so far.
    pub fn snapshot(&self) -> Vec<ShimError> {
        self.errors.lock().clone()
    }

    /// Removes and returns everything reported so far.
    pub fn take(&self) -> Vec<ShimError> {
        std::mem::take(&mut *self.errors.lock())
    }
}
