//! Core error types for shimr-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! failures of the type-description model itself.

use crate::id::MemberId;
use crate::type_id::TypeId;
use thiserror::Error;

/// Core errors produced by the shimr-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Attempting to register a type name that already exists in the registry.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// A TypeId was not found in the type registry.
    #[error("type not found: TypeId({id})", id = id.0)]
    TypeNotFound { id: TypeId },

    /// A member ID does not name a declared member.
    #[error("member not found: {id}")]
    MemberNotFound { id: MemberId },

    /// Built-in types are sealed and cannot gain members.
    #[error("built-in type {id} cannot be modified")]
    BuiltinType { id: TypeId },
}
