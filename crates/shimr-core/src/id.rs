//! Stable identifiers for members of described types.
//!
//! A [`MemberId`] pairs the declaring type's [`TypeId`] with the member's
//! position in that type's own member list, so a member inherited through a
//! base type keeps the identity of the type that declared it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::type_id::TypeId;

/// Identity of a declared member: the declaring type plus its declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId {
    /// The type that declares the member.
    pub owner: TypeId,
    /// Position within the owner's member list.
    pub index: u32,
}

impl MemberId {
    pub fn new(owner: TypeId, index: u32) -> Self {
        MemberId { owner, index }
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner.0, self.index)
    }
}
