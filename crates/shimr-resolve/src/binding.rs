//! Resolved bindings: the unit handed to code emission.
//!
//! A [`Binding`] pairs one contract member (one accessor of it, for
//! properties and indexers) with one target member, tagged with the
//! [`Strategy`] the emitter should use and the value [`Conversions`] the
//! adapter must perform on the way in and out.

use serde::{Deserialize, Serialize};
use shimr_core::{MemberId, TypeId};

use crate::contract::Flavor;

/// How an adapter member forwards to its target member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Plain passthrough to an instance member.
    Direct,
    /// Instance member whose result is wrapped in a nested adapter.
    ShimmedReturn,
    /// Instance member taking at least one argument unwrapped from an adapter.
    ShimmedParameter,
    /// Redirect to a static member of an explicit target type.
    StaticRedirect,
    /// Member supplied by a proxy type, absent from the target.
    ProxyAdd,
    /// Member supplied by a proxy type, replacing the target's own member.
    ProxyOverride,
    /// Method that constructs the target type.
    ConstructorFactory,
    /// Set/init accessor assigning a value unwrapped from an adapter.
    UnshimCast,
}

/// Which accessor of a property, field or indexer a binding covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessor {
    Get,
    Set,
    Init,
}

impl Accessor {
    /// Accessors that carry a value into the target rather than out of it.
    pub fn is_write(self) -> bool {
        matches!(self, Accessor::Set | Accessor::Init)
    }
}

/// Which Target Descriptor variant produced a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Instance,
    Static,
    Proxy,
}

/// The concrete target a binding was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub ty: TypeId,
    /// Proxy targets only: the type whose member is being added or overridden.
    pub proxied: Option<TypeId>,
}

/// A value that crosses the adapter boundary as a nested contract.
///
/// Outbound values of type `concrete` are wrapped as `contract`; inbound
/// `contract` values are unwrapped back to `concrete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NestedConversion {
    pub contract: TypeId,
    pub concrete: TypeId,
    /// The conversion applies to each element of an array.
    pub array: bool,
}

/// Conversion of one parameter, by position in the contract signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamConversion {
    pub index: usize,
    pub conversion: NestedConversion,
}

/// Every conversion a binding needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conversions {
    /// Declared value / return value.
    pub value: Option<NestedConversion>,
    pub params: Vec<ParamConversion>,
    /// Extension-style proxy: the target takes the instance as a leading argument.
    pub instance_param: bool,
}

impl Conversions {
    /// Number of adapter wraps/unwraps, used to rank overloads.
    pub fn cost(&self) -> usize {
        self.value.iter().count() + self.params.len()
    }

    /// All nested contracts this binding relies on.
    pub fn nested(&self) -> impl Iterator<Item = NestedConversion> + '_ {
        self.value
            .iter()
            .copied()
            .chain(self.params.iter().map(|p| p.conversion))
    }
}

/// A resolved pairing of a contract member with a target member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub contract: TypeId,
    pub flavor: Flavor,
    pub member: MemberId,
    /// Declaration position of `member` within its contract.
    pub ordinal: usize,
    pub accessor: Option<Accessor>,
    /// Type of the adapted instance; `None` for factory contracts.
    pub instance: Option<TypeId>,
    pub target: TargetRef,
    pub target_member: MemberId,
    /// Proxy overrides only: the member being replaced.
    pub overridden: Option<MemberId>,
    pub strategy: Strategy,
    pub conversions: Conversions,
}
