//! Ahead-of-time contract resolution.
//!
//! Discovery requests populate a [`Registry`]; a [`Resolver`] then drives it
//! to a fixpoint, matching every contract member against exactly one
//! [`TargetDescriptor`] and producing:
//! - [`Binding`]s grouped per contract in member declaration order, and
//! - [`ShimError`] diagnostics for every member that could not be bound.
//!
//! Member-level problems never abort a run. Only [`ResolveError`] does.

pub mod binding;
pub mod compat;
pub mod contract;
pub mod diagnostics;
pub mod proxy;
pub mod registry;
pub mod resolver;
pub mod target;

pub use binding::{
    Accessor, Binding, Conversions, NestedConversion, ParamConversion, Strategy, TargetKind,
    TargetRef,
};
pub use compat::{compare, compare_param, Compat};
pub use contract::{Contract, ContractKey, ContractMember, Flavor};
pub use diagnostics::{ErrorKind, ErrorReporter, ResolveError, Severity, ShimError, Site};
pub use proxy::{resolve_proxy, ProxyOutcome};
pub use registry::{Registry, WorkItem};
pub use resolver::{MemberStub, Resolution, ResolveOptions, ResolvedContract, Resolver};
pub use target::{select_candidate, MemberMatch, Selection, TargetDescriptor, TargetMember};
