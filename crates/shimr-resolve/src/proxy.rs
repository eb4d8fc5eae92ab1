//! Proxy behaviour resolution.
//!
//! A proxied member is served by a static member of an external type that
//! either adds a member the underlying target lacks, or overrides one it
//! already has. The behaviour is checked against the underlying target
//! before any proxy member is matched.

use shimr_core::{ProxyBehaviour, ProxyDirective, TypeCatalog};

use crate::contract::{Contract, ContractMember};
use crate::diagnostics::{ResolveError, ShimError, Site};
use crate::target::{select_candidate, Selection, TargetDescriptor};

/// Outcome of preparing a proxy target for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    Ready(TargetDescriptor),
    Rejected(ShimError),
}

/// Default behaviour when none is stated: override an existing member,
/// otherwise add one.
pub fn default_behaviour(
    underlying: &TargetDescriptor,
    member: &ContractMember,
    catalog: &dyn TypeCatalog,
) -> Result<ProxyBehaviour, ResolveError> {
    Ok(if underlying.exposes(member.lookup_name(), catalog)? {
        ProxyBehaviour::Override
    } else {
        ProxyBehaviour::Add
    })
}

/// Validates `directive` against `underlying` and builds the proxy descriptor.
pub fn resolve_proxy(
    catalog: &dyn TypeCatalog,
    contract: &Contract,
    member: &ContractMember,
    directive: &ProxyDirective,
    underlying: TargetDescriptor,
) -> Result<ProxyOutcome, ResolveError> {
    let lookup = member.lookup_name();
    let site = Site::Member {
        contract: contract.identity,
        member: member.id,
    };
    let behaviour = match directive.behaviour {
        Some(behaviour) => behaviour,
        None => default_behaviour(&underlying, member, catalog)?,
    };

    let overridden = match behaviour {
        ProxyBehaviour::Add => {
            if underlying.exposes(lookup, catalog)? {
                return Ok(ProxyOutcome::Rejected(ShimError::ConflictingAdd {
                    site,
                    contract: contract.display_name.clone(),
                    member: member.name.clone(),
                    target: catalog.display_name(underlying.ty()),
                }));
            }
            None
        }
        ProxyBehaviour::Override => {
            match select_candidate(underlying.candidate_members(member, catalog)?) {
                Selection::One(found) => Some(found.member.id),
                Selection::Ambiguous(candidates) => {
                    return Ok(ProxyOutcome::Rejected(ShimError::AmbiguousMatch {
                        site,
                        contract: contract.display_name.clone(),
                        member: member.name.clone(),
                        target: catalog.display_name(underlying.ty()),
                        candidates,
                    }));
                }
                Selection::None => {
                    return Ok(ProxyOutcome::Rejected(ShimError::MissingMember {
                        site,
                        contract: contract.display_name.clone(),
                        member: member.name.clone(),
                        target: catalog.display_name(underlying.ty()),
                    }));
                }
            }
        }
    };

    let implementation_name = directive.implementation_name.as_deref().unwrap_or(lookup);
    let descriptor = TargetDescriptor::proxy(
        catalog,
        directive.proxy_type,
        implementation_name,
        underlying,
        behaviour,
        overridden,
    )?;
    tracing::trace!(
        contract = %contract.display_name,
        member = %member.name,
        ?behaviour,
        "proxy target prepared"
    );
    Ok(ProxyOutcome::Ready(descriptor))
}
