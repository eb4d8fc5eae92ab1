//! Fixpoint resolution of every contract in a [`Registry`].
//!
//! Each pass snapshots the contracts with pending work, resolves them, and
//! marks the snapshot done. Resolving a member can register nested
//! contracts (or new instance targets of known ones), which the next pass
//! picks up. The loop ends on the first empty snapshot.
//!
//! Contracts within one snapshot are independent and may be processed in
//! parallel; the loop itself is strictly sequential.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shimr_core::{MemberId, TypeCatalog, TypeId, TypeKind};

use crate::binding::Binding;
use crate::contract::{Contract, ContractMember, Flavor};
use crate::diagnostics::{ResolveError, Severity, ShimError, Site};
use crate::proxy::{resolve_proxy, ProxyOutcome};
use crate::registry::{Registry, WorkItem};
use crate::target::{select_candidate, Selection, TargetDescriptor};

/// Resolver settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Fan each snapshot out over the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
    /// Contracts whose missing members become throwing stubs instead of errors.
    #[serde(default)]
    pub ignore_missing: BTreeSet<TypeId>,
}

/// A contract member that will be emitted as a not-implemented stub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberStub {
    pub member: MemberId,
    pub ordinal: usize,
    pub name: String,
    pub instance: Option<TypeId>,
}

/// Everything resolved for one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContract {
    pub contract: Contract,
    /// Ordered by member declaration order.
    pub bindings: Vec<Binding>,
    pub stubs: Vec<MemberStub>,
}

/// Result of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// In registration order.
    pub contracts: Vec<ResolvedContract>,
    pub errors: Vec<ShimError>,
    /// Each contract that received a resolution pass, once, in first-processed order.
    pub processed: Vec<TypeId>,
    pub passes: usize,
}

impl Resolution {
    pub fn bindings_for(&self, contract: TypeId) -> &[Binding] {
        self.contracts
            .iter()
            .find(|c| c.contract.identity == contract)
            .map_or(&[], |c| c.bindings.as_slice())
    }

    pub fn contract(&self, contract: TypeId) -> Option<&ResolvedContract> {
        self.contracts.iter().find(|c| c.contract.identity == contract)
    }

    pub fn all_bindings(&self) -> impl Iterator<Item = &Binding> {
        self.contracts.iter().flat_map(|c| c.bindings.iter())
    }

    /// Whether any diagnostic fails the build.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity() == Severity::Error)
    }
}

#[derive(Debug, Default)]
struct Outcome {
    bindings: Vec<Binding>,
    stubs: Vec<MemberStub>,
    errors: Vec<ShimError>,
}

#[derive(Debug, Default)]
struct Accumulated {
    bindings: IndexSet<Binding>,
    stubs: IndexSet<MemberStub>,
}

/// Drives a [`Registry`] to its fixpoint.
pub struct Resolver<'r> {
    registry: &'r Registry,
    options: ResolveOptions,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry, options: ResolveOptions) -> Self {
        Resolver { registry, options }
    }

    fn catalog(&self) -> &dyn TypeCatalog {
        self.registry.catalog()
    }

    /// Runs passes until no contract has pending work.
    ///
    /// Calling it again after more discovery requests resolves only what
    /// those requests added.
    pub fn resolve(&self) -> Result<Resolution, ResolveError> {
        let mut results: IndexMap<TypeId, Accumulated> = IndexMap::new();
        let mut processed: IndexSet<TypeId> = IndexSet::new();
        let mut passes = 0;

        loop {
            let items = self.registry.pending();
            if items.is_empty() {
                break;
            }
            passes += 1;
            tracing::debug!(pass = passes, contracts = items.len(), "resolution pass");

            let outcomes: Vec<Outcome> = if self.options.parallel {
                items
                    .par_iter()
                    .map(|item| self.process(item))
                    .collect::<Result<_, _>>()?
            } else {
                items
                    .iter()
                    .map(|item| self.process(item))
                    .collect::<Result<_, _>>()?
            };
            self.registry.mark_processed(&items);

            let mut reported = self.registry.reporter().snapshot();
            for (item, outcome) in items.iter().zip(outcomes) {
                let identity = item.contract.identity;
                processed.insert(identity);
                let acc = results.entry(identity).or_default();
                if item.first_pass {
                    // A first pass covers every target; drop anything an
                    // earlier, since invalidated, pass produced.
                    acc.bindings.clear();
                    acc.stubs.clear();
                }
                acc.bindings.extend(outcome.bindings);
                acc.stubs.extend(outcome.stubs);
                for error in outcome.errors {
                    if !reported.contains(&error) {
                        reported.push(error.clone());
                        self.registry.reporter().report(error);
                    }
                }
            }
        }

        let contracts: Vec<ResolvedContract> = self
            .registry
            .contracts()
            .into_iter()
            .map(|contract| {
                let acc = results.swap_remove(&contract.identity).unwrap_or_default();
                let mut bindings: Vec<Binding> = acc.bindings.into_iter().collect();
                bindings.sort_by_key(|b| b.ordinal);
                let mut stubs: Vec<MemberStub> = acc.stubs.into_iter().collect();
                stubs.sort_by_key(|s| s.ordinal);
                ResolvedContract {
                    contract,
                    bindings,
                    stubs,
                }
            })
            .collect();

        let resolution = Resolution {
            contracts,
            errors: self.registry.reporter().snapshot(),
            processed: processed.into_iter().collect(),
            passes,
        };
        tracing::info!(
            contracts = resolution.contracts.len(),
            bindings = resolution.all_bindings().count(),
            errors = resolution.errors.len(),
            passes,
            "resolution complete"
        );
        Ok(resolution)
    }

    /// Resolves one snapshot entry: every member against every new target.
    fn process(&self, item: &WorkItem) -> Result<Outcome, ResolveError> {
        let contract = &item.contract;
        let instances: Vec<Option<TypeId>> = match contract.flavor {
            Flavor::Factory if item.first_pass => vec![None],
            Flavor::Factory => Vec::new(),
            Flavor::Instance => item.targets.iter().copied().map(Some).collect(),
        };
        tracing::debug!(
            contract = %contract.display_name,
            flavor = %contract.flavor,
            targets = instances.len(),
            "resolving contract"
        );

        let mut out = Outcome::default();
        for instance in instances {
            for member in &contract.members {
                self.resolve_member(contract, member, instance, &mut out)?;
            }
        }
        Ok(out)
    }

    fn resolve_member(
        &self,
        contract: &Contract,
        member: &ContractMember,
        instance: Option<TypeId>,
        out: &mut Outcome,
    ) -> Result<(), ResolveError> {
        let catalog = self.catalog();
        let Some(descriptor) = self.choose_target(contract, member, instance, out)? else {
            return Ok(());
        };

        if member.constructor && !self.check_constructor(contract, member, &descriptor, out) {
            return Ok(());
        }

        match select_candidate(descriptor.candidate_members(member, catalog)?) {
            Selection::One(matched) => {
                for nested in matched.conversions.nested() {
                    self.registry
                        .request_nested(contract.identity, nested.contract, nested.concrete)?;
                }
                out.bindings
                    .extend(descriptor.make_binding(contract, instance, member, &matched));
            }
            Selection::Ambiguous(candidates) => out.errors.push(ShimError::AmbiguousMatch {
                site: member_site(contract, member),
                contract: contract.display_name.clone(),
                member: member.name.clone(),
                target: catalog.display_name(descriptor.ty()),
                candidates,
            }),
            Selection::None => self.missing(contract, member, instance, descriptor.ty(), out),
        }
        Ok(())
    }

    /// Picks the target by precedence: member static target, member proxy,
    /// contract static target, then the adapted instance.
    fn choose_target(
        &self,
        contract: &Contract,
        member: &ContractMember,
        instance: Option<TypeId>,
        out: &mut Outcome,
    ) -> Result<Option<TargetDescriptor>, ResolveError> {
        if let Some(target) = member.static_target {
            return Ok(self
                .check_explicit(contract, member, target, out)
                .then_some(TargetDescriptor::Static { ty: target }));
        }

        if let Some(directive) = &member.proxy {
            if !self.check_explicit(contract, member, directive.proxy_type, out) {
                return Ok(None);
            }
            let Some(underlying) = self.default_target(contract, member, instance, out) else {
                return Ok(None);
            };
            return match resolve_proxy(self.catalog(), contract, member, directive, underlying)? {
                ProxyOutcome::Ready(descriptor) => Ok(Some(descriptor)),
                ProxyOutcome::Rejected(error) => {
                    out.errors.push(error);
                    Ok(None)
                }
            };
        }

        Ok(self.default_target(contract, member, instance, out))
    }

    /// The contract-level static target, else the adapted instance.
    fn default_target(
        &self,
        contract: &Contract,
        member: &ContractMember,
        instance: Option<TypeId>,
        out: &mut Outcome,
    ) -> Option<TargetDescriptor> {
        if let Some(target) = contract.static_target {
            return self
                .check_explicit(contract, member, target, out)
                .then_some(TargetDescriptor::Static { ty: target });
        }
        match instance {
            Some(ty) => Some(TargetDescriptor::Instance { ty }),
            None => {
                out.errors.push(ShimError::UnresolvedTarget {
                    site: member_site(contract, member),
                    contract: contract.display_name.clone(),
                    reason: format!(
                        "{} has no live instance and no static target",
                        member.name
                    ),
                });
                None
            }
        }
    }

    /// Explicit targets must be concrete types.
    fn check_explicit(
        &self,
        contract: &Contract,
        member: &ContractMember,
        target: TypeId,
        out: &mut Outcome,
    ) -> bool {
        let catalog = self.catalog();
        if target == TypeId::OBJECT {
            out.errors.push(ShimError::UnresolvedTarget {
                site: member_site(contract, member),
                contract: contract.display_name.clone(),
                reason: format!("explicit target of {} is object", member.name),
            });
            return false;
        }
        let concrete = catalog
            .get(target)
            .is_some_and(|def| def.kind.is_concrete() || def.kind == TypeKind::Primitive);
        if !concrete {
            out.errors.push(ShimError::InvalidExplicitTarget {
                site: member_site(contract, member),
                contract: contract.display_name.clone(),
                member: member.name.clone(),
                target: catalog.display_name(target),
            });
        }
        concrete
    }

    /// A constructor member needs a static target, and must return that
    /// type or an interface.
    fn check_constructor(
        &self,
        contract: &Contract,
        member: &ContractMember,
        descriptor: &TargetDescriptor,
        out: &mut Outcome,
    ) -> bool {
        let catalog = self.catalog();
        let TargetDescriptor::Static { ty } = descriptor else {
            out.errors.push(ShimError::UnresolvedTarget {
                site: member_site(contract, member),
                contract: contract.display_name.clone(),
                reason: format!("constructor member {} has no static target", member.name),
            });
            return false;
        };
        if member.ty == *ty || catalog.is_interface(member.ty) {
            return true;
        }
        out.errors.push(ShimError::ReturnTypeMismatch {
            site: member_site(contract, member),
            contract: contract.display_name.clone(),
            member: member.name.clone(),
            declared: catalog.display_name(member.ty),
            target: catalog.display_name(*ty),
        });
        false
    }

    fn missing(
        &self,
        contract: &Contract,
        member: &ContractMember,
        instance: Option<TypeId>,
        target: TypeId,
        out: &mut Outcome,
    ) {
        let site = member_site(contract, member);
        let target = self.catalog().display_name(target);
        if self.options.ignore_missing.contains(&contract.identity) {
            out.stubs.push(MemberStub {
                member: member.id,
                ordinal: member.ordinal,
                name: member.name.clone(),
                instance,
            });
            out.errors.push(ShimError::StubbedMember {
                site,
                contract: contract.display_name.clone(),
                member: member.name.clone(),
                target,
            });
        } else {
            out.errors.push(ShimError::MissingMember {
                site,
                contract: contract.display_name.clone(),
                member: member.name.clone(),
                target,
            });
        }
    }
}

fn member_site(contract: &Contract, member: &ContractMember) -> Site {
    Site::Member {
        contract: contract.identity,
        member: member.id,
    }
}
