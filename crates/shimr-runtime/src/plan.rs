//! Adapter plans: the dispatch table behind every adapter.
//!
//! A plan is built once per (contract, runtime type) pair with the same
//! member matching the ahead-of-time resolver uses, restricted to the
//! adapted instance as target. Each contract member accessor maps to a
//! [`Slot`] that records where the call goes and which values cross the
//! boundary as nested adapters.

use std::collections::HashMap;

use shimr_core::{MemberKind, TypeCatalog, TypeId, TypeKind};
use shimr_resolve::{
    select_candidate, Accessor, Binding, Contract, ContractMember, Conversions, Flavor, Selection,
    Strategy, TargetDescriptor,
};

use crate::error::RuntimeError;
use crate::value::Value;

/// How the caller addresses a contract member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub name: String,
    pub arity: usize,
    pub accessor: Option<Accessor>,
}

impl SlotKey {
    pub fn new(name: &str, arity: usize, accessor: Option<Accessor>) -> Self {
        SlotKey {
            name: name.to_string(),
            arity,
            accessor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Bound {
        /// Member name on the target.
        target_name: String,
        target_kind: MemberKind,
        strategy: Strategy,
        conversions: Conversions,
    },
    /// Lenient adapter, no matching target member.
    NotImplemented,
}

/// One contract overload under a [`SlotKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct Overload {
    /// Declared contract parameter types.
    params: Vec<TypeId>,
    slot: Slot,
}

/// Dispatch table for one (contract, runtime type) pair.
#[derive(Debug, Clone)]
pub struct AdapterPlan {
    pub contract: TypeId,
    pub contract_name: String,
    pub target: TypeId,
    pub target_name: String,
    slots: HashMap<SlotKey, Vec<Overload>>,
    bindings: Vec<Binding>,
}

impl AdapterPlan {
    /// Matches every member of `contract` against `target`.
    ///
    /// With `lenient` set, unmatched members become [`Slot::NotImplemented`]
    /// instead of failing the whole plan.
    pub fn build(
        catalog: &dyn TypeCatalog,
        contract: TypeId,
        target: TypeId,
        lenient: bool,
    ) -> Result<AdapterPlan, RuntimeError> {
        if !catalog.is_interface(contract) {
            return Err(RuntimeError::NotAContract {
                contract: catalog.display_name(contract),
            });
        }
        let contract = Contract::new(catalog, contract, Flavor::Instance)?;
        let descriptor = TargetDescriptor::Instance { ty: target };
        let target_name = catalog.display_name(target);

        let mut slots: HashMap<SlotKey, Vec<Overload>> = HashMap::new();
        let mut bindings = Vec::new();
        for member in &contract.members {
            if member.is_redirected() {
                return Err(RuntimeError::UnsupportedRedirect {
                    contract: contract.display_name.clone(),
                    member: member.name.clone(),
                });
            }
            match select_candidate(descriptor.candidate_members(member, catalog)?) {
                Selection::One(matched) => {
                    for binding in descriptor.make_binding(&contract, Some(target), member, &matched) {
                        let slot = Slot::Bound {
                            target_name: matched.member.name.clone(),
                            target_kind: matched.member.kind,
                            strategy: binding.strategy,
                            conversions: binding.conversions.clone(),
                        };
                        add_overload(&mut slots, &contract, member, binding.accessor, slot, &target_name)?;
                        bindings.push(binding);
                    }
                }
                Selection::None if lenient => {
                    tracing::debug!(
                        contract = %contract.display_name,
                        member = %member.name,
                        "stubbing missing member"
                    );
                    for accessor in member.requested_accessors() {
                        add_overload(
                            &mut slots,
                            &contract,
                            member,
                            accessor,
                            Slot::NotImplemented,
                            &target_name,
                        )?;
                    }
                }
                Selection::None => {
                    return Err(RuntimeError::MissingMember {
                        contract: contract.display_name.clone(),
                        member: member.name.clone(),
                        target: target_name,
                    });
                }
                Selection::Ambiguous(members) => {
                    return Err(RuntimeError::AmbiguousMatch {
                        contract: contract.display_name.clone(),
                        member: member.name.clone(),
                        target: target_name,
                        members,
                    });
                }
            }
        }

        Ok(AdapterPlan {
            contract: contract.identity,
            contract_name: contract.display_name,
            target,
            target_name,
            slots,
            bindings,
        })
    }

    /// The slot for `key`, if exactly one contract overload lives there.
    pub fn slot(&self, key: &SlotKey) -> Option<&Slot> {
        match self.slots.get(key).map(Vec::as_slice) {
            Some([only]) => Some(&only.slot),
            _ => None,
        }
    }

    pub fn contains(&self, key: &SlotKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of contract overloads sharing `key`.
    pub fn overloads(&self, key: &SlotKey) -> usize {
        self.slots.get(key).map_or(0, Vec::len)
    }

    /// Picks the slot a call with `args` dispatches to.
    ///
    /// Overloads sharing a name and arity are told apart by the runtime
    /// types of the arguments. `Ok(None)` means the contract has no member
    /// under `key` at all.
    pub fn select(
        &self,
        key: &SlotKey,
        args: &[Value],
        catalog: &dyn TypeCatalog,
    ) -> Result<Option<&Slot>, RuntimeError> {
        let overloads = match self.slots.get(key) {
            None => return Ok(None),
            Some(overloads) => overloads,
        };
        if let [only] = overloads.as_slice() {
            return Ok(Some(&only.slot));
        }
        let mut accepting = overloads.iter().filter(|o| {
            o.params.len() == args.len()
                && o.params.iter().zip(args).all(|(ty, arg)| accepts(*ty, arg, catalog))
        });
        match (accepting.next(), accepting.count()) {
            (Some(overload), 0) => Ok(Some(&overload.slot)),
            (Some(_), more) => Err(RuntimeError::AmbiguousMatch {
                contract: self.contract_name.clone(),
                member: key.name.clone(),
                target: self.target_name.clone(),
                members: more + 1,
            }),
            (None, _) => Err(RuntimeError::NoMatchingOverload {
                contract: self.contract_name.clone(),
                member: key.name.clone(),
                args: args.iter().map(Value::describe).collect::<Vec<_>>().join(", "),
            }),
        }
    }

    /// The bindings this plan was built from, in member declaration order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn is_complete(&self) -> bool {
        !self
            .slots
            .values()
            .flatten()
            .any(|o| matches!(o.slot, Slot::NotImplemented))
    }
}

/// Registers `slot` under the member's key. The same parameter list twice
/// is fine when both resolve identically (a member inherited through two
/// bases); otherwise no call could tell them apart.
fn add_overload(
    slots: &mut HashMap<SlotKey, Vec<Overload>>,
    contract: &Contract,
    member: &ContractMember,
    accessor: Option<Accessor>,
    slot: Slot,
    target_name: &str,
) -> Result<(), RuntimeError> {
    let params: Vec<TypeId> = member.params.iter().map(|p| p.ty).collect();
    let overloads = slots.entry(slot_key(member, accessor)).or_default();
    match overloads.iter().find(|o| o.params == params) {
        Some(existing) if existing.slot == slot => Ok(()),
        Some(_) => Err(RuntimeError::AmbiguousMatch {
            contract: contract.display_name.clone(),
            member: member.name.clone(),
            target: target_name.to_string(),
            members: 2,
        }),
        None => {
            overloads.push(Overload { params, slot });
            Ok(())
        }
    }
}

/// Whether `arg` can be passed where the contract declares `ty`.
fn accepts(ty: TypeId, arg: &Value, catalog: &dyn TypeCatalog) -> bool {
    match arg {
        Value::Unit => catalog
            .get(ty)
            .is_some_and(|def| def.kind != TypeKind::Primitive),
        Value::Array(items) => match catalog.get(ty).map(|def| def.kind) {
            Some(TypeKind::Array { element }) => items.iter().all(|i| accepts(element, i, catalog)),
            _ => ty == TypeId::OBJECT,
        },
        Value::Object(object) => catalog.is_assignable(object.runtime_type(), ty),
        Value::Shim(adapter) => {
            catalog.is_assignable(adapter.contract(), ty)
                || catalog.is_assignable(adapter.plan().target, ty)
        }
        scalar => scalar
            .builtin_type()
            .is_some_and(|builtin| catalog.is_assignable(builtin, ty)),
    }
}

fn slot_key(member: &ContractMember, accessor: Option<Accessor>) -> SlotKey {
    let arity = match (member.kind, accessor) {
        (MemberKind::Indexer, _) | (MemberKind::Method, _) => member.params.len(),
        _ => 0,
    };
    SlotKey::new(&member.name, arity, accessor)
}
