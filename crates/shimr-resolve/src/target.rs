//! Target Descriptors and member matching.
//!
//! A [`TargetDescriptor`] is one of exactly three things a contract member
//! can be resolved against: the adapted instance's own type, an explicitly
//! named static type, or a proxy type standing in front of one of those.
//! Each variant answers the same two questions: which of its members could
//! serve a contract member ([`candidate_members`](TargetDescriptor::candidate_members)),
//! and what binding a chosen match produces ([`make_binding`](TargetDescriptor::make_binding)).
//!
//! Finding no candidate is not an error here; the caller decides what an
//! empty result means for the member being resolved.

use smallvec::SmallVec;
use shimr_core::{
    Accessors, CoreError, MemberDef, MemberId, MemberKind, ProxyBehaviour, TypeCatalog, TypeId,
};

use crate::binding::{
    Accessor, Binding, Conversions, ParamConversion, Strategy, TargetKind, TargetRef,
};
use crate::compat::{self, Compat};
use crate::contract::{Contract, ContractMember};

/// A concrete member found on a target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMember {
    pub id: MemberId,
    pub name: String,
    pub kind: MemberKind,
    pub is_static: bool,
    pub params: SmallVec<[TypeId; 4]>,
    pub ty: TypeId,
    /// Effective accessors; a field is readable, and writable unless read-only.
    pub accessors: Accessors,
}

impl TargetMember {
    pub fn from_def(id: MemberId, def: &MemberDef) -> Self {
        let accessors = match def.kind {
            MemberKind::Field => Accessors {
                get: true,
                set: !def.read_only,
                init: !def.read_only,
            },
            _ => def.accessors,
        };
        TargetMember {
            id,
            name: def.name.clone(),
            kind: def.kind,
            is_static: def.is_static,
            params: def.params.iter().map(|p| p.ty).collect(),
            ty: def.ty,
            accessors,
        }
    }
}

/// A target member that can serve a contract member, with the conversions it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMatch {
    pub member: TargetMember,
    pub conversions: Conversions,
}

/// Result of picking one match out of several candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    None,
    One(MemberMatch),
    Ambiguous(usize),
}

/// Picks the best candidate: fewest conversions wins, ties are ambiguous.
pub fn select_candidate(matches: Vec<MemberMatch>) -> Selection {
    let Some(best) = matches.iter().map(|m| m.conversions.cost()).min() else {
        return Selection::None;
    };
    let mut best_matches: Vec<MemberMatch> = matches
        .into_iter()
        .filter(|m| m.conversions.cost() == best)
        .collect();
    if best_matches.len() == 1 {
        Selection::One(best_matches.remove(0))
    } else {
        Selection::Ambiguous(best_matches.len())
    }
}

/// What a contract member is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDescriptor {
    /// The runtime type of the adapted object.
    Instance { ty: TypeId },
    /// An explicitly named type whose static members (or constructors) are used.
    Static { ty: TypeId },
    /// An external type adding or overriding a member of `underlying`.
    Proxy {
        ty: TypeId,
        underlying: Box<TargetDescriptor>,
        behaviour: ProxyBehaviour,
        /// Overrides only: the underlying member being replaced.
        overridden: Option<MemberId>,
        /// Members of `ty` under the proxy's implementation name.
        candidates: Vec<TargetMember>,
    },
}

impl TargetDescriptor {
    pub fn ty(&self) -> TypeId {
        match self {
            TargetDescriptor::Instance { ty }
            | TargetDescriptor::Static { ty }
            | TargetDescriptor::Proxy { ty, .. } => *ty,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            TargetDescriptor::Instance { .. } => TargetKind::Instance,
            TargetDescriptor::Static { .. } => TargetKind::Static,
            TargetDescriptor::Proxy { .. } => TargetKind::Proxy,
        }
    }

    /// Builds a proxy descriptor, collecting the static members of
    /// `proxy_type` named `implementation_name`.
    pub fn proxy(
        catalog: &dyn TypeCatalog,
        proxy_type: TypeId,
        implementation_name: &str,
        underlying: TargetDescriptor,
        behaviour: ProxyBehaviour,
        overridden: Option<MemberId>,
    ) -> Result<TargetDescriptor, CoreError> {
        let candidates = catalog
            .members(proxy_type)?
            .into_iter()
            .filter(|(_, m)| m.is_static && m.kind != MemberKind::Constructor)
            .filter(|(_, m)| m.name == implementation_name)
            .map(|(id, m)| TargetMember::from_def(id, m));
        let candidates = most_derived(candidates);
        Ok(TargetDescriptor::Proxy {
            ty: proxy_type,
            underlying: Box::new(underlying),
            behaviour,
            overridden,
            candidates,
        })
    }

    /// Members of this target that could be bound to `member`, in target
    /// declaration order. Overloads may yield more than one.
    pub fn candidate_members(
        &self,
        member: &ContractMember,
        catalog: &dyn TypeCatalog,
    ) -> Result<Vec<MemberMatch>, CoreError> {
        match self {
            TargetDescriptor::Instance { ty } => {
                Ok(self.named_members(*ty, member.lookup_name(), false, catalog)?
                    .into_iter()
                    .filter_map(|t| match_signature(member, t, None, catalog))
                    .collect())
            }
            TargetDescriptor::Static { ty } if member.constructor => Ok(catalog
                .members(*ty)?
                .into_iter()
                .filter(|(id, m)| id.owner == *ty && m.kind == MemberKind::Constructor)
                .map(|(id, m)| TargetMember::from_def(id, m))
                .filter_map(|t| match_signature(member, t, None, catalog))
                .collect()),
            TargetDescriptor::Static { ty } => {
                Ok(self.named_members(*ty, member.lookup_name(), true, catalog)?
                    .into_iter()
                    .filter_map(|t| match_signature(member, t, None, catalog))
                    .collect())
            }
            TargetDescriptor::Proxy {
                underlying,
                candidates,
                ..
            } => {
                let instance = match underlying.as_ref() {
                    TargetDescriptor::Instance { ty } => Some(*ty),
                    _ => None,
                };
                Ok(candidates
                    .iter()
                    .cloned()
                    .filter_map(|t| match_signature(member, t, instance, catalog))
                    .collect())
            }
        }
    }

    /// Whether the target exposes any member under `name`, whatever its
    /// kind or signature. Checked before Add/Override decisions.
    pub fn exposes(&self, name: &str, catalog: &dyn TypeCatalog) -> Result<bool, CoreError> {
        let statics = !matches!(self, TargetDescriptor::Instance { .. });
        Ok(!self.named_members(self.ty(), name, statics, catalog)?.is_empty())
    }

    fn named_members(
        &self,
        ty: TypeId,
        name: &str,
        statics: bool,
        catalog: &dyn TypeCatalog,
    ) -> Result<Vec<TargetMember>, CoreError> {
        Ok(most_derived(
            catalog
                .members(ty)?
                .into_iter()
                .filter(|(_, m)| m.kind != MemberKind::Constructor)
                .filter(|(_, m)| m.is_static == statics && m.name == name)
                .map(|(id, m)| TargetMember::from_def(id, m)),
        ))
    }

    /// Produces the bindings for one resolved member: one per requested
    /// accessor for properties, fields and indexers, one otherwise.
    pub fn make_binding(
        &self,
        contract: &Contract,
        instance: Option<TypeId>,
        member: &ContractMember,
        matched: &MemberMatch,
    ) -> Vec<Binding> {
        let target = TargetRef {
            kind: self.kind(),
            ty: self.ty(),
            proxied: match self {
                TargetDescriptor::Proxy { underlying, .. } => Some(underlying.ty()),
                _ => None,
            },
        };
        let overridden = match self {
            TargetDescriptor::Proxy { overridden, .. } => *overridden,
            _ => None,
        };

        member
            .requested_accessors()
            .into_iter()
            .map(|accessor| Binding {
                contract: contract.identity,
                flavor: contract.flavor,
                member: member.id,
                ordinal: member.ordinal,
                accessor,
                instance,
                target,
                target_member: matched.member.id,
                overridden,
                strategy: self.strategy(member, accessor, &matched.conversions),
                conversions: matched.conversions.clone(),
            })
            .collect()
    }

    fn strategy(
        &self,
        member: &ContractMember,
        accessor: Option<Accessor>,
        conversions: &Conversions,
    ) -> Strategy {
        match self {
            TargetDescriptor::Proxy {
                behaviour: ProxyBehaviour::Add,
                ..
            } => Strategy::ProxyAdd,
            TargetDescriptor::Proxy {
                behaviour: ProxyBehaviour::Override,
                ..
            } => Strategy::ProxyOverride,
            TargetDescriptor::Static { .. } if member.constructor => Strategy::ConstructorFactory,
            TargetDescriptor::Static { .. } => Strategy::StaticRedirect,
            TargetDescriptor::Instance { .. } => {
                if conversions.value.is_some() {
                    if accessor.is_some_and(Accessor::is_write) {
                        Strategy::UnshimCast
                    } else {
                        Strategy::ShimmedReturn
                    }
                } else if !conversions.params.is_empty() {
                    Strategy::ShimmedParameter
                } else {
                    Strategy::Direct
                }
            }
        }
    }
}

/// Drops members hidden by a redeclaration with the same name, kind and
/// parameter list. `members` must list a type's own members before its
/// bases', so the redeclaration is the one kept.
fn most_derived(members: impl IntoIterator<Item = TargetMember>) -> Vec<TargetMember> {
    let mut kept: Vec<TargetMember> = Vec::new();
    for member in members {
        let hidden = kept
            .iter()
            .any(|k| k.name == member.name && k.kind == member.kind && k.params == member.params);
        if !hidden {
            kept.push(member);
        }
    }
    kept
}

/// Checks kind, accessors, parameters and value type of `target` against
/// `member`. `instance` enables extension-style matching, where the target
/// takes the adapted instance as an extra leading parameter.
fn match_signature(
    member: &ContractMember,
    target: TargetMember,
    instance: Option<TypeId>,
    catalog: &dyn TypeCatalog,
) -> Option<MemberMatch> {
    let kind_ok = if member.constructor {
        target.kind == MemberKind::Constructor
    } else {
        match member.kind {
            MemberKind::Field | MemberKind::Property => {
                target.kind.is_accessor() && target.params.is_empty()
            }
            other => target.kind == other,
        }
    };
    if !kind_ok || !accessors_satisfied(member, &target) {
        return None;
    }

    let mut conversions = Conversions::default();
    let mut target_params: &[TypeId] = &target.params;
    if let Some(instance) = instance {
        if target_params.len() == member.params.len() + 1
            && catalog.is_assignable(instance, target_params[0])
        {
            target_params = &target_params[1..];
            conversions.instance_param = true;
        }
    }
    if target_params.len() != member.params.len() {
        return None;
    }
    for (index, (param, target_ty)) in member.params.iter().zip(target_params).enumerate() {
        match compat::compare_param(param, *target_ty, catalog) {
            Compat::Exact => {}
            Compat::Nested(conversion) => conversions.params.push(ParamConversion { index, conversion }),
            Compat::Incompatible => return None,
        }
    }

    match compat::compare(member.ty, target.ty, catalog) {
        Compat::Exact => {}
        Compat::Nested(conversion) => conversions.value = Some(conversion),
        Compat::Incompatible => return None,
    }

    Some(MemberMatch {
        member: target,
        conversions,
    })
}

fn accessors_satisfied(member: &ContractMember, target: &TargetMember) -> bool {
    if !(member.kind.is_accessor() || member.kind == MemberKind::Indexer) {
        return true;
    }
    let want = member.accessors;
    let have = target.accessors;
    (!want.get || have.get) && (!want.set || have.set) && (!want.init || have.init || have.set)
}
