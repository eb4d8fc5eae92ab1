//! Contracts and their members.
//!
//! A [`Contract`] is built once from an interface [`TypeDef`](shimr_core::TypeDef)
//! and then annotated during discovery (instance targets attached, explicit
//! member targets set). The resolver reads it but never changes it.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use shimr_core::{
    Accessors, CoreError, MemberDef, MemberId, MemberKind, ParamDef, ProxyBehaviour,
    ProxyDirective, TypeCatalog, TypeId,
};

use crate::binding::Accessor;

/// Whether a contract wraps a live object or only produces values from
/// static/external targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Instance,
    Factory,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Instance => write!(f, "instance"),
            Flavor::Factory => write!(f, "factory"),
        }
    }
}

/// Registry key of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractKey {
    pub identity: TypeId,
    pub flavor: Flavor,
}

/// One required capability of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMember {
    pub id: MemberId,
    /// Position within the contract, inherited members included.
    pub ordinal: usize,
    pub name: String,
    pub kind: MemberKind,
    pub params: Vec<ParamDef>,
    pub ty: TypeId,
    pub accessors: Accessors,
    pub alias: Option<String>,
    pub static_target: Option<TypeId>,
    pub proxy: Option<ProxyDirective>,
    pub constructor: bool,
}

impl ContractMember {
    fn from_def(id: MemberId, ordinal: usize, def: &MemberDef) -> Self {
        ContractMember {
            id,
            ordinal,
            name: def.name.clone(),
            kind: def.kind,
            params: def.params.clone(),
            ty: def.ty,
            accessors: def.accessors,
            alias: def.hints.alias.clone(),
            static_target: def.hints.static_target,
            proxy: def.hints.proxy.clone(),
            constructor: def.hints.constructor,
        }
    }

    /// Name to look for on the target: the alias if present, else the member's own name.
    pub fn lookup_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Accessors to bind separately; `[None]` for methods and events.
    pub fn requested_accessors(&self) -> Vec<Option<Accessor>> {
        if !(self.kind.is_accessor() || self.kind == MemberKind::Indexer) {
            return vec![None];
        }
        let mut out = Vec::with_capacity(3);
        if self.accessors.get {
            out.push(Some(Accessor::Get));
        }
        if self.accessors.set {
            out.push(Some(Accessor::Set));
        }
        if self.accessors.init {
            out.push(Some(Accessor::Init));
        }
        out
    }

    /// Whether the member carries any explicit redirection.
    pub fn is_redirected(&self) -> bool {
        self.static_target.is_some() || self.proxy.is_some() || self.constructor
    }
}

/// An interface-shaped set of members some target must be made to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub identity: TypeId,
    pub flavor: Flavor,
    pub display_name: String,
    /// Deterministic, collision-free name for the synthesized implementation.
    pub implementation_name: String,
    pub members: Vec<ContractMember>,
    pub static_target: Option<TypeId>,
    /// Instance types adapted to this contract, in discovery order.
    pub instance_targets: IndexSet<TypeId>,
}

impl Contract {
    /// Builds the contract for `identity` from its type description.
    ///
    /// Members are taken in declaration order, inherited interface members
    /// after the contract's own. Constructors and static members of the
    /// interface itself are not contract members.
    pub fn new(
        catalog: &dyn TypeCatalog,
        identity: TypeId,
        flavor: Flavor,
    ) -> Result<Contract, CoreError> {
        let def = catalog.require(identity)?;
        let members = catalog
            .members(identity)?
            .into_iter()
            .filter(|(_, m)| !m.is_static && m.kind != MemberKind::Constructor)
            .enumerate()
            .map(|(ordinal, (id, m))| ContractMember::from_def(id, ordinal, m))
            .collect();

        let full_name = def.full_name();
        Ok(Contract {
            identity,
            flavor,
            implementation_name: implementation_name(&full_name, &def.name, flavor),
            display_name: full_name,
            members,
            static_target: def.static_target,
            instance_targets: IndexSet::new(),
        })
    }

    pub fn key(&self) -> ContractKey {
        ContractKey {
            identity: self.identity,
            flavor: self.flavor,
        }
    }

    pub fn member(&self, id: MemberId) -> Option<&ContractMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Attaches an instance target; returns `false` if it was already known.
    pub fn add_target(&mut self, instance: TypeId) -> bool {
        self.instance_targets.insert(instance)
    }

    /// Records an explicit target discovered for one member.
    ///
    /// Without a behaviour the target becomes the member's static target;
    /// with one it becomes a proxy directive. Returns `false` if the member
    /// is not part of this contract.
    pub fn set_member_target(
        &mut self,
        member: MemberId,
        target: TypeId,
        behaviour: Option<ProxyBehaviour>,
    ) -> bool {
        let Some(m) = self.members.iter_mut().find(|m| m.id == member) else {
            return false;
        };
        match behaviour {
            None => m.static_target = Some(target),
            Some(behaviour) => {
                let implementation_name = m.proxy.as_ref().and_then(|p| p.implementation_name.clone());
                m.proxy = Some(ProxyDirective {
                    proxy_type: target,
                    behaviour: Some(behaviour),
                    implementation_name,
                });
            }
        }
        true
    }
}

/// `Shim__{hash}_{name}` / `ShimFactory__{hash}_{name}`.
fn implementation_name(full_name: &str, name: &str, flavor: Flavor) -> String {
    let hash = blake3::hash(full_name.as_bytes()).to_hex();
    let prefix = match flavor {
        Flavor::Instance => "Shim",
        Flavor::Factory => "ShimFactory",
    };
    format!("{prefix}__{}_{}", &hash.as_str()[..16], sanitize(name))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
