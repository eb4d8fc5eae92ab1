//! The type-description model consumed by the resolution engine.
//!
//! A front end describes every type it knows about as a [`TypeDef`]: its
//! kind, its bases and its declared members. Contract types are simply
//! `Interface`-kind definitions; their members may carry [`MemberHints`]
//! (alias, explicit static target, proxy directive, constructor flag) that
//! steer how each member is bound.
//!
//! Nothing here refers to a particular compiler or language runtime.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::type_id::TypeId;

/// The shape of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Interface-shaped type; the only kind usable as a contract.
    Interface,
    /// Reference type with members.
    Class,
    /// Value type with members.
    Struct,
    /// Built-in scalar (bool, int, long, double, string).
    Primitive,
    /// Array of another described type.
    Array { element: TypeId },
    /// The untyped top type. Every type is assignable to it.
    Object,
    /// Absence of a value; only valid as a return type.
    Void,
}

impl TypeKind {
    /// Returns `true` for kinds that can be a concrete adaptation target.
    pub fn is_concrete(self) -> bool {
        matches!(self, TypeKind::Class | TypeKind::Struct)
    }
}

/// A described type: identity, kind, bases and declared members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    /// Base class and implemented interfaces, in declaration order.
    pub bases: SmallVec<[TypeId; 2]>,
    pub members: Vec<MemberDef>,
    /// Contract-level explicit static target, inherited by members that do
    /// not name their own.
    pub static_target: Option<TypeId>,
}

impl TypeDef {
    pub fn new(namespace: &str, name: &str, kind: TypeKind) -> Self {
        TypeDef {
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind,
            bases: SmallVec::new(),
            members: Vec::new(),
            static_target: None,
        }
    }

    pub fn interface(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, TypeKind::Interface)
    }

    pub fn class(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, TypeKind::Class)
    }

    pub fn with_base(mut self, base: TypeId) -> Self {
        self.bases.push(base);
        self
    }

    pub fn with_member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_static_target(mut self, target: TypeId) -> Self {
        self.static_target = Some(target);
        self
    }

    /// Namespace-qualified name, e.g. `App.Models.IUser`.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// What sort of member a [`MemberDef`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Field,
    Property,
    Method,
    Indexer,
    Event,
    Constructor,
}

impl MemberKind {
    /// Fields and properties are both matched as value accessors.
    pub fn is_accessor(self) -> bool {
        matches!(self, MemberKind::Field | MemberKind::Property)
    }
}

/// Which accessors a property, field or indexer exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Accessors {
    pub get: bool,
    pub set: bool,
    pub init: bool,
}

impl Accessors {
    pub const NONE: Accessors = Accessors { get: false, set: false, init: false };
    pub const GET: Accessors = Accessors { get: true, set: false, init: false };
    pub const SET: Accessors = Accessors { get: false, set: true, init: false };
    pub const GET_SET: Accessors = Accessors { get: true, set: true, init: false };
    pub const GET_INIT: Accessors = Accessors { get: true, set: false, init: true };
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub ty: TypeId,
    /// Explicit real type of a contract-typed parameter. When present the
    /// target parameter must be exactly this type.
    pub underlying: Option<TypeId>,
}

impl ParamDef {
    pub fn new(name: &str, ty: TypeId) -> Self {
        ParamDef {
            name: name.to_string(),
            ty,
            underlying: None,
        }
    }
}

/// Whether a proxied member must already exist on the target or must not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyBehaviour {
    Add,
    Override,
}

/// Redirects a contract member to a member of an external proxy type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyDirective {
    pub proxy_type: TypeId,
    /// `None` means "decide by probing the target".
    pub behaviour: Option<ProxyBehaviour>,
    /// Name of the member on the proxy type, if different from the contract member.
    pub implementation_name: Option<String>,
}

/// Binding hints attached to a contract member by the front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberHints {
    /// Name to match on the target instead of the member's own name.
    pub alias: Option<String>,
    /// Per-member explicit static target.
    pub static_target: Option<TypeId>,
    pub proxy: Option<ProxyDirective>,
    /// The member constructs its target type instead of calling a method.
    pub constructor: bool,
}

/// A declared member of a described type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDef {
    pub name: String,
    pub kind: MemberKind,
    pub is_static: bool,
    pub params: Vec<ParamDef>,
    /// Declared type of fields/properties/indexers/events, return type of methods.
    pub ty: TypeId,
    pub accessors: Accessors,
    /// Fields only: the field cannot be assigned after construction.
    pub read_only: bool,
    #[serde(default)]
    pub hints: MemberHints,
}

impl MemberDef {
    fn new(name: &str, kind: MemberKind, ty: TypeId, accessors: Accessors) -> Self {
        MemberDef {
            name: name.to_string(),
            kind,
            is_static: false,
            params: Vec::new(),
            ty,
            accessors,
            read_only: false,
            hints: MemberHints::default(),
        }
    }

    /// A property exposing the given accessors.
    pub fn property(name: &str, ty: TypeId, accessors: Accessors) -> Self {
        Self::new(name, MemberKind::Property, ty, accessors)
    }

    /// A mutable field.
    pub fn field(name: &str, ty: TypeId) -> Self {
        Self::new(name, MemberKind::Field, ty, Accessors::GET_SET)
    }

    /// A field that can only be read.
    pub fn readonly_field(name: &str, ty: TypeId) -> Self {
        let mut member = Self::new(name, MemberKind::Field, ty, Accessors::GET);
        member.read_only = true;
        member
    }

    pub fn method(name: &str, params: &[TypeId], returns: TypeId) -> Self {
        let mut member = Self::new(name, MemberKind::Method, returns, Accessors::NONE);
        member.params = params
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamDef::new(&format!("arg{i}"), *ty))
            .collect();
        member
    }

    pub fn indexer(params: &[TypeId], ty: TypeId, accessors: Accessors) -> Self {
        let mut member = Self::new("Item", MemberKind::Indexer, ty, accessors);
        member.params = params
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamDef::new(&format!("index{i}"), *ty))
            .collect();
        member
    }

    pub fn event(name: &str, handler: TypeId) -> Self {
        Self::new(name, MemberKind::Event, handler, Accessors::NONE)
    }

    pub fn constructor(params: &[TypeId], owner: TypeId) -> Self {
        let mut member = Self::method(".ctor", params, owner);
        member.kind = MemberKind::Constructor;
        member.is_static = true;
        member
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.hints.alias = Some(alias.to_string());
        self
    }

    pub fn with_static_target(mut self, target: TypeId) -> Self {
        self.hints.static_target = Some(target);
        self
    }

    pub fn with_proxy(mut self, proxy_type: TypeId, behaviour: Option<ProxyBehaviour>) -> Self {
        self.hints.proxy = Some(ProxyDirective {
            proxy_type,
            behaviour,
            implementation_name: None,
        });
        self
    }

    pub fn as_constructor(mut self) -> Self {
        self.hints.constructor = true;
        self
    }

    /// Marks parameter `index` as carrying a contract over `underlying`.
    pub fn with_underlying_param(mut self, index: usize, underlying: TypeId) -> Self {
        if let Some(param) = self.params.get_mut(index) {
            param.underlying = Some(underlying);
        }
        self
    }
}
