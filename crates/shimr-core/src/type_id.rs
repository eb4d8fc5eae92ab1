//! TypeId, the [`TypeCatalog`] lookup interface, and the in-memory [`TypeRegistry`].
//!
//! The resolution engine never talks to a compiler. Everything it needs to
//! know about types (names, kinds, members, assignability) goes through
//! [`TypeCatalog`]. [`TypeRegistry`] is the catalog a front end fills in;
//! it pre-registers the built-in types on construction.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::MemberId;
use crate::types::{MemberDef, TypeDef, TypeKind};

/// Unique identifier for a type in a catalog.
///
/// The inner value is an index into the [`TypeRegistry`]'s type vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Pre-registered TypeId constants for built-in types.
impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const OBJECT: TypeId = TypeId(1);
    pub const BOOL: TypeId = TypeId(2);
    pub const I32: TypeId = TypeId(3);
    pub const I64: TypeId = TypeId(4);
    pub const F64: TypeId = TypeId(5);
    pub const STRING: TypeId = TypeId(6);
}

/// Read access to described types.
///
/// Implementors only provide [`get`](TypeCatalog::get); member enumeration
/// and assignability are derived from the definitions.
pub trait TypeCatalog: Send + Sync {
    /// Looks up a type by its [`TypeId`].
    fn get(&self, id: TypeId) -> Option<&TypeDef>;

    /// Looks up a type, failing with [`CoreError::TypeNotFound`].
    fn require(&self, id: TypeId) -> Result<&TypeDef, CoreError> {
        self.get(id).ok_or(CoreError::TypeNotFound { id })
    }

    fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.get(id).map(|t| t.kind), Some(TypeKind::Interface))
    }

    /// Namespace-qualified name, or the raw id for unknown types.
    fn display_name(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(def) => match def.kind {
                TypeKind::Array { element } => format!("{}[]", self.display_name(element)),
                _ => def.full_name(),
            },
            None => id.to_string(),
        }
    }

    /// All members visible on `id`, own members first, then each base in
    /// declaration order (breadth-first, each base visited once).
    fn members(&self, id: TypeId) -> Result<Vec<(MemberId, &MemberDef)>, CoreError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = std::collections::VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            let def = self.require(current)?;
            for (index, member) in def.members.iter().enumerate() {
                out.push((MemberId::new(current, index as u32), member));
            }
            queue.extend(def.bases.iter().copied());
        }
        Ok(out)
    }

    /// Looks up a single declared member.
    fn member(&self, id: MemberId) -> Result<&MemberDef, CoreError> {
        self.require(id.owner)?
            .members
            .get(id.index as usize)
            .ok_or(CoreError::MemberNotFound { id })
    }

    /// Returns `true` if a value of type `from` can be used where `to` is expected.
    ///
    /// Identity, `object` as top type, transitive bases, and arrays
    /// element-wise. Unknown types are never assignable.
    fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if to == TypeId::OBJECT {
            return from != TypeId::VOID && self.get(from).is_some();
        }
        let (Some(from_def), Some(to_def)) = (self.get(from), self.get(to)) else {
            return false;
        };
        if let (TypeKind::Array { element: a }, TypeKind::Array { element: b }) =
            (from_def.kind, to_def.kind)
        {
            return self.is_assignable(a, b);
        }

        let mut seen = HashSet::new();
        let mut stack: Vec<TypeId> = from_def.bases.to_vec();
        while let Some(base) = stack.pop() {
            if base == to {
                return true;
            }
            if seen.insert(base) {
                if let Some(def) = self.get(base) {
                    stack.extend(def.bases.iter().copied());
                }
            }
        }
        false
    }
}

/// Registry of all described types, providing identity via [`TypeId`].
///
/// On construction, the registry pre-registers the 7 built-in types:
/// - `TypeId(0)` = void
/// - `TypeId(1)` = object
/// - `TypeId(2)` = bool
/// - `TypeId(3)` = int
/// - `TypeId(4)` = long
/// - `TypeId(5)` = double
/// - `TypeId(6)` = string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRegistry {
    /// Types indexed by TypeId.0
    types: Vec<TypeDef>,
    /// Full-name lookup for named types
    names: IndexMap<String, TypeId>,
}

impl TypeRegistry {
    /// Number of built-in types pre-registered on construction.
    const BUILTIN_COUNT: u32 = 7;

    /// Creates a new type registry with the built-in types pre-registered.
    pub fn new() -> Self {
        let builtin = |name: &str, kind: TypeKind| TypeDef::new("", name, kind);
        let types = vec![
            builtin("void", TypeKind::Void),
            builtin("object", TypeKind::Object),
            builtin("bool", TypeKind::Primitive),
            builtin("int", TypeKind::Primitive),
            builtin("long", TypeKind::Primitive),
            builtin("double", TypeKind::Primitive),
            builtin("string", TypeKind::Primitive),
        ];
        let names = types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), TypeId(i as u32)))
            .collect();

        TypeRegistry { types, names }
    }

    /// Registers a type without a name lookup entry and returns its new [`TypeId`].
    pub fn register(&mut self, ty: TypeDef) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Registers a type under its full name, returning its [`TypeId`].
    ///
    /// Returns [`CoreError::DuplicateTypeName`] if a type with the same full
    /// name already exists.
    pub fn register_named(&mut self, ty: TypeDef) -> Result<TypeId, CoreError> {
        let name = ty.full_name();
        if self.names.contains_key(&name) {
            return Err(CoreError::DuplicateTypeName { name });
        }
        let id = self.register(ty);
        self.names.insert(name, id);
        Ok(id)
    }

    /// Registers (or reuses) the array type over `element`.
    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        let existing = self.types.iter().position(
            |t| matches!(t.kind, TypeKind::Array { element: e } if e == element),
        );
        match existing {
            Some(index) => TypeId(index as u32),
            None => self.register(TypeDef::new("", "", TypeKind::Array { element })),
        }
    }

    /// Appends a member to a registered type, returning its [`MemberId`].
    ///
    /// Needed for members that mention their own declaring type (constructors,
    /// self-typed parameters), which only has an id once registered.
    pub fn add_member(&mut self, owner: TypeId, member: MemberDef) -> Result<MemberId, CoreError> {
        if owner.0 < Self::BUILTIN_COUNT {
            return Err(CoreError::BuiltinType { id: owner });
        }
        let def = self
            .types
            .get_mut(owner.0 as usize)
            .ok_or(CoreError::TypeNotFound { id: owner })?;
        def.members.push(member);
        Ok(MemberId::new(owner, (def.members.len() - 1) as u32))
    }

    /// Appends a base type to a registered type.
    pub fn add_base(&mut self, owner: TypeId, base: TypeId) -> Result<(), CoreError> {
        if owner.0 < Self::BUILTIN_COUNT {
            return Err(CoreError::BuiltinType { id: owner });
        }
        if self.get(base).is_none() {
            return Err(CoreError::TypeNotFound { id: base });
        }
        let def = self
            .types
            .get_mut(owner.0 as usize)
            .ok_or(CoreError::TypeNotFound { id: owner })?;
        if !def.bases.contains(&base) {
            def.bases.push(base);
        }
        Ok(())
    }

    /// Sets the contract-level static target of a registered type.
    pub fn set_static_target(&mut self, owner: TypeId, target: TypeId) -> Result<(), CoreError> {
        if owner.0 < Self::BUILTIN_COUNT {
            return Err(CoreError::BuiltinType { id: owner });
        }
        let def = self
            .types
            .get_mut(owner.0 as usize)
            .ok_or(CoreError::TypeNotFound { id: owner })?;
        def.static_target = Some(target);
        Ok(())
    }

    /// Looks up a named type's [`TypeId`] by full name.
    pub fn get_by_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Number of registered types, built-ins included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeCatalog for TypeRegistry {
    fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.0 as usize)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
