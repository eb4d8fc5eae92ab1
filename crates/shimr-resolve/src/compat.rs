//! Type compatibility between a contract's declared types and a target's.
//!
//! Two types are compatible when:
//!
//! - they are the same type
//! - the contract side is an interface the target type already implements
//! - the contract side is an interface and the target side is a concrete
//!   class/struct: the value crosses the boundary through a nested adapter,
//!   which makes that interface a nested contract over the concrete type
//! - both are arrays whose element types are compatible by the rules above
//!
//! Nothing else converts implicitly; in particular `object` does not match
//! an arbitrary type and primitives never become contracts.

use shimr_core::{ParamDef, TypeCatalog, TypeId, TypeKind};

use crate::binding::NestedConversion;

/// Outcome of comparing a contract type with a target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compat {
    /// Usable as-is.
    Exact,
    /// Usable through a nested adapter.
    Nested(NestedConversion),
    Incompatible,
}

/// Compares a type declared by a contract with the corresponding target type.
pub fn compare(contract_ty: TypeId, target_ty: TypeId, catalog: &dyn TypeCatalog) -> Compat {
    if contract_ty == target_ty {
        return Compat::Exact;
    }

    let (Some(contract_def), Some(target_def)) = (catalog.get(contract_ty), catalog.get(target_ty))
    else {
        return Compat::Incompatible;
    };

    if let (TypeKind::Array { element: c }, TypeKind::Array { element: t }) =
        (contract_def.kind, target_def.kind)
    {
        return match compare(c, t, catalog) {
            Compat::Exact => Compat::Exact,
            Compat::Nested(nested) if !nested.array => Compat::Nested(NestedConversion {
                array: true,
                ..nested
            }),
            _ => Compat::Incompatible,
        };
    }

    if contract_def.kind != TypeKind::Interface {
        return Compat::Incompatible;
    }
    if catalog.is_assignable(target_ty, contract_ty) {
        return Compat::Exact;
    }
    if target_def.kind.is_concrete() {
        return Compat::Nested(NestedConversion {
            contract: contract_ty,
            concrete: target_ty,
            array: false,
        });
    }
    Compat::Incompatible
}

/// Compares a contract parameter with a target parameter type.
///
/// A parameter carrying an explicit underlying type only accepts exactly
/// that type on the target, and always unwraps.
pub fn compare_param(param: &ParamDef, target_ty: TypeId, catalog: &dyn TypeCatalog) -> Compat {
    match param.underlying {
        Some(underlying) if underlying == target_ty => Compat::Nested(NestedConversion {
            contract: param.ty,
            concrete: underlying,
            array: false,
        }),
        Some(_) => Compat::Incompatible,
        None => compare(param.ty, target_ty, catalog),
    }
}
