//! End-to-end resolution scenarios over small hand-built type graphs.

use std::sync::Arc;

use shimr_core::{
    Accessors, MemberDef, MemberId, ProxyBehaviour, TypeDef, TypeId, TypeRegistry,
};
use shimr_resolve::{
    Accessor, ErrorKind, Flavor, Registry, Resolution, ResolveOptions, Resolver, Strategy,
    TargetKind,
};

fn run(types: TypeRegistry, requests: impl FnOnce(&Registry)) -> (Registry, Resolution) {
    let registry = Registry::new(Arc::new(types));
    requests(&registry);
    let resolution = Resolver::new(&registry, ResolveOptions::default())
        .resolve()
        .expect("resolution should not fault");
    (registry, resolution)
}

fn kinds(resolution: &Resolution) -> Vec<ErrorKind> {
    resolution.errors.iter().map(|e| e.kind()).collect()
}

// ----------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------

#[test]
fn get_or_create_is_idempotent() {
    let mut types = TypeRegistry::new();
    let iface = types.register_named(TypeDef::interface("App", "IThing")).unwrap();
    let registry = Registry::new(Arc::new(types));

    let first = registry.get_or_create(iface, Flavor::Instance).unwrap();
    let second = registry.get_or_create(iface, Flavor::Instance).unwrap();
    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
    assert!(registry.reporter().is_empty());
}

#[test]
fn conflicting_flavor_is_reported_not_coerced() {
    let mut types = TypeRegistry::new();
    let iface = types.register_named(TypeDef::interface("App", "IThing")).unwrap();
    let registry = Registry::new(Arc::new(types));

    registry.get_or_create(iface, Flavor::Factory).unwrap();
    let key = registry.get_or_create(iface, Flavor::Instance).unwrap();
    assert_eq!(key.flavor, Flavor::Factory);
    let errors = registry.reporter().snapshot();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::ContractIdentityConflict);
}

// ----------------------------------------------------------------------
// Matching
// ----------------------------------------------------------------------

#[test]
fn deterministic_direct_match() {
    let mut types = TypeRegistry::new();
    let target = types
        .register_named(
            TypeDef::class("App", "Target")
                .with_member(MemberDef::method("M", &[TypeId::I32, TypeId::STRING], TypeId::VOID)),
        )
        .unwrap();
    let iface = types
        .register_named(
            TypeDef::interface("App", "IM")
                .with_member(MemberDef::method("M", &[TypeId::I32, TypeId::STRING], TypeId::VOID)),
        )
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(target)).unwrap();
    });
    assert!(resolution.errors.is_empty());
    let bindings = resolution.bindings_for(iface);
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].strategy, Strategy::Direct);
    assert_eq!(bindings[0].target_member, MemberId::new(target, 0));
    assert_eq!(bindings[0].target.kind, TargetKind::Instance);
}

#[test]
fn alias_matches_differently_named_member() {
    let mut types = TypeRegistry::new();
    let target = types
        .register_named(
            TypeDef::class("App", "Target").with_member(MemberDef::method("Execute", &[], TypeId::VOID)),
        )
        .unwrap();
    let iface = types
        .register_named(
            TypeDef::interface("App", "IRun")
                .with_member(MemberDef::method("Run", &[], TypeId::VOID).with_alias("Execute")),
        )
        .unwrap();
    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(target)).unwrap();
    });
    assert!(resolution.errors.is_empty());
    assert_eq!(resolution.bindings_for(iface).len(), 1);
}

#[test]
fn inherited_members_are_matched_on_both_sides() {
    let mut types = TypeRegistry::new();
    let base = types
        .register_named(TypeDef::class("App", "Base").with_member(MemberDef::method("Close", &[], TypeId::VOID)))
        .unwrap();
    let derived = types
        .register_named(TypeDef::class("App", "Derived").with_base(base))
        .unwrap();
    let icloseable = types
        .register_named(
            TypeDef::interface("App", "ICloseable").with_member(MemberDef::method("Close", &[], TypeId::VOID)),
        )
        .unwrap();
    let iface = types
        .register_named(TypeDef::interface("App", "IResource").with_base(icloseable))
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(derived)).unwrap();
    });
    assert!(resolution.errors.is_empty());
    let bindings = resolution.bindings_for(iface);
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].member, MemberId::new(icloseable, 0));
    assert_eq!(bindings[0].target_member, MemberId::new(base, 0));
}

#[test]
fn redeclared_members_hide_their_base_versions() {
    let mut types = TypeRegistry::new();
    let base = types
        .register_named(
            TypeDef::class("App", "Base")
                .with_member(MemberDef::method("Run", &[], TypeId::VOID))
                .with_member(MemberDef::property("Name", TypeId::STRING, Accessors::GET)),
        )
        .unwrap();
    let derived = types
        .register_named(
            TypeDef::class("App", "Derived")
                .with_base(base)
                .with_member(MemberDef::method("Run", &[], TypeId::VOID))
                .with_member(MemberDef::property("Name", TypeId::STRING, Accessors::GET)),
        )
        .unwrap();
    let iface = types
        .register_named(
            TypeDef::interface("App", "IRun")
                .with_member(MemberDef::method("Run", &[], TypeId::VOID))
                .with_member(MemberDef::property("Name", TypeId::STRING, Accessors::GET)),
        )
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(derived)).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    let bindings = resolution.bindings_for(iface);
    assert_eq!(bindings.len(), 2);
    assert!(bindings.iter().all(|b| b.strategy == Strategy::Direct));
    assert_eq!(bindings[0].target_member, MemberId::new(derived, 0));
    assert_eq!(bindings[1].target_member, MemberId::new(derived, 1));
}

#[test]
fn base_overload_with_other_parameters_stays_visible() {
    let mut types = TypeRegistry::new();
    let base = types
        .register_named(
            TypeDef::class("App", "Base").with_member(MemberDef::method("Run", &[TypeId::I32], TypeId::VOID)),
        )
        .unwrap();
    let derived = types
        .register_named(
            TypeDef::class("App", "Derived")
                .with_base(base)
                .with_member(MemberDef::method("Run", &[], TypeId::VOID)),
        )
        .unwrap();
    let iface = types
        .register_named(
            TypeDef::interface("App", "IRun")
                .with_member(MemberDef::method("Run", &[TypeId::I32], TypeId::VOID)),
        )
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(derived)).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    assert_eq!(resolution.bindings_for(iface)[0].target_member, MemberId::new(base, 0));
}

#[test]
fn missing_member_is_reported_and_other_members_still_bind() {
    let mut types = TypeRegistry::new();
    let target = types
        .register_named(TypeDef::class("App", "Target").with_member(MemberDef::method("A", &[], TypeId::VOID)))
        .unwrap();
    let iface = types
        .register_named(
            TypeDef::interface("App", "IAB")
                .with_member(MemberDef::method("A", &[], TypeId::VOID))
                .with_member(MemberDef::method("B", &[], TypeId::VOID)),
        )
        .unwrap();
    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(target)).unwrap();
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::MissingMember]);
    assert_eq!(resolution.bindings_for(iface).len(), 1);
    assert!(resolution.has_errors());
}

#[test]
fn bindings_follow_member_declaration_order() {
    let mut types = TypeRegistry::new();
    let target = types
        .register_named(
            TypeDef::class("App", "Target")
                .with_member(MemberDef::method("C", &[], TypeId::VOID))
                .with_member(MemberDef::method("B", &[], TypeId::VOID))
                .with_member(MemberDef::method("A", &[], TypeId::VOID)),
        )
        .unwrap();
    let iface = types
        .register_named(
            TypeDef::interface("App", "IOrdered")
                .with_member(MemberDef::method("A", &[], TypeId::VOID))
                .with_member(MemberDef::method("B", &[], TypeId::VOID))
                .with_member(MemberDef::method("C", &[], TypeId::VOID)),
        )
        .unwrap();
    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(target)).unwrap();
    });
    let ordinals: Vec<usize> = resolution.bindings_for(iface).iter().map(|b| b.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
}

#[test]
fn repeated_requests_produce_one_binding() {
    let mut types = TypeRegistry::new();
    let target = types
        .register_named(TypeDef::class("App", "Target").with_member(MemberDef::method("A", &[], TypeId::VOID)))
        .unwrap();
    let iface = types
        .register_named(TypeDef::interface("App", "IA").with_member(MemberDef::method("A", &[], TypeId::VOID)))
        .unwrap();
    let (_, resolution) = run(types, |r| {
        for _ in 0..3 {
            r.request_instance_contract(iface, Some(target)).unwrap();
        }
    });
    assert_eq!(resolution.bindings_for(iface).len(), 1);
}

// ----------------------------------------------------------------------
// Proxies
// ----------------------------------------------------------------------

struct ProxyFixture {
    types: TypeRegistry,
    bare: TypeId,
    with_p: TypeId,
    proxy: TypeId,
}

fn proxy_fixture() -> ProxyFixture {
    let mut types = TypeRegistry::new();
    let bare = types.register_named(TypeDef::class("Px", "Bare")).unwrap();
    let with_p = types
        .register_named(
            TypeDef::class("Px", "WithP").with_member(MemberDef::property("P", TypeId::STRING, Accessors::GET)),
        )
        .unwrap();
    let proxy = types
        .register_named(
            TypeDef::class("Px", "PProxy")
                .with_member(MemberDef::property("P", TypeId::STRING, Accessors::GET).as_static()),
        )
        .unwrap();
    ProxyFixture {
        types,
        bare,
        with_p,
        proxy,
    }
}

fn proxied_contract(f: &mut ProxyFixture, name: &str, behaviour: ProxyBehaviour) -> TypeId {
    f.types
        .register_named(TypeDef::interface("Px", name).with_member(
            MemberDef::property("P", TypeId::STRING, Accessors::GET).with_proxy(f.proxy, Some(behaviour)),
        ))
        .unwrap()
}

#[test]
fn add_proxy_on_target_without_member() {
    let mut f = proxy_fixture();
    let iface = proxied_contract(&mut f, "IAdd", ProxyBehaviour::Add);
    let bare = f.bare;
    let proxy = f.proxy;
    let (_, resolution) = run(f.types, |r| {
        r.request_instance_contract(iface, Some(bare)).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    let bindings = resolution.bindings_for(iface);
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].strategy, Strategy::ProxyAdd);
    assert_eq!(bindings[0].target.ty, proxy);
    assert_eq!(bindings[0].target.proxied, Some(bare));
}

#[test]
fn override_proxy_on_target_without_member_is_missing() {
    let mut f = proxy_fixture();
    let iface = proxied_contract(&mut f, "IOverride", ProxyBehaviour::Override);
    let bare = f.bare;
    let (_, resolution) = run(f.types, |r| {
        r.request_instance_contract(iface, Some(bare)).unwrap();
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::MissingMember]);
    assert!(resolution.bindings_for(iface).is_empty());
}

#[test]
fn add_proxy_on_target_with_member_conflicts() {
    let mut f = proxy_fixture();
    let iface = proxied_contract(&mut f, "IAdd", ProxyBehaviour::Add);
    let with_p = f.with_p;
    let (_, resolution) = run(f.types, |r| {
        r.request_instance_contract(iface, Some(with_p)).unwrap();
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::ConflictingAdd]);
    assert!(resolution.bindings_for(iface).is_empty());
}

#[test]
fn override_proxy_on_target_with_member() {
    let mut f = proxy_fixture();
    let iface = proxied_contract(&mut f, "IOverride", ProxyBehaviour::Override);
    let with_p = f.with_p;
    let (_, resolution) = run(f.types, |r| {
        r.request_instance_contract(iface, Some(with_p)).unwrap();
    });
    assert!(resolution.errors.is_empty());
    let binding = &resolution.bindings_for(iface)[0];
    assert_eq!(binding.strategy, Strategy::ProxyOverride);
    assert_eq!(binding.overridden, Some(MemberId::new(with_p, 0)));
}

#[test]
fn interface_proxy_type_is_invalid() {
    let mut types = TypeRegistry::new();
    let target = types.register_named(TypeDef::class("Px", "Target")).unwrap();
    let iproxy = types.register_named(TypeDef::interface("Px", "IProxy")).unwrap();
    let iface = types
        .register_named(TypeDef::interface("Px", "IThing").with_member(
            MemberDef::method("M", &[], TypeId::VOID).with_proxy(iproxy, Some(ProxyBehaviour::Add)),
        ))
        .unwrap();
    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(target)).unwrap();
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::InvalidExplicitTarget]);
}

// ----------------------------------------------------------------------
// Static redirection
// ----------------------------------------------------------------------

fn static_target(types: &mut TypeRegistry) -> TypeId {
    types
        .register_named(
            TypeDef::class("St", "T").with_member(MemberDef::field("V", TypeId::I64).as_static()),
        )
        .unwrap()
}

#[test]
fn get_set_scenario_binds_both_accessors_to_static_field() {
    let mut types = TypeRegistry::new();
    let t = static_target(&mut types);
    let iface = types
        .register_named(
            TypeDef::interface("St", "IGetSet")
                .with_static_target(t)
                .with_member(MemberDef::property("V", TypeId::I64, Accessors::GET_SET)),
        )
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_factory_contract(iface).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    let bindings = resolution.bindings_for(iface);
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].accessor, Some(Accessor::Get));
    assert_eq!(bindings[1].accessor, Some(Accessor::Set));
    for binding in bindings {
        assert_eq!(binding.strategy, Strategy::StaticRedirect);
        assert_eq!(binding.target_member, MemberId::new(t, 0));
        assert_eq!(binding.target.ty, t);
        assert_eq!(binding.instance, None);
    }
}

#[test]
fn get_only_and_set_only_shapes_bind_only_requested_accessor() {
    let mut types = TypeRegistry::new();
    let t = static_target(&mut types);
    let iget = types
        .register_named(TypeDef::interface("St", "IGet").with_member(
            MemberDef::property("V", TypeId::I64, Accessors::GET).with_static_target(t),
        ))
        .unwrap();
    let iset = types
        .register_named(TypeDef::interface("St", "ISet").with_member(
            MemberDef::property("V", TypeId::I64, Accessors::SET).with_static_target(t),
        ))
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_factory_contract(iget).unwrap();
        r.request_factory_contract(iset).unwrap();
    });
    assert!(resolution.errors.is_empty());
    let get: Vec<_> = resolution.bindings_for(iget).iter().map(|b| b.accessor).collect();
    let set: Vec<_> = resolution.bindings_for(iset).iter().map(|b| b.accessor).collect();
    assert_eq!(get, vec![Some(Accessor::Get)]);
    assert_eq!(set, vec![Some(Accessor::Set)]);
}

#[test]
fn annotated_static_target_redirects_instance_contract_member() {
    let mut types = TypeRegistry::new();
    let t = static_target(&mut types);
    let target = types.register_named(TypeDef::class("St", "Instance")).unwrap();
    let iface = types
        .register_named(
            TypeDef::interface("St", "IValue").with_member(MemberDef::property("V", TypeId::I64, Accessors::GET)),
        )
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(target)).unwrap();
        r.annotate_explicit_target(iface, MemberId::new(iface, 0), t, None).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    let binding = &resolution.bindings_for(iface)[0];
    assert_eq!(binding.strategy, Strategy::StaticRedirect);
    assert_eq!(binding.instance, Some(target));
}

// ----------------------------------------------------------------------
// Nested contracts
// ----------------------------------------------------------------------

#[test]
fn nested_contract_is_discovered_and_resolved() {
    let mut types = TypeRegistry::new();
    let concrete = types
        .register_named(
            TypeDef::class("N", "Concrete").with_member(MemberDef::property("X", TypeId::I32, Accessors::GET)),
        )
        .unwrap();
    let parent = types
        .register_named(
            TypeDef::class("N", "Parent").with_member(MemberDef::property("Child", concrete, Accessors::GET)),
        )
        .unwrap();
    let ichild = types
        .register_named(
            TypeDef::interface("N", "IChild").with_member(MemberDef::property("X", TypeId::I32, Accessors::GET)),
        )
        .unwrap();
    let iparent = types
        .register_named(
            TypeDef::interface("N", "IParent").with_member(MemberDef::property("Child", ichild, Accessors::GET)),
        )
        .unwrap();

    let (registry, resolution) = run(types, |r| {
        r.request_instance_contract(iparent, Some(parent)).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    assert_eq!(resolution.processed, vec![iparent, ichild]);
    assert_eq!(resolution.passes, 2);

    let parent_binding = &resolution.bindings_for(iparent)[0];
    assert_eq!(parent_binding.strategy, Strategy::ShimmedReturn);

    let child = resolution.contract(ichild).expect("IChild registered");
    assert_eq!(child.contract.flavor, Flavor::Instance);
    assert_eq!(child.contract.instance_targets.iter().copied().collect::<Vec<_>>(), vec![concrete]);
    assert_eq!(child.bindings.len(), 1);
    assert_eq!(child.bindings[0].strategy, Strategy::Direct);

    assert_eq!(registry.nested_contracts(iparent), vec![ichild]);
}

#[test]
fn factory_contract_reached_as_nested_keeps_its_flavor() {
    let mut types = TypeRegistry::new();
    let concrete = types.register_named(TypeDef::class("N", "Concrete")).unwrap();
    let parent = types
        .register_named(
            TypeDef::class("N", "Parent")
                .with_member(MemberDef::property("Child", concrete, Accessors::GET))
                .with_member(MemberDef::method("Adopt", &[concrete], TypeId::VOID)),
        )
        .unwrap();
    let ichild = types.register_named(TypeDef::interface("N", "IChild")).unwrap();
    let iparent = types
        .register_named(
            TypeDef::interface("N", "IParent")
                .with_member(MemberDef::property("Child", ichild, Accessors::GET))
                .with_member(MemberDef::method("Adopt", &[ichild], TypeId::VOID)),
        )
        .unwrap();

    let (registry, resolution) = run(types, |r| {
        r.request_factory_contract(ichild).unwrap();
        r.request_instance_contract(iparent, Some(parent)).unwrap();
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::ContractIdentityConflict]);
    assert_eq!(resolution.bindings_for(iparent).len(), 2);

    let child = resolution.contract(ichild).expect("IChild registered");
    assert_eq!(child.contract.flavor, Flavor::Factory);
    assert!(child.contract.instance_targets.is_empty());
    assert!(child.bindings.is_empty());
    assert_eq!(registry.nested_contracts(iparent), vec![ichild]);
}

#[test]
fn self_referencing_contract_terminates() {
    let mut types = TypeRegistry::new();
    let node = types.register_named(TypeDef::class("N", "Node")).unwrap();
    types
        .add_member(node, MemberDef::property("Next", node, Accessors::GET))
        .unwrap();
    let inode = types.register_named(TypeDef::interface("N", "INode")).unwrap();
    types
        .add_member(inode, MemberDef::property("Next", inode, Accessors::GET))
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(inode, Some(node)).unwrap();
    });
    assert!(resolution.errors.is_empty());
    assert_eq!(resolution.processed, vec![inode]);
    assert_eq!(resolution.bindings_for(inode).len(), 1);
}

#[test]
fn array_of_contracts_registers_element_contract() {
    let mut types = TypeRegistry::new();
    let item = types
        .register_named(TypeDef::class("N", "Item").with_member(MemberDef::method("Id", &[], TypeId::I32)))
        .unwrap();
    let iitem = types
        .register_named(TypeDef::interface("N", "IItem").with_member(MemberDef::method("Id", &[], TypeId::I32)))
        .unwrap();
    let items = types.array_of(item);
    let iitems = types.array_of(iitem);
    let bag = types
        .register_named(TypeDef::class("N", "Bag").with_member(MemberDef::method("All", &[], items)))
        .unwrap();
    let ibag = types
        .register_named(TypeDef::interface("N", "IBag").with_member(MemberDef::method("All", &[], iitems)))
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(ibag, Some(bag)).unwrap();
    });
    assert!(resolution.errors.is_empty());
    let binding = &resolution.bindings_for(ibag)[0];
    assert_eq!(binding.strategy, Strategy::ShimmedReturn);
    assert!(binding.conversions.value.unwrap().array);
    assert_eq!(resolution.bindings_for(iitem).len(), 1);
}

#[test]
fn underlying_parameter_hint_unwraps_argument() {
    let mut types = TypeRegistry::new();
    let concrete = types.register_named(TypeDef::class("N", "Concrete")).unwrap();
    let ichild = types.register_named(TypeDef::interface("N", "IChild")).unwrap();
    let target = types
        .register_named(
            TypeDef::class("N", "Sink").with_member(MemberDef::method("Put", &[concrete], TypeId::VOID)),
        )
        .unwrap();
    let iface = types
        .register_named(TypeDef::interface("N", "ISink").with_member(
            MemberDef::method("Put", &[ichild], TypeId::VOID).with_underlying_param(0, concrete),
        ))
        .unwrap();

    let (_, resolution) = run(types, |r| {
        r.request_instance_contract(iface, Some(target)).unwrap();
    });
    assert!(resolution.errors.is_empty());
    let binding = &resolution.bindings_for(iface)[0];
    assert_eq!(binding.strategy, Strategy::ShimmedParameter);
    assert_eq!(binding.conversions.params[0].conversion.concrete, concrete);
}

// ----------------------------------------------------------------------
// Constructor factories
// ----------------------------------------------------------------------

struct CtorFixture {
    types: TypeRegistry,
    widget: TypeId,
    iwidget: TypeId,
}

fn ctor_fixture() -> CtorFixture {
    let mut types = TypeRegistry::new();
    let widget = types
        .register_named(TypeDef::class("C", "Widget").with_member(MemberDef::method("Spin", &[], TypeId::VOID)))
        .unwrap();
    types.add_member(widget, MemberDef::constructor(&[TypeId::STRING], widget)).unwrap();
    let iwidget = types
        .register_named(TypeDef::interface("C", "IWidget").with_member(MemberDef::method("Spin", &[], TypeId::VOID)))
        .unwrap();
    CtorFixture {
        types,
        widget,
        iwidget,
    }
}

fn factory(f: &mut CtorFixture, name: &str, returns: TypeId) -> TypeId {
    f.types
        .register_named(
            TypeDef::interface("C", name)
                .with_static_target(f.widget)
                .with_member(MemberDef::method("Create", &[TypeId::STRING], returns).as_constructor()),
        )
        .unwrap()
}

#[test]
fn constructor_factory_returning_target_type() {
    let mut f = ctor_fixture();
    let widget = f.widget;
    let ifactory = factory(&mut f, "IWidgetFactory", widget);
    let (_, resolution) = run(f.types, |r| {
        r.request_factory_contract(ifactory).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    let binding = &resolution.bindings_for(ifactory)[0];
    assert_eq!(binding.strategy, Strategy::ConstructorFactory);
    assert_eq!(binding.target_member, MemberId::new(widget, 1));
}

#[test]
fn constructor_factory_returning_interface_nests() {
    let mut f = ctor_fixture();
    let iwidget = f.iwidget;
    let widget = f.widget;
    let ifactory = factory(&mut f, "IWidgetFactory", iwidget);
    let (_, resolution) = run(f.types, |r| {
        r.request_factory_contract(ifactory).unwrap();
    });
    assert!(resolution.errors.is_empty(), "{:?}", resolution.errors);
    assert_eq!(
        resolution.bindings_for(ifactory)[0].strategy,
        Strategy::ConstructorFactory
    );
    let nested = resolution.contract(iwidget).expect("IWidget registered");
    assert!(nested.contract.instance_targets.contains(&widget));
    assert_eq!(nested.bindings.len(), 1);
}

#[test]
fn constructor_factory_return_type_mismatch() {
    let mut f = ctor_fixture();
    let ifactory = factory(&mut f, "IBadFactory", TypeId::STRING);
    let (_, resolution) = run(f.types, |r| {
        r.request_factory_contract(ifactory).unwrap();
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::ReturnTypeMismatch]);
    assert!(resolution.bindings_for(ifactory).is_empty());
}

// ----------------------------------------------------------------------
// Discovery edge cases
// ----------------------------------------------------------------------

#[test]
fn untyped_adaptation_is_a_warning_only() {
    let mut types = TypeRegistry::new();
    let iface = types
        .register_named(TypeDef::interface("D", "IAny").with_member(MemberDef::method("M", &[], TypeId::VOID)))
        .unwrap();
    let (_, resolution) = run(types, |r| {
        assert_eq!(r.request_instance_contract(iface, Some(TypeId::OBJECT)).unwrap(), None);
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::UnresolvedTarget]);
    assert!(!resolution.has_errors());
    assert!(resolution.bindings_for(iface).is_empty());
}

#[test]
fn concrete_contract_argument_is_rejected() {
    let mut types = TypeRegistry::new();
    let class = types.register_named(TypeDef::class("D", "NotAContract")).unwrap();
    let (registry, resolution) = run(types, |r| {
        assert_eq!(r.request_factory_contract(class).unwrap(), None);
    });
    assert_eq!(kinds(&resolution), vec![ErrorKind::NonContractArgument]);
    assert!(registry.is_empty());
}
