use super::*;
use crate::value::Value;
use garden_ir::SharedInterner;

fn id(byte: u8) -> NodeId {
    NodeId::from_bytes([byte; 32])
}

#[test]
fn test_resolve_unbound() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");
    assert_eq!(Environment::new().resolve(x), None);
}

#[test]
fn test_extend_shadows_without_mutating() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");

    let outer = Environment::new().extend([(x, Binding::pending(id(1)))]);
    let inner = outer.extend([(x, Binding::pending(id(2)))]);

    assert_eq!(inner.resolve(x), Some(id(2)));
    assert_eq!(outer.resolve(x), Some(id(1)));
    assert_eq!(inner.depth(), 2);
}

#[test]
fn test_inner_frame_falls_back_to_parent() {
    let interner = SharedInterner::default();
    let x = interner.intern("x");
    let y = interner.intern("y");

    let outer = Environment::new().extend([(x, Binding::pending(id(1)))]);
    let inner = outer.extend([(y, Binding::pending(id(2)))]);
    assert_eq!(inner.resolve(x), Some(id(1)));
    assert_eq!(inner.resolve(y), Some(id(2)));
}

#[test]
fn test_define_rebinds_in_place_persistently() {
    let interner = SharedInterner::default();
    let a = interner.intern("a");
    let b = interner.intern("b");

    let first = Environment::new().define(a, Binding::pending(id(1)));
    let second = first.define(b, Binding::pending(id(2)));
    let third = second.define(a, Binding::pending(id(3)));

    assert_eq!(third.depth(), 1);
    assert_eq!(third.resolve(a), Some(id(3)));
    assert_eq!(third.resolve(b), Some(id(2)));
    // Earlier environments still see their own bindings.
    assert_eq!(first.resolve(a), Some(id(1)));
    assert_eq!(first.resolve(b), None);
    assert_eq!(second.resolve(a), Some(id(1)));
}

#[test]
fn test_binding_generation() {
    let pending = Binding::pending(id(1));
    assert_eq!(pending.generation(), Generation::NONE);

    let ready = Binding::ready(id(1), Ok(Value::Int(4)), Generation::new(7));
    assert_eq!(ready.generation(), Generation::new(7));
    assert_eq!(
        ready.state,
        BindingState::Ready {
            result: Ok(Value::Int(4)),
            generation: Generation::new(7),
        }
    );
}
