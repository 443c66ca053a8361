use super::*;
use crate::errors::EvalErrorKind;
use crate::primitives::PrimOp;
use pretty_assertions::assert_eq;

#[test]
fn display_forms() {
    assert_eq!(Value::Int(-7).to_string(), "-7");
    assert_eq!(Value::Bool(true).to_string(), "#t");
    assert_eq!(Value::Bool(false).to_string(), "#f");
    assert_eq!(Value::Unit.to_string(), "#<unit>");
    assert_eq!(Value::symbol("done").to_string(), "'done");
    assert_eq!(Value::boxed(Value::Int(3)).to_string(), "#<box 3>");
    assert_eq!(
        Value::Closure(Closure::primitive(PrimOp::Add)).to_string(),
        "#<closure add>"
    );
    assert_eq!(Value::host(5_u8).to_string(), "#<host u8>");
}

#[test]
fn nested_box_shows_one_level() {
    let outer = Value::boxed(Value::boxed(Value::Int(1)));
    assert_eq!(outer.to_string(), "#<box #<box>>");
}

#[test]
fn scalars_compare_structurally() {
    assert_eq!(Value::Int(4), Value::Int(4));
    assert_ne!(Value::Int(1), Value::Bool(true));
    assert_eq!(Value::symbol("a"), Value::symbol("a"));
    assert_ne!(Value::symbol("a"), Value::symbol("b"));
    assert_eq!(Value::Unit, Value::default());
}

#[test]
fn references_compare_by_identity() {
    let a = Value::boxed(Value::Int(1));
    let b = Value::boxed(Value::Int(1));
    assert_ne!(a, b);
    assert_eq!(a, a.clone());

    let f = Value::Closure(Closure::primitive(PrimOp::Sub));
    let g = Value::Closure(Closure::primitive(PrimOp::Sub));
    assert_ne!(f, g);
    assert_eq!(f, f.clone());

    let h = Value::host(String::from("x"));
    assert_eq!(h, h.clone());
    assert_ne!(h, Value::host(String::from("x")));
}

#[test]
fn box_cell_is_shared() {
    let cell = BoxCell::new(Value::Int(1));
    let alias = cell.clone();
    assert_eq!(alias.set(Value::Bool(true)), Value::Int(1));
    assert_eq!(cell.get(), Value::Bool(true));
    assert!(cell.ptr_eq(&alias));
}

#[test]
fn host_object_downcasts() {
    let obj = HostObject::new(vec![1_u32, 2, 3]);
    assert_eq!(obj.downcast_ref::<Vec<u32>>().map(Vec::len), Some(3));
    assert!(obj.downcast_ref::<String>().is_none());
}

#[test]
fn accessors_report_type_mismatch() {
    let err = Value::Unit.as_int().err().map(|e| e.kind);
    assert_eq!(
        err,
        Some(EvalErrorKind::TypeMismatch {
            expected: "int",
            got: "unit"
        })
    );
    assert!(Value::Int(1).as_bool().is_err());
    assert!(Value::Int(1).as_closure().is_err());
    assert!(Value::Bool(true).as_box().is_err());
    assert_eq!(Value::Bool(true).as_bool().ok(), Some(true));
}
