//! Call-site cache behavior observed through whole programs.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::rc::Rc;

use kiln_eval::{
    CacheState, CallTarget, Closure, EvalErrorKind, Expr, FrameDescriptor, Interpreter,
    LambdaCode, Name, PrimOp, Value,
};
use pretty_assertions::assert_eq;

/// A one-parameter lambda computing `op(x, k)` (or `op(k, x)` when `flip`).
fn unary(name: &str, op: PrimOp, k: i64, flip: bool) -> Expr {
    let mut scope = FrameDescriptor::new();
    let x = scope.add_slot("x");
    let args = if flip {
        [Expr::int(k), Expr::read(x)]
    } else {
        [Expr::read(x), Expr::int(k)]
    };
    Expr::named_lambda(name, vec![x], Expr::call_prim(op, args), scope.into_shared())
}

/// `(lambda call-with (f x) (f x))`, plus a handle on its inner call node.
fn call_with() -> (Expr, Expr) {
    let mut scope = FrameDescriptor::new();
    let f = scope.add_slot("f");
    let x = scope.add_slot("x");
    let inner = Expr::apply(Expr::read(f), [Expr::read(x)]);
    let lambda = Expr::named_lambda("call-with", vec![f, x], inner.clone(), scope.into_shared());
    (lambda, inner)
}

fn state(node: &Expr) -> CacheState {
    node.call_site().expect("apply node").state()
}

#[test]
fn three_closures_through_one_site_match_direct_calls() {
    let mut interp = Interpreter::builder().counters(true).build();
    let (call_with, site) = call_with();
    let call_with = interp.invoke(&call_with).unwrap();
    let inc = interp.invoke(&unary("inc", PrimOp::Add, 1, false)).unwrap();
    let dbl = interp.invoke(&unary("dbl", PrimOp::Mul, 2, false)).unwrap();
    let neg = interp.invoke(&unary("neg", PrimOp::Sub, 0, true)).unwrap();

    let expected_states = [
        CacheState::Monomorphic,
        CacheState::Polymorphic,
        CacheState::Megamorphic,
    ];
    for (callee, expected_state) in [&inc, &dbl, &neg].into_iter().zip(expected_states) {
        for x in [-3, 0, 11] {
            let direct = interp.call(callee, vec![Value::Int(x)]).unwrap();
            let cached = interp
                .call(&call_with, vec![callee.clone(), Value::Int(x)])
                .unwrap();
            assert_eq!(direct, cached);
        }
        assert_eq!(state(&site), expected_state);
    }

    // Once megamorphic, earlier targets are dispatched indirectly and still agree.
    let again = interp
        .call(&call_with, vec![inc.clone(), Value::Int(41)])
        .unwrap();
    assert_eq!(again, Value::Int(42));
    assert_eq!(state(&site), CacheState::Megamorphic);

    let counters = interp.counters().cloned().unwrap_or_default();
    assert_eq!(counters.megamorphic_transitions, 1);
    assert!(counters.indirect_transfers >= 4);
}

#[test]
fn closures_from_one_lambda_stay_monomorphic() {
    // Every evaluation of the inner lambda creates a new closure, all sharing code.
    let mut outer = FrameDescriptor::new();
    let k = outer.add_slot("k");
    let mut inner = FrameDescriptor::new();
    let n = inner.add_slot("n");
    let make_adder = Expr::lambda(
        vec![k],
        Expr::lambda(
            vec![n],
            Expr::call_prim(PrimOp::Add, [Expr::read(n), Expr::read_at(k, 1)]),
            inner.into_shared(),
        ),
        outer.into_shared(),
    );

    let mut interp = Interpreter::new();
    let (call_with, site) = call_with();
    let call_with = interp.invoke(&call_with).unwrap();
    let make_adder = interp.invoke(&make_adder).unwrap();
    for k in 0..10 {
        let adder = interp.call(&make_adder, vec![Value::Int(k)]).unwrap();
        let sum = interp.call(&call_with, vec![adder, Value::Int(100)]).unwrap();
        assert_eq!(sum, Value::Int(100 + k));
    }
    assert_eq!(state(&site), CacheState::Monomorphic);
}

#[test]
fn primitives_share_the_cache() {
    let mut interp = Interpreter::new();
    let (call_with, site) = call_with();
    let call_with = interp.invoke(&call_with).unwrap();
    let boxed = interp
        .call(
            &call_with,
            vec![Value::Closure(Closure::primitive(PrimOp::MakeBox)), Value::Int(9)],
        )
        .unwrap();
    let unboxed = interp
        .call(
            &call_with,
            vec![Value::Closure(Closure::primitive(PrimOp::Unbox)), boxed],
        )
        .unwrap();
    assert_eq!(unboxed, Value::Int(9));
    assert_eq!(state(&site), CacheState::Polymorphic);
}

#[test]
fn cache_size_one_goes_megamorphic_on_second_target() {
    let mut interp = Interpreter::builder().inline_cache_size(1).build();
    let (call_with, site) = call_with();
    let call_with = interp.invoke(&call_with).unwrap();
    let inc = interp.invoke(&unary("inc", PrimOp::Add, 1, false)).unwrap();
    let dbl = interp.invoke(&unary("dbl", PrimOp::Mul, 2, false)).unwrap();

    interp.call(&call_with, vec![inc, Value::Int(1)]).unwrap();
    assert_eq!(state(&site), CacheState::Monomorphic);
    let r = interp.call(&call_with, vec![dbl, Value::Int(4)]).unwrap();
    assert_eq!(r, Value::Int(8));
    assert_eq!(state(&site), CacheState::Megamorphic);
}

fn code(name: &str, op: PrimOp, k: i64) -> CallTarget {
    let mut scope = FrameDescriptor::new();
    let x = scope.add_slot("x");
    CallTarget::Lambda(Rc::new(LambdaCode::new(
        Name::intern(name),
        vec![x],
        Expr::call_prim(op, [Expr::read(x), Expr::int(k)]),
        scope.into_shared(),
    )))
}

#[test]
fn placeholder_rebinding_invalidates_lazily() {
    let f = Closure::placeholder("f");
    let program = Expr::apply(Expr::lit(Value::Closure(f.clone())), [Expr::int(3)]);
    let mut interp = Interpreter::builder().counters(true).build();

    let err = interp.invoke(&program).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UnboundFunction {
            name: Name::intern("f")
        }
    );
    assert_eq!(state(&program), CacheState::Uninitialized);

    f.bind(code("inc", PrimOp::Add, 1));
    assert_eq!(interp.invoke(&program).unwrap(), Value::Int(4));
    assert_eq!(interp.invoke(&program).unwrap(), Value::Int(4));
    assert_eq!(state(&program), CacheState::Monomorphic);

    f.bind(code("dbl", PrimOp::Mul, 2));
    // The stale entry is still there until the next dispatch.
    assert_eq!(program.call_site().map(|s| s.len()), Some(1));
    assert_eq!(interp.invoke(&program).unwrap(), Value::Int(6));
    assert_eq!(state(&program), CacheState::Monomorphic);

    let counters = interp.counters().cloned().unwrap_or_default();
    assert_eq!(counters.evictions, 1);
    // One hit at the outer site, one at the `add` inside `inc`.
    assert_eq!(counters.cache_hits, 2);
    assert_eq!(counters.megamorphic_transitions, 0);
}

#[test]
fn rebinding_reaches_every_alias() {
    let f = Closure::placeholder("shared");
    let alias = Value::Closure(f.clone());
    let mut interp = Interpreter::new();
    f.bind(CallTarget::Primitive(PrimOp::Unbox));
    let cell = Value::boxed(Value::Int(5));
    assert_eq!(interp.call(&alias, vec![cell.clone()]).unwrap(), Value::Int(5));
    f.bind(code("inc", PrimOp::Add, 1));
    assert_eq!(interp.call(&alias, vec![Value::Int(5)]).unwrap(), Value::Int(6));
}
