//! End-to-end programs assembled through the factory API.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use kiln_eval::{
    buffer_handler, EvalErrorKind, Expr, FrameDescriptor, Interpreter, PrimOp, Value,
};
use pretty_assertions::assert_eq;

/// `(begin (set! fibo (lambda fibo (n) ...)) (fibo n))`, naive double recursion.
fn fibo_program(n: i64) -> (Expr, FrameDescriptor) {
    let mut root = FrameDescriptor::new();
    let fibo = root.add_slot("fibo");
    let mut scope = FrameDescriptor::new();
    let arg = scope.add_slot("n");

    let recurse = |k| {
        Expr::apply(
            Expr::read_at(fibo, 1),
            [Expr::call_prim(PrimOp::Sub, [Expr::read(arg), Expr::int(k)])],
        )
    };
    let body = Expr::if_(
        Expr::call_prim(PrimOp::Lt, [Expr::read(arg), Expr::int(2)]),
        Expr::read(arg),
        Expr::call_prim(PrimOp::Add, [recurse(1), recurse(2)]),
    );
    let program = Expr::begin([
        Expr::write(
            fibo,
            Expr::named_lambda("fibo", vec![arg], body, scope.into_shared()),
        ),
        Expr::apply(Expr::read(fibo), [Expr::int(n)]),
    ]);
    (program, root)
}

fn run_fibo(n: i64) -> Value {
    let (program, root) = fibo_program(n);
    Interpreter::new()
        .invoke_with(&program, root.into_shared())
        .unwrap()
}

#[test]
fn fibo_10() {
    assert_eq!(run_fibo(10), Value::Int(55));
}

#[test]
fn fibo_20() {
    assert_eq!(run_fibo(20), Value::Int(6765));
}

#[test]
fn fibo_base_cases() {
    assert_eq!(run_fibo(0), Value::Int(0));
    assert_eq!(run_fibo(1), Value::Int(1));
}

#[test]
fn same_tree_can_be_invoked_again() {
    let (program, root) = fibo_program(15);
    let root = root.into_shared();
    let mut interp = Interpreter::new();
    let first = interp.invoke_with(&program, root.clone()).unwrap();
    let second = interp.invoke_with(&program, root).unwrap();
    assert_eq!(first, Value::Int(610));
    assert_eq!(first, second);
}

#[test]
fn box_round_trip() {
    let program = Expr::call_prim(
        PrimOp::Unbox,
        [Expr::call_prim(PrimOp::MakeBox, [Expr::int(3)])],
    );
    assert_eq!(Interpreter::new().invoke(&program).unwrap(), Value::Int(3));
}

#[test]
fn closures_sharing_a_box_observe_writes() {
    // (begin
    //   (set! counter (box 0))
    //   (set! bump (lambda () (set-box! counter^1 (add (unbox counter^1) 1))))
    //   (set! peek (lambda () (unbox counter^1)))
    //   (bump) (bump)
    //   (peek))
    let mut root = FrameDescriptor::new();
    let counter = root.add_slot("counter");
    let bump = root.add_slot("bump");
    let peek = root.add_slot("peek");
    let unbox = || Expr::call_prim(PrimOp::Unbox, [Expr::read_at(counter, 1)]);

    let bump_fn = Expr::named_lambda(
        "bump",
        vec![],
        Expr::call_prim(
            PrimOp::SetBox,
            [
                Expr::read_at(counter, 1),
                Expr::call_prim(PrimOp::Add, [unbox(), Expr::int(1)]),
            ],
        ),
        FrameDescriptor::new().into_shared(),
    );
    let peek_fn = Expr::named_lambda("peek", vec![], unbox(), FrameDescriptor::new().into_shared());

    let program = Expr::begin([
        Expr::write(counter, Expr::call_prim(PrimOp::MakeBox, [Expr::int(0)])),
        Expr::write(bump, bump_fn),
        Expr::write(peek, peek_fn),
        Expr::apply(Expr::read(bump), []),
        Expr::apply(Expr::read(bump), []),
        Expr::apply(Expr::read(peek), []),
    ]);
    let result = Interpreter::new()
        .invoke_with(&program, root.into_shared())
        .unwrap();
    assert_eq!(result, Value::Int(2));
}

#[test]
fn box_contents_are_unconstrained() {
    let mut root = FrameDescriptor::new();
    let b = root.add_slot("b");
    let program = Expr::begin([
        Expr::write(b, Expr::call_prim(PrimOp::MakeBox, [Expr::int(1)])),
        Expr::call_prim(PrimOp::SetBox, [Expr::read(b), Expr::symbol("now-a-symbol")]),
        Expr::call_prim(PrimOp::Unbox, [Expr::read(b)]),
    ]);
    let result = Interpreter::new()
        .invoke_with(&program, root.into_shared())
        .unwrap();
    assert_eq!(result, Value::symbol("now-a-symbol"));
}

#[test]
fn capture_observes_later_writes() {
    // (begin (set! x 1) (set! f (lambda () x^1)) (set! x 2) (f))
    let mut root = FrameDescriptor::new();
    let x = root.add_slot("x");
    let f = root.add_slot("f");
    let program = Expr::begin([
        Expr::write(x, Expr::int(1)),
        Expr::write(
            f,
            Expr::lambda(vec![], Expr::read_at(x, 1), FrameDescriptor::new().into_shared()),
        ),
        Expr::write(x, Expr::int(2)),
        Expr::apply(Expr::read(f), []),
    ]);
    let result = Interpreter::new()
        .invoke_with(&program, root.into_shared())
        .unwrap();
    assert_eq!(result, Value::Int(2));
}

#[test]
fn closure_writes_reach_the_captured_frame() {
    // (begin (set! x 1) ((lambda () (set! x^1 10))) x)
    let mut root = FrameDescriptor::new();
    let x = root.add_slot("x");
    let setter = Expr::lambda(
        vec![],
        Expr::write_at(x, 1, Expr::int(10)),
        FrameDescriptor::new().into_shared(),
    );
    let program = Expr::begin([
        Expr::write(x, Expr::int(1)),
        Expr::apply(setter, []),
        Expr::read(x),
    ]);
    let result = Interpreter::new()
        .invoke_with(&program, root.into_shared())
        .unwrap();
    assert_eq!(result, Value::Int(10));
}

/// `(lambda make-adder (k) (lambda (n) (add n k^1)))`
fn make_adder() -> Expr {
    let mut outer = FrameDescriptor::new();
    let k = outer.add_slot("k");
    let mut inner = FrameDescriptor::new();
    let n = inner.add_slot("n");
    Expr::named_lambda(
        "make-adder",
        vec![k],
        Expr::lambda(
            vec![n],
            Expr::call_prim(PrimOp::Add, [Expr::read(n), Expr::read_at(k, 1)]),
            inner.into_shared(),
        ),
        outer.into_shared(),
    )
}

#[test]
fn returned_closures_keep_their_frames() {
    let mut interp = Interpreter::new();
    let maker = interp.invoke(&make_adder()).unwrap();
    let add5 = interp.call(&maker, vec![Value::Int(5)]).unwrap();
    let add7 = interp.call(&maker, vec![Value::Int(7)]).unwrap();
    assert_eq!(interp.call(&add5, vec![Value::Int(1)]).unwrap(), Value::Int(6));
    assert_eq!(interp.call(&add7, vec![Value::Int(1)]).unwrap(), Value::Int(8));
    assert_ne!(add5, add7);
}

#[test]
fn println_program_output() {
    let out = buffer_handler();
    let mut interp = Interpreter::builder().print_handler(out.clone()).build();
    let (program, root) = fibo_program(10);
    let printed = Expr::call_prim(PrimOp::Println, [program]);
    let result = interp.invoke_with(&printed, root.into_shared()).unwrap();
    assert_eq!(result, Value::Unit);
    assert_eq!(out.output(), "55\n");
}

#[test]
fn errors_abort_the_whole_invoke() {
    let mut root = FrameDescriptor::new();
    let x = root.add_slot("x");
    let program = Expr::begin([
        Expr::write(x, Expr::int(1)),
        Expr::call_prim(PrimOp::Add, [Expr::read(x), Expr::bool(true)]),
        Expr::write(x, Expr::int(2)),
    ]);
    let err = Interpreter::new()
        .invoke_with(&program, root.into_shared())
        .unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::TypeMismatch {
            expected: "int",
            got: "bool"
        }
    );
}
