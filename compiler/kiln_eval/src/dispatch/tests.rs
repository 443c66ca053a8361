use super::*;
use crate::errors::EvalErrorKind;
use crate::primitives::PrimOp;
use kiln_ir::Name;
use pretty_assertions::assert_eq;

fn look(site: &CallSite, closure: &Closure) -> Option<(TransferKind, CacheEvent, usize)> {
    site.lookup(closure, DEFAULT_INLINE_CACHE_SIZE)
        .ok()
        .map(|l| (l.transfer, l.event, l.evicted))
}

#[test]
fn monomorphic_then_hit() {
    let site = CallSite::new();
    let add = Closure::primitive(PrimOp::Add);
    assert_eq!(site.state(), CacheState::Uninitialized);
    assert_eq!(
        look(&site, &add),
        Some((TransferKind::Direct, CacheEvent::Recorded, 0))
    );
    assert_eq!(site.state(), CacheState::Monomorphic);
    assert_eq!(
        look(&site, &add),
        Some((TransferKind::Direct, CacheEvent::Hit, 0))
    );
}

#[test]
fn distinct_cells_with_one_entry_point_hit() {
    let site = CallSite::new();
    look(&site, &Closure::primitive(PrimOp::Sub));
    assert_eq!(
        look(&site, &Closure::primitive(PrimOp::Sub)),
        Some((TransferKind::Direct, CacheEvent::Hit, 0))
    );
    assert_eq!(site.len(), 1);
}

#[test]
fn third_target_goes_megamorphic() {
    let site = CallSite::new();
    look(&site, &Closure::primitive(PrimOp::Add));
    look(&site, &Closure::primitive(PrimOp::Sub));
    assert_eq!(site.state(), CacheState::Polymorphic);
    assert_eq!(
        look(&site, &Closure::primitive(PrimOp::Mul)),
        Some((TransferKind::Indirect, CacheEvent::WentMegamorphic, 0))
    );
    assert_eq!(site.state(), CacheState::Megamorphic);
    assert!(site.is_empty());
    // Stays generic even for a previously cached target.
    assert_eq!(
        look(&site, &Closure::primitive(PrimOp::Add)),
        Some((TransferKind::Indirect, CacheEvent::Generic, 0))
    );
}

#[test]
fn larger_limit_delays_megamorphism() {
    let site = CallSite::new();
    for op in [PrimOp::Add, PrimOp::Sub, PrimOp::Mul] {
        let lookup = site.lookup(&Closure::primitive(op), 3).ok().map(|l| l.event);
        assert_eq!(lookup, Some(CacheEvent::Recorded));
    }
    assert_eq!(site.state(), CacheState::Polymorphic);
    assert_eq!(site.len(), 3);
}

#[test]
fn rebinding_evicts_lazily() {
    let site = CallSite::new();
    let f = Closure::placeholder("f");
    f.bind(CallTarget::Primitive(PrimOp::Add));
    look(&site, &f);

    f.bind(CallTarget::Primitive(PrimOp::Sub));
    // Nothing changes until the site is dispatched again.
    assert_eq!(site.len(), 1);

    let lookup = site.lookup(&f, DEFAULT_INLINE_CACHE_SIZE).ok();
    let (event, evicted, target) = match lookup {
        Some(l) => (l.event, l.evicted, l.target),
        None => panic!("lookup failed"),
    };
    assert_eq!((event, evicted), (CacheEvent::Recorded, 1));
    assert!(target.same_entry(&CallTarget::Primitive(PrimOp::Sub)));
    assert_eq!(site.state(), CacheState::Monomorphic);
}

#[test]
fn rebinding_to_same_entry_still_evicts() {
    let site = CallSite::new();
    let f = Closure::placeholder("g");
    f.bind(CallTarget::Primitive(PrimOp::Eq));
    look(&site, &f);
    f.bind(CallTarget::Primitive(PrimOp::Eq));
    assert_eq!(
        look(&site, &f),
        Some((TransferKind::Direct, CacheEvent::Recorded, 1))
    );
}

#[test]
fn unbound_fails_without_touching_cache() {
    let site = CallSite::new();
    let err = site
        .lookup(&Closure::placeholder("todo"), DEFAULT_INLINE_CACHE_SIZE)
        .err()
        .map(|e| e.kind);
    assert_eq!(
        err,
        Some(EvalErrorKind::UnboundFunction {
            name: Name::intern("todo")
        })
    );
    assert_eq!(site.state(), CacheState::Uninitialized);
}
