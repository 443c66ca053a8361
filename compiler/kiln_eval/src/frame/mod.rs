//! Activation records.
//!
//! A [`FrameDescriptor`] is built once per lexical scope while the tree is
//! assembled and then shared read-only by every activation of that scope.
//! A [`Frame`] is one activation: the descriptor, a link to the lexically
//! enclosing frame, and a fixed-size slot array.
//!
//! # Slot specialization
//!
//! Each slot tracks a [`SlotKind`] per activation:
//!
//! ```text
//! Uninitialized ──int──▶ Int  ──other──▶ Generic
//!       │                                  ▲
//!       └────bool──▶ Bool ──other──────────┘
//! ```
//!
//! `Int` and `Bool` slots store the raw scalar; `Generic` slots store a full
//! [`Value`]. Kinds only ever widen, and widening one activation's slot has no
//! effect on any other activation of the same descriptor.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use kiln_ir::Name;

use crate::errors::SlotFault;
use crate::Value;

/// Stable identifier of a slot within one descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: usize,
    name: Name,
}

impl SlotId {
    #[inline]
    pub fn index(self) -> usize {
        self.index
    }

    #[inline]
    pub fn name(self) -> Name {
        self.name
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Ordered, append-only list of named slot declarations.
#[derive(Clone, Debug, Default)]
pub struct FrameDescriptor {
    slots: Vec<Name>,
}

impl FrameDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new slot. Indices are assigned in declaration order.
    ///
    /// Redeclaring a name creates a distinct slot with a new index.
    pub fn add_slot(&mut self, name: impl Into<Name>) -> SlotId {
        let name = name.into();
        let index = self.slots.len();
        self.slots.push(name);
        SlotId { index, name }
    }

    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, &name)| SlotId { index, name })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Freeze the descriptor so activations can share it.
    pub fn into_shared(self) -> Rc<FrameDescriptor> {
        Rc::new(self)
    }
}

/// Storage-kind hint for one slot of one activation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SlotKind {
    #[default]
    Uninitialized,
    Int,
    Bool,
    Generic,
}

impl SlotKind {
    /// The kind after storing `value`. Never narrower than `self`.
    #[inline]
    pub fn widen(self, value: &Value) -> SlotKind {
        match (self, value) {
            (SlotKind::Uninitialized | SlotKind::Int, Value::Int(_)) => SlotKind::Int,
            (SlotKind::Uninitialized | SlotKind::Bool, Value::Bool(_)) => SlotKind::Bool,
            _ => SlotKind::Generic,
        }
    }
}

/// Slot storage, shaped by the slot's current kind.
#[derive(Clone, Default)]
enum Slot {
    #[default]
    Empty,
    Int(i64),
    Bool(bool),
    Generic(Value),
}

/// One activation record.
pub struct Frame {
    descriptor: Rc<FrameDescriptor>,
    parent: Option<Rc<Frame>>,
    slots: RefCell<Box<[Slot]>>,
    kinds: Box<[Cell<SlotKind>]>,
}

impl Frame {
    /// Create an activation of `descriptor` nested inside `parent`.
    pub fn activate(descriptor: Rc<FrameDescriptor>, parent: Option<Rc<Frame>>) -> Rc<Frame> {
        let len = descriptor.len();
        Rc::new(Frame {
            descriptor,
            parent,
            slots: RefCell::new(vec![Slot::Empty; len].into_boxed_slice()),
            kinds: (0..len).map(|_| Cell::new(SlotKind::Uninitialized)).collect(),
        })
    }

    /// A frame with no slots and no parent.
    pub fn empty() -> Rc<Frame> {
        Self::activate(Rc::new(FrameDescriptor::new()), None)
    }

    pub fn descriptor(&self) -> &Rc<FrameDescriptor> {
        &self.descriptor
    }

    pub fn parent(&self) -> Option<&Rc<Frame>> {
        self.parent.as_ref()
    }

    /// The frame `depth` lexical levels out (0 = this frame).
    pub fn ancestor(&self, depth: usize) -> Result<&Frame, SlotFault> {
        let mut frame = self;
        for _ in 0..depth {
            frame = frame.parent.as_deref().ok_or(SlotFault::NoEnclosingFrame)?;
        }
        Ok(frame)
    }

    /// Read a slot of this frame.
    #[inline]
    pub fn read(&self, slot: SlotId) -> Result<Value, SlotFault> {
        match self.slots.borrow().get(slot.index) {
            None => Err(SlotFault::OutOfRange),
            Some(Slot::Empty) => Err(SlotFault::Unwritten),
            Some(Slot::Int(n)) => Ok(Value::Int(*n)),
            Some(Slot::Bool(b)) => Ok(Value::Bool(*b)),
            Some(Slot::Generic(v)) => Ok(v.clone()),
        }
    }

    /// Write a slot of this frame, widening its kind if needed.
    #[inline]
    pub fn write(&self, slot: SlotId, value: Value) -> Result<(), SlotFault> {
        let cell = self.kinds.get(slot.index).ok_or(SlotFault::OutOfRange)?;
        let old = cell.get();
        let kind = old.widen(&value);
        if kind != old {
            tracing::trace!(slot = %slot.name, from = ?old, to = ?kind, "slot kind widened");
            cell.set(kind);
        }
        let stored = match (kind, value) {
            (SlotKind::Int, Value::Int(n)) => Slot::Int(n),
            (SlotKind::Bool, Value::Bool(b)) => Slot::Bool(b),
            (_, value) => Slot::Generic(value),
        };
        self.slots.borrow_mut()[slot.index] = stored;
        Ok(())
    }

    /// Current storage kind of a slot.
    pub fn slot_kind(&self, slot: SlotId) -> Option<SlotKind> {
        self.kinds.get(slot.index).map(Cell::get)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for id in self.descriptor.slot_ids() {
            map.key(&format_args!("{}", id.name));
            match self.read(id) {
                Ok(value) => map.value(&value),
                Err(_) => map.value(&format_args!("<unwritten>")),
            };
        }
        map.finish()
    }
}
