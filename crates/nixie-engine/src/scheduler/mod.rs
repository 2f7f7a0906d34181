//! Cooperative per-frame scheduling.
//!
//! A single scheduler drives every engine sharing a window: each redraw
//! ticks all registered entries in registration order. Single-threaded by
//! construction; entries are `Rc<RefCell<_>>` and borrowed one at a time.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::engine::RippleEngine;
use crate::render::{RenderCtx, RenderTarget};

/// Anything the scheduler can advance once per frame.
pub trait Steppable {
    fn step_frame(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>);
}

impl Steppable for RippleEngine {
    fn step_frame(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        if let Err(err) = self.step(ctx, target) {
            // Keep the frame going for the other entries.
            log::warn!("engine step failed: {err}");
        }
    }
}

pub type SchedulerId = u64;

/// Registry of entries ticked on every redraw.
#[derive(Default)]
pub struct FrameScheduler {
    entries: BTreeMap<SchedulerId, Rc<RefCell<dyn Steppable>>>,
    next_id: SchedulerId,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: Rc<RefCell<dyn Steppable>>) -> SchedulerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, entry);
        id
    }

    /// Removes an entry, reporting whether it was registered.
    pub fn unregister(&mut self, id: SchedulerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn is_registered(&self, id: SchedulerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Whether anything still wants frames.
    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advances every entry once, in registration order.
    pub fn tick(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        self.visit(|_, entry| entry.step_frame(ctx, target));
    }

    /// One pass over the registry in id order, each entry borrowed mutably
    /// exactly once. `tick` is this walk applied to the frame context.
    pub fn visit(&mut self, mut step: impl FnMut(SchedulerId, &mut dyn Steppable)) {
        for (id, entry) in &self.entries {
            step(*id, &mut *entry.borrow_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl Steppable for Idle {
        fn step_frame(&mut self, _ctx: &RenderCtx<'_>, _target: &mut RenderTarget<'_>) {}
    }

    fn entry() -> Rc<RefCell<Idle>> {
        Rc::new(RefCell::new(Idle))
    }

    #[test]
    fn register_assigns_increasing_ids() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.register(entry());
        let b = scheduler.register(entry());
        assert!(b > a);
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn unregister_stops_tracking() {
        let mut scheduler = FrameScheduler::new();
        let id = scheduler.register(entry());
        assert!(scheduler.is_registered(id));
        assert!(scheduler.is_active());

        assert!(scheduler.unregister(id));
        assert!(!scheduler.is_registered(id));
        assert!(!scheduler.is_active());

        // Unknown ids are tolerated.
        assert!(!scheduler.unregister(id));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.register(entry());
        scheduler.unregister(a);
        let b = scheduler.register(entry());
        assert_ne!(a, b);
    }

    #[test]
    fn frames_walk_each_entry_once_in_registration_order() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.register(entry());
        let b = scheduler.register(entry());
        let c = scheduler.register(entry());

        let mut seen = Vec::new();
        scheduler.visit(|id, _| seen.push(id));
        assert_eq!(seen, vec![a, b, c]);
    }

    #[test]
    fn unregistered_entries_drop_out_of_the_walk() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.register(entry());
        let b = scheduler.register(entry());
        let c = scheduler.register(entry());
        scheduler.unregister(b);

        let mut seen = Vec::new();
        scheduler.visit(|id, _| seen.push(id));
        assert_eq!(seen, vec![a, c]);
    }
}
