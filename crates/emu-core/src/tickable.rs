//! Trait for components advanced by clock ticks.

/// A component that can be advanced by discrete clock ticks.
///
/// A console tick fans out to the chips it owns in a fixed, deterministic
/// order, and each `tick()` returns after a bounded amount of work. The
/// interleaving is the definition of correctness: every read and write a
/// device observes is serialized in the exact order the driver issues them.
pub trait Tickable {
    /// Advance the component by one tick.
    fn tick(&mut self);

    /// Advance the component by `count` ticks.
    fn tick_n(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }
}
