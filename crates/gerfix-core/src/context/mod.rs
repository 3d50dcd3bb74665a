//! Register-context view passed to hook callbacks.

#[cfg(test)]
pub mod mock;

#[cfg(test)]
pub use mock::MockContext;

/// Mutable view onto the interrupted thread's CPU registers at a hook site.
///
/// A context is exclusively borrowed for the duration of one callback
/// invocation and never stored past its return. Memory accessors take
/// absolute addresses; the hooked code's `eax` typically serves as the
/// base of the record being inspected.
pub trait RegisterContext {
    /// Read float lane `lane` (0..4) of xmm0.
    fn xmm0_lane(&self, lane: usize) -> f32;

    /// Overwrite float lane `lane` (0..4) of xmm0.
    fn set_xmm0_lane(&mut self, lane: usize, value: f32);

    /// The interrupted `eax`.
    fn eax(&self) -> u32;

    /// Read a `u32` at an absolute address. `None` when unreadable.
    fn read_u32(&self, address: u32) -> Option<u32>;

    /// Write an `f32` at an absolute address. `false` when unwritable.
    fn write_f32(&mut self, address: u32, value: f32) -> bool;
}
