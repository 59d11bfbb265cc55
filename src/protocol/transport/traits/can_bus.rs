//! Minimal abstraction over the physical CAN controller driver. Allows the
//! library to plug into various implementations (embedded HAL, desktop
//! driver, test double) without owning any hardware concern itself.
//!
//! The receive path is callback-shaped: the driver delivers an inbound frame
//! for identifier X by invoking the [`FrameHandler`] registered for X, either
//! from its receive interrupt or from [`CanBus::drain_receive_queue`]. A
//! `FrameHandler` is a plain function pointer, which is all a C-style driver
//! callback surface can store; the dispatch registry turns it back into a
//! method call on the owning transport.
use crate::protocol::registry::FrameHandler;
use embedded_can::StandardId;
use futures_util::Future;

/// Contract to transmit frames and route received ones.
pub trait CanBus {
    type Error: core::fmt::Debug;

    /// Whether the controller is initialized and operational.
    fn ready(&self) -> bool;

    /// Transmit one data frame. Synchronous: the driver either queues it in
    /// a hardware mailbox or reports failure.
    fn send_frame(&mut self, id: StandardId, data: &[u8]) -> Result<(), Self::Error>;

    /// Transmit a remote request for `len` bytes on `id`.
    fn send_remote_request(&mut self, id: StandardId, len: usize) -> Result<(), Self::Error>;

    /// Route inbound frames for `id` to `handler`. The handler may be
    /// invoked from interrupt context.
    fn register_callback(&mut self, id: StandardId, handler: FrameHandler);

    /// Deliver any frames the driver has buffered to their registered
    /// handlers. Drivers that dispatch from the receive interrupt may make
    /// this a no-op.
    fn drain_receive_queue(&mut self);

    /// Try to claim a free transmit mailbox without waiting.
    fn try_lock_transmit(&mut self) -> bool;

    /// Wait until a transmit mailbox is free. Asynchronous to accommodate
    /// non-blocking drivers.
    fn wait_for_transmit_slot<'a>(&'a mut self) -> impl Future<Output = ()> + 'a;
}
