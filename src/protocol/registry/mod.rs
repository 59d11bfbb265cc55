//! Process-wide dispatch registry bridging the CAN backend's
//! function-pointer callback surface back to transport instances.
//!
//! A backend callback carries no closure environment, so an inbound frame
//! cannot reach its owning instance directly. The registry assigns each
//! instance a fixed slot and hands out the matching entry from a static
//! thunk table: thunk N looks up slot N and forwards the frame. Routing is
//! thus allocation-free and each CAN identifier reaches exactly the one
//! instance registered for it.
//!
//! Slots are assigned first-empty-wins at startup and never reclaimed; a
//! transport occupies its slot for the lifetime of the process.
use crate::error::RegistryError;
use core::cell::RefCell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Maximum number of live transports per process.
pub const MAX_TRANSPORTS: usize = 8;

/// Shape of the callback a CAN backend accepts: a plain function pointer
/// receiving the frame payload bytes. May be invoked from interrupt context.
pub type FrameHandler = fn(&[u8]);

/// Receiving side of a transport instance. Implementations are invoked from
/// interrupt context and must be non-blocking and allocation-free.
pub trait FrameSink: Sync {
    /// Accept one inbound frame payload (0 to 8 bytes).
    fn on_frame(&self, frame: &[u8]);
}

// Slot table. Written once per slot during init, read on every inbound
// frame; both sides go through a critical section because readers run in
// interrupt context.
static SLOTS: Mutex<
    CriticalSectionRawMutex,
    RefCell<[Option<&'static dyn FrameSink>; MAX_TRANSPORTS]>,
> = Mutex::new(RefCell::new([None; MAX_TRANSPORTS]));

/// Statically distinguishable entry point for slot `SLOT`.
fn dispatch<const SLOT: usize>(frame: &[u8]) {
    let sink = SLOTS.lock(|slots| slots.borrow()[SLOT]);
    if let Some(sink) = sink {
        sink.on_frame(frame);
    }
}

// One monomorphized thunk per slot; `register` hands out the matching entry.
static DISPATCH: [FrameHandler; MAX_TRANSPORTS] = [
    dispatch::<0>,
    dispatch::<1>,
    dispatch::<2>,
    dispatch::<3>,
    dispatch::<4>,
    dispatch::<5>,
    dispatch::<6>,
    dispatch::<7>,
];

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    /// Assigned slot index (0..7).
    pub slot: usize,
    /// Entry point to hand to [`CanBus::register_callback`].
    ///
    /// [`CanBus::register_callback`]: crate::protocol::transport::traits::can_bus::CanBus::register_callback
    pub handler: FrameHandler,
}

/// Assign the first empty slot to `sink`.
pub fn register(sink: &'static dyn FrameSink) -> Result<Registration, RegistryError> {
    SLOTS.lock(|slots| {
        let mut slots = slots.borrow_mut();
        let slot = slots
            .iter()
            .position(|entry| entry.is_none())
            .ok_or(RegistryError::Exhausted)?;
        slots[slot] = Some(sink);
        Ok(Registration {
            slot,
            handler: DISPATCH[slot],
        })
    })
}

/// Number of slots currently assigned. Diagnostics only.
pub fn registered_count() -> usize {
    SLOTS.lock(|slots| slots.borrow().iter().filter(|entry| entry.is_some()).count())
}
