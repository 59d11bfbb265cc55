//! Abstraction traits used by the transport layer (CAN backend and timer).
pub mod can_bus;
pub mod orion_timer;
