//! `orion-canrpc` library: request/response transport for telescope mount
//! peripherals sharing a classic CAN bus, in a `no_std` environment. The crate
//! exposes the codec infrastructure (wire bytes, cursor buffers), the dispatch
//! registry bridging function-pointer callback backends, and the protocol
//! endpoints (request initiator, request responder).
#![no_std]
//==================================================================================
#[cfg(test)]
extern crate std;
// Host unit tests need a linked critical-section implementation for the shared state.
#[cfg(test)]
use critical_section as _;
//==================================================================================
/// Domain and low-level errors (cursor capacity, registry slots, transactions).
pub mod error;
/// Byte-exact encode/decode: tidop/status wire bytes and cursor accessors.
pub mod infra;
/// Protocol implementation: transport abstractions, dispatch registry,
/// request initiator and request responder.
pub mod protocol;
//==================================================================================
