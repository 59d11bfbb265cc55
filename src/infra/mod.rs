//! Infrastructure layer: codec primitives shared by the initiator and the
//! responder.
pub mod codec;
