//! Request/response protocol implementation: transport abstractions and
//! configuration, the process-wide dispatch registry, and the two endpoint
//! roles (initiator, responder).
pub mod initiator;
pub mod registry;
pub mod responder;
pub mod transport;
