//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (cursor capacity, registry
//! slot assignment, transaction lifecycle).
use thiserror_no_std::Error;

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised by the typed cursor accessors.
pub enum CursorError {
    /// Requested access exceeds the remaining buffer space. The buffer is
    /// left untouched, including for multi-byte accessors.
    #[error("Cursor overrun -> asked: {asked}, available: {available}")]
    Overrun { asked: usize, available: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised while assigning a transport to the dispatch registry.
pub enum RegistryError {
    /// All registry slots are taken. Slots are never reclaimed, so this is
    /// a startup configuration error.
    #[error("Transport registry exhausted")]
    Exhausted,
}

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised while wiring a transport to its CAN backend.
pub enum InitError {
    /// The CAN backend reported it is not operational.
    #[error("CAN backend not ready")]
    NotReady,

    /// No registry slot could be assigned.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

//==================================================================================TRANSACT_ERROR
#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised by the initiator while running one request/response
/// transaction. A failed transaction modifies no decoded output and is safe
/// to retry as a whole.
pub enum TransactError<E: core::fmt::Debug> {
    /// The CAN backend reported it is not operational.
    #[error("CAN backend not ready")]
    NotReady,

    /// The built request does not fit a single CAN frame (1 to 8 bytes).
    #[error("Invalid request length: {len}")]
    RequestLength { len: usize },

    /// CAN backend rejected the frame during transmission.
    #[error("CAN bus send error: {0:?}")]
    Send(E),

    /// No matching response arrived within the configured timeout.
    #[error("Response timeout")]
    Timeout,

    /// A response frame arrived whose tidop does not correlate with the
    /// outstanding request.
    #[error("Response tidop mismatch")]
    TidopMismatch,

    /// A response frame arrived with fewer than the two header bytes.
    #[error("Undersized response")]
    UndersizedResponse,
}
