//! Request initiator: builds one outbound request at a time, transmits it
//! exactly once, and performs a bounded cooperative wait for the matching
//! response frame(s).
//!
//! Correlation is keyed on the tidop byte: each request carries a fresh
//! 3-bit transaction id, and only a response echoing that exact byte (plus,
//! in dual-frame mode, its successor) resolves the transaction. At most one
//! transaction is outstanding per instance; `&mut self` on every call
//! enforces it at compile time.
use crate::error::{InitError, TransactError};
use crate::infra::codec::cursor::{RxCursor, TxCursor};
use crate::infra::codec::wire::{dual_successor, pack_tidop, Status};
use crate::protocol::registry::{self, FrameSink};
use crate::protocol::transport::frame::RawFrame;
use crate::protocol::transport::traits::can_bus::CanBus;
use crate::protocol::transport::traits::orion_timer::OrionTimer;
use crate::protocol::transport::{
    TransportConfig, FRAME_MAX, POLL_INTERVAL_MS, RESPONSE_HEADER_LEN,
};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

//==================================================================================RESPONSE_WATCH

/// Terminal correlation failures recorded by the interrupt side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFault {
    /// A frame arrived whose tidop matches neither expected byte.
    Mismatch,
    /// A frame arrived shorter than the two header bytes.
    Undersized,
}

/// Correlation state of the outstanding transaction. Written from interrupt
/// context, read from task context; multi-byte, so every access runs inside
/// a critical section, the software equivalent of the interrupt-disable
/// reads hardware registers get.
struct Correlation {
    armed: bool,
    dual: bool,
    expected: u8,
    expected_second: u8,
    first: Option<RawFrame>,
    second: Option<RawFrame>,
    fault: Option<ResponseFault>,
}

impl Correlation {
    const fn new() -> Self {
        Self {
            armed: false,
            dual: false,
            expected: 0,
            expected_second: 0,
            first: None,
            second: None,
            fault: None,
        }
    }
}

/// Progress of the outstanding transaction as seen from task context.
enum WatchPoll {
    Pending,
    Complete(RawFrame, Option<RawFrame>),
    Fault(ResponseFault),
}

/// Interrupt-shared half of an initiator. Firmware allocates one statically
/// per instance and hands it to [`Initiator::new`]; the dispatch registry
/// routes inbound response frames into it.
pub struct ResponseWatch {
    state: Mutex<CriticalSectionRawMutex, RefCell<Correlation>>,
}

impl Default for ResponseWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWatch {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(Correlation::new())),
        }
    }

    /// Start expecting `expected` (and its successor in dual mode). Clears
    /// any residue of the previous transaction.
    fn arm(&self, expected: u8, dual: bool) {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            state.armed = true;
            state.dual = dual;
            state.expected = expected;
            state.expected_second = dual_successor(expected);
            state.first = None;
            state.second = None;
            state.fault = None;
        });
    }

    /// Stop expecting anything; late frames go back to being ignored.
    fn disarm(&self) {
        self.state.lock(|cell| cell.borrow_mut().armed = false);
    }

    /// Check progress; a terminal outcome disarms the watch and hands the
    /// frames over.
    fn poll(&self) -> WatchPoll {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if let Some(fault) = state.fault {
                state.armed = false;
                return WatchPoll::Fault(fault);
            }
            let complete = match (state.dual, &state.first, &state.second) {
                (false, Some(_), _) => true,
                (true, Some(_), Some(_)) => true,
                _ => false,
            };
            if !complete {
                return WatchPoll::Pending;
            }
            state.armed = false;
            let first = state.first.take().unwrap();
            let second = state.second.take();
            WatchPoll::Complete(first, second)
        })
    }
}

impl FrameSink for ResponseWatch {
    /// Interrupt-context ingestion: match the frame against the expected
    /// tidop(s) or record a fault. Frames arriving outside a transaction are
    /// silently discarded; this protocol has no NACK path.
    fn on_frame(&self, frame: &[u8]) {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if !state.armed || state.fault.is_some() {
                return;
            }
            if frame.len() < RESPONSE_HEADER_LEN {
                state.fault = Some(ResponseFault::Undersized);
                return;
            }
            let tidop = frame[0];
            if tidop == state.expected {
                state.first = Some(RawFrame::from_slice(frame));
            } else if state.dual && tidop == state.expected_second {
                state.second = Some(RawFrame::from_slice(frame));
            } else {
                state.fault = Some(ResponseFault::Mismatch);
            }
        });
    }
}

//==================================================================================INITIATOR

/// Client endpoint owning the outbound request buffer and the decoded
/// response buffer.
pub struct Initiator<C: CanBus, T: OrionTimer> {
    bus: C,
    timer: T,
    config: TransportConfig,
    watch: &'static ResponseWatch,
    slot: Option<usize>,
    tid: u8,
    tidop: u8,
    opcode: u8,
    tx: TxCursor,
    rx: RxCursor,
}

impl<C, T> Initiator<C, T>
where
    C: CanBus,
    C::Error: core::fmt::Debug,
    T: OrionTimer,
{
    /// Bind an initiator to its backend, timer, and interrupt-shared watch.
    /// Call [`init`](Self::init) once before the first request.
    pub fn new(bus: C, timer: T, config: TransportConfig, watch: &'static ResponseWatch) -> Self {
        Self {
            bus,
            timer,
            config,
            watch,
            slot: None,
            // First request uses transaction id 0.
            tid: 7,
            tidop: 0,
            opcode: 0,
            tx: TxCursor::new(),
            rx: RxCursor::new(),
        }
    }

    /// Claim a registry slot and route response frames into the watch.
    pub fn init(&mut self) -> Result<(), InitError> {
        if !self.bus.ready() {
            return Err(InitError::NotReady);
        }
        let registration = registry::register(self.watch)?;
        self.bus
            .register_callback(self.config.response_id, registration.handler);
        self.slot = Some(registration.slot);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "initiator on slot {} (req {:#x} / resp {:#x})",
            registration.slot,
            self.config.request_id.as_raw(),
            self.config.response_id.as_raw()
        );

        Ok(())
    }

    /// Assigned registry slot, once [`init`](Self::init) succeeded.
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    /// Start building a new request: advance the 3-bit transaction id
    /// (wrapping 0..7), reset the write cursor, and lay down the tidop byte.
    /// Fails only if the backend is not ready.
    pub fn begin_request(&mut self, opcode: u8) -> Result<(), TransactError<C::Error>> {
        if !self.bus.ready() {
            return Err(TransactError::NotReady);
        }
        self.tid = (self.tid + 1) & 0x07;
        self.opcode = opcode & 0x1F;
        self.tidop = pack_tidop(self.tid, self.opcode);
        self.tx.clear();
        // Cannot overrun: the cursor was just cleared.
        let _ = self.tx.write_u8(self.tidop);
        Ok(())
    }

    /// Write cursor for appending 0 to 7 argument bytes after
    /// [`begin_request`](Self::begin_request).
    pub fn writer(&mut self) -> &mut TxCursor {
        &mut self.tx
    }

    /// Read cursor over the decoded response payload; positioned just past
    /// the 2-byte header after a successful [`transact`](Self::transact).
    pub fn reader(&mut self) -> &mut RxCursor {
        &mut self.rx
    }

    /// Run the built request as one synchronous transaction: transmit
    /// exactly once, then poll for the correlated response under the
    /// configured timeout, yielding cooperatively between polls.
    ///
    /// On success the decoded [`Status`] is returned and the payload is
    /// readable through [`reader`](Self::reader). On any failure no output
    /// is modified: the call is indistinguishable in effect from "no
    /// transaction happened" and safe to retry as a whole. Retry is the
    /// caller's decision, never this function's.
    pub async fn transact(&mut self) -> Result<Status, TransactError<C::Error>> {
        let len = self.tx.len();
        if len == 0 || len > FRAME_MAX {
            return Err(TransactError::RequestLength { len });
        }
        let dual = self.opcode >= self.config.dual_frame_opcode_start;

        // Arm before transmitting so a fast responder cannot win the race.
        self.watch.arm(self.tidop, dual);

        if !self.bus.try_lock_transmit() {
            self.bus.wait_for_transmit_slot().await;
        }
        if let Err(err) = self.bus.send_frame(self.config.request_id, self.tx.as_slice()) {
            self.watch.disarm();
            return Err(TransactError::Send(err));
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("request tidop {:#x}, len {}, dual {}", self.tidop, len, dual);

        let mut elapsed_ms = 0u32;
        loop {
            self.bus.drain_receive_queue();

            match self.watch.poll() {
                WatchPoll::Pending => {}
                WatchPoll::Complete(first, second) => return Ok(self.accept(first, second)),
                WatchPoll::Fault(ResponseFault::Mismatch) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("response tidop mismatch for {:#x}", self.tidop);
                    return Err(TransactError::TidopMismatch);
                }
                WatchPoll::Fault(ResponseFault::Undersized) => {
                    return Err(TransactError::UndersizedResponse);
                }
            }

            if elapsed_ms >= self.config.timeout_ms {
                self.watch.disarm();

                #[cfg(feature = "defmt")]
                defmt::warn!("response timeout for tidop {:#x}", self.tidop);

                return Err(TransactError::Timeout);
            }
            self.timer.delay_ms(POLL_INTERVAL_MS).await;
            elapsed_ms += POLL_INTERVAL_MS;
        }
    }

    /// Solicit the peer to publish on the response identifier via a CAN
    /// remote request, under the same transmit-lock discipline as a data
    /// frame. Fire-and-forget: any reply arrives through the normal
    /// correlation path of a later transaction.
    pub async fn query_remote(&mut self, len: usize) -> Result<(), TransactError<C::Error>> {
        if !self.bus.ready() {
            return Err(TransactError::NotReady);
        }
        if !self.bus.try_lock_transmit() {
            self.bus.wait_for_transmit_slot().await;
        }
        self.bus
            .send_remote_request(self.config.response_id, len.min(FRAME_MAX))
            .map_err(TransactError::Send)
    }

    /// Load the correlated frame(s) into the read cursor and decode the
    /// status byte (frame 1's, in dual mode).
    fn accept(&mut self, first: RawFrame, second: Option<RawFrame>) -> Status {
        self.rx.load(first.as_slice());
        if let Some(second) = second {
            // Frame 2 contributes payload only; its header is dropped. The
            // concatenation fits by construction: 8 + 6 bytes, capacity 14.
            let _ = self.rx.append(&second.as_slice()[RESPONSE_HEADER_LEN..]);
        }
        self.rx.seek(RESPONSE_HEADER_LEN);
        Status::unpack(first.data[1])
    }
}
