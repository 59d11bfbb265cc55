//! Request responder: accepts inbound request frames from interrupt context
//! into a bounded queue, and in task context dequeues them, runs the
//! registered command logic, and transmits the response as one or two
//! frames depending on opcode.
//!
//! Per-request lifecycle: idle -> frame enqueued (interrupt context) ->
//! frame dequeued and processed (task context) -> response transmitted ->
//! idle.
use crate::error::InitError;
use crate::infra::codec::cursor::{RxCursor, TxCursor};
use crate::infra::codec::wire::{dual_successor, opcode_of, tid_of, Status};
use crate::protocol::registry::{self, FrameSink};
use crate::protocol::transport::frame::RawFrame;
use crate::protocol::transport::traits::can_bus::CanBus;
use crate::protocol::transport::{
    TransportConfig, DUAL_PAYLOAD_MAX, FRAME_MAX, FRAME_PAYLOAD_MAX, RESPONSE_HEADER_LEN,
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

//==================================================================================REQUEST_QUEUE

/// Interrupt-shared half of a responder: a bounded FIFO of raw request
/// frames. Firmware allocates one statically per instance (`DEPTH` is
/// typically [`DEFAULT_QUEUE_DEPTH`]) and hands it to [`Responder::new`].
///
/// [`DEFAULT_QUEUE_DEPTH`]: crate::protocol::transport::DEFAULT_QUEUE_DEPTH
pub struct RequestQueue<const DEPTH: usize> {
    frames: Channel<CriticalSectionRawMutex, RawFrame, DEPTH>,
}

impl<const DEPTH: usize> Default for RequestQueue<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DEPTH: usize> RequestQueue<DEPTH> {
    pub const fn new() -> Self {
        Self {
            frames: Channel::new(),
        }
    }

    /// Dequeue the oldest pending request, task context only.
    fn try_next(&self) -> Option<RawFrame> {
        self.frames.try_receive().ok()
    }
}

impl<const DEPTH: usize> FrameSink for RequestQueue<DEPTH> {
    /// Interrupt-context ingestion: copy the frame into the next queue slot.
    /// Never blocks; when the queue is full the newest frame is dropped
    /// silently, because stalling interrupt context is the one failure mode
    /// this path must not have.
    fn on_frame(&self, frame: &[u8]) {
        if frame.is_empty() || frame.len() > FRAME_MAX {
            return;
        }
        if self.frames.try_send(RawFrame::from_slice(frame)).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("request queue full, frame dropped");
        }
    }
}

//==================================================================================COMMAND_HANDLER

/// One bound request, exposed to the application command logic: the decoded
/// header, a read cursor over the argument bytes, and a write cursor for
/// the reply payload.
pub struct Request<'a> {
    tidop: u8,
    args: &'a mut RxCursor,
    reply: &'a mut TxCursor,
}

impl Request<'_> {
    /// Opcode of the current request.
    pub fn opcode(&self) -> u8 {
        opcode_of(self.tidop)
    }

    /// Transaction id of the current request.
    pub fn tid(&self) -> u8 {
        tid_of(self.tidop)
    }

    /// Argument bytes, positioned after the tidop byte.
    pub fn args(&mut self) -> &mut RxCursor {
        self.args
    }

    /// Reply payload cursor. Up to 6 bytes reach the wire for single-frame
    /// opcodes, up to 12 for dual-frame opcodes.
    pub fn reply(&mut self) -> &mut TxCursor {
        self.reply
    }
}

/// Application-supplied command logic. Reads arguments, writes the reply
/// payload, and decides the four status fields.
pub trait CommandHandler {
    fn handle(&mut self, request: &mut Request<'_>) -> Status;
}

impl<F> CommandHandler for F
where
    F: FnMut(&mut Request<'_>) -> Status,
{
    fn handle(&mut self, request: &mut Request<'_>) -> Status {
        self(request)
    }
}

//==================================================================================RESPONDER

/// Server endpoint draining the ingestion queue and framing responses.
pub struct Responder<C: CanBus, H: CommandHandler, const DEPTH: usize> {
    bus: C,
    config: TransportConfig,
    handler: H,
    queue: &'static RequestQueue<DEPTH>,
    slot: Option<usize>,
    tidop: u8,
    rx: RxCursor,
    tx: TxCursor,
}

impl<C, H, const DEPTH: usize> Responder<C, H, DEPTH>
where
    C: CanBus,
    C::Error: core::fmt::Debug,
    H: CommandHandler,
{
    /// Bind a responder to its backend, command logic, and interrupt-shared
    /// queue. Call [`init`](Self::init) once before scheduling
    /// [`process`](Self::process).
    pub fn new(
        bus: C,
        config: TransportConfig,
        handler: H,
        queue: &'static RequestQueue<DEPTH>,
    ) -> Self {
        Self {
            bus,
            config,
            handler,
            queue,
            slot: None,
            tidop: 0,
            rx: RxCursor::new(),
            tx: TxCursor::new(),
        }
    }

    /// Claim a registry slot and route request frames into the queue.
    pub fn init(&mut self) -> Result<(), InitError> {
        if !self.bus.ready() {
            return Err(InitError::NotReady);
        }
        let registration = registry::register(self.queue)?;
        self.bus
            .register_callback(self.config.request_id, registration.handler);
        self.slot = Some(registration.slot);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "responder on slot {} (req {:#x} / resp {:#x})",
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

    /// Drain all currently queued requests in arrival order, running the
    /// command handler and transmitting a response for each. Invoke
    /// periodically from task context, typically every
    /// [`DEFAULT_PROCESS_PERIOD_MS`].
    ///
    /// [`DEFAULT_PROCESS_PERIOD_MS`]: crate::protocol::transport::DEFAULT_PROCESS_PERIOD_MS
    pub async fn process(&mut self) {
        self.bus.drain_receive_queue();
        while let Some(frame) = self.queue.try_next() {
            // Bind as the current request: RX length and cursor, header
            // scratch, fresh reply buffer.
            self.tidop = frame.data[0];
            self.rx.load(frame.as_slice());
            self.rx.seek(1);
            self.tx.clear();

            #[cfg(feature = "defmt")]
            defmt::trace!(
                "request tidop {:#x} (opcode {}), len {}",
                self.tidop,
                opcode_of(self.tidop),
                frame.len
            );

            let status = self.handler.handle(&mut Request {
                tidop: self.tidop,
                args: &mut self.rx,
                reply: &mut self.tx,
            });
            self.send_response(status).await;
        }
    }

    /// Frame and transmit the response for the currently bound request.
    ///
    /// Single-frame opcodes get `[tidop, status, payload0..5]` with the
    /// payload clamped to 6 bytes. Dual-frame opcodes always get two frames,
    /// the second carrying `[tidop+1, status, payload6..11]` even when no
    /// payload remains for it. A failed transmit is not retried and not
    /// reported through the protocol; transmit accounting is the backend's
    /// concern.
    pub async fn send_response(&mut self, status: Status) {
        let status_byte = status.pack();
        let payload = self.tx.as_slice();
        let dual = opcode_of(self.tidop) >= self.config.dual_frame_opcode_start;

        let mut frame = [0u8; FRAME_MAX];
        frame[0] = self.tidop;
        frame[1] = status_byte;
        let first_len = payload.len().min(FRAME_PAYLOAD_MAX);
        frame[RESPONSE_HEADER_LEN..RESPONSE_HEADER_LEN + first_len]
            .copy_from_slice(&payload[..first_len]);

        if !self.bus.try_lock_transmit() {
            self.bus.wait_for_transmit_slot().await;
        }
        if let Err(_err) = self.bus.send_frame(
            self.config.response_id,
            &frame[..RESPONSE_HEADER_LEN + first_len],
        ) {
            #[cfg(feature = "defmt")]
            defmt::warn!("response frame 1 send failed: {:?}", defmt::Debug2Format(&_err));
        }

        if !dual {
            return;
        }

        let rest = &payload[first_len..payload.len().min(DUAL_PAYLOAD_MAX)];
        let mut second = [0u8; FRAME_MAX];
        second[0] = dual_successor(self.tidop);
        second[1] = status_byte;
        second[RESPONSE_HEADER_LEN..RESPONSE_HEADER_LEN + rest.len()].copy_from_slice(rest);

        if !self.bus.try_lock_transmit() {
            self.bus.wait_for_transmit_slot().await;
        }
        if let Err(_err) = self.bus.send_frame(
            self.config.response_id,
            &second[..RESPONSE_HEADER_LEN + rest.len()],
        ) {
            #[cfg(feature = "defmt")]
            defmt::warn!("response frame 2 send failed: {:?}", defmt::Debug2Format(&_err));
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
