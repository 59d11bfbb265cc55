//! Responder tests: ingestion queue bounds, handler invocation, and
//! single/dual response framing.
use super::*;
use crate::infra::codec::wire::pack_tidop;
use crate::protocol::registry::FrameHandler;
use embedded_can::StandardId;
use std::sync::{Arc, Mutex as StdMutex};
use std::vec::Vec;

fn test_config() -> TransportConfig {
    TransportConfig::new(
        StandardId::new(0x100).unwrap(),
        StandardId::new(0x101).unwrap(),
    )
}

/// Backend double recording every transmitted frame.
#[derive(Clone)]
struct CaptureBus {
    sent: Arc<StdMutex<Vec<(u16, Vec<u8>)>>>,
}

impl CaptureBus {
    fn new() -> Self {
        Self {
            sent: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    fn sent(&self) -> Vec<(u16, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl CanBus for CaptureBus {
    type Error = ();

    fn ready(&self) -> bool {
        true
    }

    fn send_frame(&mut self, id: StandardId, data: &[u8]) -> Result<(), ()> {
        self.sent.lock().unwrap().push((id.as_raw(), data.to_vec()));
        Ok(())
    }

    fn send_remote_request(&mut self, _id: StandardId, _len: usize) -> Result<(), ()> {
        Ok(())
    }

    fn register_callback(&mut self, _id: StandardId, _handler: FrameHandler) {}

    fn drain_receive_queue(&mut self) {}

    fn try_lock_transmit(&mut self) -> bool {
        true
    }

    fn wait_for_transmit_slot<'a>(&'a mut self) -> impl core::future::Future<Output = ()> + 'a {
        async {}
    }
}

#[test]
/// 17 frames into a 16-slot queue: exactly one (the newest) is dropped, and
/// the survivors drain in arrival order.
fn queue_overflow_drops_newest_frame() {
    static QUEUE: RequestQueue<16> = RequestQueue::new();

    for marker in 0..17u8 {
        QUEUE.on_frame(&[pack_tidop(0, 1), marker]);
    }
    for expected in 0..16u8 {
        let frame = QUEUE.try_next().unwrap();
        assert_eq!(frame.as_slice(), &[pack_tidop(0, 1), expected]);
    }
    assert!(QUEUE.try_next().is_none());
}

#[test]
/// Zero-length and oversized callback payloads never reach the queue.
fn queue_rejects_invalid_lengths() {
    static QUEUE: RequestQueue<16> = RequestQueue::new();

    QUEUE.on_frame(&[]);
    QUEUE.on_frame(&[0u8; 9]);
    assert!(QUEUE.try_next().is_none());
}

#[tokio::test]
/// process() binds the request, runs the handler with decoded header and
/// argument cursor, and frames the reply as `[tidop, status, payload]`.
async fn process_runs_handler_and_frames_reply() {
    static QUEUE: RequestQueue<16> = RequestQueue::new();
    let tidop = pack_tidop(2, 5);
    QUEUE.on_frame(&[tidop, 0x2A]);

    let bus = CaptureBus::new();
    let mut responder = Responder::new(
        bus.clone(),
        test_config(),
        |request: &mut Request<'_>| -> Status {
            assert_eq!(request.opcode(), 5);
            assert_eq!(request.tid(), 2);
            assert_eq!(request.args().read_u8().unwrap(), 42);
            request.reply().write_f32(3.5).unwrap();
            Status {
                handled: true,
                numeric_reply: true,
                suppress_frame: false,
                command_error: 0,
            }
        },
        &QUEUE,
    );

    responder.process().await;

    let mut expected = std::vec![tidop, 0b1100_0000];
    expected.extend_from_slice(&3.5f32.to_le_bytes());
    assert_eq!(bus.sent(), &[(0x101, expected)]);
}

#[tokio::test]
/// Single-frame opcodes clamp the reply payload to 6 bytes.
async fn single_frame_reply_clamps_payload() {
    static QUEUE: RequestQueue<16> = RequestQueue::new();
    let tidop = pack_tidop(0, 3);
    QUEUE.on_frame(&[tidop]);

    let bus = CaptureBus::new();
    let mut responder = Responder::new(
        bus.clone(),
        test_config(),
        |request: &mut Request<'_>| -> Status {
            for byte in 1..=10u8 {
                request.reply().write_u8(byte).unwrap();
            }
            Status::ok()
        },
        &QUEUE,
    );

    responder.process().await;

    let sent = bus.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, std::vec![tidop, 0x80, 1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
/// Dual-frame opcodes always produce two frames; the second carries the
/// successor tidop, the same status byte, and the payload remainder.
async fn dual_opcode_splits_reply_across_two_frames() {
    static QUEUE: RequestQueue<16> = RequestQueue::new();
    let config = test_config().with_dual_frame_opcode_start(16);
    let tidop = pack_tidop(1, 20);
    QUEUE.on_frame(&[tidop]);

    let bus = CaptureBus::new();
    let mut responder = Responder::new(
        bus.clone(),
        config,
        |request: &mut Request<'_>| -> Status {
            for byte in 1..=9u8 {
                request.reply().write_u8(byte).unwrap();
            }
            Status::ok()
        },
        &QUEUE,
    );

    responder.process().await;

    let sent = bus.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1, std::vec![tidop, 0x80, 1, 2, 3, 4, 5, 6]);
    assert_eq!(sent[1].1, std::vec![pack_tidop(2, 20), 0x80, 7, 8, 9]);
}

#[tokio::test]
/// A dual-frame reply with no payload remainder still sends the second
/// frame, as a bare 2-byte header.
async fn dual_opcode_sends_empty_second_frame() {
    static QUEUE: RequestQueue<16> = RequestQueue::new();
    let config = test_config().with_dual_frame_opcode_start(16);
    let tidop = pack_tidop(7, 16);
    QUEUE.on_frame(&[tidop]);

    let bus = CaptureBus::new();
    let mut responder = Responder::new(
        bus.clone(),
        config,
        |_request: &mut Request<'_>| -> Status { Status::ok() },
        &QUEUE,
    );

    responder.process().await;

    let sent = bus.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1, std::vec![tidop, 0x80]);
    assert_eq!(sent[1].1, std::vec![pack_tidop(0, 16), 0x80]);
}

#[tokio::test]
/// Queued requests drain in arrival order within one process() call.
async fn process_drains_in_fifo_order() {
    static QUEUE: RequestQueue<16> = RequestQueue::new();
    for tid in 0..3u8 {
        QUEUE.on_frame(&[pack_tidop(tid, 1), tid]);
    }

    let bus = CaptureBus::new();
    let mut responder = Responder::new(
        bus.clone(),
        test_config(),
        |request: &mut Request<'_>| -> Status {
            let echo = request.args().read_u8().unwrap();
            request.reply().write_u8(echo).unwrap();
            Status::ok()
        },
        &QUEUE,
    );

    responder.process().await;

    let sent = bus.sent();
    assert_eq!(sent.len(), 3);
    for (tid, (_, frame)) in sent.iter().enumerate() {
        assert_eq!(frame, &std::vec![pack_tidop(tid as u8, 1), 0x80, tid as u8]);
    }
}
