//! # Quickstart Example
//!
//! Minimal example demonstrating the basics of orion-canrpc:
//! - Pack and unpack the wire header bytes
//! - Encode payloads through the cursor accessors
//! - Run a live request/response transaction over an in-memory bus
//!
//! This example uses `std` and tokio for a quick trial run; on hardware the
//! same code runs against your CAN driver's `CanBus` implementation.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use critical_section as _;
use embedded_can::StandardId;
use orion_canrpc::infra::codec::cursor::{RxCursor, TxCursor};
use orion_canrpc::infra::codec::wire::{opcode_of, pack_tidop, tid_of, Status};
use orion_canrpc::protocol::initiator::{Initiator, ResponseWatch};
use orion_canrpc::protocol::registry::FrameHandler;
use orion_canrpc::protocol::responder::{Request, RequestQueue, Responder};
use orion_canrpc::protocol::transport::traits::{can_bus::CanBus, orion_timer::OrionTimer};
use orion_canrpc::protocol::transport::TransportConfig;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("=== orion-canrpc Quickstart ===\n");

    // ======================================================================
    // 1. Wire header bytes
    // ======================================================================
    println!("1. Packing the tidop and status bytes");

    let tidop = pack_tidop(3, 5); // transaction id 3, opcode 5
    println!("   tidop: 0x{:02X}", tidop);
    println!("   tid: {}, opcode: {}", tid_of(tidop), opcode_of(tidop));

    let status = Status {
        handled: true,
        numeric_reply: true,
        suppress_frame: false,
        command_error: 0,
    };
    println!("   status byte: 0x{:02X}\n", status.pack());

    // ======================================================================
    // 2. Cursor accessors
    // ======================================================================
    println!("2. Encoding a payload through the cursors");

    let mut tx = TxCursor::new();
    tx.write_u16(1500).unwrap(); // slew rate, arcsec/s
    tx.write_fixed_i16(-12.57, 100.0).unwrap(); // declination offset, scaled
    print!("   Encoded: ");
    for byte in tx.as_slice() {
        print!("{:02X} ", byte);
    }
    println!();

    let mut rx = RxCursor::new();
    rx.load(tx.as_slice());
    println!("   Decoded u16: {}", rx.read_u16().unwrap());
    println!("   Decoded fixed: {:.2}\n", rx.read_fixed_i16(100.0).unwrap());

    // ======================================================================
    // 3. A live transaction
    // ======================================================================
    println!("3. Running a transaction over an in-memory bus");

    static WATCH: ResponseWatch = ResponseWatch::new();
    static QUEUE: RequestQueue<16> = RequestQueue::new();

    let (initiator_bus, responder_bus) = LoopbackBus::create_pair();
    let config = TransportConfig::new(
        StandardId::new(0x100).unwrap(),
        StandardId::new(0x101).unwrap(),
    );

    // Responder: opcode 5 doubles its argument byte and replies numerically.
    let mut responder = Responder::new(
        responder_bus,
        config,
        |request: &mut Request<'_>| -> Status {
            let argument = request.args().read_u8().unwrap_or(0);
            request.reply().write_u16(2 * argument as u16).unwrap();
            Status {
                handled: true,
                numeric_reply: true,
                suppress_frame: false,
                command_error: 0,
            }
        },
        &QUEUE,
    );
    responder.init().expect("responder slot");

    tokio::spawn(async move {
        loop {
            responder.process().await;
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    });

    let mut initiator = Initiator::new(initiator_bus, TokioTimer, config, &WATCH);
    initiator.init().expect("initiator slot");

    initiator.begin_request(5).expect("backend ready");
    initiator.writer().write_u8(21).unwrap();
    match initiator.transact().await {
        Ok(reply) => {
            println!("   Reply handled: {}", reply.handled);
            println!("   Numeric payload: {}", initiator.reader().read_u16().unwrap());
        }
        Err(err) => eprintln!("   Transaction failed: {:?}", err),
    }

    // ======================================================================
    println!("\nQuickstart complete.");
}

// ==========================================================================
// In-memory bus pair and timer, the same shape the integration tests use.
// ==========================================================================

type FrameLog = Arc<Mutex<VecDeque<(u16, Vec<u8>)>>>;

#[derive(Clone)]
struct LoopbackBus {
    outbox: FrameLog,
    inbox: FrameLog,
    callbacks: Arc<Mutex<Vec<(u16, FrameHandler)>>>,
}

impl LoopbackBus {
    fn create_pair() -> (Self, Self) {
        let a_to_b: FrameLog = Arc::new(Mutex::new(VecDeque::new()));
        let b_to_a: FrameLog = Arc::new(Mutex::new(VecDeque::new()));
        let side_a = Self {
            outbox: a_to_b.clone(),
            inbox: b_to_a.clone(),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        };
        let side_b = Self {
            outbox: b_to_a,
            inbox: a_to_b,
            callbacks: Arc::new(Mutex::new(Vec::new())),
        };
        (side_a, side_b)
    }
}

impl CanBus for LoopbackBus {
    type Error = ();

    fn ready(&self) -> bool {
        true
    }

    fn send_frame(&mut self, id: StandardId, data: &[u8]) -> Result<(), ()> {
        self.outbox
            .lock()
            .unwrap()
            .push_back((id.as_raw(), data.to_vec()));
        Ok(())
    }

    fn send_remote_request(&mut self, _id: StandardId, _len: usize) -> Result<(), ()> {
        Ok(())
    }

    fn register_callback(&mut self, id: StandardId, handler: FrameHandler) {
        self.callbacks.lock().unwrap().push((id.as_raw(), handler));
    }

    fn drain_receive_queue(&mut self) {
        while let Some((id, frame)) = {
            let popped = self.inbox.lock().unwrap().pop_front();
            popped
        } {
            let callbacks = self.callbacks.lock().unwrap().clone();
            for (registered_id, handler) in callbacks {
                if registered_id == id {
                    handler(&frame);
                }
            }
        }
    }

    fn try_lock_transmit(&mut self) -> bool {
        true
    }

    fn wait_for_transmit_slot<'a>(&'a mut self) -> impl core::future::Future<Output = ()> + 'a {
        async {}
    }
}

struct TokioTimer;

impl OrionTimer for TokioTimer {
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl core::future::Future<Output = ()> + 'a {
        tokio::time::sleep(std::time::Duration::from_millis(millis as u64))
    }
}
