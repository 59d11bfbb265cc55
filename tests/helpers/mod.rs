/// Test doubles to simulate the CAN bus and timer during integration tests.
use embedded_can::StandardId;
use orion_canrpc::protocol::registry::FrameHandler;
use orion_canrpc::protocol::transport::traits::{can_bus::CanBus, orion_timer::OrionTimer};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

type FrameLog = Arc<Mutex<VecDeque<(u16, Vec<u8>)>>>;

#[derive(Clone)]
#[allow(dead_code)]
/// In-memory CAN endpoint reproducing the `CanBus` trait behavior. Frames
/// transmitted on one half of a pair land in the other half's receive
/// queue; draining a half delivers pending frames to the callbacks
/// registered on it, the way a polled driver would.
pub struct MockCanBus {
    outbox: FrameLog,
    inbox: FrameLog,
    callbacks: Arc<Mutex<Vec<(u16, FrameHandler)>>>,
}

#[allow(dead_code)]
impl MockCanBus {
    /// Construct a pair of interconnected endpoints (initiator <-> responder).
    pub fn create_pair() -> (Self, Self) {
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

impl CanBus for MockCanBus {
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
        loop {
            let pending = self.inbox.lock().unwrap().pop_front();
            let Some((id, frame)) = pending else {
                break;
            };
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

#[allow(dead_code)]
/// Timer based on `tokio::time::sleep` to drive delays in tests.
pub struct MockTimer;

impl OrionTimer for MockTimer {
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl core::future::Future<Output = ()> + 'a {
        sleep(Duration::from_millis(millis as u64))
    }
}
