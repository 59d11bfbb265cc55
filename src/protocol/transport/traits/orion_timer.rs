//! Asynchronous timer abstraction providing the cooperative-yield primitive
//! used by the initiator's bounded response wait.

/// Timer trait abstraction; must remain thread-safe when applicable.
pub trait OrionTimer {
    /// Asynchronously wait for `millis` milliseconds.
    fn delay_ms<'a>(
        &'a mut self,
        millis: u32,
    ) -> impl core::future::Future<Output = ()> + 'a;
}

/// Timer backed by `embassy-time`, for embassy-based firmware.
#[cfg(feature = "embassy")]
pub struct EmbassyTimer;

#[cfg(feature = "embassy")]
impl OrionTimer for EmbassyTimer {
    fn delay_ms<'a>(
        &'a mut self,
        millis: u32,
    ) -> impl core::future::Future<Output = ()> + 'a {
        embassy_time::Timer::after_millis(millis as u64)
    }
}
