// Path: crates/corenet-telemetry/src/time.rs
//! A simple RAII timer for measuring the duration of a scope.

use std::time::Instant;

/// Measures wall-clock time from construction to drop and hands the
/// elapsed seconds to a callback. Used by the RPC admin channel to report
/// per-command processing time without threading an `Instant` through
/// every handler by hand.
pub struct ScopeTimer<F: FnMut(f64)> {
    start: Instant,
    on_drop: Option<F>,
}

impl<F: FnMut(f64)> ScopeTimer<F> {
    pub fn new(on_drop: F) -> ScopeTimer<F> {
        ScopeTimer {
            start: Instant::now(),
            on_drop: Some(on_drop),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl<F: FnMut(f64)> Drop for ScopeTimer<F> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        if let Some(mut cb) = self.on_drop.take() {
            cb(elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fires_on_drop() {
        let fired = Cell::new(false);
        {
            let _timer = ScopeTimer::new(|_secs| fired.set(true));
        }
        assert!(fired.get());
    }
}
