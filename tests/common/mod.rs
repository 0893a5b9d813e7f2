#![allow(dead_code)]

pub use frametasks_test_utils::{builders, init_tracing, probe, scheduler, with_timeout};

use std::time::{Duration, Instant};

/// Poll `condition` until it holds or `timeout` elapses.
pub fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
