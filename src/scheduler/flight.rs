//! Single-flight guard for one cadence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// At most one holder at a time; a second acquire while held fails.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

/// Held while a tick runs. Dropping it frees the slot, also on panic.
#[derive(Debug)]
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let flight = SingleFlight::new();
        let permit = flight.try_acquire().unwrap();
        assert!(flight.is_busy());
        assert!(flight.clone().try_acquire().is_none());

        drop(permit);
        assert!(!flight.is_busy());
        assert!(flight.try_acquire().is_some());
    }
}
