//! Admission Controller
//!
//! Two independent gates evaluated in order on every inbound RPC:
//!
//! 1. **Overload gate**: a rolling window of per-second CPU samples,
//!    normalized to `[0, 1]`. When the window mean strictly exceeds the
//!    configured threshold the gate closes and requests are shed before a
//!    permit is ever taken. An empty window leaves the gate open.
//! 2. **Concurrency gate**: a counting semaphore with `max_concurrent`
//!    permits. Acquisition is non-blocking: a request that finds no permit
//!    is rejected immediately, never queued.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("server overloaded")]
    Overloaded,
    #[error("too many concurrent requests")]
    Saturated,
}

/// Held for the duration of one admitted request; the concurrency permit
/// is returned when this guard drops, regardless of handler outcome.
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

pub struct AdmissionController {
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    cpu_threshold: f64,
    /// Window length in samples; one sample is recorded per second.
    window: usize,
    samples: Mutex<VecDeque<f64>>,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize, cpu_threshold: f64, cpu_window: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        AdmissionController {
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            cpu_threshold,
            window: cpu_window.as_secs().max(1) as usize,
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// Runs both gates; the overload gate is checked before any permit is
    /// taken, so a shed request never consumes concurrency.
    pub fn admit(&self) -> Result<AdmissionPermit, AdmissionError> {
        if self.is_overloaded() {
            return Err(AdmissionError::Overloaded);
        }

        let permit = self
            .semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| AdmissionError::Saturated)?;

        Ok(AdmissionPermit { _permit: permit })
    }

    fn is_overloaded(&self) -> bool {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return false;
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        mean > self.cpu_threshold
    }

    /// Appends one load sample and trims the window.
    pub fn record_sample(&self, load: f64) {
        let mut samples = self.samples.lock();
        samples.push_back(load);
        while samples.len() > self.window {
            samples.pop_front();
        }
    }

    /// Requests currently holding a concurrency permit.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Spawns the 1 Hz sampling task feeding the overload gate with the
    /// process-wide CPU usage. Abort the handle on shutdown.
    pub fn spawn_sampler(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);

        tokio::spawn(async move {
            let mut sys = System::new_all();
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;
                sys.refresh_cpu();
                let load = (sys.global_cpu_info().cpu_usage() as f64 / 100.0).clamp(0.0, 1.0);
                controller.record_sample(load);
            }
        })
    }
}
