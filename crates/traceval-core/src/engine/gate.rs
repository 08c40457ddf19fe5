//! Admission gate bounding the number of in-flight evaluations

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{TracevalError, TracevalResult};

/// Counting permit mechanism limiting simultaneous evaluations.
///
/// At no instant are more than `limit` holders between [`AdmissionGate::admit`]
/// and the drop of the returned permit. Arrival order of waiters is not part
/// of the contract, only the count bound.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    limit: usize,
}

/// Held admission; dropping it admits the next waiter
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Build a gate admitting at most `limit` concurrent holders.
    ///
    /// A zero limit is a configuration error, reported here so a bad batch
    /// fails before any work is scheduled.
    pub fn new(limit: usize) -> TracevalResult<Self> {
        if limit == 0 {
            return Err(TracevalError::config(
                "concurrency level must be at least 1",
            ));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of admissions currently available without waiting
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait until fewer than `limit` evaluations are admitted, then enter
    pub async fn admit(&self) -> TracevalResult<AdmissionPermit> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TracevalError::other("admission gate closed"))?;
        Ok(AdmissionPermit { _permit: permit })
    }
}
