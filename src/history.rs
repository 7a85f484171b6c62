// In-memory ring of recent CPU/memory points. Not persisted; empty after restart.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{FullSnapshot, HistoryPoint};

pub struct MetricHistory {
    capacity: usize,
    points: Mutex<VecDeque<HistoryPoint>>,
}

impl MetricHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a point, evicting the oldest once full.
    pub fn push(&self, point: HistoryPoint) {
        let mut points = self.lock();
        while points.len() >= self.capacity {
            points.pop_front();
        }
        points.push_back(point);
    }

    pub fn record(&self, snapshot: &FullSnapshot) {
        self.push(HistoryPoint::from_snapshot(snapshot));
    }

    /// Oldest first.
    pub fn points(&self) -> Vec<HistoryPoint> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best-effort ring: a panic while holding the lock leaves it usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<HistoryPoint>> {
        self.points.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
