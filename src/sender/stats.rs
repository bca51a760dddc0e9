// Lock-free send statistics using atomic operations

use crate::domain::ResultCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Round-trip counters, one per result code, plus volume and latency totals.
#[derive(Debug, Default)]
pub struct SendStats {
    round_trips: AtomicU64,
    ok: AtomicU64,
    send_failed: AtomicU64,
    parse_errors: AtomicU64,
    invalid_responses: AtomicU64,
    connection_errors: AtomicU64,
    points_sent: AtomicU64,
    bytes_sent: AtomicU64,
    total_latency_ms: AtomicU64,
    last_send_time: AtomicU64,
}

impl SendStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, code: ResultCode, points: usize, bytes: usize, latency: Duration) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        self.points_sent.fetch_add(points as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);

        let counter = match code {
            ResultCode::Ok => &self.ok,
            ResultCode::SendFailed => &self.send_failed,
            ResultCode::ParseError => &self.parse_errors,
            ResultCode::InvalidResponse => &self.invalid_responses,
            ResultCode::ConnectionError => &self.connection_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_send_time.store(now, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SendStatsSnapshot {
        let round_trips = self.round_trips.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        SendStatsSnapshot {
            round_trips,
            ok: self.ok.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            invalid_responses: self.invalid_responses.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            points_sent: self.points_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            average_latency_ms: if round_trips > 0 {
                total_latency_ms / round_trips
            } else {
                0
            },
            last_send_time: self.last_send_time.load(Ordering::Relaxed),
        }
    }

    /// Share of round trips that came back `Ok` (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        let total = self.round_trips.load(Ordering::Relaxed);
        if total == 0 {
            return 1.0;
        }
        self.ok.load(Ordering::Relaxed) as f64 / total as f64
    }
}

/// Serializable snapshot of [`SendStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendStatsSnapshot {
    pub round_trips: u64,
    pub ok: u64,
    pub send_failed: u64,
    pub parse_errors: u64,
    pub invalid_responses: u64,
    pub connection_errors: u64,
    pub points_sent: u64,
    pub bytes_sent: u64,
    pub average_latency_ms: u64,
    pub last_send_time: u64,
}
