//! Bus traffic counters
//!
//! Owned by the controller (single thread), so plain integers suffice.
//! Serialized as part of the shell `status` reply.

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Frames accepted by the transport
    pub frames_sent: u64,
    /// Frames taken from the transport
    pub frames_received: u64,
    /// Frames the transport refused
    pub send_failures: u64,
    /// Exchanges that ran out of time
    pub timeouts: u64,
    /// Frames dropped while waiting for a response
    pub discarded: u64,
    /// Hash candidates rejected during negotiation
    pub hash_conflicts: u64,
}

impl BusStats {
    #[inline]
    pub fn add_sent(&mut self) {
        self.frames_sent += 1;
    }

    #[inline]
    pub fn add_received(&mut self) {
        self.frames_received += 1;
    }

    #[inline]
    pub fn add_send_failure(&mut self) {
        self.send_failures += 1;
    }

    #[inline]
    pub fn add_timeout(&mut self) {
        self.timeouts += 1;
    }

    #[inline]
    pub fn add_discarded(&mut self) {
        self.discarded += 1;
    }

    #[inline]
    pub fn add_hash_conflict(&mut self) {
        self.hash_conflicts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_serialize() {
        let mut stats = BusStats::default();
        stats.add_sent();
        stats.add_sent();
        stats.add_timeout();

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["frames_sent"], 2);
        assert_eq!(json["timeouts"], 1);
        assert_eq!(json["discarded"], 0);
    }
}
