//! UPF Context Management
//!
//! Forwarding records for attached PDU sessions with per-session volume
//! accounting and QoS rates. Totals cover every packet forwarded since start.

use crate::error::{UpfError, UpfResult};
use nfsim_core::{NfInstance, NfType, SessionId, UeId};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Rate assigned to newly attached sessions (kbps)
pub const DEFAULT_QOS_RATE_KBPS: u32 = 1000;

/// Forwarding state of one attached session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingRecord {
    pub session_id: SessionId,
    pub ue_id: UeId,
    pub uplink_bytes: u64,
    pub downlink_bytes: u64,
    /// kbps
    pub qos_rate: u32,
    pub is_attached: bool,
}

impl ForwardingRecord {
    fn new(session_id: SessionId, ue_id: UeId, qos_rate: u32) -> Self {
        Self {
            session_id,
            ue_id,
            uplink_bytes: 0,
            downlink_bytes: 0,
            qos_rate,
            is_attached: true,
        }
    }

    /// Add to the counter for the given direction
    fn add(&mut self, size: u64, is_uplink: bool) {
        if is_uplink {
            self.uplink_bytes += size;
        } else {
            self.downlink_bytes += size;
        }
    }
}

/// UPF Context
pub struct UpfContext {
    pub(crate) instance: NfInstance,
    default_qos_rate: u32,
    records: BTreeMap<SessionId, ForwardingRecord>,
    total_uplink_traffic: u64,
    total_downlink_traffic: u64,
}

impl UpfContext {
    /// Create a new UPF context
    pub fn new() -> Self {
        Self::with_default_qos(DEFAULT_QOS_RATE_KBPS)
    }

    /// Create a UPF context whose new sessions start at `qos_rate` kbps
    pub fn with_default_qos(qos_rate: u32) -> Self {
        let ctx = Self {
            instance: NfInstance::new(NfType::Upf, "UPF"),
            default_qos_rate: qos_rate,
            records: BTreeMap::new(),
            total_uplink_traffic: 0,
            total_downlink_traffic: 0,
        };
        log::info!("[{}] UPF initialized", ctx.instance.name());
        ctx
    }

    pub fn attach_pdu_session(&mut self, session_id: SessionId, ue_id: UeId) -> UpfResult<()> {
        if self.records.contains_key(&session_id) {
            log::warn!(
                "[{}] Session already attached: {}",
                self.instance.name(),
                session_id
            );
            return Err(UpfError::Duplicate(session_id));
        }

        self.records.insert(
            session_id,
            ForwardingRecord::new(session_id, ue_id, self.default_qos_rate),
        );
        log::info!(
            "[{}] PDU Session attached | Session={} | UE={}",
            self.instance.name(),
            session_id,
            ue_id
        );
        Ok(())
    }

    /// Remove a session's record. Totals keep the traffic it carried.
    pub fn detach_pdu_session(&mut self, session_id: SessionId) -> Option<ForwardingRecord> {
        let Some(mut record) = self.records.remove(&session_id) else {
            log::warn!("[{}] Session not found: {}", self.instance.name(), session_id);
            return None;
        };
        record.is_attached = false;
        log::info!("[{}] PDU Session detached | Session={}", self.instance.name(), session_id);
        Some(record)
    }

    fn forward(&mut self, session_id: SessionId, size: u32, is_uplink: bool) -> bool {
        let Some(record) = self.records.get_mut(&session_id) else {
            log::warn!(
                "[{}] Cannot forward: Session not found - {}",
                self.instance.name(),
                session_id
            );
            return false;
        };

        let size = u64::from(size);
        record.add(size, is_uplink);
        if is_uplink {
            self.total_uplink_traffic += size;
        } else {
            self.total_downlink_traffic += size;
        }

        log::debug!(
            "[{}] Packet Forward | {} | Session={} | Size={}B",
            self.instance.name(),
            if is_uplink { "UL" } else { "DL" },
            session_id,
            size
        );
        true
    }

    /// Forward an uplink packet. Returns false if the session is not attached.
    pub fn forward_uplink_packet(&mut self, session_id: SessionId, size: u32) -> bool {
        self.forward(session_id, size, true)
    }

    /// Forward a downlink packet. Returns false if the session is not attached.
    pub fn forward_downlink_packet(&mut self, session_id: SessionId, size: u32) -> bool {
        self.forward(session_id, size, false)
    }

    pub fn set_qos(&mut self, session_id: SessionId, bitrate: u32) -> bool {
        let Some(record) = self.records.get_mut(&session_id) else {
            log::warn!(
                "[{}] Cannot set QoS: Session not found - {}",
                self.instance.name(),
                session_id
            );
            return false;
        };
        record.qos_rate = bitrate;
        log::debug!(
            "[{}] QoS configured | Session={} | Rate={}kbps",
            self.instance.name(),
            session_id,
            bitrate
        );
        true
    }

    pub fn forwarding_record(&self, session_id: SessionId) -> Option<&ForwardingRecord> {
        self.records.get(&session_id)
    }

    /// QoS rate in kbps, 0 for an unattached session
    pub fn qos(&self, session_id: SessionId) -> u32 {
        self.records.get(&session_id).map_or(0, |r| r.qos_rate)
    }

    pub fn session_uplink_traffic(&self, session_id: SessionId) -> u64 {
        self.records.get(&session_id).map_or(0, |r| r.uplink_bytes)
    }

    pub fn session_downlink_traffic(&self, session_id: SessionId) -> u64 {
        self.records.get(&session_id).map_or(0, |r| r.downlink_bytes)
    }

    pub fn attached_session_count(&self) -> usize {
        self.records.len()
    }

    pub fn total_uplink_traffic(&self) -> u64 {
        self.total_uplink_traffic
    }

    pub fn total_downlink_traffic(&self) -> u64 {
        self.total_downlink_traffic
    }

    pub fn upf_status(&self) -> String {
        format!(
            "UPF Status:\n  Attached Sessions: {}\n  Total UL Traffic: {} bytes\n  Total DL Traffic: {} bytes\n",
            self.records.len(),
            self.total_uplink_traffic,
            self.total_downlink_traffic
        )
    }

    pub fn session_metrics_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================== UPF Session Metrics ==================");
        let _ = writeln!(out, "Attached Sessions: {}", self.records.len());
        let _ = writeln!(out, "Total UL Traffic: {} bytes", self.total_uplink_traffic);
        let _ = writeln!(out, "Total DL Traffic: {} bytes", self.total_downlink_traffic);
        let _ = writeln!(
            out,
            "Total Traffic: {} bytes",
            self.total_uplink_traffic + self.total_downlink_traffic
        );
        let _ = writeln!(out);
        for r in self.records.values() {
            let _ = writeln!(
                out,
                "Session {} | UE={} | UL={}B | DL={}B | QoS={}kbps",
                r.session_id, r.ue_id, r.uplink_bytes, r.downlink_bytes, r.qos_rate
            );
        }
        let _ = writeln!(out, "=========================================================");
        out
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.total_uplink_traffic = 0;
        self.total_downlink_traffic = 0;
    }
}

impl Default for UpfContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_defaults() {
        let _ = env_logger::try_init();
        let mut upf = UpfContext::new();
        upf.attach_pdu_session(5001, 1000).unwrap();

        let record = upf.forwarding_record(5001).unwrap();
        assert_eq!(record.ue_id, 1000);
        assert_eq!(record.qos_rate, DEFAULT_QOS_RATE_KBPS);
        assert_eq!(record.uplink_bytes, 0);
        assert!(record.is_attached);

        assert_eq!(
            upf.attach_pdu_session(5001, 1001),
            Err(UpfError::Duplicate(5001))
        );
        assert_eq!(upf.forwarding_record(5001).unwrap().ue_id, 1000);
    }

    #[test]
    fn test_configured_default_qos() {
        let mut upf = UpfContext::with_default_qos(2500);
        upf.attach_pdu_session(1, 1).unwrap();
        assert_eq!(upf.qos(1), 2500);
    }

    #[test]
    fn test_forwarding_updates_session_and_totals() {
        let mut upf = UpfContext::new();
        upf.attach_pdu_session(5001, 1000).unwrap();
        upf.attach_pdu_session(5002, 1001).unwrap();

        for _ in 0..3 {
            assert!(upf.forward_uplink_packet(5001, 2048));
        }
        assert!(upf.forward_downlink_packet(5002, 1500));

        assert_eq!(upf.session_uplink_traffic(5001), 6144);
        assert_eq!(upf.session_downlink_traffic(5002), 1500);
        assert_eq!(upf.total_uplink_traffic(), 6144);
        assert_eq!(upf.total_downlink_traffic(), 1500);

        // Unattached sessions leave every counter alone
        assert!(!upf.forward_uplink_packet(9999, 100));
        assert!(!upf.forward_downlink_packet(9999, 100));
        assert_eq!(upf.total_uplink_traffic(), 6144);
        assert_eq!(upf.total_downlink_traffic(), 1500);
    }

    #[test]
    fn test_detach_keeps_totals() {
        let mut upf = UpfContext::new();
        upf.attach_pdu_session(5001, 1000).unwrap();
        upf.forward_uplink_packet(5001, 512);

        let record = upf.detach_pdu_session(5001).unwrap();
        assert!(!record.is_attached);
        assert_eq!(record.uplink_bytes, 512);

        assert!(upf.detach_pdu_session(5001).is_none());
        assert_eq!(upf.attached_session_count(), 0);
        assert_eq!(upf.session_uplink_traffic(5001), 0);
        assert_eq!(upf.total_uplink_traffic(), 512);
    }

    #[test]
    fn test_qos() {
        let mut upf = UpfContext::new();
        upf.attach_pdu_session(5001, 1000).unwrap();

        assert!(upf.set_qos(5001, 5000));
        assert_eq!(upf.qos(5001), 5000);
        assert!(!upf.set_qos(9999, 5000));
        assert_eq!(upf.qos(9999), 0);
    }

    #[test]
    fn test_reports() {
        let mut upf = UpfContext::new();
        upf.attach_pdu_session(5001, 1000).unwrap();
        upf.forward_uplink_packet(5001, 100);
        upf.forward_downlink_packet(5001, 50);

        let report = upf.session_metrics_report();
        assert!(report.contains("Total Traffic: 150 bytes"));
        assert!(report.contains("Session 5001 | UE=1000 | UL=100B | DL=50B | QoS=1000kbps"));
        assert!(upf.upf_status().contains("Attached Sessions: 1"));
    }
}
