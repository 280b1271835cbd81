//! SMF Context Management
//!
//! PDU session storage, the active-session set and per-UE session lists.
//! Session ids and UE addresses come from counters owned by the context.

use crate::error::{SmfError, SmfResult};
use nfsim_core::{NfInstance, NfType, SessionId, SessionState, Snssai, UeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Session id counter start; the first session gets 5001
const SESSION_ID_BASE: SessionId = 5000;

/// Host addresses in the 10.0.0.0/16 pool. The counter cycles through
/// `1..=IPV4_POOL_SIZE`, so 10.0.0.0 is never handed out and addresses are
/// reused after this many sessions.
const IPV4_POOL_SIZE: u32 = 65535;

/// PDU session context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduSessionContext {
    pub pdu_session_id: SessionId,
    pub ue_id: UeId,
    pub state: SessionState,
    pub snssai: Snssai,
    pub dnn: String,
    pub ipv4_address: Ipv4Addr,
    pub ipv6_address: Ipv6Addr,
    /// Control-plane uplink byte count
    pub ul_traffic: u64,
    /// Control-plane downlink byte count
    pub dl_traffic: u64,
}

/// SMF Context
pub struct SmfContext {
    pub(crate) instance: NfInstance,
    next_session_id: SessionId,
    ip_addr_counter: u32,
    pdu_sessions: BTreeMap<SessionId, PduSessionContext>,
    active_sessions: BTreeSet<SessionId>,
    /// Session ids per UE, in creation order
    ue_sessions: BTreeMap<UeId, Vec<SessionId>>,
}

impl SmfContext {
    /// Create a new SMF context
    pub fn new() -> Self {
        let ctx = Self {
            instance: NfInstance::new(NfType::Smf, "SMF"),
            next_session_id: SESSION_ID_BASE,
            ip_addr_counter: 1,
            pdu_sessions: BTreeMap::new(),
            active_sessions: BTreeSet::new(),
            ue_sessions: BTreeMap::new(),
        };
        log::info!("[{}] SMF initialized", ctx.instance.name());
        ctx
    }

    /// `10.0.(c / 256).(c % 256)`, then advance the counter within the pool
    fn allocate_ipv4(&mut self) -> Ipv4Addr {
        let c = self.ip_addr_counter;
        self.ip_addr_counter = c % IPV4_POOL_SIZE + 1;
        Ipv4Addr::new(10, 0, (c >> 8) as u8, c as u8)
    }

    /// `fd00::<c>` using the already advanced counter
    fn allocate_ipv6(&self) -> Ipv6Addr {
        let c = self.ip_addr_counter;
        Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, (c >> 16) as u16, c as u16)
    }

    /// Create a session in `Activating` state and return its id
    pub fn create_pdu_session(&mut self, ue_id: UeId, dnn: &str, snssai: Snssai) -> SessionId {
        self.next_session_id = self.next_session_id.wrapping_add(1);
        let session_id = self.next_session_id;

        let ipv4_address = self.allocate_ipv4();
        let ipv6_address = self.allocate_ipv6();

        self.pdu_sessions.insert(
            session_id,
            PduSessionContext {
                pdu_session_id: session_id,
                ue_id,
                state: SessionState::Activating,
                snssai,
                dnn: dnn.to_string(),
                ipv4_address,
                ipv6_address,
                ul_traffic: 0,
                dl_traffic: 0,
            },
        );
        self.ue_sessions.entry(ue_id).or_default().push(session_id);

        log::info!(
            "[{}] PDU Session Created | ID={} | UE={} | IPv4={}",
            self.instance.name(),
            session_id,
            ue_id,
            ipv4_address
        );
        session_id
    }

    fn session_mut(&mut self, session_id: SessionId) -> SmfResult<&mut PduSessionContext> {
        self.pdu_sessions
            .get_mut(&session_id)
            .ok_or(SmfError::NotFound(session_id))
    }

    /// Move an `Activating` session to `Active`
    pub fn activate_pdu_session(&mut self, session_id: SessionId) -> SmfResult<()> {
        let name = self.instance.name().to_string();
        let session = self.session_mut(session_id).inspect_err(|_| {
            log::error!("[{}] Session not found: {}", name, session_id);
        })?;

        if !session.state.can_transition_to(SessionState::Active) {
            log::warn!(
                "[{}] Cannot activate session {} in state {}",
                name,
                session_id,
                session.state
            );
            return Err(SmfError::InvalidTransition {
                session_id,
                from: session.state,
                to: SessionState::Active,
            });
        }

        session.state = SessionState::Active;
        self.active_sessions.insert(session_id);

        log::info!("[{}] PDU Session Activated | ID={}", name, session_id);
        Ok(())
    }

    /// Change the DNN of an `Active` session
    pub fn modify_pdu_session(&mut self, session_id: SessionId, new_dnn: &str) -> SmfResult<()> {
        let name = self.instance.name().to_string();
        let session = self.session_mut(session_id).inspect_err(|_| {
            log::error!("[{}] Session not found: {}", name, session_id);
        })?;

        if !session.state.can_transition_to(SessionState::Modifying) {
            log::warn!("[{}] Cannot modify inactive session: {}", name, session_id);
            return Err(SmfError::NotActive {
                session_id,
                state: session.state,
            });
        }

        session.state = SessionState::Modifying;
        session.dnn = new_dnn.to_string();
        session.state = SessionState::Active;

        log::info!("[{}] Session modified: {} | New DNN: {}", name, session_id, new_dnn);
        Ok(())
    }

    /// Start deactivating a session. Releasing twice is a no-op.
    pub fn release_pdu_session(&mut self, session_id: SessionId) -> SmfResult<()> {
        let name = self.instance.name().to_string();
        let session = self.session_mut(session_id).inspect_err(|_| {
            log::warn!("[{}] Session not found for release: {}", name, session_id);
        })?;

        if session.state == SessionState::Deactivating {
            return Ok(());
        }
        if !session.state.can_transition_to(SessionState::Deactivating) {
            return Err(SmfError::InvalidTransition {
                session_id,
                from: session.state,
                to: SessionState::Deactivating,
            });
        }

        session.state = SessionState::Deactivating;
        self.active_sessions.remove(&session_id);

        log::debug!("[{}] Session deactivating: {}", name, session_id);
        Ok(())
    }

    /// Remove a session from storage, the active set and its UE's list
    pub fn terminate_pdu_session(&mut self, session_id: SessionId) -> SmfResult<PduSessionContext> {
        let Some(mut session) = self.pdu_sessions.remove(&session_id) else {
            log::warn!(
                "[{}] Session not found for termination: {}",
                self.instance.name(),
                session_id
            );
            return Err(SmfError::NotFound(session_id));
        };

        self.active_sessions.remove(&session_id);
        if let Some(ids) = self.ue_sessions.get_mut(&session.ue_id) {
            ids.retain(|id| *id != session_id);
            if ids.is_empty() {
                self.ue_sessions.remove(&session.ue_id);
            }
        }

        session.state = SessionState::Terminated;
        log::info!("[{}] PDU Session Terminated | ID={}", self.instance.name(), session_id);
        Ok(session)
    }

    pub fn pdu_session(&self, session_id: SessionId) -> Option<&PduSessionContext> {
        self.pdu_sessions.get(&session_id)
    }

    pub fn is_session_active(&self, session_id: SessionId) -> bool {
        self.active_sessions.contains(&session_id)
    }

    /// Active sessions of a UE, in creation order
    pub fn active_sessions(&self, ue_id: UeId) -> Vec<SessionId> {
        self.ue_sessions
            .get(&ue_id)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.active_sessions.contains(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All sessions of a UE regardless of state, in creation order
    pub fn ue_sessions(&self, ue_id: UeId) -> &[SessionId] {
        self.ue_sessions
            .get(&ue_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Add to a session's uplink counter. Returns false if the session is unknown.
    pub fn record_uplink(&mut self, session_id: SessionId, bytes: u64) -> bool {
        let Some(session) = self.pdu_sessions.get_mut(&session_id) else {
            return false;
        };
        session.ul_traffic += bytes;
        log::debug!(
            "[{}] Uplink recorded: Session={} | Bytes={}",
            self.instance.name(),
            session_id,
            bytes
        );
        true
    }

    /// Add to a session's downlink counter. Returns false if the session is unknown.
    pub fn record_downlink(&mut self, session_id: SessionId, bytes: u64) -> bool {
        let Some(session) = self.pdu_sessions.get_mut(&session_id) else {
            return false;
        };
        session.dl_traffic += bytes;
        log::debug!(
            "[{}] Downlink recorded: Session={} | Bytes={}",
            self.instance.name(),
            session_id,
            bytes
        );
        true
    }

    pub fn session_count(&self) -> usize {
        self.pdu_sessions.len()
    }

    pub fn active_session_count(&self) -> usize {
        self.active_sessions.len()
    }

    pub fn smf_status(&self) -> String {
        format!(
            "SMF Status:\n  Total Sessions: {}\n  Active Sessions: {}\n",
            self.pdu_sessions.len(),
            self.active_sessions.len()
        )
    }

    pub fn sessions_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================== SMF Active Sessions ==================");
        let _ = writeln!(out, "Total Sessions: {}", self.pdu_sessions.len());
        let _ = writeln!(out, "Active Sessions: {}", self.active_sessions.len());
        let _ = writeln!(out);
        for session in self.pdu_sessions.values() {
            let _ = writeln!(
                out,
                "Session ID: {} | UE: {} | State: {} | DNN: {} | IPv4: {} | IPv6: {} | UL: {}B | DL: {}B",
                session.pdu_session_id,
                session.ue_id,
                session.state,
                session.dnn,
                session.ipv4_address,
                session.ipv6_address,
                session.ul_traffic,
                session.dl_traffic
            );
        }
        let _ = writeln!(out, "========================================================");
        out
    }

    pub(crate) fn clear(&mut self) {
        self.pdu_sessions.clear();
        self.active_sessions.clear();
        self.ue_sessions.clear();
    }
}

impl Default for SmfContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_ids_and_addresses() {
        let _ = env_logger::try_init();
        let mut smf = SmfContext::new();

        let first = smf.create_pdu_session(1000, "internet", 1);
        let second = smf.create_pdu_session(1000, "ims", 2);
        assert_eq!(first, 5001);
        assert_eq!(second, 5002);

        let s1 = smf.pdu_session(first).unwrap();
        assert_eq!(s1.state, SessionState::Activating);
        assert_eq!(s1.ipv4_address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(s1.ipv6_address.to_string(), "fd00::2");
        assert_eq!(s1.snssai, 1);

        let s2 = smf.pdu_session(second).unwrap();
        assert_eq!(s2.ipv4_address, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(s2.ipv6_address.to_string(), "fd00::3");

        assert_eq!(smf.ue_sessions(1000), &[5001, 5002]);
        assert!(smf.active_sessions(1000).is_empty());
    }

    #[test]
    fn test_ipv4_rolls_into_third_octet() {
        let mut smf = SmfContext::new();
        let mut last = 0;
        for _ in 0..256 {
            last = smf.create_pdu_session(1, "internet", 1);
        }
        assert_eq!(
            smf.pdu_session(last).unwrap().ipv4_address,
            Ipv4Addr::new(10, 0, 1, 0)
        );
        assert_eq!(smf.pdu_session(last).unwrap().ipv6_address.to_string(), "fd00::101");
    }

    #[test]
    fn test_ipv4_pool_cycles_without_network_address() {
        let mut smf = SmfContext::new();
        smf.ip_addr_counter = IPV4_POOL_SIZE;

        let last = smf.create_pdu_session(1, "internet", 1);
        let wrapped = smf.create_pdu_session(1, "internet", 1);
        assert_eq!(
            smf.pdu_session(last).unwrap().ipv4_address,
            Ipv4Addr::new(10, 0, 255, 255)
        );
        assert_eq!(
            smf.pdu_session(wrapped).unwrap().ipv4_address,
            Ipv4Addr::new(10, 0, 0, 1)
        );
    }

    #[test]
    fn test_guards_follow_state_machine() {
        let mut smf = SmfContext::new();
        let id = smf.create_pdu_session(1000, "internet", 1);
        smf.release_pdu_session(id).unwrap();

        // Deactivating is terminal short of removal
        assert!(!SessionState::Deactivating.can_transition_to(SessionState::Active));
        assert_eq!(
            smf.activate_pdu_session(id),
            Err(SmfError::InvalidTransition {
                session_id: id,
                from: SessionState::Deactivating,
                to: SessionState::Active
            })
        );
        assert!(!SessionState::Deactivating.can_transition_to(SessionState::Modifying));
        assert_eq!(
            smf.modify_pdu_session(id, "ims"),
            Err(SmfError::NotActive {
                session_id: id,
                state: SessionState::Deactivating
            })
        );
        assert!(!smf.is_session_active(id));
    }

    #[test]
    fn test_activate() {
        let mut smf = SmfContext::new();
        let id = smf.create_pdu_session(1000, "internet", 1);

        smf.activate_pdu_session(id).unwrap();
        assert!(smf.is_session_active(id));
        assert_eq!(smf.pdu_session(id).unwrap().state, SessionState::Active);

        assert_eq!(
            smf.activate_pdu_session(id),
            Err(SmfError::InvalidTransition {
                session_id: id,
                from: SessionState::Active,
                to: SessionState::Active
            })
        );
        assert_eq!(smf.activate_pdu_session(1), Err(SmfError::NotFound(1)));
    }

    #[test]
    fn test_modify() {
        let mut smf = SmfContext::new();
        let id = smf.create_pdu_session(1000, "internet", 1);

        assert_eq!(
            smf.modify_pdu_session(id, "ims"),
            Err(SmfError::NotActive {
                session_id: id,
                state: SessionState::Activating
            })
        );

        smf.activate_pdu_session(id).unwrap();
        smf.modify_pdu_session(id, "ims").unwrap();
        let session = smf.pdu_session(id).unwrap();
        assert_eq!(session.dnn, "ims");
        assert_eq!(session.state, SessionState::Active);
    }

    #[test]
    fn test_release_and_terminate() {
        let mut smf = SmfContext::new();
        let a = smf.create_pdu_session(1000, "internet", 1);
        let b = smf.create_pdu_session(1000, "internet", 1);
        smf.activate_pdu_session(a).unwrap();
        smf.activate_pdu_session(b).unwrap();
        assert_eq!(smf.active_sessions(1000), vec![a, b]);

        smf.release_pdu_session(a).unwrap();
        assert_eq!(smf.pdu_session(a).unwrap().state, SessionState::Deactivating);
        assert_eq!(smf.active_sessions(1000), vec![b]);

        // Second release does nothing
        smf.release_pdu_session(a).unwrap();
        assert_eq!(smf.pdu_session(a).unwrap().state, SessionState::Deactivating);

        let terminated = smf.terminate_pdu_session(a).unwrap();
        assert_eq!(terminated.state, SessionState::Terminated);
        assert!(smf.pdu_session(a).is_none());
        assert_eq!(smf.ue_sessions(1000), &[b]);

        // Terminate straight from Active
        smf.terminate_pdu_session(b).unwrap();
        assert!(!smf.is_session_active(b));
        assert!(smf.ue_sessions(1000).is_empty());
        assert_eq!(smf.session_count(), 0);

        assert_eq!(smf.terminate_pdu_session(b), Err(SmfError::NotFound(b)));
        assert_eq!(smf.release_pdu_session(b), Err(SmfError::NotFound(b)));
    }

    #[test]
    fn test_record_traffic() {
        let mut smf = SmfContext::new();
        let id = smf.create_pdu_session(1000, "internet", 1);
        for _ in 0..3 {
            assert!(smf.record_uplink(id, 2048));
        }
        assert!(smf.record_downlink(id, 100));
        assert!(!smf.record_uplink(9999, 1));
        assert!(!smf.record_downlink(9999, 1));

        let session = smf.pdu_session(id).unwrap();
        assert_eq!(session.ul_traffic, 6144);
        assert_eq!(session.dl_traffic, 100);
    }

    #[test]
    fn test_reports() {
        let mut smf = SmfContext::new();
        let id = smf.create_pdu_session(1000, "internet", 1);
        smf.activate_pdu_session(id).unwrap();

        assert!(smf.smf_status().contains("Active Sessions: 1"));
        let report = smf.sessions_report();
        assert!(report.contains("Session ID: 5001 | UE: 1000 | State: ACTIVE"));
        assert!(report.contains("IPv4: 10.0.0.1"));
    }
}
