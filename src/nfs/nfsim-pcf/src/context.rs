//! PCF Context Management
//!
//! Policy rules keyed by policy id and a per-UE charging ledger.

use crate::error::{PcfError, PcfResult};
use nfsim_core::{NfInstance, NfType, SessionId, UeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Policy id counter start; the first policy is `POL_20001`
const POLICY_ID_BASE: u32 = 20000;

/// Bitrate (kbps) of policies installed on session establishment
pub const SESSION_POLICY_BITRATE: u32 = 5000;
/// Priority of policies installed on session establishment
pub const SESSION_POLICY_PRIORITY: u32 = 9;

/// Bytes per charging unit
pub const BYTES_PER_CHARGE_UNIT: u64 = 1_000_000;

/// Policy rule installed for a PDU session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub rule_name: String,
    pub ue_id: UeId,
    pub session_id: SessionId,
    /// kbps
    pub max_bitrate: u32,
    pub priority_level: u32,
    pub is_active: bool,
}

/// PCF Context
pub struct PcfContext {
    pub(crate) instance: NfInstance,
    /// (bitrate, priority) for policies installed on session establishment
    pub(crate) session_policy: (u32, u32),
    next_policy_id: u32,
    policies: BTreeMap<String, PolicyRule>,
    active_policies: BTreeSet<String>,
    /// Accumulated charge units per UE
    charge_records: BTreeMap<UeId, u64>,
}

impl PcfContext {
    /// Create a new PCF context
    pub fn new() -> Self {
        Self::with_session_policy(SESSION_POLICY_BITRATE, SESSION_POLICY_PRIORITY)
    }

    /// Create a PCF context with the policy installed on session establishment
    pub fn with_session_policy(bitrate: u32, priority: u32) -> Self {
        let ctx = Self {
            instance: NfInstance::new(NfType::Pcf, "PCF"),
            session_policy: (bitrate, priority),
            next_policy_id: POLICY_ID_BASE,
            policies: BTreeMap::new(),
            active_policies: BTreeSet::new(),
            charge_records: BTreeMap::new(),
        };
        log::info!("[{}] PCF initialized", ctx.instance.name());
        ctx
    }

    fn generate_policy_id(&mut self) -> String {
        self.next_policy_id = self.next_policy_id.wrapping_add(1);
        format!("POL_{}", self.next_policy_id)
    }

    /// Install an active policy and return its id
    pub fn create_policy(
        &mut self,
        ue_id: UeId,
        session_id: SessionId,
        bitrate: u32,
        priority: u32,
    ) -> String {
        let policy_id = self.generate_policy_id();
        self.policies.insert(
            policy_id.clone(),
            PolicyRule {
                rule_name: format!("Policy_{}", ue_id),
                ue_id,
                session_id,
                max_bitrate: bitrate,
                priority_level: priority,
                is_active: true,
            },
        );
        self.active_policies.insert(policy_id.clone());

        log::info!(
            "[{}] Policy Created | ID={} | UE={}",
            self.instance.name(),
            policy_id,
            ue_id
        );
        policy_id
    }

    /// Install the configured session policy for a session the SMF assigned
    pub fn install_session_policy(&mut self, ue_id: UeId, session_id: SessionId) -> String {
        let (bitrate, priority) = self.session_policy;
        self.create_policy(ue_id, session_id, bitrate, priority)
    }

    pub fn update_policy(&mut self, policy_id: &str, new_bitrate: u32) -> PcfResult<()> {
        let Some(policy) = self.policies.get_mut(policy_id) else {
            log::warn!("[{}] Policy not found: {}", self.instance.name(), policy_id);
            return Err(PcfError::NotFound(policy_id.to_string()));
        };
        policy.max_bitrate = new_bitrate;
        log::info!(
            "[{}] Policy updated | ID={} | New Bitrate={}kbps",
            self.instance.name(),
            policy_id,
            new_bitrate
        );
        Ok(())
    }

    pub fn remove_policy(&mut self, policy_id: &str) -> PcfResult<PolicyRule> {
        let Some(policy) = self.policies.remove(policy_id) else {
            log::warn!("[{}] Policy not found: {}", self.instance.name(), policy_id);
            return Err(PcfError::NotFound(policy_id.to_string()));
        };
        self.active_policies.remove(policy_id);
        log::info!("[{}] Policy Removed | ID={}", self.instance.name(), policy_id);
        Ok(policy)
    }

    /// Remove every policy bound to a session. Returns the removed ids.
    pub fn remove_policies_for_session(&mut self, session_id: SessionId) -> Vec<String> {
        let ids: Vec<String> = self
            .policies
            .iter()
            .filter(|(_, policy)| policy.session_id == session_id)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &ids {
            self.policies.remove(id);
            self.active_policies.remove(id);
        }
        if !ids.is_empty() {
            log::info!(
                "[{}] Policies Removed | Session={} | Count={}",
                self.instance.name(),
                session_id,
                ids.len()
            );
        }
        ids
    }

    pub fn policy(&self, policy_id: &str) -> Option<&PolicyRule> {
        self.policies.get(policy_id)
    }

    /// Charge one event: one unit per started megabyte, plus one. Returns the charge.
    pub fn record_charging_event(&mut self, ue_id: UeId, session_id: SessionId, bytes: u64) -> u64 {
        let charge = bytes / BYTES_PER_CHARGE_UNIT + 1;
        *self.charge_records.entry(ue_id).or_insert(0) += charge;

        log::debug!(
            "[{}] Charging Event | UE={} | Session={} | Bytes={} | Charge={}",
            self.instance.name(),
            ue_id,
            session_id,
            bytes,
            charge
        );
        charge
    }

    /// Accumulated charge of a UE, 0 if it was never charged
    pub fn total_charge(&self, ue_id: UeId) -> u64 {
        self.charge_records.get(&ue_id).copied().unwrap_or(0)
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    pub fn active_policy_count(&self) -> usize {
        self.active_policies.len()
    }

    pub fn pcf_status(&self) -> String {
        format!(
            "PCF Status:\n  Active Policies: {}\n  Charge Records: {}\n",
            self.active_policies.len(),
            self.charge_records.len()
        )
    }

    pub fn policies_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================== PCF Active Policies ==================");
        let _ = writeln!(out, "Total Policies: {}", self.policies.len());
        let _ = writeln!(out, "Active Policies: {}", self.active_policies.len());
        let _ = writeln!(out);
        for (id, policy) in &self.policies {
            let _ = writeln!(
                out,
                "Policy ID: {} | UE={} | Session={} | MaxBitrate={}kbps | Priority={}",
                id, policy.ue_id, policy.session_id, policy.max_bitrate, policy.priority_level
            );
        }
        if !self.charge_records.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Charging Records:");
            for (ue_id, units) in &self.charge_records {
                let _ = writeln!(out, "UE {}: {} units", ue_id, units);
            }
        }
        let _ = writeln!(out, "=========================================================");
        out
    }

    pub(crate) fn clear(&mut self) {
        self.policies.clear();
        self.active_policies.clear();
        self.charge_records.clear();
    }
}

impl Default for PcfContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_ids_and_fields() {
        let _ = env_logger::try_init();
        let mut pcf = PcfContext::new();

        let first = pcf.create_policy(1000, 5001, 5000, 9);
        let second = pcf.create_policy(1001, 5002, 10000, 5);
        assert_eq!(first, "POL_20001");
        assert_eq!(second, "POL_20002");

        let policy = pcf.policy(&first).unwrap();
        assert_eq!(policy.rule_name, "Policy_1000");
        assert_eq!(policy.session_id, 5001);
        assert_eq!(policy.max_bitrate, 5000);
        assert_eq!(policy.priority_level, 9);
        assert!(policy.is_active);
        assert_eq!(pcf.active_policy_count(), 2);
    }

    #[test]
    fn test_policies_are_independent() {
        let mut pcf = PcfContext::new();
        let a = pcf.create_policy(1000, 5001, 5000, 9);
        let b = pcf.create_policy(1000, 5002, 5000, 9);

        pcf.update_policy(&a, 20000).unwrap();
        assert_eq!(pcf.policy(&a).unwrap().max_bitrate, 20000);
        assert_eq!(pcf.policy(&b).unwrap().max_bitrate, 5000);

        pcf.remove_policy(&a).unwrap();
        assert!(pcf.policy(&a).is_none());
        assert!(pcf.policy(&b).is_some());
        assert_eq!(pcf.active_policy_count(), 1);
    }

    #[test]
    fn test_remove_policies_for_session() {
        let mut pcf = PcfContext::with_session_policy(8000, 3);
        let a = pcf.install_session_policy(1000, 5001);
        let b = pcf.create_policy(1000, 5001, 100, 1);
        let c = pcf.install_session_policy(1000, 5002);
        assert_eq!(pcf.policy(&a).unwrap().max_bitrate, 8000);
        assert_eq!(pcf.policy(&a).unwrap().priority_level, 3);

        assert_eq!(pcf.remove_policies_for_session(5001), vec![a.clone(), b]);
        assert!(pcf.policy(&a).is_none());
        assert!(pcf.policy(&c).is_some());
        assert_eq!(pcf.active_policy_count(), 1);

        assert!(pcf.remove_policies_for_session(5001).is_empty());
    }

    #[test]
    fn test_unknown_policy() {
        let mut pcf = PcfContext::new();
        assert_eq!(
            pcf.update_policy("POL_1", 1),
            Err(PcfError::NotFound("POL_1".to_string()))
        );
        assert_eq!(
            pcf.remove_policy("POL_1"),
            Err(PcfError::NotFound("POL_1".to_string()))
        );
    }

    #[test]
    fn test_charging() {
        let mut pcf = PcfContext::new();
        assert_eq!(pcf.record_charging_event(1000, 5001, 0), 1);
        assert_eq!(pcf.record_charging_event(1000, 5001, 2_500_000), 3);
        assert_eq!(pcf.record_charging_event(1001, 5002, 999_999), 1);

        assert_eq!(pcf.total_charge(1000), 4);
        assert_eq!(pcf.total_charge(1001), 1);
        assert_eq!(pcf.total_charge(1002), 0);

        let report = pcf.policies_report();
        assert!(report.contains("UE 1000: 4 units"));
    }
}
