//! AMF Context Management
//!
//! Registered UEs, their authentication/authorization flags and the gNodeB
//! each one is attached to.

use crate::error::{AmfError, AmfResult};
use nfsim_core::{is_valid_identity, GnbId, Imei, Imsi, NfInstance, NfType, UeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::time::SystemTime;

/// Registration record for one UE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UeRegistration {
    pub ue_id: UeId,
    pub imsi: Imsi,
    pub imei: Imei,
    pub is_authenticated: bool,
    /// Only ever set on an authenticated UE
    pub is_authorized: bool,
    pub connected_gnb: Option<GnbId>,
    pub registration_time: SystemTime,
}

/// AMF Context
pub struct AmfContext {
    pub(crate) instance: NfInstance,
    registered_ues: BTreeMap<UeId, UeRegistration>,
    /// UEs currently attached to a gNodeB
    connected_ues: BTreeSet<UeId>,
    /// Registration contexts (`REG_CONTEXT_<ue>`)
    registration_contexts: BTreeMap<UeId, String>,
    amf_contexts: BTreeSet<UeId>,
}

impl AmfContext {
    /// Create a new AMF context
    pub fn new() -> Self {
        let ctx = Self {
            instance: NfInstance::new(NfType::Amf, "AMF"),
            registered_ues: BTreeMap::new(),
            connected_ues: BTreeSet::new(),
            registration_contexts: BTreeMap::new(),
            amf_contexts: BTreeSet::new(),
        };
        log::info!("[{}] AMF initialized", ctx.instance.name());
        ctx
    }

    /// Register a UE with both flags cleared and no gNodeB
    pub fn register_ue(&mut self, ue_id: UeId, imsi: Imsi, imei: Imei) -> AmfResult<()> {
        if self.registered_ues.contains_key(&ue_id) {
            log::warn!("[{}] UE already registered: {}", self.instance.name(), ue_id);
            return Err(AmfError::Duplicate(ue_id));
        }
        if !is_valid_identity(imsi) {
            log::warn!("[{}] Invalid IMSI for UE: {}", self.instance.name(), ue_id);
            return Err(AmfError::InvalidImsi { ue_id, imsi });
        }
        if !is_valid_identity(imei) {
            log::warn!("[{}] Invalid IMEI for UE: {}", self.instance.name(), ue_id);
            return Err(AmfError::InvalidImei { ue_id, imei });
        }

        self.registered_ues.insert(
            ue_id,
            UeRegistration {
                ue_id,
                imsi,
                imei,
                is_authenticated: false,
                is_authorized: false,
                connected_gnb: None,
                registration_time: SystemTime::now(),
            },
        );

        log::info!(
            "[{}] UE Registration | ID={} | IMSI={}",
            self.instance.name(),
            ue_id,
            imsi
        );
        self.create_registration_context(ue_id);
        Ok(())
    }

    /// Remove a UE and everything attached to it
    pub fn deregister_ue(&mut self, ue_id: UeId) -> AmfResult<UeRegistration> {
        let Some(registration) = self.registered_ues.remove(&ue_id) else {
            log::warn!("[{}] UE not registered: {}", self.instance.name(), ue_id);
            return Err(AmfError::NotFound(ue_id));
        };

        self.connected_ues.remove(&ue_id);
        self.amf_contexts.remove(&ue_id);
        self.delete_registration_context(ue_id);

        log::info!("[{}] UE Deregistration | ID={}", self.instance.name(), ue_id);
        Ok(registration)
    }

    pub fn is_ue_registered(&self, ue_id: UeId) -> bool {
        self.registered_ues.contains_key(&ue_id)
    }

    pub fn ue(&self, ue_id: UeId) -> Option<&UeRegistration> {
        self.registered_ues.get(&ue_id)
    }

    fn registration_mut(&mut self, ue_id: UeId) -> AmfResult<&mut UeRegistration> {
        self.registered_ues
            .get_mut(&ue_id)
            .ok_or(AmfError::NotFound(ue_id))
    }

    /// Mark a UE authenticated if `imsi` matches its registration
    pub fn authenticate_ue(&mut self, ue_id: UeId, imsi: Imsi) -> AmfResult<()> {
        let name = self.instance.name().to_string();
        let registration = self.registration_mut(ue_id).inspect_err(|_| {
            log::warn!("[{}] Cannot authenticate: UE not found - {}", name, ue_id);
        })?;

        if registration.imsi != imsi {
            log::error!("[{}] Authentication failed: IMSI mismatch for UE {}", name, ue_id);
            return Err(AmfError::IdentityMismatch { ue_id });
        }

        registration.is_authenticated = true;
        log::info!("[{}] UE authenticated: {}", name, ue_id);
        Ok(())
    }

    /// Mark an authenticated UE authorized
    pub fn authorize_ue(&mut self, ue_id: UeId) -> AmfResult<()> {
        let name = self.instance.name().to_string();
        let registration = self.registration_mut(ue_id)?;

        if !registration.is_authenticated {
            log::warn!("[{}] Cannot authorize: UE not authenticated - {}", name, ue_id);
            return Err(AmfError::NotAuthenticated(ue_id));
        }

        registration.is_authorized = true;
        log::info!("[{}] UE authorized: {}", name, ue_id);
        Ok(())
    }

    /// Record that a UE is now served by `gnb_id`
    pub fn handle_ue_attach(&mut self, ue_id: UeId, gnb_id: GnbId) -> AmfResult<()> {
        let name = self.instance.name().to_string();
        let registration = self.registration_mut(ue_id).inspect_err(|_| {
            log::error!("[{}] UE attach failed: UE not registered - {}", name, ue_id);
        })?;

        registration.connected_gnb = Some(gnb_id);
        self.connected_ues.insert(ue_id);

        log::info!("[{}] UE attached: {} to gNodeB {}", name, ue_id, gnb_id);
        Ok(())
    }

    /// Clear a UE's gNodeB. Returns false for an unknown UE.
    pub fn handle_ue_detach(&mut self, ue_id: UeId) -> bool {
        let Some(registration) = self.registered_ues.get_mut(&ue_id) else {
            log::warn!("[{}] UE detach: UE not found - {}", self.instance.name(), ue_id);
            return false;
        };

        let previous = registration.connected_gnb.take();
        self.connected_ues.remove(&ue_id);

        match previous {
            Some(gnb_id) => log::info!(
                "[{}] UE detached: {} from gNodeB {}",
                self.instance.name(),
                ue_id,
                gnb_id
            ),
            None => log::info!("[{}] UE detached: {} (no gNodeB)", self.instance.name(), ue_id),
        }
        true
    }

    /// Move a UE from `source_gnb` to `target_gnb`
    pub fn handle_handover(
        &mut self,
        ue_id: UeId,
        source_gnb: GnbId,
        target_gnb: GnbId,
    ) -> AmfResult<()> {
        let name = self.instance.name().to_string();
        let registration = self.registration_mut(ue_id).inspect_err(|_| {
            log::warn!("[{}] Handover failed: UE not found - {}", name, ue_id);
        })?;

        if registration.connected_gnb != Some(source_gnb) {
            log::error!(
                "[{}] Handover failed: Source gNodeB mismatch for UE {}",
                name,
                ue_id
            );
            return Err(AmfError::SourceMismatch {
                ue_id,
                expected: source_gnb,
                actual: registration.connected_gnb,
            });
        }

        registration.connected_gnb = Some(target_gnb);
        log::info!(
            "[{}] Handover complete: UE {} from gNodeB {} to gNodeB {}",
            name,
            ue_id,
            source_gnb,
            target_gnb
        );
        Ok(())
    }

    /// Create the per-UE registration context
    pub fn create_registration_context(&mut self, ue_id: UeId) {
        self.registration_contexts
            .insert(ue_id, format!("REG_CONTEXT_{}", ue_id));
        log::debug!("[{}] Registration context created for UE {}", self.instance.name(), ue_id);
    }

    pub fn delete_registration_context(&mut self, ue_id: UeId) {
        self.registration_contexts.remove(&ue_id);
        log::debug!("[{}] Registration context deleted for UE {}", self.instance.name(), ue_id);
    }

    pub fn registration_context(&self, ue_id: UeId) -> Option<&str> {
        self.registration_contexts.get(&ue_id).map(String::as_str)
    }

    /// Create the AMF-side mobility context for a registered UE
    pub fn create_amf_context(&mut self, ue_id: UeId) -> AmfResult<()> {
        if !self.registered_ues.contains_key(&ue_id) {
            return Err(AmfError::NotFound(ue_id));
        }
        self.amf_contexts.insert(ue_id);
        log::debug!("[{}] AMF context created for UE {}", self.instance.name(), ue_id);
        Ok(())
    }

    pub fn has_amf_context(&self, ue_id: UeId) -> bool {
        self.amf_contexts.contains(&ue_id)
    }

    pub fn is_ue_connected(&self, ue_id: UeId) -> bool {
        self.connected_ues.contains(&ue_id)
    }

    pub fn registered_ue_count(&self) -> usize {
        self.registered_ues.len()
    }

    pub fn connected_ue_count(&self) -> usize {
        self.connected_ues.len()
    }

    pub fn registration_context_count(&self) -> usize {
        self.registration_contexts.len()
    }

    /// Iterate over registrations in UE id order
    pub fn registrations(&self) -> impl Iterator<Item = &UeRegistration> + '_ {
        self.registered_ues.values()
    }

    pub fn amf_status(&self) -> String {
        format!(
            "AMF Status:\n  Registered UEs: {}\n  Connected UEs: {}\n  Registration Contexts: {}\n",
            self.registered_ues.len(),
            self.connected_ues.len(),
            self.registration_contexts.len()
        )
    }

    pub fn registered_ues_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================== AMF Registered UEs ==================");
        let _ = writeln!(out, "Total Registered UEs: {}", self.registered_ues.len());
        let _ = writeln!(out, "Connected UEs: {}", self.connected_ues.len());
        let _ = writeln!(out);
        for reg in self.registered_ues.values() {
            let gnb = reg
                .connected_gnb
                .map_or_else(|| "-".to_string(), |g| g.to_string());
            let _ = writeln!(
                out,
                "UE ID: {} | IMSI: {} | Authenticated: {} | Authorized: {} | Connected gNB: {}",
                reg.ue_id,
                reg.imsi,
                if reg.is_authenticated { "Yes" } else { "No" },
                if reg.is_authorized { "Yes" } else { "No" },
                gnb
            );
        }
        let _ = writeln!(out, "========================================================");
        out
    }

    pub(crate) fn clear(&mut self) {
        self.registered_ues.clear();
        self.connected_ues.clear();
        self.registration_contexts.clear();
        self.amf_contexts.clear();
    }
}

impl Default for AmfContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UE: UeId = 1000;
    const IMSI: Imsi = 310_410_000_000_000;
    const IMEI: Imei = 354_806_000_000_000;

    #[test]
    fn test_register_ue() {
        let _ = env_logger::try_init();
        let mut amf = AmfContext::new();

        amf.register_ue(UE, IMSI, IMEI).unwrap();
        let reg = amf.ue(UE).unwrap();
        assert_eq!(reg.imsi, IMSI);
        assert_eq!(reg.imei, IMEI);
        assert!(!reg.is_authenticated);
        assert!(!reg.is_authorized);
        assert_eq!(reg.connected_gnb, None);
        assert_eq!(amf.registration_context(UE), Some("REG_CONTEXT_1000"));
    }

    #[test]
    fn test_register_rejects_duplicate_and_bad_ids() {
        let mut amf = AmfContext::new();
        amf.register_ue(UE, IMSI, IMEI).unwrap();
        assert_eq!(amf.register_ue(UE, IMSI, IMEI), Err(AmfError::Duplicate(UE)));

        assert_eq!(
            amf.register_ue(1, 0, IMEI),
            Err(AmfError::InvalidImsi { ue_id: 1, imsi: 0 })
        );
        assert_eq!(
            amf.register_ue(1, IMSI, 1_000_000_000_000_000),
            Err(AmfError::InvalidImei {
                ue_id: 1,
                imei: 1_000_000_000_000_000
            })
        );
        assert!(!amf.is_ue_registered(1));
        assert_eq!(amf.registered_ue_count(), 1);
    }

    #[test]
    fn test_authenticate_and_authorize() {
        let mut amf = AmfContext::new();
        amf.register_ue(UE, IMSI, IMEI).unwrap();

        assert_eq!(amf.authorize_ue(UE), Err(AmfError::NotAuthenticated(UE)));
        assert_eq!(
            amf.authenticate_ue(UE, IMSI + 1),
            Err(AmfError::IdentityMismatch { ue_id: UE })
        );
        assert!(!amf.ue(UE).unwrap().is_authenticated);

        amf.authenticate_ue(UE, IMSI).unwrap();
        // Re-authentication is allowed
        amf.authenticate_ue(UE, IMSI).unwrap();
        amf.authorize_ue(UE).unwrap();

        let reg = amf.ue(UE).unwrap();
        assert!(reg.is_authenticated && reg.is_authorized);

        assert_eq!(amf.authenticate_ue(7, IMSI), Err(AmfError::NotFound(7)));
        assert_eq!(amf.authorize_ue(7), Err(AmfError::NotFound(7)));
    }

    #[test]
    fn test_attach_detach() {
        let mut amf = AmfContext::new();
        amf.register_ue(UE, IMSI, IMEI).unwrap();

        amf.handle_ue_attach(UE, 2000).unwrap();
        assert_eq!(amf.ue(UE).unwrap().connected_gnb, Some(2000));
        assert!(amf.is_ue_connected(UE));
        assert_eq!(amf.connected_ue_count(), 1);

        assert!(amf.handle_ue_detach(UE));
        assert_eq!(amf.ue(UE).unwrap().connected_gnb, None);
        assert!(!amf.is_ue_connected(UE));

        assert!(!amf.handle_ue_detach(42));
        assert_eq!(amf.handle_ue_attach(42, 2000), Err(AmfError::NotFound(42)));
    }

    #[test]
    fn test_handover_source_mismatch() {
        let mut amf = AmfContext::new();
        amf.register_ue(UE, IMSI, IMEI).unwrap();
        amf.handle_ue_attach(UE, 7).unwrap();

        assert_eq!(
            amf.handle_handover(UE, 5, 6),
            Err(AmfError::SourceMismatch {
                ue_id: UE,
                expected: 5,
                actual: Some(7)
            })
        );
        assert_eq!(amf.ue(UE).unwrap().connected_gnb, Some(7));

        amf.handle_handover(UE, 7, 8).unwrap();
        assert_eq!(amf.ue(UE).unwrap().connected_gnb, Some(8));
        assert!(amf.is_ue_connected(UE));
    }

    #[test]
    fn test_deregister_and_reregister() {
        let mut amf = AmfContext::new();
        amf.register_ue(UE, IMSI, IMEI).unwrap();
        amf.handle_ue_attach(UE, 2000).unwrap();
        amf.create_amf_context(UE).unwrap();

        let removed = amf.deregister_ue(UE).unwrap();
        assert_eq!(removed.ue_id, UE);
        assert!(!amf.is_ue_registered(UE));
        assert!(!amf.is_ue_connected(UE));
        assert!(!amf.has_amf_context(UE));
        assert_eq!(amf.registration_context(UE), None);
        assert_eq!(amf.deregister_ue(UE), Err(AmfError::NotFound(UE)));

        amf.register_ue(UE, IMSI, IMEI).unwrap();
        let reg = amf.ue(UE).unwrap();
        assert!(!reg.is_authenticated);
        assert_eq!(reg.connected_gnb, None);
    }

    #[test]
    fn test_reports() {
        let mut amf = AmfContext::new();
        amf.register_ue(UE, IMSI, IMEI).unwrap();
        amf.handle_ue_attach(UE, 2000).unwrap();

        let status = amf.amf_status();
        assert!(status.contains("Registered UEs: 1"));
        assert!(status.contains("Registration Contexts: 1"));

        let report = amf.registered_ues_report();
        assert!(report.contains("UE ID: 1000 | IMSI: 310410000000000"));
        assert!(report.contains("Connected gNB: 2000"));
    }
}
