//! NRF Context Management
//!
//! Service directory keyed by NF instance id, with a per-type index that keeps
//! registration order for discovery.

use crate::error::{NrfError, NrfResult};
use nfsim_core::{NfInstance, NfType, ServiceProfile};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// NRF Context
pub struct NrfContext {
    pub(crate) instance: NfInstance,
    /// Profiles by instance id
    directory: HashMap<String, ServiceProfile>,
    /// Instance ids per NF type, in registration order
    type_index: BTreeMap<NfType, Vec<String>>,
}

impl NrfContext {
    /// Create a new NRF context
    pub fn new() -> Self {
        let ctx = Self {
            instance: NfInstance::new(NfType::Nrf, "NRF"),
            directory: HashMap::new(),
            type_index: BTreeMap::new(),
        };
        log::info!("[{}] NRF initialized", ctx.instance.name());
        ctx
    }

    /// Register an NF instance profile
    pub fn register_nf_instance(&mut self, profile: ServiceProfile) -> NrfResult<()> {
        if self.directory.contains_key(&profile.nf_instance_id) {
            log::warn!(
                "[{}] NF Instance already registered: {}",
                self.instance.name(),
                profile.nf_instance_id
            );
            return Err(NrfError::AlreadyRegistered(profile.nf_instance_id));
        }

        log::info!(
            "[{}] NF Service Registered | Type={} | ID={} | Name={}",
            self.instance.name(),
            profile.nf_type,
            profile.nf_instance_id,
            profile.nf_name
        );

        self.type_index
            .entry(profile.nf_type)
            .or_default()
            .push(profile.nf_instance_id.clone());
        self.directory
            .insert(profile.nf_instance_id.clone(), profile);
        Ok(())
    }

    /// Remove an NF instance from the directory and the type index
    pub fn deregister_nf_instance(&mut self, nf_instance_id: &str) -> NrfResult<ServiceProfile> {
        let Some(profile) = self.directory.remove(nf_instance_id) else {
            log::warn!("[{}] NF Instance not found: {}", self.instance.name(), nf_instance_id);
            return Err(NrfError::NotFound(nf_instance_id.to_string()));
        };

        if let Some(ids) = self.type_index.get_mut(&profile.nf_type) {
            ids.retain(|id| id != nf_instance_id);
        }

        log::info!("[{}] NF Instance deregistered: {}", self.instance.name(), nf_instance_id);
        Ok(profile)
    }

    /// Look up a profile by instance id
    pub fn nf_instance(&self, nf_instance_id: &str) -> NrfResult<&ServiceProfile> {
        self.directory
            .get(nf_instance_id)
            .ok_or_else(|| NrfError::NotFound(nf_instance_id.to_string()))
    }

    fn available_of_type(&self, nf_type: NfType) -> impl Iterator<Item = &ServiceProfile> + '_ {
        self.type_index
            .get(&nf_type)
            .into_iter()
            .flatten()
            .filter_map(|id| self.directory.get(id))
            .filter(|profile| profile.is_available)
    }

    /// All available profiles of a type, in registration order
    pub fn discover_nf_service(&self, nf_type: NfType) -> Vec<ServiceProfile> {
        let results: Vec<ServiceProfile> = self.available_of_type(nf_type).cloned().collect();

        if results.is_empty() {
            log::warn!("[{}] No NF Service found for Type={}", self.instance.name(), nf_type);
        } else {
            log::debug!("[{}] NF Service discovered for Type={}", self.instance.name(), nf_type);
        }
        results
    }

    /// Prefer `preferred_id` when it is available and of the right type,
    /// otherwise the first available instance of that type
    pub fn discover_specific_nf(
        &self,
        nf_type: NfType,
        preferred_id: &str,
    ) -> NrfResult<&ServiceProfile> {
        if !preferred_id.is_empty() {
            if let Some(profile) = self.directory.get(preferred_id) {
                if profile.nf_type == nf_type && profile.is_available {
                    return Ok(profile);
                }
            }
        }

        match self.available_of_type(nf_type).next() {
            Some(profile) => {
                log::debug!(
                    "[{}] Service discovered: {} -> {}",
                    self.instance.name(),
                    nf_type,
                    profile.nf_instance_id
                );
                Ok(profile)
            }
            None => {
                log::warn!(
                    "[{}] No available NF service found for type: {}",
                    self.instance.name(),
                    nf_type
                );
                Err(NrfError::Unavailable(nf_type))
            }
        }
    }

    /// Mark an instance available or unavailable. The type index is untouched.
    pub fn update_nf_instance_availability(
        &mut self,
        nf_instance_id: &str,
        available: bool,
    ) -> NrfResult<()> {
        let profile = self
            .directory
            .get_mut(nf_instance_id)
            .ok_or_else(|| NrfError::NotFound(nf_instance_id.to_string()))?;

        profile.is_available = available;
        log::info!(
            "[{}] NF Instance {} availability: {}",
            self.instance.name(),
            nf_instance_id,
            if available { "AVAILABLE" } else { "UNAVAILABLE" }
        );
        Ok(())
    }

    /// Number of registered instances of a type, available or not
    pub fn nf_instance_count(&self, nf_type: NfType) -> usize {
        self.type_index.get(&nf_type).map_or(0, Vec::len)
    }

    /// Total number of registered instances
    pub fn total_instance_count(&self) -> usize {
        self.directory.len()
    }

    /// Per-type instance counts
    pub fn service_discovery_status(&self) -> String {
        let mut status = String::from("NRF Service Directory Status:\n");
        for (nf_type, ids) in &self.type_index {
            let _ = writeln!(status, "  Type {}: {} instances", nf_type, ids.len());
        }
        status
    }

    /// Printable service directory, ordered by NF type then registration
    pub fn directory_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "======================= NRF Service Directory =======================");
        let _ = writeln!(out, "Total Registered NF Instances: {}", self.directory.len());
        let _ = writeln!(out);

        for id in self.type_index.values().flatten() {
            let Some(profile) = self.directory.get(id) else {
                continue;
            };
            let _ = writeln!(out, "Instance ID: {}", profile.nf_instance_id);
            let _ = writeln!(out, "  Type:        {}", profile.nf_type);
            let _ = writeln!(out, "  Name:        {}", profile.nf_name);
            let _ = writeln!(out, "  Port:        {}", profile.port);
            let _ = writeln!(
                out,
                "  Available:   {}",
                if profile.is_available { "Yes" } else { "No" }
            );
            if let Some(addr) = profile.ipv4_addresses.first() {
                let _ = writeln!(out, "  IPv4:        {}", addr);
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "====================================================================");
        out
    }
}

impl Default for NrfContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(nf_type: NfType, id: &str) -> ServiceProfile {
        ServiceProfile::new(nf_type, id, format!("{}-{}", nf_type, id), 8080).with_ipv4("127.0.0.1")
    }

    #[test]
    fn test_register_and_lookup() {
        let _ = env_logger::try_init();
        let mut nrf = NrfContext::new();

        nrf.register_nf_instance(profile(NfType::Amf, "amf-1")).unwrap();
        let found = nrf.nf_instance("amf-1").unwrap();
        assert_eq!(found.nf_type, NfType::Amf);
        assert_eq!(nrf.nf_instance_count(NfType::Amf), 1);
        assert_eq!(nrf.total_instance_count(), 1);
    }

    #[test]
    fn test_register_duplicate() {
        let mut nrf = NrfContext::new();
        nrf.register_nf_instance(profile(NfType::Amf, "amf-1")).unwrap();

        let err = nrf.register_nf_instance(profile(NfType::Smf, "amf-1")).unwrap_err();
        assert_eq!(err, NrfError::AlreadyRegistered("amf-1".to_string()));

        // Original entry kept, no second index entry
        assert_eq!(nrf.nf_instance("amf-1").unwrap().nf_type, NfType::Amf);
        assert_eq!(nrf.nf_instance_count(NfType::Smf), 0);
    }

    #[test]
    fn test_deregister() {
        let mut nrf = NrfContext::new();
        nrf.register_nf_instance(profile(NfType::Smf, "smf-1")).unwrap();
        nrf.register_nf_instance(profile(NfType::Smf, "smf-2")).unwrap();

        nrf.deregister_nf_instance("smf-1").unwrap();
        assert_eq!(nrf.nf_instance("smf-1"), Err(NrfError::NotFound("smf-1".to_string())));
        assert_eq!(nrf.nf_instance_count(NfType::Smf), 1);

        assert!(matches!(
            nrf.deregister_nf_instance("smf-1"),
            Err(NrfError::NotFound(_))
        ));
    }

    #[test]
    fn test_discover_skips_unavailable() {
        let mut nrf = NrfContext::new();
        nrf.register_nf_instance(profile(NfType::Upf, "upf-1")).unwrap();
        nrf.register_nf_instance(profile(NfType::Upf, "upf-2")).unwrap();
        nrf.register_nf_instance(profile(NfType::Upf, "upf-3")).unwrap();

        nrf.update_nf_instance_availability("upf-2", false).unwrap();

        let ids: Vec<String> = nrf
            .discover_nf_service(NfType::Upf)
            .into_iter()
            .map(|p| p.nf_instance_id)
            .collect();
        assert_eq!(ids, vec!["upf-1".to_string(), "upf-3".to_string()]);

        // Index still counts the unavailable instance
        assert_eq!(nrf.nf_instance_count(NfType::Upf), 3);
        assert!(nrf.discover_nf_service(NfType::Pcf).is_empty());
    }

    #[test]
    fn test_discover_specific() {
        let mut nrf = NrfContext::new();
        nrf.register_nf_instance(profile(NfType::Smf, "smf-1")).unwrap();
        nrf.register_nf_instance(profile(NfType::Smf, "smf-2")).unwrap();
        nrf.register_nf_instance(profile(NfType::Amf, "amf-1")).unwrap();

        let found = nrf.discover_specific_nf(NfType::Smf, "smf-2").unwrap();
        assert_eq!(found.nf_instance_id, "smf-2");

        // Wrong type falls back to the first available
        let found = nrf.discover_specific_nf(NfType::Smf, "amf-1").unwrap();
        assert_eq!(found.nf_instance_id, "smf-1");

        nrf.update_nf_instance_availability("smf-2", false).unwrap();
        let found = nrf.discover_specific_nf(NfType::Smf, "smf-2").unwrap();
        assert_eq!(found.nf_instance_id, "smf-1");

        let found = nrf.discover_specific_nf(NfType::Smf, "").unwrap();
        assert_eq!(found.nf_instance_id, "smf-1");

        nrf.update_nf_instance_availability("smf-1", false).unwrap();
        assert_eq!(
            nrf.discover_specific_nf(NfType::Smf, ""),
            Err(NrfError::Unavailable(NfType::Smf))
        );
    }

    #[test]
    fn test_update_availability_not_found() {
        let mut nrf = NrfContext::new();
        assert_eq!(
            nrf.update_nf_instance_availability("nope", true),
            Err(NrfError::NotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_reports() {
        let mut nrf = NrfContext::new();
        nrf.register_nf_instance(profile(NfType::Amf, "amf-1")).unwrap();
        nrf.register_nf_instance(profile(NfType::Smf, "smf-1")).unwrap();

        let status = nrf.service_discovery_status();
        assert!(status.contains("Type AMF: 1 instances"));
        assert!(status.contains("Type SMF: 1 instances"));

        let report = nrf.directory_report();
        assert!(report.contains("Total Registered NF Instances: 2"));
        assert!(report.contains("Instance ID: amf-1"));
        assert!(report.contains("IPv4:        127.0.0.1"));
    }
}
