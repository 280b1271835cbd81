//! UDM Context Management
//!
//! Authentication contexts, the subscription cache and the public key store,
//! each keyed by IMSI.

use crate::error::{UdmError, UdmResult};
use nfsim_core::{Imsi, NfInstance, NfType, SubscriptionData};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shortest response accepted by [`UdmContext::verify_authentication_response`]
pub const MIN_RESPONSE_LEN: usize = 10;

/// Authentication context for one subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub imsi: Imsi,
    pub challenge: String,
    pub is_authenticated: bool,
    pub creation_time: SystemTime,
}

/// UDM Context
pub struct UdmContext {
    pub(crate) instance: NfInstance,
    auth_contexts: BTreeMap<Imsi, AuthContext>,
    subscription_cache: BTreeMap<Imsi, SubscriptionData>,
    public_keys: BTreeMap<Imsi, String>,
}

impl UdmContext {
    /// Create a new UDM context
    pub fn new() -> Self {
        let ctx = Self {
            instance: NfInstance::new(NfType::Udm, "UDM"),
            auth_contexts: BTreeMap::new(),
            subscription_cache: BTreeMap::new(),
            public_keys: BTreeMap::new(),
        };
        log::info!("[{}] UDM initialized", ctx.instance.name());
        ctx
    }

    /// `CHALLENGE_<imsi hex>_<unix seconds>`
    fn generate_challenge(imsi: Imsi, now: SystemTime) -> String {
        let secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("CHALLENGE_{:x}_{}", imsi, secs)
    }

    /// Store a fresh context for the IMSI, replacing any earlier one
    fn issue_challenge(&mut self, imsi: Imsi) -> &AuthContext {
        let now = SystemTime::now();
        let context = AuthContext {
            imsi,
            challenge: Self::generate_challenge(imsi, now),
            is_authenticated: false,
            creation_time: now,
        };
        log::info!(
            "[{}] Authentication challenge generated for IMSI: {}",
            self.instance.name(),
            imsi
        );

        match self.auth_contexts.entry(imsi) {
            Entry::Occupied(mut slot) => {
                slot.insert(context);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(context),
        }
    }

    /// Issue a fresh challenge, replacing any earlier context for the IMSI
    pub fn generate_authentication_challenge(&mut self, imsi: Imsi) -> String {
        self.issue_challenge(imsi).challenge.clone()
    }

    /// Issue a challenge and return the new context
    pub fn create_auth_context(&mut self, imsi: Imsi) -> &AuthContext {
        self.issue_challenge(imsi)
    }

    /// Accept any response of at least [`MIN_RESPONSE_LEN`] bytes.
    ///
    /// The response is not checked against the challenge.
    pub fn verify_authentication_response(&mut self, imsi: Imsi, response: &str) -> UdmResult<bool> {
        let Some(context) = self.auth_contexts.get_mut(&imsi) else {
            log::error!("[{}] No auth context found for IMSI: {}", self.instance.name(), imsi);
            return Err(UdmError::NoContext(imsi));
        };

        if response.len() < MIN_RESPONSE_LEN {
            log::warn!("[{}] Authentication Failed | IMSI={}", self.instance.name(), imsi);
            return Ok(false);
        }

        context.is_authenticated = true;
        log::info!("[{}] Authentication Successful | IMSI={}", self.instance.name(), imsi);
        Ok(true)
    }

    pub fn auth_context(&self, imsi: Imsi) -> Option<&AuthContext> {
        self.auth_contexts.get(&imsi)
    }

    pub fn destroy_auth_context(&mut self, imsi: Imsi) -> bool {
        if self.auth_contexts.remove(&imsi).is_none() {
            return false;
        }
        log::debug!("[{}] Auth context destroyed for IMSI: {}", self.instance.name(), imsi);
        true
    }

    pub fn active_auth_context_count(&self) -> usize {
        self.auth_contexts.len()
    }

    /// Cache subscription data, replacing any earlier entry
    pub fn update_subscription(&mut self, imsi: Imsi, data: SubscriptionData) {
        self.subscription_cache.insert(imsi, data);
        log::info!("[{}] Subscription updated for IMSI: {}", self.instance.name(), imsi);
    }

    pub fn subscription_info(&self, imsi: Imsi) -> Option<&SubscriptionData> {
        let data = self.subscription_cache.get(&imsi);
        if data.is_none() {
            log::warn!(
                "[{}] Subscription info not found for IMSI: {}",
                self.instance.name(),
                imsi
            );
        }
        data
    }

    /// Public key of a subscriber, created as `PK_<imsi>` on first use
    pub fn public_key(&mut self, imsi: Imsi) -> &str {
        let name = self.instance.name();
        self.public_keys.entry(imsi).or_insert_with(|| {
            log::debug!("[{}] Public key generated for IMSI: {}", name, imsi);
            format!("PK_{}", imsi)
        })
    }

    pub fn udm_status(&self) -> String {
        format!(
            "UDM Status:\n  Active Auth Contexts: {}\n  Cached Subscriptions: {}\n  Public Keys: {}\n",
            self.auth_contexts.len(),
            self.subscription_cache.len(),
            self.public_keys.len()
        )
    }

    pub fn authentication_status_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================== UDM Authentication Status ==================");
        let _ = writeln!(out, "Active Auth Contexts: {}", self.auth_contexts.len());
        let _ = writeln!(out, "Cached Subscriptions: {}", self.subscription_cache.len());
        let _ = writeln!(out, "Public Keys Stored: {}", self.public_keys.len());
        if !self.auth_contexts.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Active Authentication Contexts:");
            for context in self.auth_contexts.values() {
                let _ = writeln!(
                    out,
                    "  IMSI {} | Challenge: {} | Authenticated: {}",
                    context.imsi,
                    context.challenge,
                    if context.is_authenticated { "Yes" } else { "No" }
                );
            }
        }
        let _ = writeln!(out, "=================================================================");
        out
    }

    pub(crate) fn clear(&mut self) {
        self.auth_contexts.clear();
        self.subscription_cache.clear();
        self.public_keys.clear();
    }
}

impl Default for UdmContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const IMSI: Imsi = 310_410_000_000_000;

    #[test]
    fn test_challenge_format() {
        let at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(
            UdmContext::generate_challenge(0xabc, at),
            "CHALLENGE_abc_1700000000"
        );
    }

    #[test]
    fn test_challenge_replaces_context() {
        let _ = env_logger::try_init();
        let mut udm = UdmContext::new();

        let challenge = udm.generate_authentication_challenge(IMSI);
        assert!(challenge.starts_with(&format!("CHALLENGE_{:x}_", IMSI)));
        assert!(udm.verify_authentication_response(IMSI, "long_enough_response").unwrap());
        assert!(udm.auth_context(IMSI).unwrap().is_authenticated);

        // A new challenge resets the authenticated flag
        udm.generate_authentication_challenge(IMSI);
        assert!(!udm.auth_context(IMSI).unwrap().is_authenticated);
        assert_eq!(udm.active_auth_context_count(), 1);
    }

    #[test]
    fn test_verify_response() {
        let mut udm = UdmContext::new();
        assert_eq!(
            udm.verify_authentication_response(IMSI, "dummy_response"),
            Err(UdmError::NoContext(IMSI))
        );

        let context = udm.create_auth_context(IMSI);
        assert_eq!(context.imsi, IMSI);
        assert!(!context.is_authenticated);

        assert_eq!(udm.verify_authentication_response(IMSI, "short"), Ok(false));
        assert!(!udm.auth_context(IMSI).unwrap().is_authenticated);

        assert_eq!(udm.verify_authentication_response(IMSI, "0123456789"), Ok(true));
        assert!(udm.auth_context(IMSI).unwrap().is_authenticated);

        assert!(udm.destroy_auth_context(IMSI));
        assert!(!udm.destroy_auth_context(IMSI));
    }

    #[test]
    fn test_create_auth_context_replaces_authenticated_context() {
        let mut udm = UdmContext::new();
        udm.generate_authentication_challenge(IMSI);
        udm.verify_authentication_response(IMSI, "0123456789").unwrap();

        let context = udm.create_auth_context(IMSI).clone();
        assert!(!context.is_authenticated);
        assert!(context.challenge.starts_with("CHALLENGE_"));
        assert_eq!(udm.auth_context(IMSI), Some(&context));
        assert_eq!(udm.active_auth_context_count(), 1);
    }

    #[test]
    fn test_public_key_cached() {
        let mut udm = UdmContext::new();
        assert_eq!(udm.public_key(IMSI), "PK_310410000000000");
        assert_eq!(udm.public_key(IMSI), "PK_310410000000000");
        assert!(udm.udm_status().contains("Public Keys: 1"));
    }

    #[test]
    fn test_subscription_cache() {
        let mut udm = UdmContext::new();
        assert!(udm.subscription_info(IMSI).is_none());

        udm.update_subscription(IMSI, SubscriptionData::new(IMSI, "+1", vec![1]));
        udm.update_subscription(IMSI, SubscriptionData::new(IMSI, "+2", vec![1]));
        assert_eq!(udm.subscription_info(IMSI).unwrap().msisdn, "+2");
    }
}
