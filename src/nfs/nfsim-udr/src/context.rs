//! UDR Context Management
//!
//! Subscription records keyed by IMSI, free-form profile attributes keyed by
//! UE and access-control strings keyed by IMSI.

use crate::error::{UdrError, UdrResult};
use nfsim_core::{Imsi, NfInstance, NfType, SubscriptionData, UeId};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Profile attributes of one UE
pub type ProfileData = BTreeMap<String, String>;

/// UDR Context
pub struct UdrContext {
    pub(crate) instance: NfInstance,
    subscriptions: BTreeMap<Imsi, SubscriptionData>,
    profiles: BTreeMap<UeId, ProfileData>,
    access_info: BTreeMap<Imsi, String>,
}

impl UdrContext {
    /// Create a new UDR context
    pub fn new() -> Self {
        let ctx = Self {
            instance: NfInstance::new(NfType::Udr, "UDR"),
            subscriptions: BTreeMap::new(),
            profiles: BTreeMap::new(),
            access_info: BTreeMap::new(),
        };
        log::info!("[{}] UDR initialized", ctx.instance.name());
        ctx
    }

    pub fn store_subscription_data(&mut self, imsi: Imsi, data: SubscriptionData) -> UdrResult<()> {
        if self.subscriptions.contains_key(&imsi) {
            log::warn!(
                "[{}] Subscription data already exists for IMSI: {}",
                self.instance.name(),
                imsi
            );
            return Err(UdrError::Duplicate(imsi));
        }
        self.subscriptions.insert(imsi, data);
        log::info!("[{}] Subscription Data Stored | IMSI={}", self.instance.name(), imsi);
        Ok(())
    }

    pub fn subscription_data(&self, imsi: Imsi) -> Option<&SubscriptionData> {
        let data = self.subscriptions.get(&imsi);
        if data.is_some() {
            log::debug!("[{}] Subscription Data Retrieved | IMSI={}", self.instance.name(), imsi);
        } else {
            log::warn!(
                "[{}] Subscription data not found for IMSI: {}",
                self.instance.name(),
                imsi
            );
        }
        data
    }

    pub fn update_subscription_data(&mut self, imsi: Imsi, data: SubscriptionData) -> UdrResult<()> {
        let Some(existing) = self.subscriptions.get_mut(&imsi) else {
            log::warn!(
                "[{}] Cannot update: Subscription data not found for IMSI: {}",
                self.instance.name(),
                imsi
            );
            return Err(UdrError::NotFound(imsi));
        };
        *existing = data;
        log::info!("[{}] Subscription data updated for IMSI: {}", self.instance.name(), imsi);
        Ok(())
    }

    pub fn remove_subscription_data(&mut self, imsi: Imsi) -> UdrResult<SubscriptionData> {
        let Some(data) = self.subscriptions.remove(&imsi) else {
            log::warn!(
                "[{}] Cannot remove: Subscription data not found for IMSI: {}",
                self.instance.name(),
                imsi
            );
            return Err(UdrError::NotFound(imsi));
        };
        log::info!("[{}] Subscription data removed for IMSI: {}", self.instance.name(), imsi);
        Ok(data)
    }

    /// Replace the profile attributes of a UE
    pub fn store_profile_data(&mut self, ue_id: UeId, profile: ProfileData) {
        self.profiles.insert(ue_id, profile);
        log::debug!("[{}] Profile data stored for UE: {}", self.instance.name(), ue_id);
    }

    pub fn profile_data(&self, ue_id: UeId) -> Option<&ProfileData> {
        self.profiles.get(&ue_id)
    }

    pub fn store_access_info(&mut self, imsi: Imsi, info: impl Into<String>) {
        self.access_info.insert(imsi, info.into());
        log::debug!("[{}] Access info stored for IMSI: {}", self.instance.name(), imsi);
    }

    pub fn access_info(&self, imsi: Imsi) -> Option<&str> {
        self.access_info.get(&imsi).map(String::as_str)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn udr_status(&self) -> String {
        format!(
            "UDR Status:\n  Stored Subscriptions: {}\n  Profile Records: {}\n  Access Control Records: {}\n",
            self.subscriptions.len(),
            self.profiles.len(),
            self.access_info.len()
        )
    }

    pub fn stored_data_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================== UDR Stored Data ==================");
        let _ = writeln!(out, "Stored Subscriptions: {}", self.subscriptions.len());
        let _ = writeln!(out, "Profile Records: {}", self.profiles.len());
        let _ = writeln!(out, "Access Control Records: {}", self.access_info.len());
        if !self.subscriptions.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Subscription Data:");
            for data in self.subscriptions.values() {
                let _ = writeln!(
                    out,
                    "  IMSI {} | MSISDN: {} | Access Allowed: {}",
                    data.imsi,
                    data.msisdn,
                    if data.access_restricted { "No" } else { "Yes" }
                );
            }
        }
        let _ = writeln!(out, "=====================================================");
        out
    }

    pub(crate) fn clear(&mut self) {
        self.subscriptions.clear();
        self.profiles.clear();
        self.access_info.clear();
    }
}

impl Default for UdrContext {
    fn default() -> Self {
        Self::new()
    }
}
