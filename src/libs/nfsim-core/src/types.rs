//! Common Types
//!
//! Identifiers, NF kinds and state enumerations shared by every network function.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// UE identifier
pub type UeId = u32;
/// gNodeB identifier
pub type GnbId = u32;
/// PDU session identifier
pub type SessionId = u32;
/// Cell identifier
pub type CellId = u32;
/// International Mobile Subscriber Identity
pub type Imsi = u64;
/// International Mobile Equipment Identity
pub type Imei = u64;
/// Single Network Slice Selection Assistance Information (slice id)
pub type Snssai = u32;

/// Upper (exclusive) bound for IMSI and IMEI values
pub const MAX_SUBSCRIBER_IDENTITY: u64 = 1_000_000_000_000_000;

/// Default SCTP port (N2)
pub const DEFAULT_SCTP_PORT: u16 = 132;
/// Default HTTP/2 SBI port
pub const DEFAULT_HTTP2_PORT: u16 = 8080;
/// Maximum number of UEs handled by the simulator
pub const MAX_UES: u32 = 10_000;
/// Maximum number of gNodeBs handled by the simulator
pub const MAX_GNBS: u32 = 100;
/// Maximum number of PDU sessions handled by the simulator
pub const MAX_SESSIONS: u32 = 50_000;

/// Check that an IMSI/IMEI lies in the valid range (0 < value < 10^15)
pub fn is_valid_identity(value: u64) -> bool {
    value > 0 && value < MAX_SUBSCRIBER_IDENTITY
}

/// Network function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NfType {
    /// Network Repository Function
    Nrf,
    /// Access and Mobility Management Function
    Amf,
    /// Session Management Function
    Smf,
    /// User Plane Function
    Upf,
    /// Policy Control Function
    Pcf,
    /// Unified Data Repository
    Udr,
    /// Unified Data Management
    Udm,
    /// User Equipment
    Ue,
    /// Radio Access Network
    Ran,
}

impl NfType {
    /// All NF types in declaration order
    pub const ALL: [NfType; 9] = [
        NfType::Nrf,
        NfType::Amf,
        NfType::Smf,
        NfType::Upf,
        NfType::Pcf,
        NfType::Udr,
        NfType::Udm,
        NfType::Ue,
        NfType::Ran,
    ];

    /// Get the name of the NF type
    pub fn name(&self) -> &'static str {
        match self {
            NfType::Nrf => "NRF",
            NfType::Amf => "AMF",
            NfType::Smf => "SMF",
            NfType::Upf => "UPF",
            NfType::Pcf => "PCF",
            NfType::Udr => "UDR",
            NfType::Udm => "UDM",
            NfType::Ue => "UE",
            NfType::Ran => "RAN",
        }
    }
}

impl fmt::Display for NfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// gNodeB operational state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GnbState {
    Idle,
    #[default]
    Active,
    Maintenance,
    Unavailable,
}

impl GnbState {
    pub fn name(&self) -> &'static str {
        match self {
            GnbState::Idle => "IDLE",
            GnbState::Active => "ACTIVE",
            GnbState::Maintenance => "MAINTENANCE",
            GnbState::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for GnbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// PDU session state
///
/// `Idle` is the state of a session that has not been created yet; a stored
/// session is always in one of the other states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Activating,
    Active,
    Modifying,
    Deactivating,
    Terminated,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::Activating => "ACTIVATING",
            SessionState::Active => "ACTIVE",
            SessionState::Modifying => "MODIFYING",
            SessionState::Deactivating => "DEACTIVATING",
            SessionState::Terminated => "TERMINATED",
        }
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Activating)
                | (Activating, Active)
                | (Activating, Deactivating)
                | (Active, Modifying)
                | (Active, Deactivating)
                | (Modifying, Active)
                | (Modifying, Deactivating)
                | (Deactivating, Terminated)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// NF profile published to the NRF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProfile {
    pub nf_type: NfType,
    pub nf_instance_id: String,
    pub nf_name: String,
    pub ipv4_addresses: Vec<String>,
    pub port: u16,
    pub is_available: bool,
}

impl ServiceProfile {
    /// Create an available profile with no addresses
    pub fn new(nf_type: NfType, nf_instance_id: impl Into<String>, nf_name: impl Into<String>, port: u16) -> Self {
        Self {
            nf_type,
            nf_instance_id: nf_instance_id.into(),
            nf_name: nf_name.into(),
            ipv4_addresses: Vec::new(),
            port,
            is_available: true,
        }
    }

    /// Add an IPv4 address
    pub fn with_ipv4(mut self, addr: impl Into<String>) -> Self {
        self.ipv4_addresses.push(addr.into());
        self
    }

    /// Set availability
    pub fn with_availability(mut self, available: bool) -> Self {
        self.is_available = available;
        self
    }
}

/// Subscriber data held by the UDR and cached by the UDM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionData {
    pub imsi: Imsi,
    pub msisdn: String,
    pub access_restricted: bool,
    pub allowed_snssais: Vec<Snssai>,
    #[serde(default)]
    pub additional_data: BTreeMap<String, String>,
}

impl SubscriptionData {
    /// Unrestricted subscription allowed on the given slices
    pub fn new(imsi: Imsi, msisdn: impl Into<String>, allowed_snssais: Vec<Snssai>) -> Self {
        Self {
            imsi,
            msisdn: msisdn.into(),
            access_restricted: false,
            allowed_snssais,
            additional_data: BTreeMap::new(),
        }
    }
}

/// Generate a fresh NF instance id
pub fn new_nf_instance_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_range() {
        assert!(!is_valid_identity(0));
        assert!(is_valid_identity(1));
        assert!(is_valid_identity(310_410_000_000_000));
        assert!(is_valid_identity(MAX_SUBSCRIBER_IDENTITY - 1));
        assert!(!is_valid_identity(MAX_SUBSCRIBER_IDENTITY));
        assert!(!is_valid_identity(u64::MAX));
    }

    #[test]
    fn test_nf_type_names() {
        assert_eq!(NfType::Amf.to_string(), "AMF");
        assert_eq!(NfType::Ran.name(), "RAN");
        assert_eq!(NfType::ALL.len(), 9);
    }

    #[test]
    fn test_session_transitions() {
        use SessionState::*;
        assert!(Activating.can_transition_to(Active));
        assert!(Active.can_transition_to(Modifying));
        assert!(Modifying.can_transition_to(Active));
        assert!(Active.can_transition_to(Deactivating));
        assert!(Deactivating.can_transition_to(Terminated));

        assert!(!Active.can_transition_to(Activating));
        assert!(!Deactivating.can_transition_to(Active));
        assert!(!Terminated.can_transition_to(Active));
        assert!(!Activating.can_transition_to(Modifying));
    }

    #[test]
    fn test_service_profile_builder() {
        let profile = ServiceProfile::new(NfType::Smf, "smf-1", "SMF-Instance-1", 8080)
            .with_ipv4("127.0.0.1")
            .with_availability(false);
        assert_eq!(profile.nf_type, NfType::Smf);
        assert_eq!(profile.ipv4_addresses, vec!["127.0.0.1".to_string()]);
        assert!(!profile.is_available);
    }

    #[test]
    fn test_new_nf_instance_id_unique() {
        let a = new_nf_instance_id();
        let b = new_nf_instance_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
