//! Simulated User Equipment
//!
//! UE-side view of the scenario: radio attachment, registration state and
//! per-session traffic counters. The UE builds the messages it sends.

use nfsim_core::{GnbId, Imei, Imsi, Message, SessionId, UeId};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// UE connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UeState {
    #[default]
    Idle,
    Searching,
    Connected,
    Registered,
    Disconnected,
}

impl UeState {
    pub fn name(&self) -> &'static str {
        match self {
            UeState::Idle => "IDLE",
            UeState::Searching => "SEARCHING",
            UeState::Connected => "CONNECTED",
            UeState::Registered => "REGISTERED",
            UeState::Disconnected => "DISCONNECTED",
        }
    }
}

impl fmt::Display for UeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Simulated UE
#[derive(Debug, Clone)]
pub struct UserEquipment {
    ue_id: UeId,
    imsi: Imsi,
    imei: Imei,
    phone_number: String,
    state: UeState,
    connected_gnb: Option<GnbId>,
    current_session: Option<SessionId>,
    total_ul_data: u64,
    total_dl_data: u64,
    session_ul_data: BTreeMap<SessionId, u64>,
    session_dl_data: BTreeMap<SessionId, u64>,
    attach_time: Option<SystemTime>,
    registration_time: Option<SystemTime>,
}

impl UserEquipment {
    pub fn new(ue_id: UeId, imsi: Imsi, imei: Imei, phone_number: impl Into<String>) -> Self {
        log::info!("Creating UE: ID={}, IMSI={}", ue_id, imsi);
        Self {
            ue_id,
            imsi,
            imei,
            phone_number: phone_number.into(),
            state: UeState::Idle,
            connected_gnb: None,
            current_session: None,
            total_ul_data: 0,
            total_dl_data: 0,
            session_ul_data: BTreeMap::new(),
            session_dl_data: BTreeMap::new(),
            attach_time: None,
            registration_time: None,
        }
    }

    pub fn ue_id(&self) -> UeId {
        self.ue_id
    }

    pub fn imsi(&self) -> Imsi {
        self.imsi
    }

    pub fn imei(&self) -> Imei {
        self.imei
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn state(&self) -> UeState {
        self.state
    }

    pub fn connected_gnb(&self) -> Option<GnbId> {
        self.connected_gnb
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.current_session
    }

    pub fn attach_time(&self) -> Option<SystemTime> {
        self.attach_time
    }

    pub fn registration_time(&self) -> Option<SystemTime> {
        self.registration_time
    }

    pub fn set_state(&mut self, new_state: UeState) {
        if self.state == new_state {
            return;
        }
        log::debug!(
            "UE {} state transition: {} -> {}",
            self.ue_id,
            self.state,
            new_state
        );
        self.state = new_state;
    }

    pub fn attach_to_gnb(&mut self, gnb_id: GnbId) {
        self.connected_gnb = Some(gnb_id);
        self.set_state(UeState::Connected);
        self.attach_time = Some(SystemTime::now());
        log::info!("UE {} attached to gNodeB {}", self.ue_id, gnb_id);
    }

    pub fn detach_from_gnb(&mut self) {
        if let Some(gnb_id) = self.connected_gnb.take() {
            log::info!("UE {} detached from gNodeB {}", self.ue_id, gnb_id);
        }
        self.set_state(UeState::Disconnected);
    }

    pub fn register_at_core(&mut self) {
        self.set_state(UeState::Registered);
        self.registration_time = Some(SystemTime::now());
        log::info!("UE {} registered at core network", self.ue_id);
    }

    pub fn deregister(&mut self) {
        self.set_state(UeState::Idle);
        self.current_session = None;
        log::info!("UE {} deregistered from core network", self.ue_id);
    }

    /// Track a new session and make it current
    pub fn create_session(&mut self, session_id: SessionId) {
        self.current_session = Some(session_id);
        self.session_ul_data.insert(session_id, 0);
        self.session_dl_data.insert(session_id, 0);
        log::debug!("UE {} created session {}", self.ue_id, session_id);
    }

    pub fn activate_session(&mut self, session_id: SessionId) {
        log::debug!("UE {} activated session {}", self.ue_id, session_id);
    }

    pub fn terminate_session(&mut self, session_id: SessionId) {
        if self.current_session == Some(session_id) {
            self.current_session = None;
        }
        self.session_ul_data.remove(&session_id);
        self.session_dl_data.remove(&session_id);
        log::debug!("UE {} terminated session {}", self.ue_id, session_id);
    }

    /// Sessions the UE is tracking, in id order
    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.session_ul_data.keys().copied()
    }

    pub fn send_data(&mut self, session_id: SessionId, bytes: u32) {
        self.total_ul_data += u64::from(bytes);
        *self.session_ul_data.entry(session_id).or_insert(0) += u64::from(bytes);
        log::debug!("UE {} sent {} bytes on session {}", self.ue_id, bytes, session_id);
    }

    pub fn receive_data(&mut self, session_id: SessionId, bytes: u32) {
        self.total_dl_data += u64::from(bytes);
        *self.session_dl_data.entry(session_id).or_insert(0) += u64::from(bytes);
        log::debug!("UE {} received {} bytes on session {}", self.ue_id, bytes, session_id);
    }

    pub fn total_ul_data(&self) -> u64 {
        self.total_ul_data
    }

    pub fn total_dl_data(&self) -> u64 {
        self.total_dl_data
    }

    pub fn session_ul_data(&self, session_id: SessionId) -> u64 {
        self.session_ul_data.get(&session_id).copied().unwrap_or(0)
    }

    pub fn session_dl_data(&self, session_id: SessionId) -> u64 {
        self.session_dl_data.get(&session_id).copied().unwrap_or(0)
    }

    pub fn attach_request(&self) -> Message {
        Message::attach_request(self.imsi, self.imei)
    }

    pub fn detach_request(&self) -> Message {
        Message::detach_request()
    }

    pub fn registration_request(&self) -> Message {
        Message::registration_request(self.imsi)
    }

    pub fn pdu_session_establishment_request(&self, session_id: SessionId, dnn: &str) -> Message {
        Message::pdu_session_establishment_request(session_id, dnn)
    }

    pub fn data_transfer(&self, session_id: SessionId, data_size: u32) -> Message {
        Message::data_transfer(session_id, data_size)
    }

    /// One-line status, e.g. `UE(1000) - REGISTERED | gNB=2000 | UL=0B DL=0B`
    pub fn detailed_status(&self) -> String {
        format!(
            "UE({}) - {} | gNB={} | UL={}B DL={}B",
            self.ue_id,
            self.state,
            self.connected_gnb.unwrap_or(0),
            self.total_ul_data,
            self.total_dl_data
        )
    }

    pub fn info_report(&self) -> String {
        format!(
            "================== UE Information ==================\n\
             UE ID:              {}\n\
             IMSI:               {}\n\
             IMEI:               {}\n\
             Phone Number:       {}\n\
             State:              {}\n\
             Connected gNodeB:   {}\n\
             Current Session:    {}\n\
             Total UL Data:      {} bytes\n\
             Total DL Data:      {} bytes\n\
             ===================================================\n",
            self.ue_id,
            self.imsi,
            self.imei,
            self.phone_number,
            self.state,
            self.connected_gnb.unwrap_or(0),
            self.current_session.unwrap_or(0),
            self.total_ul_data,
            self.total_dl_data
        )
    }
}
