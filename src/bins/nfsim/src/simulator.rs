//! Simulator
//!
//! Owns one actor per network function plus the simulated UEs and drives the
//! attachment, session, traffic and teardown scenarios. Every NF is reached
//! through its mailbox; the simulator never touches NF state directly.
//! Exchanges are optionally mirrored into a packet capture.

use crate::error::{SimError, SimResult};
use crate::ue::UserEquipment;
use nfsim_amf::AmfContext;
use nfsim_core::{
    ActorHandle, Dispatch, GnbId, Imei, Imsi, Message, NetworkFunction, NfType, PcapWriter,
    ServiceProfile, SessionId, SimConfig, Snssai, SubscriptionData, UeId, MAX_GNBS, MAX_UES,
};
use nfsim_gnb::GnbContext;
use nfsim_nrf::NrfContext;
use nfsim_pcf::PcfContext;
use nfsim_smf::SmfContext;
use nfsim_udm::UdmContext;
use nfsim_udr::UdrContext;
use nfsim_upf::UpfContext;
use rand::Rng;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::thread;
use std::time::Duration;

/// First UE id; UE `i` gets `FIRST_UE_ID + i`
pub const FIRST_UE_ID: UeId = 1000;
/// First gNodeB id; gNodeB `i` gets `FIRST_GNB_ID + i`
pub const FIRST_GNB_ID: GnbId = 2000;
/// Base IMSI; UE `i` gets `BASE_IMSI + i`
pub const BASE_IMSI: Imsi = 310_410_000_000_000;
/// Base IMEI; UE `i` gets `BASE_IMEI + i`
pub const BASE_IMEI: Imei = 354_806_000_000_000;
/// Cells created on every gNodeB
pub const CELLS_PER_GNB: u32 = 3;
/// Slice used for demo sessions
pub const DEMO_SNSSAI: Snssai = 1;

const GNB_LOCATIONS: [&str; 5] = ["NewYork", "LosAngeles", "Chicago", "Houston", "Phoenix"];

/// Destination id used for core NFs in envelopes
const CORE_DEST: u32 = 0;

type CaptureFile = PcapWriter<BufWriter<File>>;

/// Core NF actors
struct CoreNfs {
    nrf: ActorHandle<NrfContext>,
    amf: ActorHandle<AmfContext>,
    smf: ActorHandle<SmfContext>,
    upf: ActorHandle<UpfContext>,
    pcf: ActorHandle<PcfContext>,
    udr: ActorHandle<UdrContext>,
    udm: ActorHandle<UdmContext>,
}

/// 5G core simulator
pub struct Simulator {
    config: SimConfig,
    nfs: CoreNfs,
    gnbs: Vec<(GnbId, ActorHandle<GnbContext>)>,
    ues: Vec<UserEquipment>,
    capture: Option<CaptureFile>,
}

impl Simulator {
    /// Spawn the core NFs and publish their profiles in the NRF
    pub fn new(config: SimConfig) -> SimResult<Self> {
        log::info!("Initializing 5G Core Network Simulator");
        let defaults = &config.defaults;

        let nfs = CoreNfs {
            nrf: ActorHandle::spawn(NrfContext::new())?,
            amf: ActorHandle::spawn(AmfContext::new())?,
            smf: ActorHandle::spawn(SmfContext::new())?,
            upf: ActorHandle::spawn(UpfContext::with_default_qos(defaults.qos_rate_kbps))?,
            pcf: ActorHandle::spawn(PcfContext::with_session_policy(
                defaults.policy_bitrate_kbps,
                defaults.policy_priority,
            ))?,
            udr: ActorHandle::spawn(UdrContext::new())?,
            udm: ActorHandle::spawn(UdmContext::new())?,
        };

        let mut sim = Self {
            config,
            nfs,
            gnbs: Vec::new(),
            ues: Vec::new(),
            capture: None,
        };
        sim.register_nf_services()?;

        log::info!("5G Core Network initialized successfully");
        Ok(sim)
    }

    /// Open a capture file and mirror every exchange into it
    pub fn enable_capture(&mut self, path: &str) -> SimResult<()> {
        self.capture = Some(PcapWriter::create(path)?);
        self.log_exchange("NRF", "NRF", "INITIALIZE", "All network functions initialized");
        Ok(())
    }

    /// Best-effort capture record; write failures are logged
    fn log_exchange(&mut self, src: &str, dst: &str, msg_type: &str, details: &str) {
        if let Some(capture) = self.capture.as_mut() {
            if let Err(e) = capture.log_exchange(src, dst, msg_type, details) {
                log::warn!("Capture write failed ({}): {}", msg_type, e);
            }
        }
    }

    fn pause(&self) {
        if self.config.simulation.step_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.simulation.step_delay_ms));
        }
    }

    fn register_nf_services(&mut self) -> SimResult<()> {
        log::info!("=== Registering Network Functions ===");
        let profiles = [
            (NfType::Amf, self.nfs.amf.instance_id().to_string(), 38412),
            (NfType::Smf, self.nfs.smf.instance_id().to_string(), 8080),
            (NfType::Upf, self.nfs.upf.instance_id().to_string(), 2152),
            (NfType::Pcf, self.nfs.pcf.instance_id().to_string(), 8080),
            (NfType::Udr, self.nfs.udr.instance_id().to_string(), 8080),
            (NfType::Udm, self.nfs.udm.instance_id().to_string(), 8080),
        ];

        for (i, (nf_type, instance_id, port)) in profiles.into_iter().enumerate() {
            let profile = ServiceProfile::new(
                nf_type,
                instance_id,
                format!("{}-Instance-1", nf_type),
                port,
            )
            .with_ipv4(format!("192.168.1.{}", i + 1));

            let registered = self
                .nfs
                .nrf
                .call(move |nrf| nrf.register_nf_instance(profile))?;
            match registered {
                Ok(()) => self.log_exchange(
                    "NRF",
                    "NRF",
                    "REGISTER_NF",
                    &format!("{} registered", nf_type),
                ),
                Err(e) => log::warn!("NRF registration of {} failed: {}", nf_type, e),
            }
        }
        Ok(())
    }

    /// Create `count` gNodeBs with three cells each
    pub fn create_gnbs(&mut self, count: u32) -> SimResult<()> {
        let count = count.min(MAX_GNBS.saturating_sub(self.gnbs.len() as u32));
        let first = self.gnbs.len() as u32;

        for i in first..first + count {
            let gnb_id = FIRST_GNB_ID + i;
            let location = format!("{}_gNB_{}", GNB_LOCATIONS[i as usize % GNB_LOCATIONS.len()], i);

            let mut gnb = GnbContext::new(gnb_id, location.clone());
            for j in 0..CELLS_PER_GNB {
                if let Err(e) = gnb.add_cell(gnb_id * 100 + j, 100 + j, 3500 + j * 50) {
                    log::warn!("Cell {} not added: {}", j, e);
                }
            }
            self.gnbs.push((gnb_id, ActorHandle::spawn(gnb)?));

            log::info!("Created gNodeB: ID={}, Location={}", gnb_id, location);
            self.log_exchange(
                "GNB",
                "GNB",
                "CREATE_GNB",
                &format!("gNodeB Created | ID:{} | Location:{} | Cells:{}", gnb_id, location, CELLS_PER_GNB),
            );
        }
        Ok(())
    }

    /// Create `count` UEs with consecutive identities
    pub fn create_ues(&mut self, count: u32) {
        let count = count.min(MAX_UES.saturating_sub(self.ues.len() as u32));
        let first = self.ues.len() as u32;

        for i in first..first + count {
            let ue_id = FIRST_UE_ID + i;
            let imsi = BASE_IMSI + u64::from(i);
            let imei = BASE_IMEI + u64::from(i);
            let phone = format!("+1-234-567-{:05}", 89000 + i);

            self.log_exchange(
                "UE",
                "GNB",
                "CREATE_UE",
                &format!("UE Created | ID:{} | IMSI:{} | IMEI:{}", ue_id, imsi, imei),
            );
            self.ues.push(UserEquipment::new(ue_id, imsi, imei, phone));
        }
    }

    pub fn ues(&self) -> &[UserEquipment] {
        &self.ues
    }

    pub fn ue(&self, ue_id: UeId) -> Option<&UserEquipment> {
        self.ues.iter().find(|ue| ue.ue_id() == ue_id)
    }

    fn ue_index(&self, ue_id: UeId) -> SimResult<usize> {
        self.ues
            .iter()
            .position(|ue| ue.ue_id() == ue_id)
            .ok_or(SimError::UnknownUe(ue_id))
    }

    fn gnb_index(&self, gnb_id: GnbId) -> SimResult<usize> {
        self.gnbs
            .iter()
            .position(|(id, _)| *id == gnb_id)
            .ok_or(SimError::UnknownGnb(gnb_id))
    }

    pub fn gnb_ids(&self) -> Vec<GnbId> {
        self.gnbs.iter().map(|(id, _)| *id).collect()
    }

    pub fn amf(&self) -> &ActorHandle<AmfContext> {
        &self.nfs.amf
    }

    pub fn smf(&self) -> &ActorHandle<SmfContext> {
        &self.nfs.smf
    }

    pub fn upf(&self) -> &ActorHandle<UpfContext> {
        &self.nfs.upf
    }

    pub fn pcf(&self) -> &ActorHandle<PcfContext> {
        &self.nfs.pcf
    }

    pub fn udr(&self) -> &ActorHandle<UdrContext> {
        &self.nfs.udr
    }

    pub fn udm(&self) -> &ActorHandle<UdmContext> {
        &self.nfs.udm
    }

    pub fn nrf(&self) -> &ActorHandle<NrfContext> {
        &self.nfs.nrf
    }

    pub fn gnb(&self, gnb_id: GnbId) -> SimResult<&ActorHandle<GnbContext>> {
        Ok(&self.gnbs[self.gnb_index(gnb_id)?].1)
    }

    /// Deliver a message and wait for the verdict. NF rejections become
    /// [`SimError::Rejected`].
    fn deliver<N: NetworkFunction>(
        handle: &ActorHandle<N>,
        source: u32,
        dest: u32,
        message: Message,
    ) -> SimResult<Dispatch> {
        handle
            .request(source, dest, message)
            .map_err(|e| SimError::from_dispatch(handle.name(), e))
    }

    /// Attach every UE to a gNodeB (round robin) and register it at the core.
    ///
    /// A UE the network rejects is logged and skipped. Returns the number of
    /// UEs that reached `Registered`.
    pub fn attach_all(&mut self) -> SimResult<usize> {
        log::info!("=== Simulating UE Attachment ===");
        if self.gnbs.is_empty() {
            log::warn!("No gNodeBs available for attachment");
            return Ok(0);
        }

        let gnb_ids = self.gnb_ids();
        let ue_ids: Vec<UeId> = self.ues.iter().map(UserEquipment::ue_id).collect();
        let mut registered = 0;

        for (i, ue_id) in ue_ids.into_iter().enumerate() {
            let gnb_id = gnb_ids[i % gnb_ids.len()];
            match self.attach_ue(ue_id, gnb_id) {
                Ok(()) => registered += 1,
                Err(e) if e.is_rejection() => log::warn!("UE {} attachment failed: {}", ue_id, e),
                Err(e) => return Err(e),
            }
            self.pause();
        }
        Ok(registered)
    }

    /// Attach one UE to `gnb_id`, then register, authenticate and authorize it.
    ///
    /// The AMF registers the UE before the gNodeB connects it. A rejection at
    /// any later step disconnects the UE again and drops its AMF registration
    /// and auth context, so the UE itself is only updated once every NF has
    /// accepted it.
    pub fn attach_ue(&mut self, ue_id: UeId, gnb_id: GnbId) -> SimResult<()> {
        let idx = self.ue_index(ue_id)?;
        let gnb_idx = self.gnb_index(gnb_id)?;
        let (imsi, imei) = (self.ues[idx].imsi(), self.ues[idx].imei());

        // Registration at the AMF
        let attach = self.ues[idx].attach_request();
        Self::deliver(&self.nfs.amf, ue_id, CORE_DEST, attach.clone())?;
        self.log_exchange(
            "GNB",
            "AMF",
            "REGISTRATION_REQUEST",
            &format!("UE Registration | IMSI:{} | IMEI:{}", imsi, imei),
        );

        // Radio side
        if let Err(e) = Self::deliver(&self.gnbs[gnb_idx].1, ue_id, gnb_id, attach) {
            self.rollback_attach(ue_id, imsi, None);
            return Err(e);
        }
        self.log_exchange(
            "UE",
            "GNB",
            "ATTACH_REQUEST",
            &format!("UE Attach Request | UE:{} | gNodeB:{}", ue_id, gnb_id),
        );

        if let Err(e) = self.register_at_core(idx, gnb_id) {
            self.rollback_attach(ue_id, imsi, Some(gnb_idx));
            return Err(e);
        }

        let ue = &mut self.ues[idx];
        ue.attach_to_gnb(gnb_id);
        ue.register_at_core();
        self.log_exchange(
            "UE",
            "CORE",
            "STATE_CHANGE",
            "UE State | Old: CONNECTED | New: REGISTERED",
        );
        Ok(())
    }

    /// Authentication, registration and subscription storage for a UE the
    /// AMF and gNodeB have already accepted
    fn register_at_core(&mut self, idx: usize, gnb_id: GnbId) -> SimResult<()> {
        let ue_id = self.ues[idx].ue_id();
        let imsi = self.ues[idx].imsi();
        let phone = self.ues[idx].phone_number().to_string();

        // Authentication: the UDM issues a challenge and verifies the answer
        let challenge = self
            .nfs
            .udm
            .call(move |udm| udm.generate_authentication_challenge(imsi))?;
        Self::deliver(
            &self.nfs.udm,
            ue_id,
            CORE_DEST,
            Message::authentication_request(challenge),
        )?;
        self.log_exchange(
            "AMF",
            "UDM",
            "AUTHENTICATION_REQUEST",
            &format!("Auth Challenge | IMSI:{}", imsi),
        );

        let register = self.ues[idx].registration_request();
        Self::deliver(&self.nfs.udm, ue_id, CORE_DEST, register.clone())?;
        Self::deliver(&self.nfs.amf, ue_id, CORE_DEST, register.clone())?;
        Self::deliver(&self.nfs.udr, ue_id, CORE_DEST, register)?;
        self.log_exchange(
            "UDM",
            "AMF",
            "AUTHENTICATION_RESPONSE",
            "Auth Response | Challenge Verified",
        );

        self.nfs
            .amf
            .call(move |amf| amf.handle_ue_attach(ue_id, gnb_id))?
            .map_err(|e| SimError::rejected("AMF", e))?;
        self.log_exchange(
            "AMF",
            "UE",
            "ATTACH_ACCEPT",
            &format!("UE Attach Accepted | UE:{}", ue_id),
        );

        // Subscription record; a record left from an earlier registration is kept
        let msisdn = phone.clone();
        let stored = self.nfs.udr.call(move |udr| {
            udr.store_subscription_data(imsi, SubscriptionData::new(imsi, msisdn, vec![DEMO_SNSSAI]))
        })?;
        if let Err(e) = stored {
            log::debug!("Subscription for UE {} not stored: {}", ue_id, e);
        }
        self.log_exchange(
            "AMF",
            "UDR",
            "STORE_UE_DATA",
            &format!("Subscription Data | IMSI:{} | MSISDN:{}", imsi, phone),
        );
        Ok(())
    }

    /// Undo a partial attach: the gNodeB that connected the UE (if any)
    /// disconnects it, and the AMF and UDM forget it. Best effort.
    fn rollback_attach(&self, ue_id: UeId, imsi: Imsi, gnb_idx: Option<usize>) {
        log::warn!("Rolling back attachment of UE {}", ue_id);
        if let Some(gnb_idx) = gnb_idx {
            let (gnb_id, gnb) = &self.gnbs[gnb_idx];
            if let Err(e) = gnb.request(ue_id, *gnb_id, Message::detach_request()) {
                log::warn!("gNodeB {} kept UE {}: {}", gnb_id, ue_id, e);
            }
        }
        if let Err(e) = self.nfs.amf.request(ue_id, CORE_DEST, Message::detach_request()) {
            log::warn!("AMF kept UE {}: {}", ue_id, e);
        }
        if let Err(e) = self.nfs.udm.call(move |udm| udm.destroy_auth_context(imsi)) {
            log::warn!("UDM kept auth context of UE {}: {}", ue_id, e);
        }
    }

    /// Establish `simulation.sessions` sessions for every registered UE.
    /// Returns the established session ids.
    pub fn establish_sessions(&mut self) -> SimResult<Vec<SessionId>> {
        log::info!("=== Simulating PDU Session Establishment ===");
        let per_ue = self.config.simulation.sessions;
        let ue_ids: Vec<UeId> = self
            .ues
            .iter()
            .filter(|ue| ue.state() == crate::ue::UeState::Registered)
            .map(UserEquipment::ue_id)
            .collect();

        let mut sessions = Vec::new();
        for ue_id in ue_ids {
            for _ in 0..per_ue {
                match self.establish_session(ue_id) {
                    Ok(id) => sessions.push(id),
                    Err(e) if e.is_rejection() => {
                        log::warn!("Session establishment for UE {} failed: {}", ue_id, e)
                    }
                    Err(e) => return Err(e),
                }
            }
            self.pause();
        }
        Ok(sessions)
    }

    /// Create and activate a session at the SMF, install its policy at the
    /// PCF and attach it to the UPF with the policy bitrate
    pub fn establish_session(&mut self, ue_id: UeId) -> SimResult<SessionId> {
        let idx = self.ue_index(ue_id)?;
        let dnn = self.config.defaults.dnn.clone();

        let smf_dnn = dnn.clone();
        let session_id = self
            .nfs
            .smf
            .call(move |smf| {
                let id = smf.create_pdu_session(ue_id, &smf_dnn, DEMO_SNSSAI);
                smf.activate_pdu_session(id).map(|()| id)
            })?
            .map_err(|e| SimError::rejected("SMF", e))?;
        self.log_exchange(
            "AMF",
            "SMF",
            "PDU_SESSION_CREATE",
            &format!("Create PDU Session | Session:{} | UE:{} | DNN:{}", session_id, ue_id, dnn),
        );

        let policy_id = self
            .nfs
            .pcf
            .call(move |pcf| pcf.install_session_policy(ue_id, session_id))?;
        let bitrate = self.config.defaults.policy_bitrate_kbps;
        self.log_exchange(
            "SMF",
            "PCF",
            "POLICY_CREATE_REQUEST",
            &format!(
                "Create Policy | ID:{} | Session:{} | BitRate:{}Kbps | Priority:{}",
                policy_id, session_id, bitrate, self.config.defaults.policy_priority
            ),
        );

        self.nfs
            .upf
            .call(move |upf| {
                upf.attach_pdu_session(session_id, ue_id)
                    .map(|()| upf.set_qos(session_id, bitrate))
            })?
            .map_err(|e| SimError::rejected("UPF", e))?;
        self.log_exchange(
            "SMF",
            "UPF",
            "SESSION_ESTABLISHMENT",
            &format!("PDU Session Established | Session:{} | QoS:{}Kbps | UE:{}", session_id, bitrate, ue_id),
        );

        let ue = &mut self.ues[idx];
        ue.create_session(session_id);
        ue.activate_session(session_id);
        self.log_exchange(
            "UPF",
            "UE",
            "SESSION_ACTIVE",
            &format!("PDU Session Now ACTIVE | Session:{}", session_id),
        );
        Ok(session_id)
    }

    /// Send `size` bytes uplink on the UE's current session. The gNodeB, SMF
    /// and UPF each account for it; the PCF charges it.
    pub fn send_uplink(&mut self, ue_id: UeId, size: u32) -> SimResult<SessionId> {
        let idx = self.ue_index(ue_id)?;
        let ue = &self.ues[idx];
        let session_id = ue.current_session().ok_or(SimError::NoSession(ue_id))?;
        let message = ue.data_transfer(session_id, size);

        if let Some(gnb_id) = ue.connected_gnb() {
            let gnb = self.gnb(gnb_id)?;
            gnb.post(ue_id, gnb_id, message.clone())?;
        }
        self.nfs.smf.post(ue_id, CORE_DEST, message.clone())?;
        self.nfs.upf.post(ue_id, CORE_DEST, message)?;
        self.ues[idx].send_data(session_id, size);
        self.log_exchange(
            "GNB",
            "UPF",
            "UPLINK_FORWARD",
            &format!("Forward Uplink | Size:{} bytes | Session:{}", size, session_id),
        );

        let charge = self
            .nfs
            .pcf
            .call(move |pcf| pcf.record_charging_event(ue_id, session_id, u64::from(size)))?;
        self.log_exchange(
            "UPF",
            "PCF",
            "CHARGING_RECORD",
            &format!("Charging Event | Volume:{} bytes | UE:{} | Charge:{}", size, ue_id, charge),
        );
        Ok(session_id)
    }

    /// Deliver `size` bytes downlink to the UE on its current session
    pub fn send_downlink(&mut self, ue_id: UeId, size: u32) -> SimResult<SessionId> {
        let idx = self.ue_index(ue_id)?;
        let session_id = self.ues[idx]
            .current_session()
            .ok_or(SimError::NoSession(ue_id))?;

        let forwarded = self
            .nfs
            .upf
            .call(move |upf| upf.forward_downlink_packet(session_id, size))?;
        if !forwarded {
            return Err(SimError::UnknownSession(session_id));
        }
        self.nfs
            .smf
            .call(move |smf| smf.record_downlink(session_id, u64::from(size)))?;
        if let Some(gnb_id) = self.ues[idx].connected_gnb() {
            self.gnb(gnb_id)?
                .call(move |gnb| gnb.update_traffic(0, size))?;
        }

        self.ues[idx].receive_data(session_id, size);
        self.log_exchange(
            "CORE",
            "UE",
            "DATA_TRANSFER_DL",
            &format!("Downlink Data | Size:{} bytes | Session:{}", size, session_id),
        );
        Ok(session_id)
    }

    /// One round of random-sized uplink and downlink traffic for every UE
    /// with a session
    pub fn simulate_data_transfer(&mut self) -> SimResult<()> {
        log::info!("=== Simulating Data Transfer ===");
        let ue_ids: Vec<UeId> = self
            .ues
            .iter()
            .filter(|ue| ue.current_session().is_some())
            .map(UserEquipment::ue_id)
            .collect();

        let mut rng = rand::rng();
        for ue_id in ue_ids {
            let ul = 1024 * rng.random_range(0..100u32);
            let dl = 1024 * rng.random_range(0..100u32);
            self.send_uplink(ue_id, ul)?;
            self.send_downlink(ue_id, dl)?;
            self.pause();
        }
        Ok(())
    }

    /// Move a UE between gNodeBs. The AMF decides; on success the radio side
    /// follows. If the target gNodeB refuses the UE, the AMF is moved back
    /// and the source gNodeB keeps it.
    pub fn handover(&mut self, ue_id: UeId, source: GnbId, target: GnbId) -> SimResult<()> {
        let idx = self.ue_index(ue_id)?;
        let target_idx = self.gnb_index(target)?;

        self.nfs
            .amf
            .call(move |amf| amf.handle_handover(ue_id, source, target))?
            .map_err(|e| SimError::rejected("AMF", e))?;

        let attach = self.ues[idx].attach_request();
        if let Err(e) = Self::deliver(&self.gnbs[target_idx].1, ue_id, target, attach) {
            let reverted = self
                .nfs
                .amf
                .call(move |amf| amf.handle_handover(ue_id, target, source))?;
            if let Err(revert) = reverted {
                log::warn!("AMF handover of UE {} not reverted: {}", ue_id, revert);
            }
            return Err(e);
        }
        if let Ok(source_idx) = self.gnb_index(source) {
            Self::deliver(&self.gnbs[source_idx].1, ue_id, source, Message::detach_request())?;
        }

        self.ues[idx].attach_to_gnb(target);
        self.ues[idx].register_at_core();
        self.log_exchange(
            "AMF",
            "GNB",
            "HANDOVER",
            &format!("Handover | UE:{} | {} -> {}", ue_id, source, target),
        );
        Ok(())
    }

    /// Tear down a UE: its sessions are terminated at the SMF, detached from
    /// the UPF and their policies removed at the PCF, then the AMF and gNodeB
    /// forget it
    pub fn deregister_ue(&mut self, ue_id: UeId) -> SimResult<()> {
        let idx = self.ue_index(ue_id)?;

        let sessions: Vec<SessionId> = self
            .nfs
            .smf
            .call(move |smf| smf.ue_sessions(ue_id).to_vec())?;
        for session_id in sessions {
            let terminated = self
                .nfs
                .smf
                .call(move |smf| smf.terminate_pdu_session(session_id))?;
            if let Err(e) = terminated {
                log::warn!("Session {} not terminated: {}", session_id, e);
            }
            self.nfs
                .upf
                .call(move |upf| upf.detach_pdu_session(session_id))?;
            self.nfs
                .pcf
                .call(move |pcf| pcf.remove_policies_for_session(session_id))?;
            self.ues[idx].terminate_session(session_id);
        }

        let detach = self.ues[idx].detach_request();
        Self::deliver(&self.nfs.amf, ue_id, CORE_DEST, detach.clone())?;
        if let Some(gnb_id) = self.ues[idx].connected_gnb() {
            let gnb_idx = self.gnb_index(gnb_id)?;
            Self::deliver(&self.gnbs[gnb_idx].1, ue_id, gnb_id, detach)?;
        }

        let imsi = self.ues[idx].imsi();
        self.nfs.udm.call(move |udm| udm.destroy_auth_context(imsi))?;

        self.ues[idx].detach_from_gnb();
        self.ues[idx].deregister();
        self.log_exchange(
            "UE",
            "AMF",
            "DETACH_REQUEST",
            &format!("UE Detach | UE:{}", ue_id),
        );
        Ok(())
    }

    /// Summary of every NF and the first few UEs and gNodeBs
    pub fn status_report(&self) -> SimResult<String> {
        let mut out = String::new();
        let running = |r: bool| if r { "Running" } else { "Stopped" };

        let nrf = self.nfs.nrf.call(|nrf| (nrf.is_running(), nrf.total_instance_count()))?;
        let amf = self.nfs.amf.call(|amf| (amf.is_running(), amf.registered_ue_count()))?;
        let smf = self.nfs.smf.call(|smf| (smf.is_running(), smf.active_session_count()))?;
        let upf = self.nfs.upf.call(|upf| (upf.is_running(), upf.attached_session_count()))?;
        let pcf = self.nfs.pcf.call(|pcf| (pcf.is_running(), pcf.active_policy_count()))?;
        let udr = self.nfs.udr.call(|udr| (udr.is_running(), udr.subscription_count()))?;
        let udm = self.nfs.udm.call(|udm| (udm.is_running(), udm.active_auth_context_count()))?;

        let _ = writeln!(out, "=== Network Functions ===");
        let _ = writeln!(out, "NRF: {} | Registered NFs: {}", running(nrf.0), nrf.1);
        let _ = writeln!(out, "AMF: {} | Registered UEs: {}", running(amf.0), amf.1);
        let _ = writeln!(out, "SMF: {} | Active Sessions: {}", running(smf.0), smf.1);
        let _ = writeln!(out, "UPF: {} | Attached Sessions: {}", running(upf.0), upf.1);
        let _ = writeln!(out, "PCF: {} | Active Policies: {}", running(pcf.0), pcf.1);
        let _ = writeln!(out, "UDR: {} | Subscriptions: {}", running(udr.0), udr.1);
        let _ = writeln!(out, "UDM: {} | Auth Contexts: {}", running(udm.0), udm.1);

        let _ = writeln!(out, "=== Infrastructure ===");
        let _ = writeln!(out, "UEs: {} | gNodeBs: {}", self.ues.len(), self.gnbs.len());
        for ue in self.ues.iter().take(5) {
            let _ = writeln!(out, "  {}", ue.detailed_status());
        }
        if self.ues.len() > 5 {
            let _ = writeln!(out, "  ... and {} more UEs", self.ues.len() - 5);
        }
        for (_, gnb) in self.gnbs.iter().take(3) {
            let _ = writeln!(out, "  {}", gnb.call(|g| g.detailed_status())?);
        }
        Ok(out)
    }

    /// Full per-NF reports
    pub fn detailed_report(&self) -> SimResult<String> {
        let mut out = String::new();
        out.push_str(&self.nfs.nrf.call(|nrf| nrf.directory_report())?);
        out.push_str(&self.nfs.amf.call(|amf| amf.registered_ues_report())?);
        out.push_str(&self.nfs.smf.call(|smf| smf.sessions_report())?);
        out.push_str(&self.nfs.upf.call(|upf| upf.session_metrics_report())?);
        out.push_str(&self.nfs.pcf.call(|pcf| pcf.policies_report())?);
        out.push_str(&self.nfs.udr.call(|udr| udr.stored_data_report())?);
        out.push_str(&self.nfs.udm.call(|udm| udm.authentication_status_report())?);
        if let Some((_, gnb)) = self.gnbs.first() {
            out.push_str(&gnb.call(|g| g.info_report())?);
        }
        if let Some(ue) = self.ues.first() {
            out.push_str(&ue.info_report());
        }
        Ok(out)
    }

    /// Number of capture records written so far
    pub fn captured_packets(&self) -> u64 {
        self.capture.as_ref().map_or(0, PcapWriter::packet_count)
    }

    /// Stop every NF and flush the capture
    pub fn shutdown(self) -> SimResult<()> {
        log::info!("Shutting down simulator...");
        let Self { nfs, gnbs, capture, .. } = self;

        nfs.nrf.shutdown()?;
        nfs.amf.shutdown()?;
        nfs.smf.shutdown()?;
        nfs.upf.shutdown()?;
        nfs.pcf.shutdown()?;
        nfs.udr.shutdown()?;
        nfs.udm.shutdown()?;
        for (_, gnb) in gnbs {
            gnb.shutdown()?;
        }

        if let Some(capture) = capture {
            let packets = capture.packet_count();
            capture.into_inner()?;
            log::info!("Packet capture closed ({} packets)", packets);
        }

        log::info!("Simulator shut down successfully");
        Ok(())
    }
}
