//! NF Message Definitions
//!
//! Typed messages exchanged between network functions. Every message kind is a
//! variant of [`Message`] carrying its own payload struct, so dispatchers match
//! on the variant instead of inspecting a tag and downcasting.

use crate::types::{Imei, Imsi, SessionId, UeId};
use std::fmt;
use std::time::SystemTime;

/// Message kinds known to the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    UeAttachRequest = 0,
    UeAttachAccept,
    UeDetachRequest,
    UeDetachAccept,
    AuthenticationRequest,
    AuthenticationResponse,
    SecurityModeCommand,
    SecurityModeComplete,
    RegistrationRequest,
    RegistrationAccept,
    ServiceRequest,
    ServiceAccept,
    PduSessionEstablishmentRequest,
    PduSessionEstablishmentAccept,
    PduSessionReleaseRequest,
    PduSessionReleaseComplete,
    DataTransfer,
    Heartbeat,
    Error,
}

impl MessageType {
    /// Get the name of the message type
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::UeAttachRequest => "UE_ATTACH_REQUEST",
            MessageType::UeAttachAccept => "UE_ATTACH_ACCEPT",
            MessageType::UeDetachRequest => "UE_DETACH_REQUEST",
            MessageType::UeDetachAccept => "UE_DETACH_ACCEPT",
            MessageType::AuthenticationRequest => "AUTHENTICATION_REQUEST",
            MessageType::AuthenticationResponse => "AUTHENTICATION_RESPONSE",
            MessageType::SecurityModeCommand => "SECURITY_MODE_COMMAND",
            MessageType::SecurityModeComplete => "SECURITY_MODE_COMPLETE",
            MessageType::RegistrationRequest => "REGISTRATION_REQUEST",
            MessageType::RegistrationAccept => "REGISTRATION_ACCEPT",
            MessageType::ServiceRequest => "SERVICE_REQUEST",
            MessageType::ServiceAccept => "SERVICE_ACCEPT",
            MessageType::PduSessionEstablishmentRequest => "PDU_SESSION_ESTABLISHMENT_REQUEST",
            MessageType::PduSessionEstablishmentAccept => "PDU_SESSION_ESTABLISHMENT_ACCEPT",
            MessageType::PduSessionReleaseRequest => "PDU_SESSION_RELEASE_REQUEST",
            MessageType::PduSessionReleaseComplete => "PDU_SESSION_RELEASE_COMPLETE",
            MessageType::DataTransfer => "DATA_TRANSFER",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::Error => "ERROR",
        }
    }

    /// Numeric code used in capture records
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// UE attach request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    pub imsi: Imsi,
    pub imei: Imei,
}

/// UE detach request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachRequest;

/// Authentication request carrying the network challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    pub challenge: String,
}

/// Registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub imsi: Imsi,
}

/// PDU session establishment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduSessionEstablishmentRequest {
    pub session_id: SessionId,
    pub dnn: String,
}

/// User data transfer on a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTransfer {
    pub session_id: SessionId,
    pub data_size: u32,
}

/// Message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    AttachRequest(AttachRequest),
    DetachRequest(DetachRequest),
    AuthenticationRequest(AuthenticationRequest),
    RegistrationRequest(RegistrationRequest),
    PduSessionEstablishmentRequest(PduSessionEstablishmentRequest),
    DataTransfer(DataTransfer),
    Heartbeat,
}

impl Message {
    pub fn attach_request(imsi: Imsi, imei: Imei) -> Self {
        Message::AttachRequest(AttachRequest { imsi, imei })
    }

    pub fn detach_request() -> Self {
        Message::DetachRequest(DetachRequest)
    }

    pub fn authentication_request(challenge: impl Into<String>) -> Self {
        Message::AuthenticationRequest(AuthenticationRequest {
            challenge: challenge.into(),
        })
    }

    pub fn registration_request(imsi: Imsi) -> Self {
        Message::RegistrationRequest(RegistrationRequest { imsi })
    }

    pub fn pdu_session_establishment_request(session_id: SessionId, dnn: impl Into<String>) -> Self {
        Message::PduSessionEstablishmentRequest(PduSessionEstablishmentRequest {
            session_id,
            dnn: dnn.into(),
        })
    }

    pub fn data_transfer(session_id: SessionId, data_size: u32) -> Self {
        Message::DataTransfer(DataTransfer {
            session_id,
            data_size,
        })
    }

    /// Get the message kind
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::AttachRequest(_) => MessageType::UeAttachRequest,
            Message::DetachRequest(_) => MessageType::UeDetachRequest,
            Message::AuthenticationRequest(_) => MessageType::AuthenticationRequest,
            Message::RegistrationRequest(_) => MessageType::RegistrationRequest,
            Message::PduSessionEstablishmentRequest(_) => MessageType::PduSessionEstablishmentRequest,
            Message::DataTransfer(_) => MessageType::DataTransfer,
            Message::Heartbeat => MessageType::Heartbeat,
        }
    }
}

/// Message with routing header
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Sequence number assigned by the sender
    pub message_id: u32,
    /// Source entity (UE id for device-originated messages)
    pub source: u32,
    /// Destination entity
    pub dest: u32,
    pub timestamp: SystemTime,
    pub message: Message,
}

impl Envelope {
    /// Create an envelope stamped with the current time
    pub fn new(message_id: u32, source: u32, dest: u32, message: Message) -> Self {
        Self {
            message_id,
            source,
            dest,
            timestamp: SystemTime::now(),
            message,
        }
    }

    /// Source interpreted as a UE id
    pub fn ue_id(&self) -> UeId {
        self.source
    }

    pub fn message_type(&self) -> MessageType {
        self.message.message_type()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Message::AttachRequest(m) => {
                write!(f, "AttachRequest(UE={}, IMSI={})", self.source, m.imsi)
            }
            Message::DetachRequest(_) => write!(f, "DetachRequest(UE={})", self.source),
            Message::AuthenticationRequest(_) => {
                write!(f, "AuthenticationRequest(UE={})", self.source)
            }
            Message::RegistrationRequest(m) => {
                write!(f, "RegistrationRequest(UE={}, IMSI={})", self.source, m.imsi)
            }
            Message::PduSessionEstablishmentRequest(m) => write!(
                f,
                "PduSessionEstablishmentRequest(UE={}, Session={}, DNN={})",
                self.source, m.session_id, m.dnn
            ),
            Message::DataTransfer(m) => write!(
                f,
                "DataTransfer(UE={}, Session={}, Size={}B)",
                self.source, m.session_id, m.data_size
            ),
            Message::Heartbeat => write!(f, "Heartbeat(from={})", self.source),
        }
    }
}
