//! UDM message handling

use crate::context::UdmContext;
use crate::error::UdmError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance};

/// Response presented on behalf of a registering UE
pub const REGISTRATION_RESPONSE: &str = "dummy_response";

impl NetworkFunction for UdmContext {
    type Error = UdmError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn start(&mut self) {
        self.instance.start();
        log::info!("[{}] UDM started and ready for authentication", self.instance.name());
    }

    fn stop(&mut self) {
        self.instance.stop();
        self.clear();
        log::info!("[{}] UDM stopped", self.instance.name());
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, UdmError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);

        match &envelope.message {
            Message::AuthenticationRequest(_) => {
                log::info!(
                    "[{}] Authentication challenge request received",
                    self.instance.name()
                );
                Ok(Dispatch::Handled)
            }
            Message::RegistrationRequest(m) => {
                self.verify_authentication_response(m.imsi, REGISTRATION_RESPONSE)?;
                Ok(Dispatch::Handled)
            }
            Message::AttachRequest(_)
            | Message::DetachRequest(_)
            | Message::PduSessionEstablishmentRequest(_)
            | Message::DataTransfer(_)
            | Message::Heartbeat => {
                log::warn!(
                    "[{}] Unhandled message type: {}",
                    self.instance.name(),
                    envelope.message_type()
                );
                Ok(Dispatch::Unhandled)
            }
        }
    }
}
