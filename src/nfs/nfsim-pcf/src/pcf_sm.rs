//! PCF message handling

use crate::context::PcfContext;
use crate::error::PcfError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance};

impl NetworkFunction for PcfContext {
    type Error = PcfError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn start(&mut self) {
        self.instance.start();
        log::info!("[{}] PCF started and ready for policy management", self.instance.name());
    }

    fn stop(&mut self) {
        self.instance.stop();
        self.clear();
        log::info!("[{}] PCF stopped", self.instance.name());
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, PcfError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);

        match &envelope.message {
            Message::PduSessionEstablishmentRequest(m) => {
                // The SMF owns session ids; policies are installed with
                // install_session_policy once it has assigned one
                log::debug!(
                    "[{}] Establishment request for session {} left to the SMF",
                    self.instance.name(),
                    m.session_id
                );
                Ok(Dispatch::Unhandled)
            }
            Message::AttachRequest(_)
            | Message::DetachRequest(_)
            | Message::AuthenticationRequest(_)
            | Message::RegistrationRequest(_)
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
