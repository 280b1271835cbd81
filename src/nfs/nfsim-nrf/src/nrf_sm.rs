//! NRF message handling

use crate::context::NrfContext;
use crate::error::NrfError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance};

impl NetworkFunction for NrfContext {
    type Error = NrfError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn start(&mut self) {
        self.instance.start();
        log::info!("[{}] NRF started and ready for service discovery", self.instance.name());
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, NrfError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);

        match &envelope.message {
            Message::AttachRequest(_) => {
                log::info!(
                    "[{}] Processing attachment request from UE {}",
                    self.instance.name(),
                    envelope.ue_id()
                );
                Ok(Dispatch::Handled)
            }
            Message::DetachRequest(_)
            | Message::AuthenticationRequest(_)
            | Message::RegistrationRequest(_)
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

#[cfg(test)]
mod tests {
    use super::*;
    use nfsim_core::{ActorHandle, NfType, ServiceProfile};

    #[test]
    fn test_nrf_dispatch() {
        let _ = env_logger::try_init();
        let mut nrf = NrfContext::new();

        let attach = Envelope::new(1, 1000, 0, Message::attach_request(1, 2));
        assert_eq!(nrf.dispatch(&attach), Ok(Dispatch::Handled));

        let heartbeat = Envelope::new(2, 1000, 0, Message::Heartbeat);
        assert_eq!(nrf.dispatch(&heartbeat), Ok(Dispatch::Unhandled));
    }

    #[test]
    fn test_nrf_start_stop() {
        let mut nrf = NrfContext::new();
        assert_eq!(nrf.nf_type(), NfType::Nrf);
        assert_eq!(nrf.name(), "NRF");
        assert!(!nrf.is_running());

        nrf.start();
        assert!(nrf.is_running());
        assert_eq!(nrf.status(), "NRF (Running)");

        nrf.stop();
        assert!(!nrf.is_running());
    }

    #[test]
    fn test_nrf_as_actor() {
        let handle = ActorHandle::spawn(NrfContext::new()).unwrap();

        let registered = handle
            .call(|nrf| {
                nrf.register_nf_instance(ServiceProfile::new(NfType::Amf, "amf-1", "AMF-1", 8080))
            })
            .unwrap();
        assert!(registered.is_ok());

        assert_eq!(
            handle.request(1000, 0, Message::attach_request(1, 2)).unwrap(),
            Dispatch::Handled
        );

        let nrf = handle.shutdown().unwrap();
        assert_eq!(nrf.nf_instance_count(NfType::Amf), 1);
        assert!(!nrf.is_running());
    }
}
