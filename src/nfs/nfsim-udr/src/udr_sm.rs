//! UDR message handling

use crate::context::UdrContext;
use crate::error::UdrError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance};

impl NetworkFunction for UdrContext {
    type Error = UdrError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn start(&mut self) {
        self.instance.start();
        log::info!("[{}] UDR started and ready for data management", self.instance.name());
    }

    fn stop(&mut self) {
        self.instance.stop();
        self.clear();
        log::info!("[{}] UDR stopped", self.instance.name());
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, UdrError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);

        match &envelope.message {
            Message::RegistrationRequest(m) => {
                // Lookup only; a missing record is logged by the lookup itself
                let _ = self.subscription_data(m.imsi);
                Ok(Dispatch::Handled)
            }
            Message::AttachRequest(_)
            | Message::DetachRequest(_)
            | Message::AuthenticationRequest(_)
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
    use nfsim_core::SubscriptionData;

    #[test]
    fn test_udr_registration_lookup() {
        let _ = env_logger::try_init();
        let mut udr = UdrContext::new();
        udr.store_subscription_data(1, SubscriptionData::new(1, "+1", vec![1]))
            .unwrap();

        let known = Envelope::new(1, 1000, 0, Message::registration_request(1));
        assert_eq!(udr.dispatch(&known), Ok(Dispatch::Handled));

        let unknown = Envelope::new(2, 1000, 0, Message::registration_request(2));
        assert_eq!(udr.dispatch(&unknown), Ok(Dispatch::Handled));

        let attach = Envelope::new(3, 1000, 0, Message::attach_request(1, 1));
        assert_eq!(udr.dispatch(&attach), Ok(Dispatch::Unhandled));
    }

    #[test]
    fn test_udr_stop_clears_stores() {
        let mut udr = UdrContext::new();
        udr.start();
        udr.store_subscription_data(1, SubscriptionData::default()).unwrap();
        udr.store_access_info(1, "ok");

        udr.stop();
        assert_eq!(udr.subscription_count(), 0);
        assert!(udr.access_info(1).is_none());
    }
}
