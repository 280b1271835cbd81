//! gNodeB message handling

use crate::context::GnbContext;
use crate::error::GnbError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance};

impl NetworkFunction for GnbContext {
    type Error = GnbError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, GnbError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);
        let ue_id = envelope.ue_id();

        match &envelope.message {
            Message::AttachRequest(_) => {
                self.connect_ue(ue_id)?;
                Ok(Dispatch::Handled)
            }
            Message::DetachRequest(_) => {
                self.disconnect_ue(ue_id);
                Ok(Dispatch::Handled)
            }
            Message::DataTransfer(m) => {
                self.update_traffic(m.data_size, 0);
                Ok(Dispatch::Handled)
            }
            Message::AuthenticationRequest(_)
            | Message::RegistrationRequest(_)
            | Message::PduSessionEstablishmentRequest(_)
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
    use nfsim_core::NfType;

    #[test]
    fn test_gnb_dispatch() {
        let _ = env_logger::try_init();
        let mut gnb = GnbContext::new(2000, "loc");
        gnb.add_cell(200_000, 100, 3500).unwrap();
        assert_eq!(gnb.nf_type(), NfType::Ran);
        assert_eq!(gnb.name(), "gNB-2000");

        let attach = Envelope::new(1, 1000, 2000, Message::attach_request(1, 2));
        assert_eq!(gnb.dispatch(&attach), Ok(Dispatch::Handled));
        assert!(gnb.is_ue_connected(1000));
        assert_eq!(
            gnb.dispatch(&attach),
            Err(GnbError::AlreadyConnected {
                gnb_id: 2000,
                ue_id: 1000
            })
        );

        let data = Envelope::new(2, 1000, 2000, Message::data_transfer(5001, 2048));
        assert_eq!(gnb.dispatch(&data), Ok(Dispatch::Handled));
        assert_eq!(gnb.total_ul_traffic(), 2048);

        let detach = Envelope::new(3, 1000, 2000, Message::detach_request());
        assert_eq!(gnb.dispatch(&detach), Ok(Dispatch::Handled));
        assert!(!gnb.is_ue_connected(1000));

        let register = Envelope::new(4, 1000, 2000, Message::registration_request(1));
        assert_eq!(gnb.dispatch(&register), Ok(Dispatch::Unhandled));
    }
}
