//! AMF message handling

use crate::context::AmfContext;
use crate::error::AmfError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance};

impl NetworkFunction for AmfContext {
    type Error = AmfError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn start(&mut self) {
        self.instance.start();
        log::info!("[{}] AMF started and ready for registration", self.instance.name());
    }

    fn stop(&mut self) {
        self.instance.stop();
        self.clear();
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, AmfError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);
        let ue_id = envelope.ue_id();

        match &envelope.message {
            Message::AttachRequest(m) => {
                self.register_ue(ue_id, m.imsi, m.imei)?;
                Ok(Dispatch::Handled)
            }
            Message::RegistrationRequest(m) => {
                self.authenticate_ue(ue_id, m.imsi)?;
                self.authorize_ue(ue_id)?;
                Ok(Dispatch::Handled)
            }
            Message::DetachRequest(_) => {
                self.deregister_ue(ue_id)?;
                Ok(Dispatch::Handled)
            }
            Message::AuthenticationRequest(_)
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
    use nfsim_core::{ActorHandle, DispatchError};

    const IMSI: u64 = 310_410_000_000_000;
    const IMEI: u64 = 354_806_000_000_000;

    #[test]
    fn test_amf_dispatch_flow() {
        let _ = env_logger::try_init();
        let mut amf = AmfContext::new();

        let attach = Envelope::new(1, 1000, 0, Message::attach_request(IMSI, IMEI));
        assert_eq!(amf.dispatch(&attach), Ok(Dispatch::Handled));
        assert!(amf.is_ue_registered(1000));

        let register = Envelope::new(2, 1000, 0, Message::registration_request(IMSI));
        assert_eq!(amf.dispatch(&register), Ok(Dispatch::Handled));
        let reg = amf.ue(1000).unwrap();
        assert!(reg.is_authenticated && reg.is_authorized);

        let detach = Envelope::new(3, 1000, 0, Message::detach_request());
        assert_eq!(amf.dispatch(&detach), Ok(Dispatch::Handled));
        assert!(!amf.is_ue_registered(1000));

        let data = Envelope::new(4, 1000, 0, Message::data_transfer(5001, 10));
        assert_eq!(amf.dispatch(&data), Ok(Dispatch::Unhandled));
    }

    #[test]
    fn test_amf_dispatch_registration_mismatch() {
        let mut amf = AmfContext::new();
        amf.register_ue(1000, IMSI, IMEI).unwrap();

        let register = Envelope::new(1, 1000, 0, Message::registration_request(IMSI + 1));
        assert_eq!(
            amf.dispatch(&register),
            Err(AmfError::IdentityMismatch { ue_id: 1000 })
        );
        assert!(!amf.ue(1000).unwrap().is_authorized);
    }

    #[test]
    fn test_amf_stop_clears_state() {
        let mut amf = AmfContext::new();
        amf.start();
        amf.register_ue(1000, IMSI, IMEI).unwrap();
        amf.handle_ue_attach(1000, 2000).unwrap();

        amf.stop();
        assert!(!amf.is_running());
        assert_eq!(amf.registered_ue_count(), 0);
        assert_eq!(amf.connected_ue_count(), 0);
    }

    #[test]
    fn test_amf_actor_request_errors() {
        let handle = ActorHandle::spawn(AmfContext::new()).unwrap();

        assert_eq!(
            handle
                .request(1000, 0, Message::attach_request(IMSI, IMEI))
                .unwrap(),
            Dispatch::Handled
        );
        assert!(matches!(
            handle.request(1000, 0, Message::attach_request(IMSI, IMEI)),
            Err(DispatchError::Nf(AmfError::Duplicate(1000)))
        ));

        let count = handle.call(|amf| amf.registered_ue_count()).unwrap();
        assert_eq!(count, 1);
    }
}
