//! SMF message handling

use crate::context::SmfContext;
use crate::error::SmfError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance, Snssai};

/// Slice assigned to sessions established through the message path
pub const DEFAULT_SNSSAI: Snssai = 1;

impl NetworkFunction for SmfContext {
    type Error = SmfError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn start(&mut self) {
        self.instance.start();
        log::info!("[{}] SMF started and ready for session management", self.instance.name());
    }

    fn stop(&mut self) {
        self.instance.stop();
        self.clear();
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, SmfError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);

        match &envelope.message {
            Message::PduSessionEstablishmentRequest(m) => {
                // The SMF assigns the id; the one carried in the request is ignored
                let session_id = self.create_pdu_session(envelope.ue_id(), &m.dnn, DEFAULT_SNSSAI);
                self.activate_pdu_session(session_id)?;
                Ok(Dispatch::Handled)
            }
            Message::DataTransfer(m) => {
                if !self.record_uplink(m.session_id, u64::from(m.data_size)) {
                    log::debug!(
                        "[{}] Uplink for unknown session {} ignored",
                        self.instance.name(),
                        m.session_id
                    );
                }
                Ok(Dispatch::Handled)
            }
            Message::AttachRequest(_)
            | Message::DetachRequest(_)
            | Message::AuthenticationRequest(_)
            | Message::RegistrationRequest(_)
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
    use nfsim_core::SessionState;

    #[test]
    fn test_smf_establishment_activates_created_session() {
        let _ = env_logger::try_init();
        let mut smf = SmfContext::new();

        // Request carries an id the SMF never issued
        let request = Envelope::new(
            1,
            1000,
            0,
            Message::pdu_session_establishment_request(42, "internet"),
        );
        assert_eq!(smf.dispatch(&request), Ok(Dispatch::Handled));

        assert!(smf.pdu_session(42).is_none());
        let session = smf.pdu_session(5001).unwrap();
        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.ue_id, 1000);
        assert_eq!(session.snssai, DEFAULT_SNSSAI);
        assert_eq!(smf.active_sessions(1000), vec![5001]);
    }

    #[test]
    fn test_smf_data_transfer() {
        let mut smf = SmfContext::new();
        let id = smf.create_pdu_session(1000, "internet", 1);

        let data = Envelope::new(1, 1000, 0, Message::data_transfer(id, 2048));
        assert_eq!(smf.dispatch(&data), Ok(Dispatch::Handled));
        assert_eq!(smf.pdu_session(id).unwrap().ul_traffic, 2048);

        let unknown = Envelope::new(2, 1000, 0, Message::data_transfer(1, 2048));
        assert_eq!(smf.dispatch(&unknown), Ok(Dispatch::Handled));

        let attach = Envelope::new(3, 1000, 0, Message::attach_request(1, 2));
        assert_eq!(smf.dispatch(&attach), Ok(Dispatch::Unhandled));
    }

    #[test]
    fn test_smf_stop_clears_sessions() {
        let mut smf = SmfContext::new();
        smf.start();
        let id = smf.create_pdu_session(1000, "internet", 1);
        smf.activate_pdu_session(id).unwrap();

        smf.stop();
        assert_eq!(smf.session_count(), 0);
        assert_eq!(smf.active_session_count(), 0);
        assert!(smf.ue_sessions(1000).is_empty());
    }
}
