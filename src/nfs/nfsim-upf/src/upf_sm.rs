//! UPF message handling

use crate::context::UpfContext;
use crate::error::UpfError;
use nfsim_core::{Dispatch, Envelope, Message, NetworkFunction, NfInstance};

impl NetworkFunction for UpfContext {
    type Error = UpfError;

    fn instance(&self) -> &NfInstance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut NfInstance {
        &mut self.instance
    }

    fn start(&mut self) {
        self.instance.start();
        log::info!("[{}] UPF started and ready for packet forwarding", self.instance.name());
    }

    fn stop(&mut self) {
        self.instance.stop();
        self.clear();
        log::info!("[{}] UPF stopped", self.instance.name());
    }

    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, UpfError> {
        log::debug!("[{}] Handling message: {}", self.instance.name(), envelope);

        match &envelope.message {
            Message::DataTransfer(m) => {
                self.forward_uplink_packet(m.session_id, m.data_size);
                Ok(Dispatch::Handled)
            }
            Message::AttachRequest(_)
            | Message::DetachRequest(_)
            | Message::AuthenticationRequest(_)
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
    use nfsim_core::ActorHandle;

    #[test]
    fn test_upf_data_transfer_dispatch() {
        let _ = env_logger::try_init();
        let mut upf = UpfContext::new();
        upf.attach_pdu_session(5001, 1000).unwrap();

        let data = Envelope::new(1, 1000, 0, Message::data_transfer(5001, 2048));
        assert_eq!(upf.dispatch(&data), Ok(Dispatch::Handled));
        assert_eq!(upf.session_uplink_traffic(5001), 2048);

        let heartbeat = Envelope::new(2, 1000, 0, Message::Heartbeat);
        assert_eq!(upf.dispatch(&heartbeat), Ok(Dispatch::Unhandled));
    }

    #[test]
    fn test_upf_stop_resets_totals() {
        let mut upf = UpfContext::new();
        upf.start();
        upf.attach_pdu_session(5001, 1000).unwrap();
        upf.forward_uplink_packet(5001, 100);

        upf.stop();
        assert!(!upf.is_running());
        assert_eq!(upf.attached_session_count(), 0);
        assert_eq!(upf.total_uplink_traffic(), 0);
    }

    #[test]
    fn test_upf_actor_forwarding() {
        let mut upf = UpfContext::new();
        upf.attach_pdu_session(5001, 1000).unwrap();
        let handle = ActorHandle::spawn(upf).unwrap();

        for _ in 0..3 {
            handle.post(1000, 0, Message::data_transfer(5001, 2048)).unwrap();
        }
        let total = handle.call(|upf| upf.total_uplink_traffic()).unwrap();
        assert_eq!(total, 6144);

        let upf = handle.shutdown().unwrap();
        assert_eq!(upf.total_uplink_traffic(), 0);
    }
}
