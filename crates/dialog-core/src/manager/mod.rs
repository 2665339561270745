//! Dialog Manager Module
//!
//! [`DialogManager`] owns every [`Dialog`] of a user agent in a
//! [`HandleRegistry`] and indexes them by [`DialogId`]. Other components keep
//! [`Handle<Dialog>`] values, which go stale when the dialog is removed instead
//! of dangling.
//!
//! ```rust
//! use sipflow_dialog_core::prelude::*;
//!
//! let mut manager = DialogManager::new(
//!     "sip:bob@192.0.2.4".parse().unwrap(),
//!     RegistryConfig::default(),
//! );
//! assert!(manager.is_empty());
//! assert!(manager.shutdown().is_ok());
//! ```

use std::collections::HashMap;

use tracing::{debug, info};

use sipflow_sip_core::{HeaderAccess, Message, Request, Response, StatusCode, Uri};

use crate::config::RegistryConfig;
use crate::dialog::{Dialog, DialogId, DialogMessage, TargetRefresh};
use crate::errors::{DialogError, DialogResult};
use crate::handle::{Handle, HandleRegistry};
use crate::transaction::utils::create_response;

/// What to do with an incoming in-dialog message
#[derive(Debug, Clone, PartialEq)]
pub enum InDialogOutcome {
    /// The dialog accepted the message; hand it to the application
    Accepted(Handle<Dialog>),
    /// Send this negative response on the request's server transaction:
    /// 481 for an unknown dialog, 500 for a CSeq regression
    Rejected(Response),
    /// An ACK or response that matches no dialog; there is nothing to answer
    Unmatched,
}

/// Owner of all dialogs of one user agent
#[derive(Debug)]
pub struct DialogManager {
    local_contact: Uri,
    dialogs: HandleRegistry<Dialog>,
    index: HashMap<DialogId, Handle<Dialog>>,
}

impl DialogManager {
    pub fn new(local_contact: Uri, config: RegistryConfig) -> Self {
        Self {
            local_contact,
            dialogs: HandleRegistry::new(config.shutdown_policy),
            index: HashMap::new(),
        }
    }

    /// Creates a dialog for a request received as UAS
    ///
    /// See [`Dialog::create_as_uas`]; `response` gets the local tag.
    pub fn create_uas(&mut self, request: &Request, response: &mut Response) -> DialogResult<Handle<Dialog>> {
        let mut dialog = Dialog::new(self.local_contact.clone());
        let id = dialog.create_as_uas(request, response)?;
        if self.index.contains_key(&id) {
            return Err(DialogError::DuplicateDialogCreation {
                dialog_id: id.to_string(),
            });
        }
        self.insert(id, dialog)
    }

    /// Creates a dialog from a response to a request sent as UAC
    ///
    /// A response for a dialog that already exists (a retransmitted 2xx)
    /// returns the existing handle. Forked responses with a different To tag
    /// create separate dialogs.
    pub fn create_uac(&mut self, request: &Request, response: &Response) -> DialogResult<Handle<Dialog>> {
        if let Some(handle) = self.find_for_response(response) {
            return Ok(handle);
        }
        let mut dialog = Dialog::new(self.local_contact.clone());
        let id = dialog.create_as_uac(request, response)?;
        self.insert(id, dialog)
    }

    fn insert(&mut self, id: DialogId, dialog: Dialog) -> DialogResult<Handle<Dialog>> {
        let handle = self.dialogs.create(dialog)?;
        debug!(dialog = %id, %handle, "Dialog registered");
        self.index.insert(id, handle);
        Ok(handle)
    }

    /// The dialog an incoming request belongs to
    pub fn find_for_request(&self, request: &Request) -> Option<Handle<Dialog>> {
        let id = DialogId::from_request(request, true)?;
        self.index.get(&id).copied()
    }

    /// The dialog a response to one of our requests belongs to
    pub fn find_for_response(&self, response: &Response) -> Option<Handle<Dialog>> {
        let id = DialogId::from_response(response)?;
        self.index.get(&id).copied()
    }

    pub fn find(&self, id: &DialogId) -> Option<Handle<Dialog>> {
        self.index.get(id).copied()
    }

    pub fn get(&self, handle: Handle<Dialog>) -> DialogResult<&Dialog> {
        self.dialogs.resolve(handle)
    }

    pub fn get_mut(&mut self, handle: Handle<Dialog>) -> DialogResult<&mut Dialog> {
        self.dialogs.resolve_mut(handle)
    }

    /// Removes the dialog; every copy of `handle` becomes stale
    pub fn remove(&mut self, handle: Handle<Dialog>) -> DialogResult<Dialog> {
        let dialog = self.dialogs.remove(handle)?;
        if let Some(id) = dialog.dialog_id() {
            self.index.remove(&id);
            debug!(dialog = %id, %handle, "Dialog removed");
        }
        Ok(dialog)
    }

    /// Matches an incoming in-dialog message and applies it to its dialog
    ///
    /// Unknown dialogs and CSeq regressions come back as the negative
    /// response the transaction layer should send; neither is an error.
    /// CANCEL belongs to the INVITE server transaction and is refused.
    pub fn handle_message(&mut self, message: Message) -> DialogResult<InDialogOutcome> {
        match DialogMessage::classify(message) {
            DialogMessage::Invite(request)
            | DialogMessage::Bye(request)
            | DialogMessage::Refer(request)
            | DialogMessage::Notify(request)
            | DialogMessage::Options(request)
            | DialogMessage::Request(request) => self.apply_request(&request),
            DialogMessage::Ack(request) => self.apply_ack(&request),
            DialogMessage::Cancel(_) => Err(DialogError::invalid_request(
                "in-dialog dispatch",
                "CANCEL is handled by the INVITE server transaction",
            )),
            DialogMessage::Response(response) => self.apply_response(&response),
        }
    }

    /// [`handle_message`](Self::handle_message) for a request
    pub fn handle_in_dialog_request(&mut self, request: &Request) -> DialogResult<InDialogOutcome> {
        self.handle_message(Message::Request(request.clone()))
    }

    fn apply_request(&mut self, request: &Request) -> DialogResult<InDialogOutcome> {
        let Some(handle) = self.find_for_request(request) else {
            debug!(method = %request.method(), "No dialog for request, answering 481");
            return Ok(InDialogOutcome::Rejected(create_response(
                request,
                StatusCode::CALL_OR_TRANSACTION_DOES_NOT_EXIST,
            )));
        };

        let dialog = self.dialogs.resolve_mut(handle)?;
        match dialog.target_refresh_request(request)? {
            TargetRefresh::Accepted => Ok(InDialogOutcome::Accepted(handle)),
            TargetRefresh::OutOfOrder { received, current } => {
                debug!(%handle, received, current, "Rejecting out of order request with 500");
                let response = dialog.make_response(request, StatusCode::SERVER_INTERNAL_ERROR)?;
                Ok(InDialogOutcome::Rejected(response))
            }
        }
    }

    /// ACK is never answered, so a stray one is only logged
    fn apply_ack(&mut self, ack: &Request) -> DialogResult<InDialogOutcome> {
        let Some(handle) = self.find_for_request(ack) else {
            debug!("ACK matches no dialog, dropping");
            return Ok(InDialogOutcome::Unmatched);
        };
        self.dialogs.resolve_mut(handle)?.target_refresh_request(ack)?;
        Ok(InDialogOutcome::Accepted(handle))
    }

    /// A 2xx to a target refresh request updates the remote target
    fn apply_response(&mut self, response: &Response) -> DialogResult<InDialogOutcome> {
        let Some(handle) = self.find_for_response(response) else {
            debug!(status = response.status_code(), "Response matches no dialog");
            return Ok(InDialogOutcome::Unmatched);
        };
        let refreshes = response.is_success()
            && response.cseq().map_or(false, |cseq| cseq.method.is_target_refresh());
        if refreshes {
            self.dialogs.resolve_mut(handle)?.target_refresh_response(response);
        }
        Ok(InDialogOutcome::Accepted(handle))
    }

    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }

    /// Shuts the registry down under its configured policy
    pub fn shutdown(&mut self) -> DialogResult<()> {
        self.dialogs.shutdown()?;
        self.index.clear();
        info!("Dialog manager shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ShutdownPolicy;
    use sipflow_sip_core::prelude::*;

    fn invite() -> Request {
        Request::new(Method::Invite, "sip:bob@biloxi.com".parse().unwrap())
            .with_header(TypedHeader::Via("SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKmgr".parse().unwrap()))
            .with_header(TypedHeader::From("<sip:alice@atlanta.com>;tag=abc".parse().unwrap()))
            .with_header(TypedHeader::To("<sip:bob@biloxi.com>".parse().unwrap()))
            .with_header(TypedHeader::CallId("mgr-call".into()))
            .with_header(TypedHeader::CSeq(CSeq::new(10, Method::Invite)))
            .with_header(TypedHeader::Contact(vec!["<sip:alice@pc33.atlanta.com>".parse().unwrap()]))
    }

    fn in_dialog(seq: u32, local_tag: &str) -> Request {
        in_dialog_with(Method::Bye, seq, local_tag)
    }

    fn in_dialog_with(method: Method, seq: u32, local_tag: &str) -> Request {
        Request::new(method.clone(), "sip:bob@192.0.2.4".parse().unwrap())
            .with_header(TypedHeader::Via("SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKbye".parse().unwrap()))
            .with_header(TypedHeader::From("<sip:alice@atlanta.com>;tag=abc".parse().unwrap()))
            .with_header(TypedHeader::To(format!("<sip:bob@biloxi.com>;tag={}", local_tag).parse().unwrap()))
            .with_header(TypedHeader::CallId("mgr-call".into()))
            .with_header(TypedHeader::CSeq(CSeq::new(seq, method)))
    }

    fn manager(policy: ShutdownPolicy) -> DialogManager {
        DialogManager::new(
            "sip:bob@192.0.2.4".parse().unwrap(),
            RegistryConfig::default().with_shutdown_policy(policy),
        )
    }

    #[test]
    fn test_create_find_remove() {
        let mut manager = manager(ShutdownPolicy::FaultOnLiveHandles);
        let mut ok = create_response(&invite(), StatusCode::OK);
        let handle = manager.create_uas(&invite(), &mut ok).unwrap();
        let tag = ok.to_tag().unwrap().to_string();

        assert_eq!(manager.find_for_request(&in_dialog(11, &tag)), Some(handle));
        assert_eq!(manager.get(handle).unwrap().remote_tag(), "abc");

        manager.remove(handle).unwrap();
        assert!(manager.get(handle).is_err());
        assert_eq!(manager.find_for_request(&in_dialog(11, &tag)), None);
    }

    #[test]
    fn test_in_dialog_outcomes() {
        let mut manager = manager(ShutdownPolicy::ForceClear);
        let mut ok = create_response(&invite(), StatusCode::OK);
        let handle = manager.create_uas(&invite(), &mut ok).unwrap();
        let tag = ok.to_tag().unwrap().to_string();

        match manager.handle_in_dialog_request(&in_dialog(11, &tag)).unwrap() {
            InDialogOutcome::Accepted(h) => assert_eq!(h, handle),
            other => panic!("unexpected {:?}", other),
        }
        match manager.handle_in_dialog_request(&in_dialog(5, &tag)).unwrap() {
            InDialogOutcome::Rejected(r) => assert_eq!(r.status(), StatusCode::SERVER_INTERNAL_ERROR),
            other => panic!("unexpected {:?}", other),
        }
        match manager.handle_in_dialog_request(&in_dialog(12, "unknown")).unwrap() {
            InDialogOutcome::Rejected(r) => {
                assert_eq!(r.status(), StatusCode::CALL_OR_TRANSACTION_DOES_NOT_EXIST)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(manager.get(handle).unwrap().remote_sequence(), Some(11));
    }

    #[test]
    fn test_dispatch_by_message_kind() {
        let mut manager = manager(ShutdownPolicy::ForceClear);
        let mut ok = create_response(&invite(), StatusCode::OK);
        let handle = manager.create_uas(&invite(), &mut ok).unwrap();
        let tag = ok.to_tag().unwrap().to_string();

        // ACK reuses the INVITE's CSeq and is never answered
        let ack = in_dialog_with(Method::Ack, 10, &tag);
        assert_eq!(
            manager.handle_message(Message::Request(ack)).unwrap(),
            InDialogOutcome::Accepted(handle)
        );
        let stray = in_dialog_with(Method::Ack, 10, "unknown");
        assert_eq!(
            manager.handle_message(Message::Request(stray)).unwrap(),
            InDialogOutcome::Unmatched
        );

        let cancel = in_dialog_with(Method::Cancel, 10, &tag);
        assert!(matches!(
            manager.handle_message(Message::Request(cancel)),
            Err(DialogError::InvalidRequest { .. })
        ));

        // A 2xx to our re-INVITE moves the remote target
        let reinvite = manager.get_mut(handle).unwrap().make_invite().unwrap();
        let mut answer = create_response(&reinvite, StatusCode::OK);
        answer.push_header(TypedHeader::Contact(vec!["<sip:alice@198.51.100.9>".parse().unwrap()]));
        assert_eq!(
            manager.handle_message(Message::Response(answer)).unwrap(),
            InDialogOutcome::Accepted(handle)
        );
        assert_eq!(
            manager.get(handle).unwrap().remote_target().unwrap().to_string(),
            "sip:alice@198.51.100.9"
        );
        assert_eq!(manager.get(handle).unwrap().remote_sequence(), Some(10));
    }

    #[test]
    fn test_uac_retransmitted_2xx_reuses_dialog() {
        let mut manager = manager(ShutdownPolicy::ForceClear);
        let mut ok = create_response(&invite(), StatusCode::OK);
        ok.to_address_mut().unwrap().set_tag("bob-1");

        let first = manager.create_uac(&invite(), &ok).unwrap();
        let again = manager.create_uac(&invite(), &ok).unwrap();
        assert_eq!(first, again);
        assert_eq!(manager.len(), 1);

        let mut forked = create_response(&invite(), StatusCode::OK);
        forked.to_address_mut().unwrap().set_tag("bob-2");
        assert_ne!(manager.create_uac(&invite(), &forked).unwrap(), first);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_shutdown_policies() {
        let mut strict = manager(ShutdownPolicy::FaultOnLiveHandles);
        let mut ok = create_response(&invite(), StatusCode::OK);
        let handle = strict.create_uas(&invite(), &mut ok).unwrap();
        assert_eq!(
            strict.shutdown(),
            Err(DialogError::LiveHandlesAtShutdown { count: 1 })
        );
        strict.remove(handle).unwrap();
        assert!(strict.shutdown().is_ok());

        let mut lenient = manager(ShutdownPolicy::ForceClear);
        let mut ok = create_response(&invite(), StatusCode::OK);
        let handle = lenient.create_uas(&invite(), &mut ok).unwrap();
        assert!(lenient.shutdown().is_ok());
        assert!(lenient.get(handle).is_err());
        assert_eq!(
            lenient.create_uas(&invite(), &mut create_response(&invite(), StatusCode::OK)),
            Err(DialogError::RegistryShutdown)
        );
    }
}
