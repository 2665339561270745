//! Dialog implementation for RFC 3261 SIP dialogs
//!
//! A [`Dialog`] holds the state that outlives individual transactions: the
//! identifying tags, the route set, the remote target and both CSeq counters.
//! It is created once, either as UAS from an incoming request or as UAC from
//! the response to a request it sent, and from then on builds in-dialog
//! requests and responses.
//!
//! ```rust
//! use sipflow_dialog_core::dialog::Dialog;
//! use sipflow_sip_core::prelude::*;
//!
//! let invite = Request::new(Method::Invite, "sip:bob@biloxi.com".parse().unwrap())
//!     .with_header(TypedHeader::Via("SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776".parse().unwrap()))
//!     .with_header(TypedHeader::From("<sip:alice@atlanta.com>;tag=abc".parse().unwrap()))
//!     .with_header(TypedHeader::To("<sip:bob@biloxi.com>".parse().unwrap()))
//!     .with_header(TypedHeader::CallId("call-1".to_string()))
//!     .with_header(TypedHeader::CSeq(CSeq::new(1, Method::Invite)))
//!     .with_header(TypedHeader::Contact(vec!["<sip:alice@pc33.atlanta.com>".parse().unwrap()]));
//!
//! let mut dialog = Dialog::new("sip:bob@192.0.2.4".parse().unwrap());
//! let mut ok = Response::new(StatusCode::OK)
//!     .with_header(TypedHeader::To("<sip:bob@biloxi.com>;tag=xyz123".parse().unwrap()));
//! let id = dialog.create_as_uas(&invite, &mut ok).unwrap();
//! assert_eq!(id.local_tag, "xyz123");
//!
//! let bye = dialog.make_bye().unwrap();
//! assert_eq!(bye.cseq().unwrap().seq, 1);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use sipflow_sip_core::utils::{generate_branch, generate_tag};
use sipflow_sip_core::{
    Address, CSeq, HeaderAccess, Method, Request, Response, StatusCode, TypedHeader,
    Uri, Via,
};

use super::dialog_id::DialogId;
use crate::errors::{DialogError, DialogResult};
use crate::transaction::utils::create_response;

/// Max-Forwards on every request the dialog builds
pub const DEFAULT_MAX_FORWARDS: u8 = 70;

/// Outcome of applying an incoming request to the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRefresh {
    /// Sequence accepted; remote target updated if the request had one Contact
    Accepted,
    /// CSeq went backwards; the dialog is unchanged and the request should be
    /// rejected with 500
    OutOfOrder { received: u32, current: u32 },
}

impl TargetRefresh {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TargetRefresh::Accepted)
    }
}

/// A SIP dialog as defined in RFC 3261
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    created: bool,

    /// Contact placed on every request and target-refresh response
    local_contact: Address,

    /// Via copied onto every request with a fresh branch
    via_template: Via,

    call_id: String,
    local_tag: String,
    remote_tag: String,

    local_uri: Uri,
    remote_uri: Uri,

    /// Remote Contact; requests go here
    remote_target: Option<Uri>,

    /// Route set in the order requests traverse it
    route_set: Vec<Uri>,

    local_sequence: Option<u32>,
    remote_sequence: Option<u32>,
}

impl Dialog {
    /// An uncreated dialog using `local_contact` on what it sends
    ///
    /// The Via template defaults to UDP at the contact's host and port.
    pub fn new(local_contact: Uri) -> Self {
        let via_template = Via::new("UDP", local_contact.host.clone(), local_contact.port);
        Self {
            created: false,
            local_contact: Address::new(local_contact),
            via_template,
            call_id: String::new(),
            local_tag: String::new(),
            remote_tag: String::new(),
            local_uri: Uri::sip(""),
            remote_uri: Uri::sip(""),
            remote_target: None,
            route_set: Vec::new(),
            local_sequence: None,
            remote_sequence: None,
        }
    }

    pub fn with_via_template(mut self, via: Via) -> Self {
        self.via_template = via;
        self
    }

    /// Creates the dialog from a request received as UAS
    ///
    /// The local tag is taken from the response's To header; when it has no
    /// tag yet a fresh one is generated and stamped onto it. Route set is the
    /// request's Record-Route in received order.
    pub fn create_as_uas(&mut self, request: &Request, response: &mut Response) -> DialogResult<DialogId> {
        if self.created {
            return Err(DialogError::DuplicateDialogCreation {
                dialog_id: self.id_string(),
            });
        }

        let call_id = request.require_call_id()?.to_string();
        let from = request.require_from()?;
        let remote_tag = from.tag().ok_or(DialogError::MissingHeader("From tag"))?.to_string();
        let remote_uri = from.uri.clone();
        let local_uri = request.require_to()?.uri.clone();
        let remote_sequence = request.require_cseq()?.seq;

        let to = response.to_address_mut().ok_or(DialogError::MissingHeader("To"))?;
        let local_tag = match to.tag() {
            Some(tag) => tag.to_string(),
            None => {
                let tag = generate_tag();
                to.set_tag(tag.clone());
                tag
            }
        };

        self.call_id = call_id;
        self.local_tag = local_tag;
        self.remote_tag = remote_tag;
        self.local_uri = local_uri;
        self.remote_uri = remote_uri;
        self.route_set = request.record_route().into_iter().map(|a| a.uri.clone()).collect();
        self.remote_target = single_contact(request).or_else(|| Some(self.remote_uri.clone()));
        self.remote_sequence = Some(remote_sequence);
        self.local_sequence = None;
        self.created = true;

        let id = self.id();
        debug!(dialog = %id, routes = self.route_set.len(), "Dialog created as UAS");
        Ok(id)
    }

    /// Creates the dialog from the response to a request sent as UAC
    ///
    /// Does nothing on an already created dialog and returns its id. Route
    /// set is the response's Record-Route reversed.
    pub fn create_as_uac(&mut self, request: &Request, response: &Response) -> DialogResult<DialogId> {
        if self.created {
            trace!(dialog = %self.id(), "create_as_uac on existing dialog ignored");
            return Ok(self.id());
        }

        let call_id = response.require_call_id()?.to_string();
        let from = response.require_from()?;
        let to = response.require_to()?;
        let local_tag = from.tag().ok_or(DialogError::MissingHeader("From tag"))?.to_string();
        let remote_tag = to.tag().ok_or(DialogError::MissingHeader("To tag"))?.to_string();
        let local_sequence = request.require_cseq()?.seq;

        self.call_id = call_id;
        self.local_tag = local_tag;
        self.remote_tag = remote_tag;
        self.local_uri = from.uri.clone();
        self.remote_uri = to.uri.clone();
        self.route_set = response
            .record_route()
            .into_iter()
            .rev()
            .map(|a| a.uri.clone())
            .collect();
        self.remote_target = single_contact(response).or_else(|| Some(request.uri().clone()));
        self.local_sequence = Some(local_sequence);
        self.remote_sequence = None;
        self.created = true;

        let id = self.id();
        debug!(dialog = %id, routes = self.route_set.len(), "Dialog created as UAC");
        Ok(id)
    }

    /// Updates the remote target from a response with exactly one Contact
    pub fn target_refresh_response(&mut self, response: &Response) -> bool {
        match single_contact(response) {
            Some(target) => {
                trace!(%target, "Remote target refreshed from response");
                self.remote_target = Some(target);
                true
            }
            None => false,
        }
    }

    /// Applies an incoming in-dialog request
    ///
    /// CSeq must not go below the last remote sequence; a regression is
    /// returned as [`TargetRefresh::OutOfOrder`] and leaves the dialog as it
    /// was. ACK carries the INVITE's CSeq and does not move the counter.
    /// CANCEL is not an in-dialog request and is refused.
    pub fn target_refresh_request(&mut self, request: &Request) -> DialogResult<TargetRefresh> {
        if request.method() == &Method::Cancel {
            return Err(DialogError::invalid_request(
                "target refresh",
                "CANCEL does not belong to the dialog",
            ));
        }

        if request.method() != &Method::Ack {
            let received = request.require_cseq()?.seq;
            match self.remote_sequence {
                Some(current) if received < current => {
                    debug!(received, current, "Out of order request");
                    return Ok(TargetRefresh::OutOfOrder { received, current });
                }
                _ => self.remote_sequence = Some(received),
            }
        }

        if let Some(target) = single_contact(request) {
            trace!(%target, "Remote target refreshed from request");
            self.remote_target = Some(target);
        }
        Ok(TargetRefresh::Accepted)
    }

    pub fn make_invite(&mut self) -> DialogResult<Request> {
        self.build_request(Method::Invite, true)
    }

    pub fn make_bye(&mut self) -> DialogResult<Request> {
        self.build_request(Method::Bye, true)
    }

    /// REFER with `Refer-To: refer_to` and `Referred-By` set to the local URI
    pub fn make_refer(&mut self, refer_to: Uri) -> DialogResult<Request> {
        let mut request = self.build_request(Method::Refer, true)?;
        request.push_header(TypedHeader::ReferTo(Address::new(refer_to)));
        request.push_header(TypedHeader::ReferredBy(Address::new(self.local_uri.clone())));
        Ok(request)
    }

    /// NOTIFY reuses the current local sequence; callers that need a new one
    /// bump it themselves
    pub fn make_notify(&mut self) -> DialogResult<Request> {
        self.build_request(Method::Notify, false)
    }

    pub fn make_options(&mut self) -> DialogResult<Request> {
        self.build_request(Method::Options, true)
    }

    /// Any other in-dialog request. ACK and CANCEL have their own builders.
    pub fn make_request(&mut self, method: Method) -> DialogResult<Request> {
        if matches!(method, Method::Ack | Method::Cancel) {
            return Err(DialogError::invalid_request(
                "make_request",
                format!("{} has a dedicated builder", method),
            ));
        }
        self.build_request(method, true)
    }

    /// ACK for a 2xx to `original`
    ///
    /// Uses the INVITE's CSeq number and carries over its credentials. The
    /// local sequence is left untouched.
    pub fn make_ack(&self, original: &Request) -> DialogResult<Request> {
        let seq = original.require_cseq()?.seq;
        let mut ack = self.request_with_sequence(Method::Ack, seq)?;

        for header in original.headers() {
            if matches!(
                header,
                TypedHeader::Authorization(_) | TypedHeader::ProxyAuthorization(_)
            ) {
                ack.push_header(header.clone());
            }
        }
        Ok(ack)
    }

    /// CANCEL for a pending INVITE
    ///
    /// Copies Request-URI, Call-ID, To, From, the CSeq number, the top Via
    /// only, and any Route headers. Does not need a created dialog.
    pub fn make_cancel(&self, invite: &Request) -> DialogResult<Request> {
        if invite.method() != &Method::Invite {
            return Err(DialogError::invalid_request(
                "make_cancel",
                format!("cannot cancel {}", invite.method()),
            ));
        }
        let via = invite
            .first_via()
            .ok_or_else(|| DialogError::invalid_request("make_cancel", "request has no Via"))?;

        let mut cancel = Request::new(Method::Cancel, invite.uri().clone())
            .with_header(TypedHeader::Via(via.clone()))
            .with_header(TypedHeader::MaxForwards(DEFAULT_MAX_FORWARDS))
            .with_header(TypedHeader::From(invite.require_from()?.clone()))
            .with_header(TypedHeader::To(invite.require_to()?.clone()))
            .with_header(TypedHeader::CallId(invite.require_call_id()?.to_string()))
            .with_header(TypedHeader::CSeq(CSeq::new(invite.require_cseq()?.seq, Method::Cancel)));

        for header in invite.headers() {
            if let TypedHeader::Route(_) = header {
                cancel.push_header(header.clone());
            }
        }
        Ok(cancel)
    }

    /// Response to an in-dialog request, To-tagged with the local tag
    ///
    /// A To tag already equal to the local tag is kept; a different one is
    /// refused. 1xx (except 100) and 2xx responses to target-refresh requests
    /// carry the local Contact.
    pub fn make_response(&self, request: &Request, status: StatusCode) -> DialogResult<Response> {
        self.ensure_created()?;
        let mut response = create_response(request, status);

        let to = response.to_address_mut().ok_or(DialogError::MissingHeader("To"))?;
        match to.tag() {
            Some(existing) if existing != self.local_tag => {
                return Err(DialogError::AlreadyTagged {
                    existing: existing.to_string(),
                });
            }
            Some(_) => {}
            None => to.set_tag(self.local_tag.clone()),
        }

        let code = status.as_u16();
        if request.method().is_target_refresh() && code > 100 && code < 300 {
            response.push_header(TypedHeader::Contact(vec![self.local_contact.clone()]));
        }
        Ok(response)
    }

    /// The dialog id, for use in a Replaces header
    pub fn make_replaces(&self) -> DialogResult<DialogId> {
        self.ensure_created()?;
        Ok(self.id())
    }

    /// Identifier once created
    pub fn dialog_id(&self) -> Option<DialogId> {
        self.created.then(|| self.id())
    }

    /// Returns the dialog to its uncreated state; local contact and Via
    /// template are kept
    pub fn clear(&mut self) {
        self.created = false;
        self.call_id.clear();
        self.local_tag.clear();
        self.remote_tag.clear();
        self.local_uri = Uri::sip("");
        self.remote_uri = Uri::sip("");
        self.remote_target = None;
        self.route_set.clear();
        self.local_sequence = None;
        self.remote_sequence = None;
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn local_tag(&self) -> &str {
        &self.local_tag
    }

    pub fn remote_tag(&self) -> &str {
        &self.remote_tag
    }

    pub fn local_uri(&self) -> &Uri {
        &self.local_uri
    }

    pub fn remote_uri(&self) -> &Uri {
        &self.remote_uri
    }

    pub fn remote_target(&self) -> Option<&Uri> {
        self.remote_target.as_ref()
    }

    pub fn route_set(&self) -> &[Uri] {
        &self.route_set
    }

    pub fn local_sequence(&self) -> Option<u32> {
        self.local_sequence
    }

    pub fn remote_sequence(&self) -> Option<u32> {
        self.remote_sequence
    }

    pub fn local_contact(&self) -> &Address {
        &self.local_contact
    }

    fn id(&self) -> DialogId {
        DialogId::new(&self.call_id, &self.local_tag, &self.remote_tag)
    }

    fn id_string(&self) -> String {
        self.id().to_string()
    }

    fn ensure_created(&self) -> DialogResult<()> {
        if self.created {
            Ok(())
        } else {
            Err(DialogError::DialogNotCreated)
        }
    }

    /// Next local CSeq: incremented (starting at 1) or the current value
    fn next_sequence(&mut self, increment: bool) -> u32 {
        let seq = match (self.local_sequence, increment) {
            (None, _) => 1,
            (Some(current), true) => current.wrapping_add(1),
            (Some(current), false) => current,
        };
        self.local_sequence = Some(seq);
        seq
    }

    fn build_request(&mut self, method: Method, increment: bool) -> DialogResult<Request> {
        self.ensure_created()?;
        let seq = self.next_sequence(increment);
        self.request_with_sequence(method, seq)
    }

    fn request_with_sequence(&self, method: Method, seq: u32) -> DialogResult<Request> {
        self.ensure_created()?;
        let target = self
            .remote_target
            .clone()
            .unwrap_or_else(|| self.remote_uri.clone());
        let via = self.via_template.clone().with_branch(generate_branch());

        let mut request = Request::new(method.clone(), target)
            .with_header(TypedHeader::Via(via))
            .with_header(TypedHeader::MaxForwards(DEFAULT_MAX_FORWARDS))
            .with_header(TypedHeader::To(
                Address::new(self.remote_uri.clone()).with_tag(self.remote_tag.clone()),
            ))
            .with_header(TypedHeader::From(
                Address::new(self.local_uri.clone()).with_tag(self.local_tag.clone()),
            ))
            .with_header(TypedHeader::CallId(self.call_id.clone()))
            .with_header(TypedHeader::CSeq(CSeq::new(seq, method.clone())));

        if !self.route_set.is_empty() {
            request.push_header(TypedHeader::Route(
                self.route_set.iter().cloned().map(Address::new).collect(),
            ));
        }
        request.push_header(TypedHeader::Contact(vec![self.local_contact.clone()]));

        trace!(dialog = %self.id(), %method, seq, "Built in-dialog request");
        Ok(request)
    }
}

/// The URI of the message's Contact when there is exactly one
fn single_contact<M: HeaderAccess>(message: &M) -> Option<Uri> {
    match message.contacts().as_slice() {
        [only] => Some(only.uri.clone()),
        _ => None,
    }
}
