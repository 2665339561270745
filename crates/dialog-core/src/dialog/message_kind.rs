//! Classification of messages handed to the dialog layer
//!
//! A closed set of variants so that the dialog layer dispatches with an
//! exhaustive `match`. Adding a method here makes every unhandled dispatch
//! site a compile error.

use sipflow_sip_core::{HeaderAccess, Message, Method, Request, Response};

/// A message as the dialog layer dispatches on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMessage {
    Invite(Request),
    Bye(Request),
    Refer(Request),
    Notify(Request),
    Options(Request),
    Ack(Request),
    Cancel(Request),
    /// Any other method
    Request(Request),
    Response(Response),
}

impl DialogMessage {
    pub fn classify(message: Message) -> Self {
        match message {
            Message::Request(request) => Self::from(request),
            Message::Response(response) => DialogMessage::Response(response),
        }
    }

    /// Method of a request, or the CSeq method of a response
    pub fn method(&self) -> Option<Method> {
        match self {
            DialogMessage::Invite(_) => Some(Method::Invite),
            DialogMessage::Bye(_) => Some(Method::Bye),
            DialogMessage::Refer(_) => Some(Method::Refer),
            DialogMessage::Notify(_) => Some(Method::Notify),
            DialogMessage::Options(_) => Some(Method::Options),
            DialogMessage::Ack(_) => Some(Method::Ack),
            DialogMessage::Cancel(_) => Some(Method::Cancel),
            DialogMessage::Request(r) => Some(r.method().clone()),
            DialogMessage::Response(r) => r.cseq().map(|c| c.method.clone()),
        }
    }

    pub fn is_request(&self) -> bool {
        !matches!(self, DialogMessage::Response(_))
    }

    pub fn into_message(self) -> Message {
        match self {
            DialogMessage::Invite(r)
            | DialogMessage::Bye(r)
            | DialogMessage::Refer(r)
            | DialogMessage::Notify(r)
            | DialogMessage::Options(r)
            | DialogMessage::Ack(r)
            | DialogMessage::Cancel(r)
            | DialogMessage::Request(r) => Message::Request(r),
            DialogMessage::Response(r) => Message::Response(r),
        }
    }
}

impl From<Request> for DialogMessage {
    fn from(request: Request) -> Self {
        match request.method() {
            Method::Invite => DialogMessage::Invite(request),
            Method::Bye => DialogMessage::Bye(request),
            Method::Refer => DialogMessage::Refer(request),
            Method::Notify => DialogMessage::Notify(request),
            Method::Options => DialogMessage::Options(request),
            Method::Ack => DialogMessage::Ack(request),
            Method::Cancel => DialogMessage::Cancel(request),
            _ => DialogMessage::Request(request),
        }
    }
}

impl From<Message> for DialogMessage {
    fn from(message: Message) -> Self {
        Self::classify(message)
    }
}
