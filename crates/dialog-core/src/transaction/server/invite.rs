//! Server INVITE transaction (RFC 3261 Section 17.2.1)
//!
//! ```text
//!   Proceeding ──2xx──▶ Completed(stale) ─────────────────────────▶ Terminated
//!       │
//!       └──3xx-6xx──▶ Completed(G, H) ──ACK──▶ Confirmed ──I──▶ Terminated
//!                          │
//!                          └──H──▶ Terminated (timeout)
//! ```
//!
//! The transaction answers INVITE retransmissions itself with the last
//! response it sent; the TU sees the INVITE once. If the TU has not sent a
//! provisional response within T100 the transaction sends `100 Trying`.

use tracing::{debug, trace, warn};

use sipflow_sip_core::{Message, Method, Request, Response};

use crate::transaction::events::TransactionEvent;
use crate::transaction::logic::{TransactionContext, TransactionCore, TransactionLogic};
use crate::transaction::state::TransactionState;
use crate::transaction::timer::{FiredTimer, TimerKind};
use crate::transaction::utils::create_trying_response;

#[derive(Debug)]
pub struct ServerInviteTransaction {
    core: TransactionCore,
    send_100_trying: bool,
}

impl ServerInviteTransaction {
    pub fn new(core: TransactionCore, send_100_trying: bool) -> Self {
        Self {
            core,
            send_100_trying,
        }
    }

    /// Enters Proceeding and hands the INVITE to the TU
    pub fn start(&mut self, ctx: &mut TransactionContext<'_>) {
        self.move_to(ctx, TransactionState::Proceeding);
        let source = self.core.source;
        if let Some(source) = source {
            ctx.to_tu(TransactionEvent::Request {
                key: self.core.key.clone(),
                request: self.core.request.clone(),
                source,
            });
        }
    }

    /// Whether a CANCEL may still act on this transaction
    pub fn is_cancellable(&self) -> bool {
        self.core.state == TransactionState::Proceeding
    }

    fn final_is_success(&self) -> bool {
        self.core
            .last_final
            .as_ref()
            .map(Response::is_success)
            .unwrap_or(false)
    }

    fn on_request(&mut self, ctx: &mut TransactionContext<'_>, request: Request) {
        let state = self.core.state;
        match (request.method(), state) {
            (Method::Invite, TransactionState::Proceeding | TransactionState::Completed) => {
                trace!(id = %self.core.key, state = ?state, "INVITE retransmission, re-sending last response");
                self.resend_last_response(ctx);
            }
            (Method::Ack, TransactionState::Completed) if self.final_is_success() => {
                // ACK for a 2xx that reused the INVITE branch
                let source = self.core.source;
                if let Some(source) = source {
                    ctx.to_tu(TransactionEvent::AckFor2xx { request, source });
                }
            }
            (Method::Ack, TransactionState::Completed) => {
                self.move_to(ctx, TransactionState::Confirmed);
            }
            (method, state) => {
                trace!(id = %self.core.key, %method, state = ?state, "Absorbing request");
            }
        }
    }
}

impl TransactionLogic for ServerInviteTransaction {
    fn core(&self) -> &TransactionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransactionCore {
        &mut self.core
    }

    fn on_enter_state(
        &mut self,
        ctx: &mut TransactionContext<'_>,
        new_state: TransactionState,
        _previous_state: TransactionState,
    ) {
        match new_state {
            TransactionState::Proceeding => {
                if self.send_100_trying {
                    let t100 = ctx.settings.t100;
                    self.start_timer(ctx, TimerKind::Trying, t100);
                }
            }
            TransactionState::Completed => {
                self.cancel_timer(ctx, TimerKind::Trying);
                if self.final_is_success() {
                    let stale = ctx.settings.stale;
                    self.start_timer(ctx, TimerKind::Stale, stale);
                } else {
                    let (t1, timer_h) = (ctx.settings.t1, ctx.settings.timer_h);
                    if !self.core.reliable {
                        self.start_timer(ctx, TimerKind::G, t1);
                    }
                    self.start_timer(ctx, TimerKind::H, timer_h);
                }
            }
            TransactionState::Confirmed => {
                self.cancel_timer(ctx, TimerKind::G);
                self.cancel_timer(ctx, TimerKind::H);
                let wait = ctx.settings.timer_i(self.core.reliable);
                if wait.is_zero() {
                    self.move_to(ctx, TransactionState::Terminated);
                } else {
                    self.start_timer(ctx, TimerKind::I, wait);
                }
            }
            _ => {}
        }
    }

    fn process_message(&mut self, ctx: &mut TransactionContext<'_>, message: Message) {
        match message {
            Message::Request(request) => self.on_request(ctx, request),
            Message::Response(response) => {
                trace!(id = %self.core.key, status = response.status_code(), "Server transaction ignoring response");
            }
        }
    }

    fn handle_timer(&mut self, ctx: &mut TransactionContext<'_>, timer: &FiredTimer) {
        match (timer.kind, self.core.state) {
            (TimerKind::Trying, TransactionState::Proceeding) => {
                if self.core.last_provisional.is_none() {
                    debug!(id = %self.core.key, "TU silent for T100, sending 100 Trying");
                    let trying = create_trying_response(&self.core.request);
                    ctx.send(trying.clone(), false);
                    self.core.last_provisional = Some(trying);
                }
            }
            (TimerKind::G, TransactionState::Completed) => {
                trace!(id = %self.core.key, interval = ?timer.duration, "Timer G fired, retransmitting final response");
                self.resend_last_response(ctx);
                let next = ctx.settings.next_retransmit(timer.duration, true);
                self.start_timer(ctx, TimerKind::G, next);
            }
            (TimerKind::H, TransactionState::Completed) => self.time_out(ctx),
            (TimerKind::I, TransactionState::Confirmed)
            | (TimerKind::Stale, TransactionState::Completed) => {
                self.move_to(ctx, TransactionState::Terminated);
            }
            (kind, state) => {
                trace!(id = %self.core.key, timer = %kind, state = ?state, "Ignoring timer");
            }
        }
    }

    fn send_response(&mut self, ctx: &mut TransactionContext<'_>, response: Response) {
        match self.core.state {
            TransactionState::Proceeding => {
                ctx.send(response.clone(), false);
                if response.is_provisional() {
                    self.cancel_timer(ctx, TimerKind::Trying);
                    self.core.last_provisional = Some(response);
                } else {
                    self.core.last_final = Some(response);
                    self.move_to(ctx, TransactionState::Completed);
                }
            }
            TransactionState::Completed if self.final_is_success() && response.is_success() => {
                // TU-driven 2xx retransmission (RFC 3261 13.3.1.4)
                ctx.send(response.clone(), true);
                self.core.last_final = Some(response);
            }
            state => {
                warn!(id = %self.core.key, state = ?state, status = response.status_code(), "Response after final response, dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sipflow_sip_core::prelude::*;
    use sipflow_sip_transport::Target;
    use tokio::time::Instant;

    use crate::transaction::key::TransactionKey;
    use crate::transaction::logic::TransactionOutput;
    use crate::transaction::state::TransactionKind;
    use crate::transaction::timer::{TimerQueue, TimerSettings};
    use crate::transaction::utils::create_response;

    fn invite() -> Request {
        Request::new(Method::Invite, "sip:bob@10.0.0.2".parse().unwrap())
            .with_header(TypedHeader::Via("SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bKist".parse().unwrap()))
            .with_header(TypedHeader::From("<sip:alice@10.0.0.1>;tag=a1".parse().unwrap()))
            .with_header(TypedHeader::To("<sip:bob@10.0.0.2>".parse().unwrap()))
            .with_header(TypedHeader::CallId("ist-call".into()))
            .with_header(TypedHeader::CSeq(CSeq::new(1, Method::Invite)))
    }

    fn ack() -> Request {
        let mut ack = invite();
        ack.method = Method::Ack;
        ack.set_header(TypedHeader::CSeq(CSeq::new(1, Method::Ack)));
        ack
    }

    fn transaction(target: Target) -> ServerInviteTransaction {
        let request = invite();
        let key = TransactionKey::for_server_request(&request).unwrap();
        let core = TransactionCore::new(key, TransactionKind::InviteServer, request, Some(target))
            .with_source("10.0.0.1:5060".parse().unwrap());
        ServerInviteTransaction::new(core, true)
    }

    fn tu_requests(outputs: &[TransactionOutput]) -> usize {
        outputs
            .iter()
            .filter(|o| matches!(o, TransactionOutput::Tu(TransactionEvent::Request { .. })))
            .count()
    }

    #[test]
    fn test_sends_100_trying_when_tu_is_silent() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::udp("10.0.0.1:5060".parse().unwrap()));
        let start = Instant::now();
        let mut ctx = TransactionContext::new(start, &mut timers, &settings);
        tx.start(&mut ctx);
        assert_eq!(tu_requests(&ctx.outputs), 1);
        drop(ctx);

        let now = start + Duration::from_millis(200);
        let fired = timers.pop_expired(now);
        assert_eq!(fired[0].kind, TimerKind::Trying);
        let mut ctx = TransactionContext::new(now, &mut timers, &settings);
        assert!(tx.claim_timer(&fired[0]));
        tx.handle_timer(&mut ctx, &fired[0]);
        match ctx.outputs.as_slice() {
            [TransactionOutput::Wire { message: Message::Response(r), retransmission: false }] => {
                assert_eq!(r.status(), StatusCode::TRYING)
            }
            other => panic!("unexpected outputs {:?}", other),
        }
    }

    #[test]
    fn test_retransmitted_invite_gets_last_response_without_tu() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::udp("10.0.0.1:5060".parse().unwrap()));
        let mut ctx = TransactionContext::new(Instant::now(), &mut timers, &settings);
        tx.start(&mut ctx);

        tx.send_response(&mut ctx, create_response(&invite(), StatusCode::BUSY_HERE));
        assert_eq!(tx.state(), TransactionState::Completed);
        assert!(tx.core().has_timer(TimerKind::G));
        assert!(tx.core().has_timer(TimerKind::H));
        assert!(!tx.core().has_timer(TimerKind::Trying));

        ctx.outputs.clear();
        tx.process_message(&mut ctx, Message::Request(invite()));
        assert_eq!(tu_requests(&ctx.outputs), 0);
        assert!(matches!(
            ctx.outputs.as_slice(),
            [TransactionOutput::Wire { retransmission: true, .. }]
        ));
    }

    #[test]
    fn test_ack_confirms_and_timer_i_terminates() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::udp("10.0.0.1:5060".parse().unwrap()));
        let start = Instant::now();
        let mut ctx = TransactionContext::new(start, &mut timers, &settings);
        tx.start(&mut ctx);
        tx.send_response(&mut ctx, create_response(&invite(), StatusCode::NOT_FOUND));
        tx.process_message(&mut ctx, Message::Request(ack()));
        assert_eq!(tx.state(), TransactionState::Confirmed);
        assert!(!tx.core().has_timer(TimerKind::G));
        assert!(tx.core().has_timer(TimerKind::I));
        drop(ctx);

        let now = start + settings.t4;
        let fired = timers.pop_expired(now);
        let timer_i = fired.iter().find(|t| t.kind == TimerKind::I).unwrap();
        let mut ctx = TransactionContext::new(now, &mut timers, &settings);
        assert!(tx.claim_timer(timer_i));
        tx.handle_timer(&mut ctx, timer_i);
        assert!(tx.is_terminated());
        assert!(!ctx
            .outputs
            .iter()
            .any(|o| matches!(o, TransactionOutput::Tu(TransactionEvent::Timeout { .. }))));
    }

    #[test]
    fn test_2xx_lingers_and_resends_on_retransmission() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::tcp("10.0.0.1:5060".parse().unwrap()));
        let mut ctx = TransactionContext::new(Instant::now(), &mut timers, &settings);
        tx.start(&mut ctx);
        tx.send_response(&mut ctx, create_response(&invite(), StatusCode::OK));
        assert_eq!(tx.state(), TransactionState::Completed);
        assert!(tx.core().has_timer(TimerKind::Stale));
        assert!(!tx.core().has_timer(TimerKind::H));

        ctx.outputs.clear();
        tx.process_message(&mut ctx, Message::Request(invite()));
        assert_eq!(ctx.outputs.len(), 1);

        ctx.outputs.clear();
        tx.process_message(&mut ctx, Message::Request(ack()));
        assert!(matches!(
            ctx.outputs.as_slice(),
            [TransactionOutput::Tu(TransactionEvent::AckFor2xx { .. })]
        ));
    }
}
