//! Client INVITE transaction (RFC 3261 Section 17.1.1)
//!
//! ```text
//!                 Initial ──start──▶ Calling ──1xx──▶ Proceeding
//!                                     │  │              │
//!                        Timer B ─────┘  └──2xx-6xx─────┴──▶ Completed ──D/Stale──▶ Terminated
//! ```
//!
//! On unreliable transports Timer A retransmits the INVITE at T1, 2*T1, 4*T1
//! and so on without a cap until Timer B (64*T1) ends the attempt. A 300-699
//! response is acknowledged by the transaction itself; a 2xx is left to the TU.

use tracing::{debug, trace};

use sipflow_sip_core::{Message, Response};

use crate::transaction::logic::{TransactionContext, TransactionCore, TransactionLogic};
use crate::transaction::state::TransactionState;
use crate::transaction::events::TransactionEvent;
use crate::transaction::timer::{FiredTimer, TimerKind};
use crate::transaction::utils::create_ack_for_failure;

#[derive(Debug)]
pub struct ClientInviteTransaction {
    core: TransactionCore,
}

impl ClientInviteTransaction {
    pub fn new(core: TransactionCore) -> Self {
        Self { core }
    }

    /// Sends the INVITE. Requires a target.
    pub fn start(&mut self, ctx: &mut TransactionContext<'_>) {
        self.move_to(ctx, TransactionState::Calling);
    }

    fn forward(&self, ctx: &mut TransactionContext<'_>, response: Response) {
        ctx.to_tu(TransactionEvent::Response {
            key: self.core.key.clone(),
            response,
        });
    }

    fn on_response(&mut self, ctx: &mut TransactionContext<'_>, response: Response) {
        let state = self.core.state;
        match state {
            TransactionState::Calling | TransactionState::Proceeding => {
                self.cancel_timer(ctx, TimerKind::A);

                if response.is_provisional() {
                    if state == TransactionState::Calling {
                        self.move_to(ctx, TransactionState::Proceeding);
                    }
                    self.forward(ctx, response);
                    return;
                }

                self.cancel_timer(ctx, TimerKind::B);

                if response.is_success() {
                    self.forward(ctx, response);
                    if self.core.reliable {
                        self.move_to(ctx, TransactionState::Terminated);
                    } else {
                        self.move_to(ctx, TransactionState::Completed);
                    }
                    return;
                }

                match create_ack_for_failure(&self.core.request, &response) {
                    Ok(ack) => {
                        ctx.send(ack.clone(), false);
                        self.core.ack = Some(ack);
                    }
                    Err(e) => debug!(id = %self.core.key, error = %e, "could not build ACK for failure response"),
                }
                self.core.last_final = Some(response.clone());
                self.forward(ctx, response);
                self.move_to(ctx, TransactionState::Completed);
            }
            TransactionState::Completed => {
                if response.is_success() {
                    // 2xx retransmissions are for the TU to ACK
                    self.forward(ctx, response);
                } else if response.is_final() {
                    if let Some(ack) = self.core.ack.clone() {
                        trace!(id = %self.core.key, "Re-sending ACK for retransmitted final response");
                        ctx.send(ack, true);
                    }
                }
            }
            _ => {
                trace!(id = %self.core.key, state = ?state, "Ignoring response");
            }
        }
    }
}

impl TransactionLogic for ClientInviteTransaction {
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
            TransactionState::Calling => {
                let (t1, timer_b) = (ctx.settings.t1, ctx.settings.timer_b);
                ctx.send(self.core.request.clone(), false);
                if !self.core.reliable {
                    self.start_timer(ctx, TimerKind::A, t1);
                }
                self.start_timer(ctx, TimerKind::B, timer_b);
            }
            TransactionState::Completed => {
                if self.core.last_final.is_some() {
                    let wait = ctx.settings.timer_d(self.core.reliable);
                    if wait.is_zero() {
                        self.move_to(ctx, TransactionState::Terminated);
                    } else {
                        self.start_timer(ctx, TimerKind::D, wait);
                    }
                } else {
                    // Completed by a 2xx: linger to pass retransmitted 2xx up
                    let stale = ctx.settings.stale;
                    self.start_timer(ctx, TimerKind::Stale, stale);
                }
            }
            _ => {}
        }
    }

    fn process_message(&mut self, ctx: &mut TransactionContext<'_>, message: Message) {
        match message {
            Message::Response(response) => self.on_response(ctx, response),
            Message::Request(request) => {
                trace!(id = %self.core.key, method = %request.method(), "Client transaction ignoring request");
            }
        }
    }

    fn handle_timer(&mut self, ctx: &mut TransactionContext<'_>, timer: &FiredTimer) {
        match (timer.kind, self.core.state) {
            (TimerKind::A, TransactionState::Calling) => {
                trace!(id = %self.core.key, interval = ?timer.duration, "Timer A fired, retransmitting INVITE");
                ctx.send(self.core.request.clone(), true);
                let next = ctx.settings.next_retransmit(timer.duration, false);
                self.start_timer(ctx, TimerKind::A, next);
            }
            (TimerKind::B, TransactionState::Calling) => self.time_out(ctx),
            (TimerKind::D, TransactionState::Completed)
            | (TimerKind::Stale, TransactionState::Completed) => {
                self.move_to(ctx, TransactionState::Terminated);
            }
            (kind, state) => {
                trace!(id = %self.core.key, timer = %kind, state = ?state, "Ignoring timer");
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

    fn invite() -> Request {
        Request::new(Method::Invite, "sip:bob@10.0.0.2".parse().unwrap())
            .with_header(TypedHeader::Via("SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bKict".parse().unwrap()))
            .with_header(TypedHeader::From("<sip:alice@10.0.0.1>;tag=a1".parse().unwrap()))
            .with_header(TypedHeader::To("<sip:bob@10.0.0.2>".parse().unwrap()))
            .with_header(TypedHeader::CallId("ict-call".into()))
            .with_header(TypedHeader::CSeq(CSeq::new(1, Method::Invite)))
    }

    fn response(status: StatusCode) -> Response {
        crate::transaction::utils::create_response(&invite(), status)
    }

    fn transaction(target: Target) -> ClientInviteTransaction {
        let request = invite();
        let key = TransactionKey::for_client_request(&request).unwrap();
        ClientInviteTransaction::new(TransactionCore::new(key, TransactionKind::InviteClient, request, Some(target)))
    }

    fn wires(outputs: &[TransactionOutput]) -> usize {
        outputs.iter().filter(|o| matches!(o, TransactionOutput::Wire { .. })).count()
    }

    #[test]
    fn test_start_sends_and_arms_a_and_b() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::udp("10.0.0.2:5060".parse().unwrap()));
        let mut ctx = TransactionContext::new(Instant::now(), &mut timers, &settings);

        tx.start(&mut ctx);
        assert_eq!(tx.state(), TransactionState::Calling);
        assert_eq!(wires(&ctx.outputs), 1);
        assert!(tx.core().has_timer(TimerKind::A));
        assert!(tx.core().has_timer(TimerKind::B));
    }

    #[test]
    fn test_reliable_transport_skips_timer_a() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::tcp("10.0.0.2:5060".parse().unwrap()));
        let mut ctx = TransactionContext::new(Instant::now(), &mut timers, &settings);

        tx.start(&mut ctx);
        assert!(!tx.core().has_timer(TimerKind::A));
        assert!(tx.core().has_timer(TimerKind::B));

        tx.process_message(&mut ctx, Message::Response(response(StatusCode::BUSY_HERE)));
        // ACK sent, Timer D is zero on TCP
        assert_eq!(tx.state(), TransactionState::Terminated);
    }

    #[test]
    fn test_failure_response_is_acked_and_absorbed() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::udp("10.0.0.2:5060".parse().unwrap()));
        let now = Instant::now();
        let mut ctx = TransactionContext::new(now, &mut timers, &settings);

        tx.start(&mut ctx);
        ctx.outputs.clear();
        tx.process_message(&mut ctx, Message::Response(response(StatusCode::BUSY_HERE)));
        assert_eq!(tx.state(), TransactionState::Completed);
        assert!(tx.core().has_timer(TimerKind::D));
        assert!(!tx.core().has_timer(TimerKind::A));
        let forwarded = ctx
            .outputs
            .iter()
            .filter(|o| matches!(o, TransactionOutput::Tu(TransactionEvent::Response { .. })))
            .count();
        assert_eq!(forwarded, 1);
        assert_eq!(wires(&ctx.outputs), 1);

        ctx.outputs.clear();
        tx.process_message(&mut ctx, Message::Response(response(StatusCode::BUSY_HERE)));
        assert!(matches!(
            ctx.outputs.as_slice(),
            [TransactionOutput::Wire { retransmission: true, .. }]
        ));
    }

    #[test]
    fn test_provisional_then_success() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::udp("10.0.0.2:5060".parse().unwrap()));
        let mut ctx = TransactionContext::new(Instant::now(), &mut timers, &settings);

        tx.start(&mut ctx);
        tx.process_message(&mut ctx, Message::Response(response(StatusCode::RINGING)));
        assert_eq!(tx.state(), TransactionState::Proceeding);
        assert!(!tx.core().has_timer(TimerKind::A));

        tx.process_message(&mut ctx, Message::Response(response(StatusCode::OK)));
        assert_eq!(tx.state(), TransactionState::Completed);
        assert!(tx.core().has_timer(TimerKind::Stale));
        assert!(tx.core().ack.is_none());
    }

    #[test]
    fn test_timer_a_doubles_without_cap() {
        let settings = TimerSettings::default();
        let mut timers = TimerQueue::new();
        let mut tx = transaction(Target::udp("10.0.0.2:5060".parse().unwrap()));
        let start = Instant::now();
        {
            let mut ctx = TransactionContext::new(start, &mut timers, &settings);
            tx.start(&mut ctx);
        }

        let fired = timers.pop_expired(start + Duration::from_millis(500));
        assert_eq!(fired.len(), 1);
        assert!(tx.claim_timer(&fired[0]));
        let mut ctx = TransactionContext::new(start + Duration::from_millis(500), &mut timers, &settings);
        tx.handle_timer(&mut ctx, &fired[0]);
        assert!(matches!(
            ctx.outputs.as_slice(),
            [TransactionOutput::Wire { retransmission: true, .. }]
        ));
        drop(ctx);
        assert_eq!(timers.time_until_next(start + Duration::from_millis(500)), Some(Duration::from_secs(1)));
    }
}
