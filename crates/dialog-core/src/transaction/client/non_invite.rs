//! Client non-INVITE transaction (RFC 3261 Section 17.1.2)
//!
//! Timer E retransmits the request starting at T1 and doubling up to T2 while
//! in Trying; after a provisional response it keeps retransmitting every T2.
//! Timer F bounds the whole exchange. Timer K absorbs retransmitted final
//! responses and is zero on reliable transports.

use tracing::trace;

use sipflow_sip_core::{Message, Response};

use crate::transaction::events::TransactionEvent;
use crate::transaction::logic::{TransactionContext, TransactionCore, TransactionLogic};
use crate::transaction::state::TransactionState;
use crate::transaction::timer::{FiredTimer, TimerKind};

#[derive(Debug)]
pub struct ClientNonInviteTransaction {
    core: TransactionCore,
}

impl ClientNonInviteTransaction {
    pub fn new(core: TransactionCore) -> Self {
        Self { core }
    }

    /// Sends the request. Requires a target.
    pub fn start(&mut self, ctx: &mut TransactionContext<'_>) {
        self.move_to(ctx, TransactionState::Trying);
    }

    fn forward(&self, ctx: &mut TransactionContext<'_>, response: Response) {
        ctx.to_tu(TransactionEvent::Response {
            key: self.core.key.clone(),
            response,
        });
    }

    fn on_response(&mut self, ctx: &mut TransactionContext<'_>, response: Response) {
        match self.core.state {
            TransactionState::Trying | TransactionState::Proceeding => {
                if response.is_provisional() {
                    self.move_to(ctx, TransactionState::Proceeding);
                    self.forward(ctx, response);
                    return;
                }
                self.cancel_timer(ctx, TimerKind::E);
                self.cancel_timer(ctx, TimerKind::F);
                self.core.last_final = Some(response.clone());
                self.forward(ctx, response);
                self.move_to(ctx, TransactionState::Completed);
            }
            state => {
                trace!(id = %self.core.key, state = ?state, status = response.status_code(), "Absorbing response");
            }
        }
    }
}

impl TransactionLogic for ClientNonInviteTransaction {
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
            TransactionState::Trying => {
                let (t1, timer_f) = (ctx.settings.t1, ctx.settings.timer_f);
                ctx.send(self.core.request.clone(), false);
                if !self.core.reliable {
                    self.start_timer(ctx, TimerKind::E, t1);
                }
                self.start_timer(ctx, TimerKind::F, timer_f);
            }
            TransactionState::Completed => {
                let wait = ctx.settings.timer_k(self.core.reliable);
                if wait.is_zero() {
                    self.move_to(ctx, TransactionState::Terminated);
                } else {
                    self.start_timer(ctx, TimerKind::K, wait);
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
            (TimerKind::E, state @ (TransactionState::Trying | TransactionState::Proceeding)) => {
                trace!(id = %self.core.key, interval = ?timer.duration, "Timer E fired, retransmitting request");
                ctx.send(self.core.request.clone(), true);
                let next = if state == TransactionState::Proceeding {
                    ctx.settings.t2
                } else {
                    ctx.settings.next_retransmit(timer.duration, true)
                };
                self.start_timer(ctx, TimerKind::E, next);
            }
            (TimerKind::F, TransactionState::Trying | TransactionState::Proceeding) => {
                self.time_out(ctx)
            }
            (TimerKind::K, TransactionState::Completed) => {
                self.move_to(ctx, TransactionState::Terminated);
            }
            (kind, state) => {
                trace!(id = %self.core.key, timer = %kind, state = ?state, "Ignoring timer");
            }
        }
    }
}
