//! Server non-INVITE transaction (RFC 3261 Section 17.2.2)
//!
//! The request reaches the TU once. Retransmissions are answered with the last
//! response sent, or absorbed if nothing was sent yet. Timer J keeps the
//! transaction around after the final response to absorb late retransmissions;
//! it is zero on reliable transports.

use tracing::{trace, warn};

use sipflow_sip_core::{Message, Response};

use crate::transaction::events::TransactionEvent;
use crate::transaction::logic::{TransactionContext, TransactionCore, TransactionLogic};
use crate::transaction::state::TransactionState;
use crate::transaction::timer::{FiredTimer, TimerKind};

#[derive(Debug)]
pub struct ServerNonInviteTransaction {
    core: TransactionCore,
}

impl ServerNonInviteTransaction {
    pub fn new(core: TransactionCore) -> Self {
        Self { core }
    }

    /// Enters Trying. CANCEL transactions are answered by the controller and
    /// are not delivered as plain requests.
    pub fn start(&mut self, ctx: &mut TransactionContext<'_>, deliver_to_tu: bool) {
        self.move_to(ctx, TransactionState::Trying);
        if deliver_to_tu {
            if let Some(source) = self.core.source {
                ctx.to_tu(TransactionEvent::Request {
                    key: self.core.key.clone(),
                    request: self.core.request.clone(),
                    source,
                });
            }
        }
    }
}

impl TransactionLogic for ServerNonInviteTransaction {
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
        if new_state == TransactionState::Completed {
            let wait = ctx.settings.timer_j(self.core.reliable);
            if wait.is_zero() {
                self.move_to(ctx, TransactionState::Terminated);
            } else {
                self.start_timer(ctx, TimerKind::J, wait);
            }
        }
    }

    fn process_message(&mut self, ctx: &mut TransactionContext<'_>, message: Message) {
        match (message, self.core.state) {
            (Message::Request(_), TransactionState::Proceeding | TransactionState::Completed) => {
                trace!(id = %self.core.key, "Request retransmission, re-sending last response");
                self.resend_last_response(ctx);
            }
            (message, state) => {
                trace!(id = %self.core.key, state = ?state, "Absorbing {}", message.short_description());
            }
        }
    }

    fn handle_timer(&mut self, ctx: &mut TransactionContext<'_>, timer: &FiredTimer) {
        match (timer.kind, self.core.state) {
            (TimerKind::J, TransactionState::Completed) => {
                self.move_to(ctx, TransactionState::Terminated);
            }
            (kind, state) => {
                trace!(id = %self.core.key, timer = %kind, state = ?state, "Ignoring timer");
            }
        }
    }

    fn send_response(&mut self, ctx: &mut TransactionContext<'_>, response: Response) {
        match self.core.state {
            TransactionState::Trying | TransactionState::Proceeding => {
                ctx.send(response.clone(), false);
                if response.is_provisional() {
                    self.core.last_provisional = Some(response);
                    self.move_to(ctx, TransactionState::Proceeding);
                } else {
                    self.core.last_final = Some(response);
                    self.move_to(ctx, TransactionState::Completed);
                }
            }
            state => {
                warn!(id = %self.core.key, state = ?state, status = response.status_code(), "Response after final response, dropped");
            }
        }
    }
}
