//! The contract between the controller and the four transaction state machines
//!
//! A state machine never performs I/O and never looks at the clock. Each call
//! gets a [`TransactionContext`] carrying the current time, the controller's
//! timer queue and an output buffer. Messages to send and events for the TU
//! are appended to the buffer; the controller carries them out after the call
//! returns. Timers fire only as [`FiredTimer`] values handed to
//! [`TransactionLogic::handle_timer`] from the controller's processing step.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use sipflow_sip_core::{Message, Request, Response};
use sipflow_sip_transport::Target;

use crate::dialog::DialogId;
use crate::transaction::error::Result;
use crate::transaction::events::TransactionEvent;
use crate::transaction::key::TransactionKey;
use crate::transaction::state::{TransactionKind, TransactionState};
use crate::transaction::timer::{FiredTimer, TimerId, TimerKind, TimerQueue, TimerSettings};

/// Something a transaction asked the controller to do
#[derive(Debug, Clone)]
pub enum TransactionOutput {
    /// Send a message to the transaction's current target
    Wire {
        message: Message,
        retransmission: bool,
    },
    /// Deliver an event to the TU
    Tu(TransactionEvent),
}

/// Per-call environment handed to a state machine
pub struct TransactionContext<'a> {
    pub now: Instant,
    pub timers: &'a mut TimerQueue,
    pub settings: &'a TimerSettings,
    pub outputs: Vec<TransactionOutput>,
}

impl<'a> TransactionContext<'a> {
    pub fn new(now: Instant, timers: &'a mut TimerQueue, settings: &'a TimerSettings) -> Self {
        Self {
            now,
            timers,
            settings,
            outputs: Vec::new(),
        }
    }

    pub fn send(&mut self, message: impl Into<Message>, retransmission: bool) {
        self.outputs.push(TransactionOutput::Wire {
            message: message.into(),
            retransmission,
        });
    }

    pub fn to_tu(&mut self, event: TransactionEvent) {
        self.outputs.push(TransactionOutput::Tu(event));
    }
}

impl fmt::Debug for TransactionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContext")
            .field("now", &self.now)
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

/// State shared by every transaction kind
#[derive(Debug)]
pub struct TransactionCore {
    pub key: TransactionKey,
    pub kind: TransactionKind,
    pub state: TransactionState,
    /// The request that created the transaction
    pub request: Request,
    /// Where the request came from (server transactions)
    pub source: Option<SocketAddr>,
    /// Where messages are sent; `None` while a client waits for resolution
    pub target: Option<Target>,
    /// Remaining resolved targets to fail over to
    pub candidates: VecDeque<Target>,
    pub reliable: bool,
    pub last_provisional: Option<Response>,
    pub last_final: Option<Response>,
    /// ACK sent for a non-2xx final response (client INVITE)
    pub ack: Option<Request>,
    /// Dialog this transaction runs inside, if the request was in-dialog
    pub dialog: Option<DialogId>,
    timers: HashMap<TimerKind, TimerId>,
    timeout_reported: bool,
}

impl TransactionCore {
    pub fn new(
        key: TransactionKey,
        kind: TransactionKind,
        request: Request,
        target: Option<Target>,
    ) -> Self {
        let reliable = target.map(|t| t.is_reliable()).unwrap_or(false);
        let dialog = DialogId::from_request(&request, kind.is_server());
        Self {
            key,
            kind,
            state: TransactionState::Initial,
            request,
            source: None,
            target,
            candidates: VecDeque::new(),
            reliable,
            last_provisional: None,
            last_final: None,
            ack: None,
            dialog,
            timers: HashMap::new(),
            timeout_reported: false,
        }
    }

    pub fn with_source(mut self, source: SocketAddr) -> Self {
        self.source = Some(source);
        self
    }

    /// Switches to a new target, typically the next resolved candidate
    pub fn set_target(&mut self, target: Target) {
        self.reliable = target.is_reliable();
        self.target = Some(target);
    }

    /// Moves to the next candidate after a send failure
    pub fn advance_target(&mut self) -> Option<Target> {
        let next = self.candidates.pop_front()?;
        self.set_target(next);
        Some(next)
    }

    pub fn has_timer(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }
}

/// Trait defining the specific logic for a type of SIP transaction.
///
/// Implementors provide the state-specific handling for messages, timers and
/// state entry; the default methods handle the parts common to all four
/// machines: validated transitions, timer bookkeeping, timeout reporting and
/// termination.
pub trait TransactionLogic: Send + fmt::Debug {
    fn core(&self) -> &TransactionCore;

    fn core_mut(&mut self) -> &mut TransactionCore;

    /// Starts the timers and sends the messages required on entering `new_state`
    fn on_enter_state(
        &mut self,
        ctx: &mut TransactionContext<'_>,
        new_state: TransactionState,
        previous_state: TransactionState,
    );

    /// Processes a message matched to this transaction: a response for a
    /// client transaction, a retransmitted request or ACK for a server one
    fn process_message(&mut self, ctx: &mut TransactionContext<'_>, message: Message);

    /// Handles one of this transaction's timers
    fn handle_timer(&mut self, ctx: &mut TransactionContext<'_>, timer: &FiredTimer);

    /// Sends a response from the TU. Only server transactions accept one.
    fn send_response(&mut self, ctx: &mut TransactionContext<'_>, response: Response) {
        let _ = ctx;
        warn!(id = %self.key(), status = response.status_code(), "response handed to a client transaction, dropped");
    }

    fn key(&self) -> &TransactionKey {
        &self.core().key
    }

    fn kind(&self) -> TransactionKind {
        self.core().kind
    }

    fn state(&self) -> TransactionState {
        self.core().state
    }

    fn is_terminated(&self) -> bool {
        self.state().is_terminated()
    }

    /// Validated state change followed by [`TransactionLogic::on_enter_state`]
    ///
    /// Entering `Terminated` cancels every remaining timer. Termination itself
    /// is silent; timeouts and transport failures report their own events.
    fn transition_to(
        &mut self,
        ctx: &mut TransactionContext<'_>,
        new_state: TransactionState,
    ) -> Result<()> {
        let previous_state = self.state();
        if previous_state == new_state {
            trace!(id = %self.key(), state = ?new_state, "Already in requested state, no transition needed.");
            return Ok(());
        }
        TransactionState::validate_transition(self.kind(), previous_state, new_state)?;

        debug!(id = %self.key(), "State transition: {:?} -> {:?}", previous_state, new_state);
        self.core_mut().state = new_state;

        if new_state == TransactionState::Terminated {
            self.cancel_all_timers(ctx);
        }

        self.on_enter_state(ctx, new_state, previous_state);
        Ok(())
    }

    /// Transition that cannot fail for the caller's state; logs if it does
    fn move_to(&mut self, ctx: &mut TransactionContext<'_>, new_state: TransactionState) {
        if let Err(e) = self.transition_to(ctx, new_state) {
            warn!(id = %self.key(), error = %e, "rejected state transition");
        }
    }

    /// Schedules `kind`, replacing a pending timer of the same kind
    fn start_timer(&mut self, ctx: &mut TransactionContext<'_>, kind: TimerKind, duration: Duration) {
        let key = self.key().clone();
        let id = ctx.timers.schedule(ctx.now, key, kind, duration);
        if let Some(old) = self.core_mut().timers.insert(kind, id) {
            ctx.timers.cancel(old);
        }
        trace!(id = %self.key(), timer = %kind, ?duration, "Started timer");
    }

    fn cancel_timer(&mut self, ctx: &mut TransactionContext<'_>, kind: TimerKind) {
        if let Some(id) = self.core_mut().timers.remove(&kind) {
            ctx.timers.cancel(id);
            trace!(id = %self.key(), timer = %kind, "Cancelled timer");
        }
    }

    fn cancel_all_timers(&mut self, ctx: &mut TransactionContext<'_>) {
        for (_, id) in self.core_mut().timers.drain() {
            ctx.timers.cancel(id);
        }
    }

    /// Claims a fired timer. Returns false for a timer this transaction no
    /// longer tracks (replaced or cancelled after it was popped).
    fn claim_timer(&mut self, timer: &FiredTimer) -> bool {
        let timers = &mut self.core_mut().timers;
        match timers.get(&timer.kind) {
            Some(id) if *id == timer.id => {
                timers.remove(&timer.kind);
                true
            }
            _ => false,
        }
    }

    /// Reports a B/F/H timeout once and terminates
    fn time_out(&mut self, ctx: &mut TransactionContext<'_>) {
        if !self.core().timeout_reported {
            self.core_mut().timeout_reported = true;
            warn!(id = %self.key(), state = ?self.state(), "Transaction timed out");
            let key = self.key().clone();
            let method = self.core().request.method().clone();
            ctx.to_tu(TransactionEvent::Timeout { key, method });
        }
        self.move_to(ctx, TransactionState::Terminated);
    }

    /// Every target refused the message
    fn transport_failed(&mut self, ctx: &mut TransactionContext<'_>, reason: String) {
        if self.is_terminated() {
            return;
        }
        warn!(id = %self.key(), %reason, "Transport failure, terminating transaction");
        let key = self.key().clone();
        ctx.to_tu(TransactionEvent::TransportFailure { key, reason });
        self.move_to(ctx, TransactionState::Terminated);
    }

    /// Sends the last provisional or final response again
    fn resend_last_response(&mut self, ctx: &mut TransactionContext<'_>) {
        let core = self.core();
        let last = core.last_final.as_ref().or(core.last_provisional.as_ref()).cloned();
        if let Some(response) = last {
            trace!(id = %self.key(), status = response.status_code(), "Retransmitting response");
            ctx.send(response, true);
        }
    }
}
