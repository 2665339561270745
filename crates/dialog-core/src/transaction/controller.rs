//! # Transaction Controller
//!
//! The controller owns every live transaction, the timer queue and the three
//! FIFOs that connect the transaction layer to the transport below and the TU
//! above. All transaction state is advanced from one place,
//! [`Controller::process_at`], so there is never more than one writer.
//!
//! ## Processing step
//!
//! Each call to `process_at(now)`:
//!
//! 1. moves resolver results into the inbound FIFO,
//! 2. fires every timer due at `now`,
//! 3. handles up to `max_events_per_step` inbound items,
//! 4. handles up to `max_events_per_step` TU commands,
//! 5. reaps transactions that reached Terminated,
//! 6. republishes statistics when `stats_interval` has passed,
//! 7. emits [`TransactionEvent::ShutdownComplete`] once, when shutdown was
//!    requested and everything has drained.
//!
//! The per-step caps keep a flood on one side from starving the other.
//!
//! ## Hosting
//!
//! [`Controller::run`] is a ready-made tokio loop: it processes, then sleeps
//! until the next timer deadline or until work arrives. Hosts with their own
//! event loop call [`Controller::process_at`] and
//! [`Controller::time_till_next_wakeup`] directly; tests pass synthetic
//! instants to replay whole exchanges deterministically.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sipflow_dialog_core::prelude::*;
//! use sipflow_sip_transport::MemoryTransport;
//!
//! # async fn example() {
//! let transport = MemoryTransport::udp("127.0.0.1:5060".parse().unwrap());
//! let mut controller = Controller::new(ControllerConfig::default());
//! controller.add_transport(Arc::new(transport));
//! let handle = controller.handle();
//! tokio::spawn(controller.run());
//!
//! while let Some(event) = Some(handle.next_event().await) {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use sipflow_sip_core::{Message, Method, Request, Response, StatusCode, Uri};
use sipflow_sip_transport::{
    Resolution, ResolutionSink, ResolutionToken, Target, TargetResolver, Transport, TransportEvent,
    TransportKind,
};

use crate::config::ControllerConfig;
use crate::transaction::client::ClientTransaction;
use crate::transaction::error::{Error, Result};
use crate::transaction::events::{ControllerInput, TransactionEvent, TuCommand};
use crate::transaction::fifo::TimeLimitFifo;
use crate::transaction::key::TransactionKey;
use crate::transaction::logic::{TransactionContext, TransactionCore, TransactionLogic, TransactionOutput};
use crate::transaction::server::{ServerInviteTransaction, ServerNonInviteTransaction, ServerTransaction};
use crate::transaction::state::{TransactionKind, TransactionState};
use crate::transaction::stats::{StatisticsManager, StatsHandle, TransactionStats};
use crate::transaction::timer::{FiredTimer, TimerQueue};
use crate::transaction::utils::{create_response, extract_resolution_uri, extract_response_target};

/// Longest sleep of [`Controller::run`] when nothing is scheduled and
/// statistics are published every step
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// What a pending resolution will be used for
#[derive(Debug)]
enum PendingResolution {
    /// A client transaction waiting for its first target
    Transaction(TransactionKey),
    /// A stateless message (ACK for 2xx) waiting for a target
    Stateless(Message),
}

/// Cloneable access to a running [`Controller`] from other tasks
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    inbound: TimeLimitFifo<ControllerInput>,
    commands: TimeLimitFifo<TuCommand>,
    tu: TimeLimitFifo<TransactionEvent>,
    shutdown: Arc<AtomicBool>,
    wakeup: Arc<Notify>,
    stats: StatsHandle,
}

impl ControllerHandle {
    /// Hands a message from a transport to the controller
    ///
    /// New requests are subject to the inbound FIFO's admission limits and
    /// fail with [`Error::NotAdmitted`] when it is over them. Responses and
    /// ACKs complete existing work and are always queued.
    pub fn receive_from_wire(
        &self,
        message: Message,
        source: SocketAddr,
        kind: TransportKind,
    ) -> Result<()> {
        let is_new_work = matches!(&message, Message::Request(r) if r.method() != &Method::Ack);
        let input = ControllerInput::Wire {
            message,
            source,
            kind,
        };
        if is_new_work {
            self.inbound.try_push(input).map_err(|_| {
                debug!(%source, "inbound queue over limit, refusing request");
                Error::NotAdmitted
            })
        } else {
            self.inbound.push(input);
            Ok(())
        }
    }

    /// Feeds an event from a transport's event channel
    pub fn handle_transport_event(&self, event: TransportEvent) -> Result<()> {
        match event {
            TransportEvent::MessageReceived {
                message,
                source,
                kind,
                ..
            } => self.receive_from_wire(message, source, kind),
            TransportEvent::Error { error } => {
                warn!(%error, "transport reported an error");
                Ok(())
            }
            TransportEvent::Closed => {
                debug!("transport closed");
                Ok(())
            }
        }
    }

    /// Starts a client transaction for `request`
    ///
    /// The top Via must carry an RFC 3261 branch. Without a `target` the
    /// request is routed through the configured [`TargetResolver`]. ACK is sent
    /// statelessly and creates no transaction.
    pub fn send_request(&self, request: Request, target: Option<Target>) -> Result<TransactionKey> {
        if self.is_shutting_down() && request.method() != &Method::Ack {
            return Err(Error::ShutdownInProgress);
        }
        let key = TransactionKey::for_client_request(&request)?;
        self.commands.push(TuCommand::SendRequest {
            key: key.clone(),
            request,
            target,
        });
        Ok(key)
    }

    /// Sends a response on the server transaction `key`
    pub fn send_response(&self, key: &TransactionKey, response: Response) -> Result<()> {
        self.commands.push(TuCommand::SendResponse {
            key: key.clone(),
            response,
        });
        Ok(())
    }

    /// Waits for the next event for the TU
    pub async fn next_event(&self) -> TransactionEvent {
        self.tu.recv().await
    }

    pub fn try_next_event(&self) -> Option<TransactionEvent> {
        self.tu.pop()
    }

    /// Refuses new transactions from now on; existing ones run to completion
    pub fn request_shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            info!("Transaction layer shutdown requested");
        }
        self.wakeup.notify_one();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Whether a new inbound request would be admitted right now
    pub fn would_accept_more_work(&self) -> bool {
        !self.is_shutting_down() && self.inbound.would_accept()
    }

    /// Last published statistics
    pub fn stats_snapshot(&self) -> TransactionStats {
        self.stats.snapshot()
    }
}

/// Single-threaded owner of all transaction state
pub struct Controller {
    config: ControllerConfig,
    transports: HashMap<TransportKind, Arc<dyn Transport>>,
    resolver: Option<Arc<dyn TargetResolver>>,
    clients: HashMap<TransactionKey, ClientTransaction>,
    servers: HashMap<TransactionKey, ServerTransaction>,
    timers: TimerQueue,
    inbound: TimeLimitFifo<ControllerInput>,
    commands: TimeLimitFifo<TuCommand>,
    tu: TimeLimitFifo<TransactionEvent>,
    resolution_tx: ResolutionSink,
    resolution_rx: mpsc::UnboundedReceiver<Resolution>,
    pending_resolutions: HashMap<ResolutionToken, PendingResolution>,
    next_token: u64,
    stats: StatisticsManager,
    shutdown: Arc<AtomicBool>,
    wakeup: Arc<Notify>,
    shutdown_complete_sent: bool,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        let (resolution_tx, resolution_rx) = mpsc::unbounded_channel();
        let inbound = TimeLimitFifo::new(config.max_fifo_size, config.max_fifo_time_depth);
        let stats = StatisticsManager::new(config.stats_interval);
        Self {
            config,
            transports: HashMap::new(),
            resolver: None,
            clients: HashMap::new(),
            servers: HashMap::new(),
            timers: TimerQueue::new(),
            inbound,
            commands: TimeLimitFifo::unbounded(),
            tu: TimeLimitFifo::unbounded(),
            resolution_tx,
            resolution_rx,
            pending_resolutions: HashMap::new(),
            next_token: 0,
            stats,
            shutdown: Arc::new(AtomicBool::new(false)),
            wakeup: Arc::new(Notify::new()),
            shutdown_complete_sent: false,
        }
    }

    /// Registers the transport used for targets of its kind
    pub fn add_transport(&mut self, transport: Arc<dyn Transport>) {
        debug!(kind = %transport.kind(), "registering transport");
        self.transports.insert(transport.kind(), transport);
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TargetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn set_resolver(&mut self, resolver: Arc<dyn TargetResolver>) {
        self.resolver = Some(resolver);
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            inbound: self.inbound.clone(),
            commands: self.commands.clone(),
            tu: self.tu.clone(),
            shutdown: self.shutdown.clone(),
            wakeup: self.wakeup.clone(),
            stats: self.stats.handle(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// State of a live transaction
    pub fn transaction_state(&self, key: &TransactionKey) -> Option<TransactionState> {
        if key.is_server {
            self.servers.get(key).map(|tx| tx.logic().state())
        } else {
            self.clients.get(key).map(|tx| tx.logic().state())
        }
    }

    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete_sent
    }

    /// Whether a new inbound request would be admitted right now
    pub fn would_accept_more_work(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst) && self.inbound.would_accept()
    }

    /// How long the host may wait before the next `process_at`
    ///
    /// Zero when queued work or transport output is pending, otherwise the
    /// time to the earliest timer. `None` means nothing is scheduled.
    pub fn time_till_next_wakeup(&mut self, now: Instant) -> Option<Duration> {
        let busy = !self.inbound.is_empty()
            || !self.commands.is_empty()
            || self.transports.values().any(|t| t.has_data_to_send());
        if busy {
            return Some(Duration::ZERO);
        }
        self.timers.time_until_next(now)
    }

    /// One processing step at the current time
    pub fn process(&mut self) {
        self.process_at(Instant::now());
    }

    /// One processing step at `now`
    pub fn process_at(&mut self, now: Instant) {
        while let Ok(resolution) = self.resolution_rx.try_recv() {
            self.inbound.push(ControllerInput::TargetsResolved(resolution));
        }

        for fired in self.timers.pop_expired(now) {
            self.dispatch_timer(now, fired);
        }

        for _ in 0..self.config.max_events_per_step {
            match self.inbound.pop() {
                Some(input) => self.handle_input(now, input),
                None => break,
            }
        }

        for _ in 0..self.config.max_events_per_step {
            match self.commands.pop() {
                Some(command) => self.handle_command(now, command),
                None => break,
            }
        }

        self.reap_terminated();

        self.stats
            .set_active(self.timers.len(), self.clients.len(), self.servers.len());
        self.stats.maybe_publish(now);

        self.check_shutdown_complete();
    }

    /// Runs the controller on the current tokio runtime until shutdown
    /// completes
    pub async fn run(mut self) {
        info!("Transaction controller running");
        let inbound = self.inbound.clone();
        let commands = self.commands.clone();
        let wakeup = self.wakeup.clone();

        loop {
            self.process();
            if self.shutdown_complete_sent {
                break;
            }

            let wait = self.next_wait(Instant::now());

            let resolved = tokio::select! {
                _ = tokio::time::sleep(wait) => None,
                _ = inbound.ready() => None,
                _ = commands.ready() => None,
                _ = wakeup.notified() => None,
                resolution = self.resolution_rx.recv() => resolution,
            };
            if let Some(resolution) = resolved {
                self.inbound.push(ControllerInput::TargetsResolved(resolution));
            }
        }
        info!("Transaction controller stopped");
    }

    /// How long [`Controller::run`] may sleep before the next step
    ///
    /// Bounded by the statistics interval so snapshots stay fresh. A zero
    /// interval already publishes on every step and does not bound the sleep.
    fn next_wait(&mut self, now: Instant) -> Duration {
        let interval = self.config.stats_interval;
        match self.time_till_next_wakeup(now) {
            Some(wait) if interval.is_zero() => wait,
            Some(wait) => wait.min(interval),
            None if interval.is_zero() => IDLE_WAIT,
            None => interval,
        }
    }

    fn dispatch_timer(&mut self, now: Instant, fired: FiredTimer) {
        let key = fired.key.clone();
        let handled = self.with_transaction(now, &key, |tx, ctx| {
            if tx.claim_timer(&fired) {
                trace!(id = %fired.key, timer = %fired.kind, "Timer fired");
                tx.handle_timer(ctx, &fired);
            } else {
                trace!(id = %fired.key, timer = %fired.kind, "Ignoring superseded timer");
            }
        });
        if !handled {
            trace!(id = %key, timer = %fired.kind, "Timer for reaped transaction");
        }
    }

    fn handle_input(&mut self, now: Instant, input: ControllerInput) {
        match input {
            ControllerInput::TargetsResolved(resolution) => self.on_resolution(now, resolution),
            ControllerInput::Wire {
                message,
                source,
                kind,
            } => {
                self.stats.received(&message);
                match message {
                    Message::Response(response) => self.on_response(now, response),
                    Message::Request(request) => self.on_request(now, request, source, kind),
                }
            }
        }
    }

    fn on_response(&mut self, now: Instant, response: Response) {
        let key = match TransactionKey::for_response(&response) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "dropping unkeyable response");
                self.stats.stray_response();
                return;
            }
        };
        let matched = self.with_client(now, &key, |tx, ctx| {
            tx.logic_mut().process_message(ctx, Message::Response(response))
        });
        if !matched {
            debug!(id = %key, "stray response, no client transaction");
            self.stats.stray_response();
        }
    }

    fn on_request(&mut self, now: Instant, request: Request, source: SocketAddr, kind: TransportKind) {
        let key = match TransactionKey::for_server_request(&request) {
            Ok(key) => key,
            Err(e) => {
                debug!(%source, error = %e, "dropping unkeyable request");
                return;
            }
        };

        if self.servers.contains_key(&key) {
            self.with_server(now, &key, |tx, ctx| {
                tx.logic_mut().process_message(ctx, Message::Request(request))
            });
            return;
        }

        match request.method() {
            Method::Ack => {
                trace!(%source, "ACK without server transaction, passing to TU");
                self.deliver(TransactionEvent::AckFor2xx { request, source });
            }
            Method::Cancel => self.on_cancel(now, key, request, source, kind),
            _ => self.on_new_request(now, key, request, source, kind),
        }
    }

    fn on_new_request(
        &mut self,
        now: Instant,
        key: TransactionKey,
        request: Request,
        source: SocketAddr,
        kind: TransportKind,
    ) {
        if self.shutdown.load(Ordering::SeqCst) {
            debug!(id = %key, "shutting down, rejecting new request with 503");
            self.reject_statelessly(&request, source, kind);
            return;
        }
        let capacity = self.config.tu_fifo_capacity;
        if capacity > 0 && self.tu.len() >= capacity {
            warn!(id = %key, backlog = self.tu.len(), "TU queue full, rejecting new request with 503");
            self.stats.tu_fifo_drop();
            self.reject_statelessly(&request, source, kind);
            return;
        }

        let target = extract_response_target(&request, source, kind);
        let invite = request.method().is_invite();
        let tx_kind = if invite {
            TransactionKind::InviteServer
        } else {
            TransactionKind::NonInviteServer
        };
        let core = TransactionCore::new(key.clone(), tx_kind, request, Some(target)).with_source(source);
        let transaction = if invite {
            ServerTransaction::Invite(ServerInviteTransaction::new(core, self.config.send_100_trying))
        } else {
            ServerTransaction::NonInvite(ServerNonInviteTransaction::new(core))
        };

        debug!(id = %key, %source, "Creating server transaction");
        self.servers.insert(key.clone(), transaction);
        self.with_server(now, &key, |tx, ctx| match tx {
            ServerTransaction::Invite(tx) => tx.start(ctx),
            ServerTransaction::NonInvite(tx) => tx.start(ctx, true),
        });
    }

    /// CANCEL runs in its own non-INVITE server transaction. It is answered
    /// here: 200 when it matches a pending INVITE, 481 otherwise.
    fn on_cancel(
        &mut self,
        now: Instant,
        key: TransactionKey,
        cancel: Request,
        source: SocketAddr,
        kind: TransportKind,
    ) {
        let invite_key = key.with_method(Method::Invite);
        let matched = self
            .servers
            .get(&invite_key)
            .map(ServerTransaction::is_cancellable)
            .unwrap_or(false);

        let status = if matched {
            StatusCode::OK
        } else {
            StatusCode::CALL_OR_TRANSACTION_DOES_NOT_EXIST
        };
        let response = create_response(&cancel, status);

        let target = extract_response_target(&cancel, source, kind);
        let core = TransactionCore::new(key.clone(), TransactionKind::NonInviteServer, cancel.clone(), Some(target))
            .with_source(source);
        self.servers
            .insert(key.clone(), ServerTransaction::NonInvite(ServerNonInviteTransaction::new(core)));
        self.with_server(now, &key, |tx, ctx| {
            if let ServerTransaction::NonInvite(tx) = tx {
                tx.start(ctx, false);
            }
            tx.logic_mut().send_response(ctx, response);
        });

        if matched {
            debug!(id = %invite_key, "CANCEL matched pending INVITE");
            self.deliver(TransactionEvent::Cancel { invite_key, cancel });
        } else {
            debug!(id = %key, "CANCEL matched nothing, answered 481");
            self.stats.unmatched_cancel();
        }
    }

    fn on_resolution(&mut self, now: Instant, resolution: Resolution) {
        let Some(pending) = self.pending_resolutions.remove(&resolution.token) else {
            trace!(token = %resolution.token, "resolution for nothing pending");
            return;
        };

        match (pending, resolution.result) {
            (PendingResolution::Transaction(key), Ok(targets)) if !targets.is_empty() => {
                self.with_client(now, &key, |tx, ctx| {
                    let core = tx.logic_mut().core_mut();
                    core.candidates = targets.into_iter().collect();
                    if core.advance_target().is_some() {
                        tx.start(ctx);
                    }
                });
            }
            (PendingResolution::Transaction(key), result) => {
                let reason = match result {
                    Err(e) => e.to_string(),
                    Ok(_) => "no targets".to_string(),
                };
                self.with_client(now, &key, |tx, ctx| tx.logic_mut().transport_failed(ctx, reason));
            }
            (PendingResolution::Stateless(message), Ok(targets)) => {
                if let Some(target) = targets.first() {
                    self.send_stateless(*target, &message);
                }
            }
            (PendingResolution::Stateless(message), Err(e)) => {
                warn!(error = %e, "could not resolve target for {}", message.short_description());
            }
        }
    }

    fn handle_command(&mut self, now: Instant, command: TuCommand) {
        match command {
            TuCommand::SendRequest {
                key,
                request,
                target,
            } => {
                if request.method() == &Method::Ack {
                    let message = Message::Request(request);
                    match target {
                        Some(target) => self.send_stateless(target, &message),
                        None => {
                            let uri = match &message {
                                Message::Request(r) => extract_resolution_uri(r),
                                Message::Response(_) => return,
                            };
                            self.resolve(&uri, PendingResolution::Stateless(message), now);
                        }
                    }
                    return;
                }
                self.start_client(now, key, request, target);
            }
            TuCommand::SendResponse { key, response } => {
                let found = self.with_server(now, &key, |tx, ctx| tx.logic_mut().send_response(ctx, response));
                if !found {
                    warn!(id = %key, "response for unknown server transaction, dropped");
                }
            }
        }
    }

    fn start_client(&mut self, now: Instant, key: TransactionKey, request: Request, target: Option<Target>) {
        if self.clients.contains_key(&key) {
            warn!(error = %Error::TransactionExists(key), "request not sent");
            return;
        }

        let tx_kind = if key.is_invite() {
            TransactionKind::InviteClient
        } else {
            TransactionKind::NonInviteClient
        };
        let uri = extract_resolution_uri(&request);
        let core = TransactionCore::new(key.clone(), tx_kind, request, target);
        debug!(id = %key, "Creating client transaction");
        self.clients.insert(key.clone(), ClientTransaction::new(core));

        if target.is_some() {
            self.with_client(now, &key, |tx, ctx| tx.start(ctx));
        } else {
            self.resolve(&uri, PendingResolution::Transaction(key), now);
        }
    }

    fn resolve(&mut self, uri: &Uri, pending: PendingResolution, now: Instant) {
        let Some(resolver) = self.resolver.clone() else {
            match pending {
                PendingResolution::Transaction(key) => {
                    self.with_client(now, &key, |tx, ctx| {
                        tx.logic_mut()
                            .transport_failed(ctx, "no target and no resolver".to_string())
                    });
                }
                PendingResolution::Stateless(message) => {
                    warn!("no resolver, dropping {}", message.short_description());
                }
            }
            return;
        };

        self.next_token += 1;
        let token = ResolutionToken(self.next_token);
        trace!(%token, %uri, "resolving target");
        self.pending_resolutions.insert(token, pending);
        resolver.resolve(uri, token, self.resolution_tx.clone());
    }

    fn reject_statelessly(&mut self, request: &Request, source: SocketAddr, kind: TransportKind) {
        let response = create_response(request, StatusCode::SERVICE_UNAVAILABLE);
        let target = extract_response_target(request, source, kind);
        self.send_stateless(target, &Message::Response(response));
    }

    fn send_stateless(&mut self, target: Target, message: &Message) {
        match self.send_to(target, message) {
            Ok(()) => self.stats.sent(message, false),
            Err(e) => warn!(%target, error = %e, "stateless send failed"),
        }
    }

    fn send_to(&self, target: Target, message: &Message) -> std::result::Result<(), sipflow_sip_transport::Error> {
        let transport = self
            .transports
            .get(&target.kind)
            .ok_or(sipflow_sip_transport::Error::UnsupportedTransport(target.kind))?;
        transport.send(message, target.addr)
    }

    fn deliver(&mut self, event: TransactionEvent) {
        match &event {
            TransactionEvent::Timeout { .. } => self.stats.timeout(),
            TransactionEvent::TransportFailure { .. } => self.stats.transport_failure(),
            _ => {}
        }
        self.tu.push(event);
    }

    fn with_client(
        &mut self,
        now: Instant,
        key: &TransactionKey,
        f: impl FnOnce(&mut ClientTransaction, &mut TransactionContext<'_>),
    ) -> bool {
        let Some(tx) = self.clients.get_mut(key) else {
            return false;
        };
        let mut ctx = TransactionContext::new(now, &mut self.timers, &self.config.timers);
        f(tx, &mut ctx);
        let outputs = ctx.outputs;
        self.execute(now, key, outputs);
        true
    }

    fn with_server(
        &mut self,
        now: Instant,
        key: &TransactionKey,
        f: impl FnOnce(&mut ServerTransaction, &mut TransactionContext<'_>),
    ) -> bool {
        let Some(tx) = self.servers.get_mut(key) else {
            return false;
        };
        let mut ctx = TransactionContext::new(now, &mut self.timers, &self.config.timers);
        f(tx, &mut ctx);
        let outputs = ctx.outputs;
        self.execute(now, key, outputs);
        true
    }

    fn with_transaction(
        &mut self,
        now: Instant,
        key: &TransactionKey,
        f: impl FnOnce(&mut dyn TransactionLogic, &mut TransactionContext<'_>),
    ) -> bool {
        if key.is_server {
            self.with_server(now, key, |tx, ctx| f(tx.logic_mut(), ctx))
        } else {
            self.with_client(now, key, |tx, ctx| f(tx.logic_mut(), ctx))
        }
    }

    fn core_mut(&mut self, key: &TransactionKey) -> Option<&mut TransactionCore> {
        if key.is_server {
            self.servers.get_mut(key).map(|tx| tx.logic_mut().core_mut())
        } else {
            self.clients.get_mut(key).map(|tx| tx.logic_mut().core_mut())
        }
    }

    /// Carries out what a transaction asked for
    fn execute(&mut self, now: Instant, key: &TransactionKey, outputs: Vec<TransactionOutput>) {
        for output in outputs {
            match output {
                TransactionOutput::Tu(event) => self.deliver(event),
                TransactionOutput::Wire {
                    message,
                    retransmission,
                } => self.transmit(now, key, message, retransmission),
            }
        }
    }

    /// Sends to the transaction's target, failing over through the remaining
    /// candidates. When none is left the transaction reports a transport
    /// failure and terminates.
    fn transmit(&mut self, now: Instant, key: &TransactionKey, message: Message, retransmission: bool) {
        loop {
            let Some(target) = self.core_mut(key).and_then(|core| core.target) else {
                warn!(id = %key, "no target for {}", message.short_description());
                return;
            };

            let error = match self.send_to(target, &message) {
                Ok(()) => {
                    trace!(id = %key, %target, retransmission, "sent {}", message.short_description());
                    self.stats.sent(&message, retransmission);
                    return;
                }
                Err(e) => e,
            };

            let next = self.core_mut(key).and_then(TransactionCore::advance_target);
            match next {
                Some(next) => {
                    info!(id = %key, failed = %target, %next, error = %error, "send failed, trying next target");
                }
                None => {
                    let reason = error.to_string();
                    self.with_transaction(now, key, |tx, ctx| tx.transport_failed(ctx, reason));
                    return;
                }
            }
        }
    }

    fn reap_terminated(&mut self) {
        let before = self.clients.len() + self.servers.len();
        self.clients.retain(|_, tx| !tx.logic().is_terminated());
        self.servers.retain(|_, tx| !tx.logic().is_terminated());
        let reaped = before - (self.clients.len() + self.servers.len());
        if reaped > 0 {
            trace!(reaped, "Reaped terminated transactions");
        }
    }

    fn check_shutdown_complete(&mut self) {
        if self.shutdown_complete_sent || !self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        let drained = self.clients.is_empty()
            && self.servers.is_empty()
            && self.inbound.is_empty()
            && self.commands.is_empty()
            && self.pending_resolutions.is_empty();
        // Events already in the TU FIFO stay ahead of ShutdownComplete, so a
        // TU that reads up to it has drained that FIFO too
        if drained {
            info!("Transaction layer drained, shutdown complete");
            self.shutdown_complete_sent = true;
            self.tu.push(TransactionEvent::ShutdownComplete);
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("clients", &self.clients.len())
            .field("servers", &self.servers.len())
            .field("timers", &self.timers.len())
            .field("inbound", &self.inbound.len())
            .field("commands", &self.commands.len())
            .field("shutdown", &self.shutdown.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_wait_without_stats_interval_is_not_zero() {
        let mut controller = Controller::new(ControllerConfig::default().with_stats_interval(Duration::ZERO));
        let wait = controller.next_wait(Instant::now());
        assert_eq!(wait, IDLE_WAIT);
        assert!(!wait.is_zero());
    }

    #[test]
    fn test_idle_wait_follows_stats_interval() {
        let mut controller = Controller::new(ControllerConfig::default());
        assert_eq!(controller.next_wait(Instant::now()), Duration::from_secs(60));

        let mut controller =
            Controller::new(ControllerConfig::default().with_stats_interval(Duration::from_millis(250)));
        assert_eq!(controller.next_wait(Instant::now()), Duration::from_millis(250));
    }
}
