//! Client transactions (RFC 3261 Section 17.1)

pub mod invite;
pub mod non_invite;

pub use invite::ClientInviteTransaction;
pub use non_invite::ClientNonInviteTransaction;

use crate::transaction::logic::{TransactionContext, TransactionCore, TransactionLogic};

/// A client transaction of either kind
#[derive(Debug)]
pub enum ClientTransaction {
    Invite(ClientInviteTransaction),
    NonInvite(ClientNonInviteTransaction),
}

impl ClientTransaction {
    /// Builds the right machine for the request's method
    pub fn new(core: TransactionCore) -> Self {
        if core.key.is_invite() {
            ClientTransaction::Invite(ClientInviteTransaction::new(core))
        } else {
            ClientTransaction::NonInvite(ClientNonInviteTransaction::new(core))
        }
    }

    /// Sends the request and arms the retransmit and timeout timers
    pub fn start(&mut self, ctx: &mut TransactionContext<'_>) {
        match self {
            ClientTransaction::Invite(tx) => tx.start(ctx),
            ClientTransaction::NonInvite(tx) => tx.start(ctx),
        }
    }

    pub fn logic(&self) -> &dyn TransactionLogic {
        match self {
            ClientTransaction::Invite(tx) => tx,
            ClientTransaction::NonInvite(tx) => tx,
        }
    }

    pub fn logic_mut(&mut self) -> &mut dyn TransactionLogic {
        match self {
            ClientTransaction::Invite(tx) => tx,
            ClientTransaction::NonInvite(tx) => tx,
        }
    }
}
