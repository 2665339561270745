//! Server transactions (RFC 3261 Section 17.2)

pub mod invite;
pub mod non_invite;

pub use invite::ServerInviteTransaction;
pub use non_invite::ServerNonInviteTransaction;

use crate::transaction::logic::TransactionLogic;

/// A server transaction of either kind
#[derive(Debug)]
pub enum ServerTransaction {
    Invite(ServerInviteTransaction),
    NonInvite(ServerNonInviteTransaction),
}

impl ServerTransaction {
    pub fn logic(&self) -> &dyn TransactionLogic {
        match self {
            ServerTransaction::Invite(tx) => tx,
            ServerTransaction::NonInvite(tx) => tx,
        }
    }

    pub fn logic_mut(&mut self) -> &mut dyn TransactionLogic {
        match self {
            ServerTransaction::Invite(tx) => tx,
            ServerTransaction::NonInvite(tx) => tx,
        }
    }

    /// INVITE transaction still waiting for a final response
    pub fn is_cancellable(&self) -> bool {
        match self {
            ServerTransaction::Invite(tx) => tx.is_cancellable(),
            ServerTransaction::NonInvite(_) => false,
        }
    }
}
