//! Boundary contract between the ledger and the authoritative chain.
//!
//! The core never submits transactions itself; it hands the data the
//! surrounding workflow needs (a shield id and the current sibling path,
//! encoded as an ordered field element sequence) to an opaque service and
//! waits for durable completion.

use std::fmt;

use ark_bn254::Fr;
use thiserror::Error;

/// Method name for the authoritative blacklist insertion.
pub const ADD_TO_BLACKLIST: &str = "add_to_blacklist";

/// Method name for the authoritative blacklist removal.
pub const REMOVE_FROM_BLACKLIST: &str = "remove_from_blacklist";

/// Method name for reading the committed blacklist root.
pub const GET_BLACKLIST_ROOT: &str = "get_blacklist_root";

/// Opaque key identifying which blacklist an operation targets
/// (e.g. a token contract address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubjectId([u8; 32]);

impl SubjectId {
    /// Wrap a raw 32-byte identifier.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for SubjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Errors reported by the chain boundary.
#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("call to {method} rejected by the authoritative ledger: {reason}")]
    Rejected { method: String, reason: String },
    #[error("unknown method {0}")]
    UnknownMethod(String),
}

/// Receipt for a completed state-changing call.
#[derive(Clone, Debug)]
pub struct TxReceipt {
    /// Root committed by the authority after the call was applied.
    pub new_root: Fr,
}

/// External services the ledger consumes: a read call, a state-changing
/// call whose completion implies durability, and the committed-root oracle.
///
/// Sibling paths cross this boundary as ordered field element sequences,
/// leaf-to-root; mutation arguments are encoded `[shield_id, path...]`.
pub trait ChainBoundary {
    /// Synchronous-result read against the authoritative ledger.
    fn view_call(&self, subject: &SubjectId, method: &str, args: &[Fr])
        -> Result<Fr, BoundaryError>;

    /// State-changing call, awaited to durable completion.
    fn send_and_wait(
        &mut self,
        subject: &SubjectId,
        method: &str,
        args: &[Fr],
    ) -> Result<TxReceipt, BoundaryError>;

    /// Authoritative committed root for a subject.
    fn committed_root(&self, subject: &SubjectId) -> Result<Fr, BoundaryError> {
        self.view_call(subject, GET_BLACKLIST_ROOT, &[])
    }
}
