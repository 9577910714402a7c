//! Blacklist ledger mirroring an on-chain sparse Merkle commitment.
//!
//! The ledger keeps, per subject (e.g. per token), a membership set paired
//! with a sparse Merkle tree whose root must stay byte-for-byte consistent
//! with the root an external authority has committed. Every externally
//! visible operation re-fetches the committed root and aborts on
//! disagreement, converting silent cache divergence into an explicit
//! failure.

pub mod boundary;
pub mod ledger;
pub mod sim;

pub use boundary::{
    BoundaryError, ChainBoundary, SubjectId, TxReceipt, ADD_TO_BLACKLIST, GET_BLACKLIST_ROOT,
    REMOVE_FROM_BLACKLIST,
};
pub use ledger::{BlacklistLedger, LedgerError, ABSENT, PRESENT};
pub use sim::SimulatedAttestor;
