//! Invite ledger: attributes joins and leaves to the invite code that
//! produced them by diffing per-guild invite snapshots around each join.
//!
//! All state is in-memory and mutated only from the primary event loop.

pub mod ledger;

pub use ledger::{InviteLedger, InviteRecord, InviterStats, TimeWindowStats};
