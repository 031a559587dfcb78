//! Locally persisted marketplace state.
//!
//! The ledger keeps orders, proposals and users in the configured storage
//! backend and answers the same backend traits as the REST client, so the
//! whole workflow can run without a server.

pub mod ledger;

pub use ledger::OrderLedger;
