//! Flush Registry Module
//!
//! This module tracks the flushes that have been created but not yet settled.
//! The registry is the only record of how many flushes are outstanding and is
//! what shutdown waits on.

mod flushes;
pub(crate) use flushes::{FlushRegistry, UnitOutcome};
