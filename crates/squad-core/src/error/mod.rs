//! Error types for Squad
//!
//! Every fallible operation in `squad-core` returns [`SquadResult`]. Variants carry a
//! human-readable message plus optional context describing where the failure happened.
//!
//! Teammate failures and poll timeouts are *not* errors: they are reported as
//! outcomes by the poller and the aggregator.

mod constructors;
mod conversions;
mod types;

pub use types::{ResultExt, SquadError, SquadResult};
