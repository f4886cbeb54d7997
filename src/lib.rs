/// Private and public account state. State is modified using events,
/// which are created by handling operations.
pub mod account;

/// Typed ledger calls, parsed from loosely typed call fields and later
/// executed by [`ledger`].
pub mod command;

/// Ledger interface, host collaborators, plus "in memory" implementation.
/// Coordinates account lookup, value transfers and event emission.
pub mod ledger;

/// CSV replay harness around the ledger, used by the binary and by the
/// integration tests.
pub mod bin_utils;
