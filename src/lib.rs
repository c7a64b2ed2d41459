/// Account variants, the type registry, and the shared transfer rules:
/// batch validation plus forward/revert transitions.
pub mod account;

/// Spendable value and replay-protection nonce of an account.
pub mod balance;

/// Cursor-based byte buffer used by the account wire format.
pub mod serial_buffer;

/// Read-only transaction values consumed by [`account`].
pub mod transaction;

/// Ledger commands parsed from raw feed rows, later executed by [`processor`].
pub mod command;

/// Ledger processor interface, plus "in memory" implementation.
/// Owns the accounts and drives validation and transitions for each command.
pub mod processor;

/// Replays a CSV command feed through the in-memory processor and prints the
/// resulting accounts. Kept in the library so integration tests can drive it.
pub mod bin_utils;
