// AI usage gate: request fingerprinting, daily quota enforcement, shared
// result cache and the usage audit trail.
// Handlers call `UsageGate` before and after every billable AI operation.

pub mod clock;
pub mod fingerprint;
pub mod gate;
pub mod handlers;
pub mod operation;
pub mod postgres;
pub mod store;

#[cfg(test)]
pub mod memory;
