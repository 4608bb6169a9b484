// Gated AI operations: prompt building, the provider seam and the HTTP entry
// point that wraps every provider call in the usage gate.

pub mod handlers;
pub mod prompts;
pub mod provider;
