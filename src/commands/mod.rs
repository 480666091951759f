//! User-facing operations
//!
//! A single command lives here: producing the pin-diff report between two
//! revisions of the deployment repository. It composes the mirror store,
//! manifest reader, diff calculator, and range resolver into the full
//! pipeline and collects per-project failures along the way.

pub mod report;
