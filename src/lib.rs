//! ngsite manages nginx site configurations on a host: it renders server blocks for
//! static or reverse-proxied domains, enables and validates them before reloading
//! the server, appends sub-routes to existing sites, and drives certificate issuance
//! and renewal through the ACME client.

/// Certificate issuance and renewal.
pub mod certs;

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Default paths and names.
pub mod constants;

/// Error handling.
pub mod error;

/// Advisory locking between concurrent invocations.
pub mod lock;

/// Operator-facing facade.
pub mod manager;

/// Server control commands.
pub mod nginx;

/// Activation state machine.
pub mod pipeline;

/// Server block rendering.
pub mod render;

/// External command execution.
pub mod runner;

/// Site descriptors and input validation.
pub mod site;

/// Site record storage.
pub mod store;

/// Sub-route insertion.
pub mod subroute;

/// Test doubles shared by unit and integration tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
