//! API request handlers.

/// Question answering handler.
pub mod ask;
/// Liveness handler.
pub mod health;
