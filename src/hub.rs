//! Session connection and observer hub.
//!
//! Surfaces never touch the session directly: they read its state from the
//! observables on [`SessionConnection`] and send commands through it.

mod connection;
mod observable;

pub use connection::{CommandSink, NodeSubscription, SessionConnection};
pub use observable::{Observable, Subscription};

#[cfg(test)]
mod tests;
