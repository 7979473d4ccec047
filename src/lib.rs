//! rondo: a music playback session with a browsable catalog.
//!
//! A [`library::MusicSource`] loads the catalog, a [`browser::Browser`]
//! serves the browse tree, and a [`session::PlaybackSession`] drives a
//! [`session::Player`]. Every surface observes the session through one
//! [`hub::SessionConnection`].

pub mod access;
pub mod audio;
pub mod browser;
pub mod config;
pub mod error;
pub mod hub;
pub mod library;
pub mod logging;
pub mod mpris;
pub mod notification;
pub mod runtime;
pub mod session;
pub mod store;

pub use error::{Error, Result};
