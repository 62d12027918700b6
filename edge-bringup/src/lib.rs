#![cfg_attr(not(feature = "std"), no_std)]
#![allow(async_fn_in_trait)]
#![warn(clippy::large_futures)]
#![allow(clippy::uninlined_format_args)]

//! Network bring-up for a single interface.
//!
//! [`Bringup`] chains lease acquisition, link-level resolution of the peers,
//! name resolution of the time server and time synchronization, and starts
//! over from the top whenever the link drops or a step runs out of retries.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod bringup;
pub mod clock;
pub mod config;
#[cfg(feature = "io")]
pub mod io;
#[cfg(test)]
mod mock;
pub mod name;
pub mod peers;
pub mod time;

pub use bringup::{Bringup, NetConfig, State};
pub use clock::Clock;
pub use config::{Config, Error, Policy};
pub use name::NameResolver;
pub use peers::{Peer, Peers, Resolution, Resolver};
pub use time::TimeSync;
