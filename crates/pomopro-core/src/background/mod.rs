//! Background timekeeping context.
//!
//! [`Timekeeper`] is the plain state holder; [`spawn`] runs it in its own
//! tokio task, wired to the foreground only through channels.

mod timekeeper;

pub use timekeeper::{spawn, ActiveTimer, Timekeeper, TimekeeperHandle, CHECK_INTERVAL};
