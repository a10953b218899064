//! Synchronization primitives for the monitor control plane
//!
//! Manual-reset events grouped in an [`EventSet`] so a waiter can block on
//! any subset with one condition variable, plus a counting [`Semaphore`]
//! guarding the dump slot.

mod event;
mod semaphore;

pub use event::{Event, EventSet, WaitAny, WaitResult, wait_any};
pub use semaphore::Semaphore;
