//! Route handlers for the passgate API.

pub mod health;
pub mod login;
