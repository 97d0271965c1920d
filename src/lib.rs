//! # Passgate (timing-safe login endpoint)
//!
//! `passgate` serves a single `POST /login` endpoint that checks an
//! email/password pair against a fixed, read-only credential table.
//!
//! ## Validation order
//!
//! 1. Only `POST` is accepted (`405` otherwise).
//! 2. The body must be JSON with exactly `email` and `password` (`400`).
//! 3. The email must match a strict address grammar (`400`). The grammar is
//!    evaluated by the `regex` crate, whose automaton runs in linear time, and
//!    overlong input is rejected before matching.
//! 4. The password is compared against the stored secret in constant time
//!    (`401` on mismatch).
//!
//! Unknown emails and wrong passwords produce byte-identical `401` responses,
//! and both paths perform the same digest comparison so response timing does
//! not reveal whether an account exists.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
