//! Core contracts: the remote API seam, the session handle and the error model.

pub mod api;
pub mod error;
pub mod session;
