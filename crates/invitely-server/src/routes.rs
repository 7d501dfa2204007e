//! HTTP route handlers

pub mod publish;
pub mod themes;
