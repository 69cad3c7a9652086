//! `remitdesk-api` — HTTP surface for the Remitdesk control plane.

pub mod app;
pub mod authz;
pub mod middleware;
