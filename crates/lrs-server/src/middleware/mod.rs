//! HTTP middleware applied around the router.

pub mod compat;
pub mod request_id;
