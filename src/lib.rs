//! Purpose: Ship the geoclient native geocoding engine inside this crate and bind it at runtime.
//! Exports: `api` (loader surface), `diagnostics`, `response`.
//! Role: Library used by geocoding callers before any native entry point is invoked.
//! Invariants: Callers must check the load outcome; there is no degraded mode without the library.
//! Invariants: Core modules stay private; `api` is the public path to them.
pub mod api;
mod core;
pub mod diagnostics;
pub mod response;
