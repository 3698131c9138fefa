// Core modules implementing platform naming, bundling, extraction, binding, and errors.
pub mod bind;
pub mod error;
pub mod extract;
pub mod loader;
pub mod platform;
pub mod resource;
