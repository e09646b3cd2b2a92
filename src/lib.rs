//! C-ABI bridge for a string doubler and a Compute Engine client probe.
//!
//! The shared library exports `StringDoubler`, `ComputeClientProbe` and
//! `FreeString` (see [`ffi`] for the ownership contract). The same
//! operations are available to Rust callers through [`doubler`] and
//! [`probe`], with credentials injected through
//! [`gcp::auth::CredentialProvider`].

pub mod config;
pub mod doubler;
pub mod ffi;
pub mod gcp;
pub mod probe;

/// Version injected at compile time via GCLOUD_BRIDGE_VERSION (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("GCLOUD_BRIDGE_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
