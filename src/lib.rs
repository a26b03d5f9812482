//! Resolve VMware Cloud Director entities by filter criteria.

pub mod config;
pub mod filter;
pub mod vcd;

/// Version injected at compile time via VCD_FILTER_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("VCD_FILTER_VERSION") {
    Some(v) => v,
    None => "dev",
};
