//! Adapters layer

pub mod sysinfo_sampler;

pub use sysinfo_sampler::SysinfoSampler;
