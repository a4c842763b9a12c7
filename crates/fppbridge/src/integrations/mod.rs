#[cfg(feature = "integration_fpp")]
pub mod fpp;
