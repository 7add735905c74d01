/// Version of the software (the Cargo package version).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
