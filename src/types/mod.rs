pub mod cli;
pub mod credentials;
pub mod host_spec;

pub use cli::CliArgs;
pub use credentials::Credentials;
pub use host_spec::HostSpec;
