//! Disposable container environments for plugin dependency installation.
//!
//! The `plugpack-isolation` crate runs shell scripts inside throw-away
//! containers that see exactly one host directory, mounted read-write at
//! [`MOUNT_TARGET`]. Callers describe a run with a [`ContainerRun`], then hand
//! it to a [`ContainerRuntime`]. The production runtime, [`DockerCli`], drives
//! the `docker` client with an argument vector, so no host shell ever parses
//! the request.
//!
//! Every run holds to three rules:
//! - Containers are always started with `--rm` and are gone once the call
//!   returns, whether the script succeeded or not.
//! - Scripts run as the invoking user and group, so everything written into
//!   the mount stays readable and deletable on the host.
//! - Values interpolated into scripts must pass through [`shell::quote`].
//!
//! ```rust,no_run
//! use plugpack_isolation::{ContainerRun, ContainerRuntime, DockerCli, Owner, shell};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let script = shell::chain(["cd /plugin", "ls -la"]);
//! let run = ContainerRun::new("python:3.11", "/tmp/build", script)
//!     .with_owner(Owner::current());
//!
//! let output = DockerCli::new().run(&run)?;
//! println!("{}", output.as_text());
//! # Ok(()) }
//! ```

mod error;
mod owner;
pub mod process;
mod run;
mod runtime;
pub mod shell;

#[cfg(test)]
mod tests;

pub use error::IsolationError;
pub use owner::Owner;
pub use run::{ContainerRun, MOUNT_TARGET};
pub use runtime::{ContainerOutput, ContainerRuntime, DockerCli};
