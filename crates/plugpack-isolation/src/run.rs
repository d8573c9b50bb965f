//! Declarative description of a single container run.

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::IsolationError;
use crate::owner::Owner;

/// Path at which the host directory is mounted inside every container.
pub const MOUNT_TARGET: &str = "/plugin";

/// Shell used to interpret the run's script inside the container.
const SCRIPT_SHELL: [&str; 3] = ["/bin/bash", "-l", "-c"];

/// One disposable container invocation.
///
/// A run names the image, the host directory to bind at [`MOUNT_TARGET`], the
/// bash script to execute, and optionally the owner the script runs as.
///
/// ```
/// use plugpack_isolation::{ContainerRun, Owner};
///
/// let run = ContainerRun::new("builder:latest", "/tmp/build", "cd /plugin")
///     .with_owner(Owner::new(1000, 1000));
/// let args = run.client_args().expect("valid mount");
/// assert_eq!(args.first().map(String::as_str), Some("run"));
/// assert!(args.contains(&String::from("--rm")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRun {
    image: String,
    mount: Utf8PathBuf,
    script: String,
    owner: Option<Owner>,
}

impl ContainerRun {
    /// Creates a run of `script` in `image` with `mount` bound read-write.
    #[must_use]
    pub fn new(
        image: impl Into<String>,
        mount: impl Into<Utf8PathBuf>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            mount: mount.into(),
            script: script.into(),
            owner: None,
        }
    }

    /// Runs the script as the given user and group.
    #[must_use]
    pub const fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Returns the image name.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Returns the host directory bound into the container.
    #[must_use]
    pub fn mount(&self) -> &Utf8Path {
        &self.mount
    }

    /// Returns the script executed inside the container.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Returns the owner the script runs as, if one was set.
    #[must_use]
    pub const fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Builds the argument vector passed to the container client.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::InvalidMount`] when the host directory is
    /// relative or contains a `:`, which would corrupt the volume binding.
    pub fn client_args(&self) -> Result<Vec<String>, IsolationError> {
        let volume = self.volume_binding()?;
        let mut args = vec![
            String::from("run"),
            String::from("--rm"),
            String::from("--volume"),
            volume,
        ];
        if let Some(owner) = self.owner {
            args.push(String::from("--user"));
            args.push(owner.to_string());
        }
        args.push(self.image.clone());
        args.extend(SCRIPT_SHELL.iter().map(|part| (*part).to_owned()));
        args.push(self.script.clone());
        Ok(args)
    }

    fn volume_binding(&self) -> Result<String, IsolationError> {
        if !self.mount.is_absolute() {
            return Err(IsolationError::InvalidMount {
                path: self.mount.clone(),
                reason: "host directory must be absolute",
            });
        }
        if self.mount.as_str().contains(':') {
            return Err(IsolationError::InvalidMount {
                path: self.mount.clone(),
                reason: "host directory must not contain ':'",
            });
        }
        Ok(format!("{}:{MOUNT_TARGET}:rw", self.mount))
    }
}
