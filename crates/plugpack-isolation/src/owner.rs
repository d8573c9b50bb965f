//! Host user and group identity applied to containerised processes.

use std::fmt;

/// Numeric user and group that a container process runs as.
///
/// Running as the invoking user keeps files written into the mounted build
/// directory owned by that user, so the host can read and delete them later.
///
/// ```
/// use plugpack_isolation::Owner;
///
/// let owner = Owner::new(1002, 1030);
/// assert_eq!(owner.to_string(), "1002:1030");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    uid: u32,
    gid: u32,
}

impl Owner {
    /// Creates an owner from raw numeric identifiers.
    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// Returns the real user and group of the current process.
    #[cfg(unix)]
    #[must_use]
    pub fn current() -> Self {
        use nix::unistd::{getgid, getuid};
        Self::new(getuid().as_raw(), getgid().as_raw())
    }

    /// Returns the root identity on platforms without POSIX ownership.
    #[cfg(not(unix))]
    #[must_use]
    pub const fn current() -> Self {
        Self::new(0, 0)
    }

    /// Returns the numeric user identifier.
    #[must_use]
    pub const fn uid(self) -> u32 {
        self.uid
    }

    /// Returns the numeric group identifier.
    #[must_use]
    pub const fn gid(self) -> u32 {
        self.gid
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}
