// SMF format version constants.
//
// Every SMF encoding announces a (major, minor) version before any header
// data. Consumers receive it through `ParserEvents::on_version_received`.

use std::fmt;

// =============================================================================
// Current Versions
// =============================================================================

/// Latest major version of the binary encoding.
pub const SMF_BINARY_VERSION_MAJOR: u32 = 1;

/// Latest minor version of the binary encoding.
pub const SMF_BINARY_VERSION_MINOR: u32 = 0;

/// Version written by default serializers.
pub const DEFAULT_BINARY_VERSION: FormatVersion =
    FormatVersion::new(SMF_BINARY_VERSION_MAJOR, SMF_BINARY_VERSION_MINOR);

// =============================================================================
// FormatVersion
// =============================================================================

/// A format version. Ordered by major, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns true if this version is at least `target`.
    #[inline]
    pub fn at_least(self, target: FormatVersion) -> bool {
        self >= target
    }

    /// Returns true if a reader for `self` can read data written as `other`.
    ///
    /// Minor versions are backwards compatible within one major version.
    #[inline]
    pub fn can_read(self, other: FormatVersion) -> bool {
        self.major == other.major && self.minor >= other.minor
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
