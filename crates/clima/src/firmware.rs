use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use serde::{Deserialize, Serialize};

// The grammar published alongside `SemVer 2.0.0`, with `\d` spelled out as
// `[0-9]` so that non-ASCII digits are rejected.
//
// Numeric identifiers carry no leading zeros, pre-release identifiers follow
// the same rule when purely numeric, build metadata accepts any leading zeros.
const SEMVER_PATTERN: &str = concat!(
    r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)",
    r"(?:-((?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*)",
    r"(?:\.(?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*))*))?",
    r"(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
);

// Compiled once per process and never mutated afterwards.
static SEMVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SEMVER_PATTERN).expect("the SemVer grammar is a valid pattern"));

/// Returns `true` when `version` is a complete `SemVer 2.0.0` string.
///
/// The whole input must match: no surrounding whitespace, no `v` prefix, no
/// partial versions such as `1.2`.
///
/// ```
/// use clima::firmware::is_valid_semver;
///
/// assert!(is_valid_semver("1.2.3-rc.1+build.5"));
/// assert!(!is_valid_semver("01.2.3"));
/// ```
#[must_use]
#[inline]
pub fn is_valid_semver(version: &str) -> bool {
    SEMVER.is_match(version)
}

/// A firmware version string rejected by the `SemVer 2.0.0` grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFirmwareVersion {
    value: String,
}

impl InvalidFirmwareVersion {
    /// Returns the rejected value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns a message suitable for a field-attributed validation error.
    #[must_use]
    pub fn message(&self) -> Cow<'static, str> {
        if self.value.is_empty() {
            Cow::Borrowed("The firmware version is required.")
        } else {
            Cow::Owned(format!(
                "The firmware version `{}` is not a valid semantic version.",
                self.value
            ))
        }
    }
}

impl std::fmt::Display for InvalidFirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for InvalidFirmwareVersion {}

/// A firmware version known to be a well-formed `SemVer 2.0.0` string.
///
/// The version is only ever checked for well-formedness, it is never split
/// into its numeric components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FirmwareVersion(String);

impl FirmwareVersion {
    /// Creates a [`FirmwareVersion`].
    ///
    /// # Errors
    ///
    /// Returns an error if `version` does not match the `SemVer 2.0.0`
    /// grammar.
    pub fn new(version: impl Into<String>) -> Result<Self, InvalidFirmwareVersion> {
        let version = version.into();
        if is_valid_semver(&version) {
            Ok(Self(version))
        } else {
            Err(InvalidFirmwareVersion { value: version })
        }
    }

    /// Returns the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for FirmwareVersion {
    type Err = InvalidFirmwareVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for FirmwareVersion {
    type Error = InvalidFirmwareVersion;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for FirmwareVersion {
    type Error = InvalidFirmwareVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FirmwareVersion> for String {
    fn from(version: FirmwareVersion) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{deserialize, serialize};

    use super::{FirmwareVersion, is_valid_semver};

    #[test]
    fn accepts_core_triples() {
        for version in ["1.0.0", "0.0.1", "0.0.0", "1.2.3", "10.20.30", "999.0.12"] {
            assert!(is_valid_semver(version), "`{version}` should be valid");
        }
    }

    #[test]
    fn accepts_pre_release_and_build_metadata() {
        for version in [
            "2.3.4-alpha.1",
            "1.0.0+build.5",
            "1.2.3-rc.1+build.5",
            "1.0.0-alpha",
            "1.0.0-alpha.beta",
            "1.0.0-0.3.7",
            "1.0.0-x.7.z.92",
            "1.0.0-x-y-z.--",
            "1.0.0-0A.is.legal",
            "1.0.0+0.build.1-rc.10000aaa-kk-0.1",
            "1.0.0+001",
            "1.0.0-alpha+001",
            "1.0.0-rc.1+build.1",
        ] {
            assert!(is_valid_semver(version), "`{version}` should be valid");
        }
    }

    #[test]
    fn rejects_missing_components() {
        for version in ["", "1", "1.0", "1.2.", ".1.2", "1..2", "1.2.3."] {
            assert!(!is_valid_semver(version), "`{version}` should be invalid");
        }
    }

    #[test]
    fn rejects_leading_zeros() {
        for version in ["01.0.0", "1.01.0", "1.0.01", "1.0.0-01", "1.0.0-alpha.01"] {
            assert!(!is_valid_semver(version), "`{version}` should be invalid");
        }
    }

    #[test]
    fn rejects_malformed_suffixes() {
        for version in [
            "1.0.0-",
            "1.0.0+",
            "1.0.0-+build",
            "1.0.0-alpha.",
            "1.0.0-alpha..1",
            "1.0.0+build..1",
            "1.0.0-alpha_beta",
            "1.0.0+build+1",
        ] {
            assert!(!is_valid_semver(version), "`{version}` should be invalid");
        }
    }

    #[test]
    fn rejects_partial_matches() {
        for version in [
            "v1.0.0",
            " 1.0.0",
            "1.0.0 ",
            "1.0.0\n",
            "1.0.0.0",
            "a1.0.0",
            "1.2.3-rc.1+build.5 trailing",
            "\u{661}.0.0",
        ] {
            assert!(!is_valid_semver(version), "`{version:?}` should be invalid");
        }
    }

    #[test]
    fn firmware_version_new() {
        let version = FirmwareVersion::new("1.2.3-rc.1").unwrap();
        assert_eq!(version.as_str(), "1.2.3-rc.1");
        assert_eq!(version.to_string(), "1.2.3-rc.1");

        let error = FirmwareVersion::new("1.2").unwrap_err();
        assert_eq!(error.value(), "1.2");
        assert_eq!(
            error.to_string(),
            "The firmware version `1.2` is not a valid semantic version."
        );

        let error = "".parse::<FirmwareVersion>().unwrap_err();
        assert_eq!(error.to_string(), "The firmware version is required.");
    }

    #[test]
    fn firmware_version_serde() {
        let version = FirmwareVersion::try_from("0.4.0+esp32").unwrap();
        assert_eq!(serialize(&version), json!("0.4.0+esp32"));
        assert_eq!(
            deserialize::<FirmwareVersion>(json!("0.4.0+esp32")),
            version
        );
        assert!(serde_json::from_value::<FirmwareVersion>(json!("0.4")).is_err());
    }
}
