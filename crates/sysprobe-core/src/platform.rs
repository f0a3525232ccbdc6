//! Supported target platforms.
//!
//! Every parser branch in this crate is selected by a [`Platform`] value
//! fixed at check construction time, never re-checked per field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of platforms the checks know how to parse output for.
///
/// An unrecognized platform string fails at the edge ([`FromStr`]); a check
/// asked to run on a platform it has no branch for returns
/// `CheckError::UnsupportedPlatform` instead of guessing a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    FreeBsd,
    Darwin,
}

impl Platform {
    /// Platform of the running process, if it is one we support.
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else if cfg!(target_os = "freebsd") {
            Some(Platform::FreeBsd)
        } else if cfg!(target_os = "macos") {
            Some(Platform::Darwin)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::FreeBsd => "freebsd",
            Platform::Darwin => "darwin",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "freebsd" => Ok(Platform::FreeBsd),
            "darwin" | "macos" => Ok(Platform::Darwin),
            other => Err(format!("unsupported platform '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags() {
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("FreeBSD".parse::<Platform>().unwrap(), Platform::FreeBsd);
        assert_eq!("darwin".parse::<Platform>().unwrap(), Platform::Darwin);
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::Darwin);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!("sunos".parse::<Platform>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for p in [Platform::Linux, Platform::FreeBsd, Platform::Darwin] {
            assert_eq!(p.to_string().parse::<Platform>().unwrap(), p);
        }
    }
}
