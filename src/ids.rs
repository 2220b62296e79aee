//! Prefixed string identifiers for standards, versions and change records.
//!
//! Ids are random (uuid-v4 derived) and carry a short type prefix so they
//! stay recognizable in file names and logs: `std_1a2b3c4d5e`,
//! `v_1a2b3c4d5e`, `chg_1a2b3c4d5e`.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;
use uuid::Uuid;

/// Length of the random hex portion after the prefix
const ID_HEX_LEN: usize = 10;

fn random_suffix() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..ID_HEX_LEN].to_string()
}

macro_rules! id_type {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                $name(format!(concat!($prefix, "_{}"), random_suffix()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name(s.to_string()))
            }
        }

        impl Deref for $name {
            type Target = String;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(fr: &str) -> Self {
                $name(fr.to_string())
            }
        }

        impl From<String> for $name {
            fn from(fr: String) -> Self {
                $name(fr)
            }
        }

        impl From<$name> for String {
            fn from(fr: $name) -> Self {
                fr.0
            }
        }
    };
}

id_type!(StandardId, "std");
id_type!(VersionId, "v");
id_type!(ChangeId, "chg");
