use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How a plugin's third-party dependencies are packaged for its platforms.
///
/// Parsing is case-sensitive: only the lowercase names are accepted, so a
/// misspelt method fails loudly rather than falling back to a default.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PackagingMethod {
    /// All dependencies are packaged once and shared across platforms.
    /// Only safe when every dependency is platform-independent.
    Common,
    /// Dependencies are packaged separately for each supported platform.
    /// Most reliable, at the cost of a larger plugin archive.
    Separate,
    /// The builder probes both platforms and picks one of the above.
    #[default]
    Autodetect,
}
