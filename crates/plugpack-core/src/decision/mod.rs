//! Packaging-method decision engine.
//!
//! A plugin either ships one vendor directory shared by every platform or
//! one per supported operating system. The user may declare which, or ask
//! the builder to find out by resolving the requirements for each platform
//! and comparing the results.

use plugpack_config::PackagingMethod;
use tracing::info;

use crate::error::BuildError;
use crate::manifest::OperatingSystem;
use crate::report::PackageSet;
use crate::vendor::COMMON_VENDOR_DIR;

/// Tracing target for packaging decisions.
const DECISION_TARGET: &str = "plugpack_core::decision";

/// Requested packaging method together with the platforms it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackagingPlan {
    /// One shared vendor directory, no probe.
    Common,
    /// One vendor directory per listed platform, no probe.
    Separate(Vec<OperatingSystem>),
    /// Probe the listed platforms and choose.
    Autodetect(Vec<OperatingSystem>),
}

impl PackagingPlan {
    /// Pairs a packaging method with the plugin's supported platforms.
    #[must_use]
    pub fn new(method: PackagingMethod, systems: &[OperatingSystem]) -> Self {
        match method {
            PackagingMethod::Common => Self::Common,
            PackagingMethod::Separate => Self::Separate(systems.to_vec()),
            PackagingMethod::Autodetect => Self::Autodetect(systems.to_vec()),
        }
    }
}

/// Vendor directory layout chosen for a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorLayout {
    /// A single `vendor` directory used on every platform.
    Shared,
    /// A `vendor-<os>` directory for each listed platform.
    PerOs(Vec<OperatingSystem>),
}

impl VendorLayout {
    /// Names of the vendor directories this layout produces.
    #[must_use]
    pub fn vendor_dir_names(&self) -> Vec<&'static str> {
        match self {
            Self::Shared => vec![COMMON_VENDOR_DIR],
            Self::PerOs(systems) => systems
                .iter()
                .copied()
                .map(OperatingSystem::vendor_dir_name)
                .collect(),
        }
    }
}

/// Resolves the package set a platform would install.
pub trait PackageProbe {
    /// Returns the identities of the packages `os` resolves to.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the dry run or report parsing fails.
    fn probe(&self, os: OperatingSystem) -> Result<PackageSet, BuildError>;
}

/// Decides the vendor layout for a plan, probing when it asks to.
///
/// Autodetection with a single platform needs no probe and yields that
/// platform's own directory. With several platforms each is probed, Linux
/// first, and a shared directory is chosen only when every package set is
/// identical.
///
/// # Errors
///
/// Propagates probe failures unchanged.
pub fn decide<P>(plan: &PackagingPlan, probe: &P) -> Result<VendorLayout, BuildError>
where
    P: PackageProbe + ?Sized,
{
    let layout = match plan {
        PackagingPlan::Common => VendorLayout::Shared,
        PackagingPlan::Separate(systems) => VendorLayout::PerOs(systems.clone()),
        PackagingPlan::Autodetect(systems) if systems.len() <= 1 => {
            VendorLayout::PerOs(systems.clone())
        }
        PackagingPlan::Autodetect(systems) => {
            let mut probe_order = systems.clone();
            probe_order.sort_unstable();
            let sets = probe_order
                .iter()
                .map(|os| probe.probe(*os))
                .collect::<Result<Vec<_>, _>>()?;
            layout_from_package_sets(&sets, systems)
        }
    };
    info!(target: DECISION_TARGET, ?plan, ?layout, "packaging decision made");
    Ok(layout)
}

/// Chooses a shared directory when every package set is identical.
#[must_use]
pub fn layout_from_package_sets(
    sets: &[PackageSet],
    systems: &[OperatingSystem],
) -> VendorLayout {
    let all_equal = sets.windows(2).all(|pair| match pair {
        [first, second] => first == second,
        _ => true,
    });
    if all_equal {
        info!(target: DECISION_TARGET, "common vendor directory is possible");
        VendorLayout::Shared
    } else {
        info!(target: DECISION_TARGET, "common vendor directory is not possible");
        VendorLayout::PerOs(systems.to_vec())
    }
}
