//! Device capability descriptors.

use std::fmt;
use std::str::FromStr;

use crate::error::FbDepthError;
use crate::rotation::NativeRotation;

/// How a device's kernel mangles the rotation field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RotationQuirk {
    /// Native and canonical rotations agree.
    #[default]
    Sane,
    /// Every rotation is reported upside down (H2O and most Mk. 7 Kobos).
    AllInverted,
    /// Only CW and CCW are swapped (Kobo Forma).
    OddInverted,
}

/// Einkfb orientation table: Portrait, PortraitUpsideDown, Landscape, LandscapeUpsideDown.
const EINKFB_ORIENTATION_MAP: [NativeRotation; 4] = [
    NativeRotation::UR,
    NativeRotation::UD,
    NativeRotation::CW,
    NativeRotation::CCW,
];

/// What the reconciliation logic needs to know about a device family.
///
/// This is injected at startup instead of branching on the target hardware all
/// over the place, so every family can be exercised from a single binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCaps {
    /// Whether canonical (user-facing) rotations can be translated to native ones.
    pub supports_canonical_rotation: bool,
    /// The boot-rotation / canonical mapping quirk.
    pub rotation_quirk: RotationQuirk,
    /// Whether rotation goes through the einkfb orientation ioctls.
    pub is_legacy_orientation_model: bool,
    /// Native rotation for each [`LegacyOrientation`](crate::LegacyOrientation), indexed by its raw value.
    pub legacy_orientation_map: [NativeRotation; 4],
    /// Boot rotation, if known ahead of time. Otherwise the rotation observed
    /// when the framebuffer is opened is used, which quirky families can't rely
    /// on for automatic Portrait (see [`check_auto_portrait`](crate::rotation::check_auto_portrait)).
    pub boot_rotation: Option<NativeRotation>,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            supports_canonical_rotation: false,
            rotation_quirk: RotationQuirk::Sane,
            is_legacy_orientation_model: false,
            legacy_orientation_map: EINKFB_ORIENTATION_MAP,
            boot_rotation: None,
        }
    }
}

/// Supported device families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    /// Plain Linux framebuffer, no quirks.
    #[default]
    Generic,
    /// Kobo with a sane kernel (Libra and newer).
    Kobo,
    /// Kobo whose kernel inverts every rotation.
    KoboAllInverted,
    /// Kobo whose kernel swaps CW and CCW.
    KoboOddInverted,
    /// BQ Cervantes.
    Cervantes,
    /// mxcfb Kindle.
    Kindle,
    /// einkfb Kindle (K2, DX, K3, K4).
    KindleLegacy,
}

impl DeviceFamily {
    /// Every family, for exhaustive tests.
    pub const ALL: [Self; 7] = [
        Self::Generic,
        Self::Kobo,
        Self::KoboAllInverted,
        Self::KoboOddInverted,
        Self::Cervantes,
        Self::Kindle,
        Self::KindleLegacy,
    ];

    /// The flag spelling of this family.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Kobo => "kobo",
            Self::KoboAllInverted => "kobo-all-inverted",
            Self::KoboOddInverted => "kobo-odd-inverted",
            Self::Cervantes => "cervantes",
            Self::Kindle => "kindle",
            Self::KindleLegacy => "kindle-legacy",
        }
    }

    /// The capability descriptor for this family.
    pub fn caps(self) -> DeviceCaps {
        let kobo = |rotation_quirk: RotationQuirk| DeviceCaps {
            supports_canonical_rotation: true,
            rotation_quirk,
            ..DeviceCaps::default()
        };

        match self {
            Self::Generic | Self::Kindle | Self::Cervantes => DeviceCaps::default(),
            Self::Kobo => kobo(RotationQuirk::Sane),
            Self::KoboAllInverted => kobo(RotationQuirk::AllInverted),
            Self::KoboOddInverted => kobo(RotationQuirk::OddInverted),
            Self::KindleLegacy => DeviceCaps {
                is_legacy_orientation_model: true,
                ..DeviceCaps::default()
            },
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceFamily {
    type Err = FbDepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FbDepthError::parse("device family", s))
    }
}
