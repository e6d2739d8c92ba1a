//! Rotation codes and the mapping between them.
//!
//! Three encodings are in play on eInk devices:
//!
//! - **Native** rotation: the raw `rotate` field of the Linux framebuffer, as the
//!   device's (often vendor-patched) driver interprets it.
//! - **Canonical** rotation: what the user actually sees (Upright, Clockwise,
//!   Upside Down, Counter Clockwise). On some Kobo kernels native and canonical
//!   disagree, see [`RotationQuirk`](crate::RotationQuirk).
//! - **Legacy orientation**: the four-value einkfb ioctl used by older Kindles
//!   instead of the `rotate` field.
//!
//! ## Example
//!
//! ```
//! use fbdepth_core::{rotation, CanonicalRotation, DeviceFamily, NativeRotation};
//!
//! // On a Kobo Forma, only the odd rotations are swapped.
//! let caps = DeviceFamily::KoboOddInverted.caps();
//! let native = rotation::to_native(CanonicalRotation::Cw, &caps)?;
//! assert_eq!(native, NativeRotation::CCW);
//! assert_eq!(rotation::to_canonical(native, &caps)?, CanonicalRotation::Cw);
//! # Ok::<(), fbdepth_core::FbDepthError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use crate::device::{DeviceCaps, RotationQuirk};
use crate::error::FbDepthError;
use crate::state::HardwareSnapshot;

/// A native framebuffer rotation code, guaranteed to be in `0..=3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeRotation(u8);

impl NativeRotation {
    /// `FB_ROTATE_UR`
    pub const UR: Self = Self(0);
    /// `FB_ROTATE_CW`
    pub const CW: Self = Self(1);
    /// `FB_ROTATE_UD`
    pub const UD: Self = Self(2);
    /// `FB_ROTATE_CCW`
    pub const CCW: Self = Self(3);

    /// Validate a raw rotation code.
    ///
    /// # Errors
    /// Returns [`FbDepthError::InvalidRotation`] for anything outside `0..=3`.
    pub fn new(value: i64) -> Result<Self, FbDepthError> {
        match value {
            0..=3 => Ok(Self(value as u8)),
            _ => Err(FbDepthError::InvalidRotation(value)),
        }
    }

    /// The raw code.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The next rotation clockwise, wrapping around.
    pub const fn next(self) -> Self {
        Self((self.0 + 1) & 3)
    }

    /// Whether the rotation is landscape relative to the panel's scanout.
    pub const fn is_odd(self) -> bool {
        self.0 & 1 == 1
    }
}

impl TryFrom<u32> for NativeRotation {
    type Error = FbDepthError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<NativeRotation> for u32 {
    fn from(rotation: NativeRotation) -> Self {
        u32::from(rotation.0)
    }
}

impl fmt::Display for NativeRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device-independent rotation, as seen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalRotation {
    /// Upright.
    Ur = 0,
    /// Clockwise, 90°.
    Cw = 1,
    /// Upside down, 180°.
    Ud = 2,
    /// Counter clockwise, 270°.
    Ccw = 3,
}

impl CanonicalRotation {
    /// All four rotations, in code order.
    pub const ALL: [Self; 4] = [Self::Ur, Self::Cw, Self::Ud, Self::Ccw];

    /// The numeric code (Linux FB convention).
    pub const fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Self {
        Self::ALL[usize::from(code & 3)]
    }
}

impl FromStr for CanonicalRotation {
    type Err = FbDepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UR" | "0" => Ok(Self::Ur),
            "CW" | "1" => Ok(Self::Cw),
            "UD" | "2" => Ok(Self::Ud),
            "CCW" | "3" => Ok(Self::Ccw),
            _ => Err(FbDepthError::parse("rotation", s)),
        }
    }
}

/// Orientation values of the einkfb `FBIO_EINK_{GET,SET}_DISPLAY_ORIENTATION` ioctls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyOrientation {
    /// `orientation_portrait`
    Portrait = 0,
    /// `orientation_portrait_upside_down`
    PortraitUpsideDown = 1,
    /// `orientation_landscape`
    Landscape = 2,
    /// `orientation_landscape_upside_down`
    LandscapeUpsideDown = 3,
}

impl LegacyOrientation {
    /// All four orientations, in ioctl encoding order.
    pub const ALL: [Self; 4] = [
        Self::Portrait,
        Self::PortraitUpsideDown,
        Self::Landscape,
        Self::LandscapeUpsideDown,
    ];

    /// Decode the raw ioctl value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// The raw ioctl value.
    pub const fn raw(self) -> u32 {
        self as u32
    }
}

// The three quirks are involutions, so one function serves both directions.
fn swap_for_quirk(code: u8, quirk: RotationQuirk) -> u8 {
    match quirk {
        RotationQuirk::Sane => code,
        RotationQuirk::AllInverted => code ^ 2,
        RotationQuirk::OddInverted if code & 1 == 1 => code ^ 2,
        RotationQuirk::OddInverted => code,
    }
}

fn require_canonical(caps: &DeviceCaps) -> Result<(), FbDepthError> {
    if caps.supports_canonical_rotation {
        Ok(())
    } else {
        Err(FbDepthError::UnsupportedOperation("Canonical rotation"))
    }
}

/// Translate a canonical rotation into the code this device's driver expects.
///
/// # Errors
/// [`FbDepthError::UnsupportedOperation`] if the family has no canonical addressing.
pub fn to_native(
    rotation: CanonicalRotation,
    caps: &DeviceCaps,
) -> Result<NativeRotation, FbDepthError> {
    require_canonical(caps)?;
    Ok(NativeRotation(swap_for_quirk(
        rotation.code(),
        caps.rotation_quirk,
    )))
}

/// Translate a native rotation code into what the user actually sees.
///
/// # Errors
/// [`FbDepthError::UnsupportedOperation`] if the family has no canonical addressing.
pub fn to_canonical(
    rotation: NativeRotation,
    caps: &DeviceCaps,
) -> Result<CanonicalRotation, FbDepthError> {
    require_canonical(caps)?;
    Ok(CanonicalRotation::from_code(swap_for_quirk(
        rotation.get(),
        caps.rotation_quirk,
    )))
}

/// Whether [`resolve_auto_portrait`] gives a stable answer on this family.
///
/// On quirky kernels the answer is derived from the boot rotation, which has to
/// be pinned in `caps`. Falling back to the rotation observed at open time
/// would rotate the panel one more step on every run.
///
/// # Errors
/// [`FbDepthError::UnsupportedOperation`] for a quirky family without a pinned
/// boot rotation.
pub fn check_auto_portrait(caps: &DeviceCaps) -> Result<(), FbDepthError> {
    if caps.rotation_quirk != RotationQuirk::Sane && caps.boot_rotation.is_none() {
        return Err(FbDepthError::UnsupportedOperation(
            "Automatic Portrait rotation without a known boot rotation (--bootrota)",
        ));
    }
    Ok(())
}

/// The native rotation matching the device's own idea of Portrait.
///
/// On most quirky Kobo kernels the upright orientation used by Nickel is one step
/// clockwise from the rotation the panel booted in; sane kernels boot upright.
pub fn resolve_auto_portrait(snapshot: &HardwareSnapshot) -> NativeRotation {
    if snapshot.rotation_quirk != RotationQuirk::Sane {
        snapshot.boot_rotation.next()
    } else {
        snapshot.boot_rotation
    }
}

/// Map a legacy einkfb orientation to the equivalent native rotation.
pub fn resolve_legacy_orientation(
    orientation: LegacyOrientation,
    caps: &DeviceCaps,
) -> NativeRotation {
    caps.legacy_orientation_map[orientation as usize]
}

/// Inverse of [`resolve_legacy_orientation`].
///
/// # Errors
/// [`FbDepthError::UnsupportedOperation`] on devices that don't use the legacy
/// interface, [`FbDepthError::InvalidRotation`] if the family's table has no
/// orientation for `rotation`.
pub fn to_legacy_orientation(
    rotation: NativeRotation,
    caps: &DeviceCaps,
) -> Result<LegacyOrientation, FbDepthError> {
    if !caps.is_legacy_orientation_model {
        return Err(FbDepthError::UnsupportedOperation("Legacy orientation"));
    }
    LegacyOrientation::ALL
        .into_iter()
        .find(|&o| resolve_legacy_orientation(o, caps) == rotation)
        .ok_or(FbDepthError::InvalidRotation(i64::from(rotation.get())))
}

/// Human readable label for log output.
pub fn describe(rotation: NativeRotation) -> &'static str {
    match rotation.get() {
        0 => "Upright, 0°",
        1 => "Clockwise, 90°",
        2 => "Upside Down, 180°",
        _ => "Counter Clockwise, 270°",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceFamily;

    fn snapshot(boot: NativeRotation, quirk: RotationQuirk) -> HardwareSnapshot {
        HardwareSnapshot {
            boot_rotation: boot,
            rotation_quirk: quirk,
            ..HardwareSnapshot::default()
        }
    }

    #[test]
    fn test_native_rotation_rejects_out_of_range() {
        assert!(matches!(
            NativeRotation::new(4),
            Err(FbDepthError::InvalidRotation(4))
        ));
        assert!(matches!(
            NativeRotation::new(-1),
            Err(FbDepthError::InvalidRotation(-1))
        ));
        assert!(matches!(
            NativeRotation::try_from(4u32),
            Err(FbDepthError::InvalidRotation(4))
        ));
        assert_eq!(NativeRotation::new(3).unwrap(), NativeRotation::CCW);
    }

    #[test]
    fn test_canonical_round_trip_for_every_capable_family() {
        for family in DeviceFamily::ALL {
            let caps = family.caps();
            if !caps.supports_canonical_rotation {
                continue;
            }
            for rotation in CanonicalRotation::ALL {
                let native = to_native(rotation, &caps).unwrap();
                assert_eq!(to_canonical(native, &caps).unwrap(), rotation, "{family}");
            }
        }
    }

    #[test]
    fn test_quirk_mappings() {
        let all = DeviceFamily::KoboAllInverted.caps();
        assert_eq!(to_native(CanonicalRotation::Ur, &all).unwrap(), NativeRotation::UD);
        assert_eq!(to_native(CanonicalRotation::Cw, &all).unwrap(), NativeRotation::CCW);

        let odd = DeviceFamily::KoboOddInverted.caps();
        assert_eq!(to_native(CanonicalRotation::Ur, &odd).unwrap(), NativeRotation::UR);
        assert_eq!(to_native(CanonicalRotation::Ccw, &odd).unwrap(), NativeRotation::CW);

        let sane = DeviceFamily::Kobo.caps();
        assert_eq!(to_native(CanonicalRotation::Ud, &sane).unwrap(), NativeRotation::UD);
    }

    #[test]
    fn test_canonical_unsupported() {
        let caps = DeviceFamily::Kindle.caps();
        assert!(matches!(
            to_native(CanonicalRotation::Ur, &caps),
            Err(FbDepthError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            to_canonical(NativeRotation::UR, &caps),
            Err(FbDepthError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_auto_portrait_sane_keeps_boot_rotation() {
        for code in 0..4 {
            let boot = NativeRotation::new(code).unwrap();
            let snap = snapshot(boot, RotationQuirk::Sane);
            assert_eq!(resolve_auto_portrait(&snap), boot);
        }
    }

    #[test]
    fn test_auto_portrait_quirky_is_boot_plus_one() {
        let snap = snapshot(NativeRotation::CCW, RotationQuirk::AllInverted);
        assert_eq!(resolve_auto_portrait(&snap), NativeRotation::UR);

        let snap = snapshot(NativeRotation::UR, RotationQuirk::OddInverted);
        assert_eq!(resolve_auto_portrait(&snap), NativeRotation::CW);
        // Same snapshot, same answer.
        assert_eq!(resolve_auto_portrait(&snap), resolve_auto_portrait(&snap));
    }

    #[test]
    fn test_auto_portrait_needs_pinned_boot_rotation_when_quirky() {
        assert!(check_auto_portrait(&DeviceFamily::Kobo.caps()).is_ok());
        assert!(check_auto_portrait(&DeviceFamily::Generic.caps()).is_ok());

        let caps = DeviceFamily::KoboOddInverted.caps();
        assert!(matches!(
            check_auto_portrait(&caps),
            Err(FbDepthError::UnsupportedOperation(_))
        ));
        let caps = DeviceCaps {
            boot_rotation: Some(NativeRotation::UR),
            ..caps
        };
        assert!(check_auto_portrait(&caps).is_ok());
    }

    #[test]
    fn test_legacy_orientation_table() {
        let caps = DeviceFamily::KindleLegacy.caps();
        assert_eq!(
            resolve_legacy_orientation(LegacyOrientation::Portrait, &caps),
            NativeRotation::UR
        );
        assert_eq!(
            resolve_legacy_orientation(LegacyOrientation::Landscape, &caps),
            NativeRotation::CW
        );
        assert_eq!(
            resolve_legacy_orientation(LegacyOrientation::PortraitUpsideDown, &caps),
            NativeRotation::UD
        );
        assert_eq!(
            resolve_legacy_orientation(LegacyOrientation::LandscapeUpsideDown, &caps),
            NativeRotation::CCW
        );

        for orientation in LegacyOrientation::ALL {
            let native = resolve_legacy_orientation(orientation, &caps);
            assert_eq!(to_legacy_orientation(native, &caps).unwrap(), orientation);
        }
    }

    #[test]
    fn test_legacy_orientation_requires_legacy_model() {
        let caps = DeviceFamily::Kindle.caps();
        assert!(matches!(
            to_legacy_orientation(NativeRotation::UR, &caps),
            Err(FbDepthError::UnsupportedOperation(_))
        ));
        assert_eq!(LegacyOrientation::from_raw(4), None);
    }

    #[test]
    fn test_parse_canonical() {
        assert_eq!("ccw".parse::<CanonicalRotation>().unwrap(), CanonicalRotation::Ccw);
        assert_eq!("2".parse::<CanonicalRotation>().unwrap(), CanonicalRotation::Ud);
        assert!("-1".parse::<CanonicalRotation>().is_err());
        assert!("sideways".parse::<CanonicalRotation>().is_err());
    }
}
