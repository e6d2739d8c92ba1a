//! Deciding whether the hardware actually needs touching.

use log::debug;

use crate::grayscale::GrayscaleCode;
use crate::request::ResolvedTarget;
use crate::state::HardwareSnapshot;

/// Which parts of the framebuffer mode differ from the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeVerdict {
    /// The bitdepth differs.
    pub bitdepth_changed: bool,
    /// A rotation was requested and differs.
    pub rotation_changed: bool,
    /// The grayscale flag differs (always true for a toggle).
    pub grayscale_changed: bool,
}

impl ChangeVerdict {
    /// Whether anything needs to be applied.
    pub const fn any_change(&self) -> bool {
        self.bitdepth_changed || self.rotation_changed || self.grayscale_changed
    }
}

/// Compare a resolved target against a snapshot, field by field.
pub fn decide(snapshot: &HardwareSnapshot, target: &ResolvedTarget) -> ChangeVerdict {
    let bitdepth_changed = target.bitdepth != snapshot.bitdepth;
    if !bitdepth_changed {
        debug!("Current bitdepth is already {}bpp", target.bitdepth);
    }

    let rotation_changed = match target.rotation {
        Some(rotation) if rotation == snapshot.rotation => {
            debug!("Current rotation is already {}", rotation);
            false
        }
        Some(_) => true,
        None => false,
    };

    let grayscale_changed = match target.grayscale {
        GrayscaleCode::Toggle => true,
        GrayscaleCode::KeepCurrent => false,
        code if code.hw_value() == snapshot.grayscale => {
            debug!("Current grayscale flag is already {}", snapshot.grayscale);
            false
        }
        _ => true,
    };

    ChangeVerdict {
        bitdepth_changed,
        rotation_changed,
        grayscale_changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::NativeRotation;

    fn snapshot(bitdepth: u32, rotation: NativeRotation, grayscale: u32) -> HardwareSnapshot {
        HardwareSnapshot {
            bitdepth,
            rotation,
            grayscale,
            ..HardwareSnapshot::default()
        }
    }

    #[test]
    fn test_rotation_only() {
        let snap = snapshot(32, NativeRotation::CW, 0);
        let target = ResolvedTarget {
            bitdepth: 32,
            rotation: Some(NativeRotation::UR),
            grayscale: GrayscaleCode::NoGrayscale,
        };
        let verdict = decide(&snap, &target);
        assert_eq!(
            verdict,
            ChangeVerdict {
                rotation_changed: true,
                ..ChangeVerdict::default()
            }
        );
        assert!(verdict.any_change());
    }

    #[test]
    fn test_unset_rotation_never_changes() {
        let snap = snapshot(8, NativeRotation::UD, 1);
        let target = ResolvedTarget {
            bitdepth: 8,
            rotation: None,
            grayscale: GrayscaleCode::None8bit,
        };
        assert!(!decide(&snap, &target).any_change());
    }

    #[test]
    fn test_grayscale_mismatch_alone() {
        let snap = snapshot(8, NativeRotation::UR, 1);
        let target = ResolvedTarget {
            bitdepth: 8,
            rotation: None,
            grayscale: GrayscaleCode::Inverted8bit,
        };
        let verdict = decide(&snap, &target);
        assert!(verdict.grayscale_changed);
        assert!(!verdict.bitdepth_changed);
        assert!(!verdict.rotation_changed);
    }

    #[test]
    fn test_toggle_and_keep_current() {
        let snap = snapshot(8, NativeRotation::UR, 2);
        let mut target = ResolvedTarget {
            bitdepth: 8,
            rotation: None,
            grayscale: GrayscaleCode::Toggle,
        };
        assert!(decide(&snap, &target).grayscale_changed);

        target.grayscale = GrayscaleCode::KeepCurrent;
        assert!(!decide(&snap, &target).any_change());
    }

    #[test]
    fn test_bitdepth_change() {
        let snap = snapshot(32, NativeRotation::UR, 0);
        let target = ResolvedTarget {
            bitdepth: 8,
            rotation: Some(NativeRotation::UR),
            grayscale: GrayscaleCode::None8bit,
        };
        let verdict = decide(&snap, &target);
        assert!(verdict.bitdepth_changed);
        assert!(verdict.grayscale_changed);
        assert!(!verdict.rotation_changed);
    }
}
