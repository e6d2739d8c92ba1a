//! Framebuffer bitdepth, rotation and night-mode reconciliation for eInk devices.
//!
//! eInk readers expose a regular Linux framebuffer, but their kernels disagree
//! about what the `rotate` field means, and only honor palette inversion at
//! 8bpp. This crate takes a [`TargetRequest`] (any subset of bitdepth, rotation
//! and night mode), resolves it against the device's quirks, and only touches
//! the hardware when something actually differs.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # fn main() -> Result<(), fbdepth_core::FbDepthError> {
//! use fbdepth_core::{
//!     DeviceCaps, DeviceFamily, LinuxFramebuffer, NativeRotation, NightMode, Reconciler,
//!     RotationRequest, TargetRequest,
//! };
//!
//! // Quirky Kobos need their boot rotation pinned for automatic Portrait.
//! let caps = DeviceCaps {
//!     boot_rotation: Some(NativeRotation::CCW),
//!     ..DeviceFamily::KoboAllInverted.caps()
//! };
//! let fb = LinuxFramebuffer::open(LinuxFramebuffer::DEFAULT_PATH, caps.clone())?;
//!
//! // 8bpp, inverted, in whatever the device considers Portrait.
//! let request = TargetRequest {
//!     bitdepth: Some("8".parse()?),
//!     rotation: Some(RotationRequest::AutoPortrait),
//!     night_mode: NightMode::On,
//! };
//! let outcome = Reconciler::new(caps).run(&fb, &request)?;
//! println!("changed: {}", outcome.applied());
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```
//!
//! # Testing
//!
//! Use [`MockFramebuffer`] to test code without a framebuffer device:
//!
//! ```
//! use fbdepth_core::{query, DeviceFamily, MockFramebuffer, Query};
//!
//! let caps = DeviceFamily::Kobo.caps();
//! let mock = MockFramebuffer::new(caps.clone());
//! assert_eq!(query(&mock, &caps, Query::Bitdepth).unwrap(), 32);
//! ```

#![warn(missing_docs)]

mod decision;
mod device;
mod error;
mod framebuffer;
mod grayscale;
mod mock;
mod query;
mod reconcile;
mod request;
pub mod rotation;
mod state;

// Re-export public API
pub use decision::{ChangeVerdict, decide};
pub use device::{DeviceCaps, DeviceFamily, RotationQuirk};
pub use error::FbDepthError;
pub use framebuffer::{DEFAULT_FB_PATH, Framebuffer};
#[cfg(target_os = "linux")]
pub use framebuffer::LinuxFramebuffer;
pub use grayscale::{GrayscaleCode, NightMode, derive_grayscale};
pub use mock::{FbState, MockFramebuffer};
pub use query::{Query, query};
pub use reconcile::{Outcome, Phase, Reconciler};
pub use request::{Bitdepth, ResolvedTarget, RotationRequest, TargetRequest};
pub use rotation::{CanonicalRotation, LegacyOrientation, NativeRotation};
pub use state::HardwareSnapshot;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_only_scenario() {
        let caps = DeviceFamily::Kobo.caps();
        let mock = MockFramebuffer::with_state(
            FbState {
                bitdepth: 32,
                rotation: NativeRotation::CW,
                grayscale: 0,
                ..FbState::default()
            },
            caps.clone(),
        );
        let reconciler = Reconciler::new(caps);
        let request = TargetRequest {
            rotation: Some(RotationRequest::Native(NativeRotation::UR)),
            ..TargetRequest::default()
        };

        let snapshot = mock.probe().unwrap();
        let target = reconciler.resolve(&request, &snapshot).unwrap();
        assert_eq!(
            target,
            ResolvedTarget {
                bitdepth: 32,
                rotation: Some(NativeRotation::UR),
                grayscale: GrayscaleCode::NoGrayscale,
            }
        );
        assert_eq!(
            decide(&snapshot, &target),
            ChangeVerdict {
                bitdepth_changed: false,
                rotation_changed: true,
                grayscale_changed: false,
            }
        );
    }

    #[test]
    fn test_night_mode_scenario() {
        let caps = DeviceFamily::Kobo.caps();
        let mock = MockFramebuffer::with_state(
            FbState {
                bitdepth: 8,
                grayscale: GrayscaleCode::None8bit.hw_value(),
                ..FbState::default()
            },
            caps.clone(),
        );
        let reconciler = Reconciler::new(caps);
        let request = TargetRequest {
            bitdepth: Some(Bitdepth::Eight),
            night_mode: NightMode::On,
            ..TargetRequest::default()
        };

        let snapshot = mock.probe().unwrap();
        let target = reconciler.resolve(&request, &snapshot).unwrap();
        assert_eq!(target.grayscale, GrayscaleCode::Inverted8bit);

        let verdict = decide(&snapshot, &target);
        assert!(verdict.grayscale_changed);
        assert!(!verdict.bitdepth_changed);
        assert!(!verdict.rotation_changed);
    }

    #[test]
    fn test_second_pass_is_a_noop() {
        let absolute_night_modes = [NightMode::On, NightMode::Off, NightMode::Unspecified];
        let rotations = [
            None,
            Some(RotationRequest::Native(NativeRotation::CCW)),
            Some(RotationRequest::Canonical(CanonicalRotation::Cw)),
            Some(RotationRequest::AutoPortrait),
        ];

        for family in [DeviceFamily::Kobo, DeviceFamily::KoboOddInverted] {
            for night_mode in absolute_night_modes {
                for rotation in rotations {
                    for bitdepth in [None, Some(Bitdepth::Eight), Some(Bitdepth::ThirtyTwo)] {
                        let caps = DeviceCaps {
                            boot_rotation: Some(NativeRotation::UR),
                            ..family.caps()
                        };
                        let mock = MockFramebuffer::new(caps.clone());
                        let reconciler = Reconciler::new(caps);
                        let request = TargetRequest {
                            bitdepth,
                            rotation,
                            night_mode,
                        };

                        reconciler.run(&mock, &request).unwrap();
                        let applied = mock.apply_count();
                        let outcome = reconciler.run(&mock, &request).unwrap();
                        assert!(!outcome.applied(), "{family} {request:?}");
                        assert_eq!(mock.apply_count(), applied);
                    }
                }
            }
        }
    }

    #[test]
    fn test_auto_portrait_is_stable_across_fresh_opens() {
        let caps = DeviceCaps {
            boot_rotation: Some(NativeRotation::UR),
            ..DeviceFamily::KoboAllInverted.caps()
        };
        let reconciler = Reconciler::new(caps.clone());
        let request = TargetRequest {
            rotation: Some(RotationRequest::AutoPortrait),
            ..TargetRequest::default()
        };

        // Every CLI invocation opens the device anew.
        let mut state = FbState::default();
        let mut applied = Vec::new();
        for _ in 0..3 {
            let mock = MockFramebuffer::with_state(state, caps.clone());
            applied.push(reconciler.run(&mock, &request).unwrap().applied());
            state = mock.state();
            assert_eq!(state.rotation, NativeRotation::CW);
        }
        assert_eq!(applied, [true, false, false]);
    }

    #[test]
    fn test_auto_portrait_refused_without_boot_rotation() {
        let caps = DeviceFamily::KoboAllInverted.caps();
        let mock = MockFramebuffer::new(caps.clone());
        let request = TargetRequest {
            rotation: Some(RotationRequest::AutoPortrait),
            ..TargetRequest::default()
        };

        assert!(matches!(
            Reconciler::new(caps).run(&mock, &request),
            Err(FbDepthError::UnsupportedOperation(_))
        ));
        assert_eq!(mock.apply_count(), 0);
    }

    #[test]
    fn test_applied_outcome_reports_both_snapshots() {
        let caps = DeviceFamily::KoboAllInverted.caps();
        let mock = MockFramebuffer::new(caps.clone());
        let request = TargetRequest {
            bitdepth: Some(Bitdepth::Eight),
            rotation: Some(RotationRequest::Canonical(CanonicalRotation::Cw)),
            night_mode: NightMode::On,
        };

        let outcome = Reconciler::new(caps).run(&mock, &request).unwrap();
        let Outcome::Applied {
            before,
            after,
            verdict,
        } = outcome
        else {
            panic!("expected a mode switch");
        };
        assert_eq!(before.bitdepth, 32);
        assert_eq!(after.bitdepth, 8);
        assert_eq!(after.rotation, NativeRotation::CCW);
        assert_eq!(after.grayscale, 2);
        // Width and height follow the panel around.
        assert_eq!((after.width, after.height), (before.height, before.width));
        assert!(verdict.bitdepth_changed && verdict.rotation_changed && verdict.grayscale_changed);
    }

    #[test]
    fn test_native_rotation_four_is_rejected() {
        assert!(matches!(
            NativeRotation::new(4),
            Err(FbDepthError::InvalidRotation(4))
        ));
    }
}
