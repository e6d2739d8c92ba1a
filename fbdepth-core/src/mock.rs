//! Mock framebuffer for testing.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::device::DeviceCaps;
use crate::error::FbDepthError;
use crate::framebuffer::Framebuffer;
use crate::request::ResolvedTarget;
use crate::rotation::NativeRotation;
use crate::state::HardwareSnapshot;

/// The mutable part of a mock framebuffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FbState {
    /// Visible width in the current rotation.
    pub width: u32,
    /// Visible height in the current rotation.
    pub height: u32,
    /// Bits per pixel.
    pub bitdepth: u32,
    /// Native rotation.
    pub rotation: NativeRotation,
    /// `grayscale` flag.
    pub grayscale: u32,
}

impl Default for FbState {
    fn default() -> Self {
        Self {
            width: 1072,
            height: 1448,
            bitdepth: 32,
            rotation: NativeRotation::UR,
            grayscale: 0,
        }
    }
}

/// A mock framebuffer for testing.
///
/// This allows exercising the reconciliation logic without a framebuffer
/// device. `apply` behaves like a cooperative kernel: it takes the requested
/// depth and rotation, and flips the 8bpp palette on a toggle.
///
/// # Example
///
/// ```
/// use fbdepth_core::{DeviceFamily, Framebuffer, MockFramebuffer};
///
/// let mock = MockFramebuffer::new(DeviceFamily::Kobo.caps());
/// assert_eq!(mock.probe().unwrap().bitdepth, 32);
/// ```
#[derive(Debug)]
pub struct MockFramebuffer {
    state: Mutex<FbState>,
    caps: DeviceCaps,
    boot_rotation: NativeRotation,
    apply_count: AtomicUsize,
    fail_next_probe: AtomicBool,
    fail_probe_after_apply: AtomicBool,
    fail_next_apply: AtomicBool,
}

impl MockFramebuffer {
    /// Create a new mock framebuffer with default state.
    pub fn new(caps: DeviceCaps) -> Self {
        Self::with_state(FbState::default(), caps)
    }

    /// Create a mock framebuffer with custom initial state.
    ///
    /// Unless `caps` pins it, the boot rotation is `state.rotation`.
    pub fn with_state(state: FbState, caps: DeviceCaps) -> Self {
        let boot_rotation = caps.boot_rotation.unwrap_or(state.rotation);
        Self {
            state: Mutex::new(state),
            caps,
            boot_rotation,
            apply_count: AtomicUsize::new(0),
            fail_next_probe: AtomicBool::new(false),
            fail_probe_after_apply: AtomicBool::new(false),
            fail_next_apply: AtomicBool::new(false),
        }
    }

    /// Current state.
    pub fn state(&self) -> FbState {
        self.lock().clone()
    }

    /// How many times `apply` has succeeded.
    pub fn apply_count(&self) -> usize {
        self.apply_count.load(Ordering::SeqCst)
    }

    /// Make the next `probe` fail.
    pub fn fail_next_probe(&self) {
        self.fail_next_probe.store(true, Ordering::SeqCst);
    }

    /// Make the first `probe` after the next successful `apply` fail.
    pub fn fail_probe_after_apply(&self) {
        self.fail_probe_after_apply.store(true, Ordering::SeqCst);
    }

    /// Make the next `apply` fail.
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FbState> {
        // A panicking test thread can't leave the state half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Framebuffer for MockFramebuffer {
    fn probe(&self) -> Result<HardwareSnapshot, FbDepthError> {
        if self.fail_next_probe.swap(false, Ordering::SeqCst) {
            return Err(FbDepthError::ProbeFailure {
                query: "FBIOGET_VSCREENINFO",
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }

        let state = self.lock();
        let scanline_stride = state.width * state.bitdepth / 8;
        Ok(HardwareSnapshot {
            width: state.width,
            height: state.height,
            bitdepth: state.bitdepth,
            rotation: state.rotation,
            grayscale: state.grayscale,
            scanline_stride,
            buffer_size: scanline_stride * state.height,
            fb_id: "mxc_epdc_fb".to_owned(),
            boot_rotation: self.boot_rotation,
            rotation_quirk: self.caps.rotation_quirk,
            is_legacy_orientation_model: self.caps.is_legacy_orientation_model,
        })
    }

    fn apply(&self, target: &ResolvedTarget) -> Result<(), FbDepthError> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(FbDepthError::ApplyFailure {
                op: "set the variable screen info",
                source: io::Error::from(io::ErrorKind::InvalidInput),
            });
        }

        let mut guard = self.lock();
        let state = &mut *guard;
        state.bitdepth = target.bitdepth;
        state.grayscale = target.grayscale.resolve_against(state.grayscale);
        if let Some(rotation) = target.rotation {
            if rotation.is_odd() != state.rotation.is_odd() {
                std::mem::swap(&mut state.width, &mut state.height);
            }
            state.rotation = rotation;
        }
        self.apply_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe_after_apply.swap(false, Ordering::SeqCst) {
            self.fail_next_probe.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}
