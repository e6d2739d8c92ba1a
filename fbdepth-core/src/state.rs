//! Framebuffer state snapshot.

use log::debug;

use crate::device::RotationQuirk;
use crate::rotation::{self, NativeRotation};

/// A snapshot of the framebuffer's state at probe time.
///
/// Produced by [`Framebuffer::probe`](crate::Framebuffer::probe) and never
/// mutated afterwards; a reconciliation pass re-probes instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareSnapshot {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Bits per pixel.
    pub bitdepth: u32,
    /// Current native rotation.
    pub rotation: NativeRotation,
    /// Live `grayscale` flag from the variable screen info.
    pub grayscale: u32,
    /// Line length in bytes.
    pub scanline_stride: u32,
    /// Size of the framebuffer memory in bytes.
    pub buffer_size: u32,
    /// Driver identification string.
    pub fb_id: String,
    /// Rotation the panel booted in.
    pub boot_rotation: NativeRotation,
    /// The device family's rotation quirk.
    pub rotation_quirk: RotationQuirk,
    /// Whether rotation goes through the einkfb orientation ioctls.
    pub is_legacy_orientation_model: bool,
}

impl HardwareSnapshot {
    /// Dump the snapshot at debug level.
    pub fn log_summary(&self) {
        let virtual_width = if self.bitdepth == 0 {
            0
        } else {
            (self.scanline_stride << 3) / self.bitdepth
        };
        let virtual_height = self
            .buffer_size
            .checked_div(self.scanline_stride)
            .unwrap_or(0);

        debug!(
            "Screen is {}x{} ({}x{}), {}bpp @ rotation: {} ({}); grayscale flag is {}",
            self.width,
            self.height,
            virtual_width,
            virtual_height,
            self.bitdepth,
            self.rotation,
            rotation::describe(self.rotation),
            self.grayscale
        );
        debug!(
            "Fixed fb info: ID is \"{}\", length of fb mem: {} bytes & line length: {} bytes",
            self.fb_id, self.buffer_size, self.scanline_stride
        );
        debug!(
            "Boot rotation: {} ({}), quirk: {:?}{}",
            self.boot_rotation,
            rotation::describe(self.boot_rotation),
            self.rotation_quirk,
            if self.is_legacy_orientation_model {
                ", legacy einkfb orientation"
            } else {
                ""
            }
        );
    }
}
