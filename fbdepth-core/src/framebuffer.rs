//! Framebuffer access.

use crate::error::FbDepthError;
use crate::request::ResolvedTarget;
use crate::state::HardwareSnapshot;

#[cfg(target_os = "linux")]
pub use linux::LinuxFramebuffer;

/// The primary framebuffer device node.
pub const DEFAULT_FB_PATH: &str = "/dev/fb0";

// =============================================================================
// Framebuffer Trait
// =============================================================================

/// Trait for framebuffer implementations.
///
/// This allows for mock implementations in tests.
pub trait Framebuffer: Send + Sync {
    /// Read the current hardware state.
    ///
    /// Fails with [`FbDepthError::ProbeFailure`] if any underlying query fails;
    /// no partial snapshot is ever returned.
    fn probe(&self) -> Result<HardwareSnapshot, FbDepthError>;

    /// Program a new mode.
    ///
    /// Fails with [`FbDepthError::ApplyFailure`] if the driver rejects it.
    fn apply(&self, target: &ResolvedTarget) -> Result<(), FbDepthError>;
}

// =============================================================================
// Linux Framebuffer
// =============================================================================

#[cfg(target_os = "linux")]
mod linux {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::fd::AsRawFd;
    use std::path::Path;

    use log::debug;

    use super::Framebuffer;
    use crate::device::DeviceCaps;
    use crate::error::FbDepthError;
    use crate::request::ResolvedTarget;
    use crate::rotation::{self, LegacyOrientation, NativeRotation};
    use crate::state::HardwareSnapshot;

    /// Raw kernel interface (linux/fb.h and Lab126's linux/einkfb.h).
    #[allow(non_camel_case_types)]
    mod sys {
        use nix::{ioctl_read_bad, ioctl_write_int_bad, ioctl_write_ptr_bad};

        const FBIOGET_VSCREENINFO: u32 = 0x4600;
        const FBIOPUT_VSCREENINFO: u32 = 0x4601;
        const FBIOGET_FSCREENINFO: u32 = 0x4602;
        const FBIO_EINK_SET_DISPLAY_ORIENTATION: u32 = 0x46f0;
        const FBIO_EINK_GET_DISPLAY_ORIENTATION: u32 = 0x46f1;

        pub const FB_ACTIVATE_NOW: u32 = 0;
        pub const FB_ACTIVATE_FORCE: u32 = 128;

        #[repr(C)]
        #[derive(Debug, Copy, Clone)]
        pub struct fb_fix_screeninfo {
            pub id: [std::ffi::c_char; 16],
            pub smem_start: std::ffi::c_ulong,
            pub smem_len: u32,
            pub type_: u32,
            pub type_aux: u32,
            pub visual: u32,
            pub xpanstep: u16,
            pub ypanstep: u16,
            pub ywrapstep: u16,
            pub line_length: u32,
            pub mmio_start: std::ffi::c_ulong,
            pub mmio_len: u32,
            pub accel: u32,
            pub capabilities: u16,
            pub reserved: [u16; 2],
        }

        #[repr(C)]
        #[derive(Debug, Copy, Clone, Default)]
        pub struct fb_bitfield {
            pub offset: u32,
            pub length: u32,
            pub msb_right: u32,
        }

        impl fb_bitfield {
            pub const fn new(offset: u32, length: u32) -> Self {
                Self {
                    offset,
                    length,
                    msb_right: 0,
                }
            }
        }

        #[repr(C)]
        #[derive(Debug, Copy, Clone, Default)]
        pub struct fb_var_screeninfo {
            pub xres: u32,
            pub yres: u32,
            pub xres_virtual: u32,
            pub yres_virtual: u32,
            pub xoffset: u32,
            pub yoffset: u32,
            pub bits_per_pixel: u32,
            pub grayscale: u32,
            pub red: fb_bitfield,
            pub green: fb_bitfield,
            pub blue: fb_bitfield,
            pub transp: fb_bitfield,
            pub nonstd: u32,
            pub activate: u32,
            pub height: u32,
            pub width: u32,
            pub accel_flags: u32,
            pub pixclock: u32,
            pub left_margin: u32,
            pub right_margin: u32,
            pub upper_margin: u32,
            pub lower_margin: u32,
            pub hsync_len: u32,
            pub vsync_len: u32,
            pub sync: u32,
            pub vmode: u32,
            pub rotate: u32,
            pub colorspace: u32,
            pub reserved: [u32; 4],
        }

        impl Default for fb_fix_screeninfo {
            fn default() -> Self {
                Self {
                    id: [0; 16],
                    smem_start: 0,
                    smem_len: 0,
                    type_: 0,
                    type_aux: 0,
                    visual: 0,
                    xpanstep: 0,
                    ypanstep: 0,
                    ywrapstep: 0,
                    line_length: 0,
                    mmio_start: 0,
                    mmio_len: 0,
                    accel: 0,
                    capabilities: 0,
                    reserved: [0; 2],
                }
            }
        }

        ioctl_read_bad!(fb_get_var_screeninfo, FBIOGET_VSCREENINFO, fb_var_screeninfo);
        ioctl_write_ptr_bad!(fb_put_var_screeninfo, FBIOPUT_VSCREENINFO, fb_var_screeninfo);
        ioctl_read_bad!(fb_get_fix_screeninfo, FBIOGET_FSCREENINFO, fb_fix_screeninfo);
        ioctl_read_bad!(
            eink_get_display_orientation,
            FBIO_EINK_GET_DISPLAY_ORIENTATION,
            u32
        );
        ioctl_write_int_bad!(
            eink_set_display_orientation,
            FBIO_EINK_SET_DISPLAY_ORIENTATION
        );
    }

    fn probe_failure(query: &'static str) -> impl FnOnce(nix::Error) -> FbDepthError {
        move |errno| FbDepthError::ProbeFailure {
            query,
            source: errno.into(),
        }
    }

    fn apply_failure(op: &'static str) -> impl FnOnce(nix::Error) -> FbDepthError {
        move |errno| FbDepthError::ApplyFailure {
            op,
            source: errno.into(),
        }
    }

    /// Pixel layout the driver expects for each depth.
    fn set_bitfields(var: &mut sys::fb_var_screeninfo, bitdepth: u32) {
        use sys::fb_bitfield as bf;

        let (red, green, blue, transp) = match bitdepth {
            8 => (bf::new(0, 8), bf::new(0, 8), bf::new(0, 8), bf::new(0, 0)),
            16 => (bf::new(11, 5), bf::new(5, 6), bf::new(0, 5), bf::new(0, 0)),
            24 => (bf::new(16, 8), bf::new(8, 8), bf::new(0, 8), bf::new(0, 0)),
            _ => (bf::new(16, 8), bf::new(8, 8), bf::new(0, 8), bf::new(24, 8)),
        };
        var.red = red;
        var.green = green;
        var.blue = blue;
        var.transp = transp;
    }

    /// A Linux framebuffer device node.
    ///
    /// The device is held open for the lifetime of the value and closed when it
    /// is dropped, whichever way the caller exits.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fbdepth_core::{DeviceFamily, Framebuffer, LinuxFramebuffer};
    ///
    /// let fb = LinuxFramebuffer::open(LinuxFramebuffer::DEFAULT_PATH, DeviceFamily::Kobo.caps())?;
    /// println!("{}bpp", fb.probe()?.bitdepth);
    /// # Ok::<(), fbdepth_core::FbDepthError>(())
    /// ```
    #[derive(Debug)]
    pub struct LinuxFramebuffer {
        file: File,
        caps: DeviceCaps,
        boot_rotation: NativeRotation,
    }

    impl LinuxFramebuffer {
        /// The primary framebuffer.
        pub const DEFAULT_PATH: &'static str = super::DEFAULT_FB_PATH;

        /// Open the framebuffer at `path`.
        ///
        /// Unless `caps` pins it, the boot rotation is taken to be the rotation the
        /// framebuffer is in right now.
        ///
        /// # Errors
        ///
        /// - [`FbDepthError::Io`] if the device can't be opened
        /// - [`FbDepthError::ProbeFailure`] if reading the initial rotation fails
        pub fn open(path: impl AsRef<Path>, caps: DeviceCaps) -> Result<Self, FbDepthError> {
            let path = path.as_ref();
            let file = OpenOptions::new().read(true).write(true).open(path)?;
            debug!("opened {}", path.display());

            let mut fb = Self {
                file,
                caps,
                boot_rotation: NativeRotation::UR,
            };
            fb.boot_rotation = match fb.caps.boot_rotation {
                Some(rotation) => rotation,
                None => {
                    let var = fb.read_var_info().map_err(probe_failure("FBIOGET_VSCREENINFO"))?;
                    fb.current_rotation(&var)?
                }
            };
            Ok(fb)
        }

        fn read_var_info(&self) -> nix::Result<sys::fb_var_screeninfo> {
            let mut var = sys::fb_var_screeninfo::default();
            unsafe { sys::fb_get_var_screeninfo(self.file.as_raw_fd(), &mut var) }?;
            Ok(var)
        }

        fn read_fix_info(&self) -> nix::Result<sys::fb_fix_screeninfo> {
            let mut fix = sys::fb_fix_screeninfo::default();
            unsafe { sys::fb_get_fix_screeninfo(self.file.as_raw_fd(), &mut fix) }?;
            Ok(fix)
        }

        fn read_orientation(&self) -> Result<LegacyOrientation, FbDepthError> {
            let mut raw = 0u32;
            unsafe { sys::eink_get_display_orientation(self.file.as_raw_fd(), &mut raw) }
                .map_err(probe_failure("FBIO_EINK_GET_DISPLAY_ORIENTATION"))?;
            LegacyOrientation::from_raw(raw).ok_or_else(|| FbDepthError::ProbeFailure {
                query: "FBIO_EINK_GET_DISPLAY_ORIENTATION",
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown orientation {raw}"),
                ),
            })
        }

        // einkfb ignores the standard rotate field entirely.
        fn current_rotation(
            &self,
            var: &sys::fb_var_screeninfo,
        ) -> Result<NativeRotation, FbDepthError> {
            if self.caps.is_legacy_orientation_model {
                let orientation = self.read_orientation()?;
                let rotation = rotation::resolve_legacy_orientation(orientation, &self.caps);
                debug!("einkfb orientation: {:?} -> rotation {}", orientation, rotation);
                Ok(rotation)
            } else {
                NativeRotation::try_from(var.rotate)
            }
        }
    }

    impl Framebuffer for LinuxFramebuffer {
        fn probe(&self) -> Result<HardwareSnapshot, FbDepthError> {
            let var = self
                .read_var_info()
                .map_err(probe_failure("FBIOGET_VSCREENINFO"))?;
            let fix = self
                .read_fix_info()
                .map_err(probe_failure("FBIOGET_FSCREENINFO"))?;
            let rotation = self.current_rotation(&var)?;

            let id_len = fix.id.iter().position(|&c| c == 0).unwrap_or(fix.id.len());
            let fb_id = fix.id[..id_len]
                .iter()
                .map(|&c| char::from(c as u8))
                .collect();

            Ok(HardwareSnapshot {
                width: var.xres,
                height: var.yres,
                bitdepth: var.bits_per_pixel,
                rotation,
                grayscale: var.grayscale,
                scanline_stride: fix.line_length,
                buffer_size: fix.smem_len,
                fb_id,
                boot_rotation: self.boot_rotation,
                rotation_quirk: self.caps.rotation_quirk,
                is_legacy_orientation_model: self.caps.is_legacy_orientation_model,
            })
        }

        fn apply(&self, target: &ResolvedTarget) -> Result<(), FbDepthError> {
            let fd = self.file.as_raw_fd();
            let mut var = self
                .read_var_info()
                .map_err(apply_failure("read the variable screen info"))?;

            var.bits_per_pixel = target.bitdepth;
            set_bitfields(&mut var, target.bitdepth);
            var.grayscale = target.grayscale.resolve_against(var.grayscale);
            if let Some(rotation) = target.rotation {
                if !self.caps.is_legacy_orientation_model {
                    var.rotate = rotation.into();
                }
            }
            var.xoffset = 0;
            var.yoffset = 0;
            var.activate = sys::FB_ACTIVATE_FORCE | sys::FB_ACTIVATE_NOW;

            debug!(
                "FBIOPUT_VSCREENINFO: {}bpp, grayscale {}, rotate {}",
                var.bits_per_pixel, var.grayscale, var.rotate
            );
            unsafe { sys::fb_put_var_screeninfo(fd, &var) }
                .map_err(apply_failure("set the variable screen info"))?;

            if let Some(rotation) = target.rotation {
                if self.caps.is_legacy_orientation_model {
                    let orientation = rotation::to_legacy_orientation(rotation, &self.caps)?;
                    unsafe { sys::eink_set_display_orientation(fd, orientation.raw() as _) }
                        .map_err(apply_failure("set the einkfb orientation"))?;
                }
            }
            Ok(())
        }
    }
}
