//! What the caller asks for, and what that turns into on a given device.

use std::fmt;
use std::str::FromStr;

use crate::error::FbDepthError;
use crate::grayscale::{GrayscaleCode, NightMode};
use crate::rotation::{CanonicalRotation, NativeRotation};

/// Bitdepths the tool is willing to switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitdepth {
    /// 8bpp grayscale.
    Eight = 8,
    /// RGB565.
    Sixteen = 16,
    /// RGB888. Known to misbehave on most real devices.
    TwentyFour = 24,
    /// XRGB8888.
    ThirtyTwo = 32,
}

impl Bitdepth {
    /// Bits per pixel.
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

impl FromStr for Bitdepth {
    type Err = FbDepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "8" => Ok(Self::Eight),
            "16" => Ok(Self::Sixteen),
            "24" => Ok(Self::TwentyFour),
            "32" => Ok(Self::ThirtyTwo),
            _ => Err(FbDepthError::parse("bitdepth", s)),
        }
    }
}

impl fmt::Display for Bitdepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bpp", self.bits())
    }
}

/// A requested rotation, in whichever encoding the caller used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationRequest {
    /// A native code, passed through untouched.
    Native(NativeRotation),
    /// A user-facing rotation, translated through the device's quirk.
    Canonical(CanonicalRotation),
    /// Whatever the device considers Portrait.
    AutoPortrait,
}

impl FromStr for RotationRequest {
    type Err = FbDepthError;

    /// Parses the native rotation grammar: `UR|CW|UD|CCW`, `0`-`3`, or `-1` for auto-portrait.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-1" {
            return Ok(Self::AutoPortrait);
        }
        let code = s
            .parse::<CanonicalRotation>()
            .map_err(|_| FbDepthError::parse("rotation", s))?
            .code();
        NativeRotation::new(i64::from(code)).map(Self::Native)
    }
}

/// The operator's target configuration. Anything left unset is kept as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetRequest {
    /// Target bitdepth.
    pub bitdepth: Option<Bitdepth>,
    /// Target rotation.
    pub rotation: Option<RotationRequest>,
    /// Target night mode.
    pub night_mode: NightMode,
}

impl TargetRequest {
    /// Whether the request asks for anything at all.
    pub fn is_empty(&self) -> bool {
        self.bitdepth.is_none()
            && self.rotation.is_none()
            && self.night_mode == NightMode::Unspecified
    }
}

/// A [`TargetRequest`] with every device quirk resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Bits per pixel.
    pub bitdepth: u32,
    /// Native rotation, or `None` to leave it alone.
    pub rotation: Option<NativeRotation>,
    /// Grayscale flag to program.
    pub grayscale: GrayscaleCode,
}
