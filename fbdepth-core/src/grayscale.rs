//! Night mode and the hardware grayscale-inversion flag.
//!
//! The EPDC only honors palette inversion at 8bpp. At higher depths any non-zero
//! `grayscale` value breaks rendering, so the flag is forced to
//! [`GrayscaleCode::NoGrayscale`] there whatever the requested night mode.

use std::str::FromStr;

use crate::error::FbDepthError;

/// `GRAYSCALE_8BIT`
const GRAYSCALE_8BIT: u32 = 1;
/// `GRAYSCALE_8BIT_INVERTED`
const GRAYSCALE_8BIT_INVERTED: u32 = 2;
const TOGGLE_GRAYSCALE: u32 = 1 << 6;
const KEEP_CURRENT_GRAYSCALE: u32 = 1 << 7;

/// Requested night mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NightMode {
    /// Invert the palette.
    On,
    /// Regular palette.
    Off,
    /// Flip whatever the hardware currently does.
    Toggle,
    /// Nothing requested; behaves like [`NightMode::Off`].
    #[default]
    Unspecified,
}

impl FromStr for NightMode {
    type Err = FbDepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(Self::On),
            "off" | "false" | "no" | "0" => Ok(Self::Off),
            "toggle" | "-1" => Ok(Self::Toggle),
            _ => Err(FbDepthError::parse("nightmode state", s)),
        }
    }
}

/// The grayscale flag to program, as decided by [`derive_grayscale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrayscaleCode {
    /// 8bpp, regular palette.
    None8bit,
    /// 8bpp, inverted palette.
    Inverted8bit,
    /// Anything above 8bpp.
    NoGrayscale,
    /// Flip the live flag at apply time.
    Toggle,
    /// Leave the live flag alone.
    KeepCurrent,
}

impl GrayscaleCode {
    /// The value written to `fb_var_screeninfo.grayscale`.
    ///
    /// `Toggle` and `KeepCurrent` map to out-of-band sentinels that the kernel
    /// never reports back.
    pub const fn hw_value(self) -> u32 {
        match self {
            Self::NoGrayscale => 0,
            Self::None8bit => GRAYSCALE_8BIT,
            Self::Inverted8bit => GRAYSCALE_8BIT_INVERTED,
            Self::Toggle => TOGGLE_GRAYSCALE,
            Self::KeepCurrent => KEEP_CURRENT_GRAYSCALE,
        }
    }

    /// Whether this is an absolute value rather than a relative instruction.
    pub const fn is_absolute(self) -> bool {
        !matches!(self, Self::Toggle | Self::KeepCurrent)
    }

    /// Resolve this code against the flag currently set in hardware.
    ///
    /// Toggling only flips between the two 8bpp palettes; any other live value
    /// is returned as-is.
    pub const fn resolve_against(self, live: u32) -> u32 {
        match self {
            Self::Toggle => match live {
                GRAYSCALE_8BIT => GRAYSCALE_8BIT_INVERTED,
                GRAYSCALE_8BIT_INVERTED => GRAYSCALE_8BIT,
                other => other,
            },
            Self::KeepCurrent => live,
            absolute => absolute.hw_value(),
        }
    }
}

/// Pick the grayscale flag for `bitdepth` given the requested night mode.
pub fn derive_grayscale(bitdepth: u32, night_mode: NightMode) -> GrayscaleCode {
    if night_mode == NightMode::Toggle {
        return GrayscaleCode::Toggle;
    }

    match bitdepth {
        // 4bpp has its own dedicated grayscale constants, don't touch them.
        0..8 => GrayscaleCode::KeepCurrent,
        8 if night_mode == NightMode::On => GrayscaleCode::Inverted8bit,
        8 => GrayscaleCode::None8bit,
        _ => GrayscaleCode::NoGrayscale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        use GrayscaleCode::*;

        assert_eq!(derive_grayscale(8, NightMode::On), Inverted8bit);
        assert_eq!(derive_grayscale(8, NightMode::Off), None8bit);
        assert_eq!(derive_grayscale(8, NightMode::Unspecified), None8bit);
        assert_eq!(derive_grayscale(8, NightMode::Toggle), Toggle);

        for depth in [16, 24, 32] {
            assert_eq!(derive_grayscale(depth, NightMode::On), NoGrayscale);
            assert_eq!(derive_grayscale(depth, NightMode::Off), NoGrayscale);
            assert_eq!(derive_grayscale(depth, NightMode::Unspecified), NoGrayscale);
            assert_eq!(derive_grayscale(depth, NightMode::Toggle), Toggle);
        }
    }

    #[test]
    fn test_sub_8bpp_keeps_current() {
        assert_eq!(derive_grayscale(4, NightMode::On), GrayscaleCode::KeepCurrent);
        assert_eq!(derive_grayscale(4, NightMode::Toggle), GrayscaleCode::Toggle);
    }

    #[test]
    fn test_hw_values() {
        assert_eq!(GrayscaleCode::NoGrayscale.hw_value(), 0);
        assert_eq!(GrayscaleCode::None8bit.hw_value(), 1);
        assert_eq!(GrayscaleCode::Inverted8bit.hw_value(), 2);
        assert!(!GrayscaleCode::Toggle.is_absolute());
        assert!(GrayscaleCode::NoGrayscale.is_absolute());
    }

    #[test]
    fn test_resolve_against_live_flag() {
        assert_eq!(GrayscaleCode::Toggle.resolve_against(1), 2);
        assert_eq!(GrayscaleCode::Toggle.resolve_against(2), 1);
        assert_eq!(GrayscaleCode::Toggle.resolve_against(0), 0);
        assert_eq!(GrayscaleCode::KeepCurrent.resolve_against(2), 2);
        assert_eq!(GrayscaleCode::Inverted8bit.resolve_against(1), 2);
    }

    #[test]
    fn test_parse_tristate() {
        assert_eq!("ON".parse::<NightMode>().unwrap(), NightMode::On);
        assert_eq!("yes".parse::<NightMode>().unwrap(), NightMode::On);
        assert_eq!("Off".parse::<NightMode>().unwrap(), NightMode::Off);
        assert_eq!("0".parse::<NightMode>().unwrap(), NightMode::Off);
        assert_eq!("toggle".parse::<NightMode>().unwrap(), NightMode::Toggle);
        assert_eq!("-1".parse::<NightMode>().unwrap(), NightMode::Toggle);
        assert!("maybe".parse::<NightMode>().is_err());
        assert!("".parse::<NightMode>().is_err());
    }
}
