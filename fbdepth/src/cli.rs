use clap::{ArgGroup, Parser};
use fbdepth_core::{
    Bitdepth, CanonicalRotation, DEFAULT_FB_PATH, DeviceCaps, DeviceFamily, FbDepthError,
    NativeRotation, NightMode, Query, RotationRequest, TargetRequest, rotation,
};
use std::path::PathBuf;

fn parse_boot_rotation(s: &str) -> Result<NativeRotation, FbDepthError> {
    let invalid = || FbDepthError::Parse {
        what: "boot rotation",
        value: s.to_owned(),
    };
    let code: i64 = s.parse().map_err(|_| invalid())?;
    NativeRotation::new(code).map_err(|_| invalid())
}

/// The device family this binary was built for.
pub fn build_family() -> DeviceFamily {
    if cfg!(feature = "kobo") {
        DeviceFamily::Kobo
    } else if cfg!(feature = "kindle") {
        DeviceFamily::Kindle
    } else if cfg!(feature = "cervantes") {
        DeviceFamily::Cervantes
    } else {
        DeviceFamily::Generic
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "fbdepth",
    version,
    about = "Tiny tool to set the framebuffer bitdepth, rotation and night mode on eInk devices"
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .multiple(true)
        .args([
            "depth",
            "rota",
            "canonicalrota",
            "nightmode",
            "get",
            "getcode",
            "getrota",
            "getrotacode",
            "getcanonicalrota",
            "getcanonicalrotacode",
        ])
))]
pub struct Cli {
    #[arg(short, long, value_name = "8|16|24|32", help = "Switch the framebuffer to the supplied bitdepth")]
    pub depth: Option<Bitdepth>,
    #[arg(
        short,
        long,
        value_name = "UR|CW|UD|CCW|0-3|-1",
        allow_hyphen_values = true,
        conflicts_with = "canonicalrota",
        help = "Switch the framebuffer to the supplied native rotation; -1 is the device's Portrait orientation"
    )]
    pub rota: Option<RotationRequest>,
    #[arg(
        short = 'R',
        long,
        value_name = "UR|CW|UD|CCW",
        help = "Switch the framebuffer to the supplied canonical rotation, translated to the native one"
    )]
    pub canonicalrota: Option<CanonicalRotation>,
    #[arg(
        short = 'H',
        long,
        value_name = "on|off|toggle",
        allow_hyphen_values = true,
        help = "Hardware inversion (8bpp only, safely ignored otherwise)"
    )]
    pub nightmode: Option<NightMode>,
    #[arg(short, long, help = "Just output the current bitdepth to stdout")]
    pub get: bool,
    #[arg(short = 'G', long, help = "Just exit with the current bitdepth as exit code")]
    pub getcode: bool,
    #[arg(short = 'o', long, help = "Just output the current rotation to stdout")]
    pub getrota: bool,
    #[arg(short = 'O', long, help = "Just exit with the current rotation as exit code")]
    pub getrotacode: bool,
    #[arg(
        short = 'c',
        long,
        help = "Just output the current canonical rotation to stdout"
    )]
    pub getcanonicalrota: bool,
    #[arg(
        short = 'C',
        long,
        help = "Just exit with the current canonical rotation as exit code"
    )]
    pub getcanonicalrotacode: bool,
    #[arg(short, long, conflicts_with = "quiet", help = "Print diagnostic messages")]
    pub verbose: bool,
    #[arg(short, long, help = "Hide diagnostic messages")]
    pub quiet: bool,
    #[arg(long, default_value_t = build_family(), help = "Device family (defaults to the build variant)")]
    pub device: DeviceFamily,
    #[arg(
        long,
        value_name = "0-3",
        value_parser = parse_boot_rotation,
        help = "Native rotation the device boots in, needed for -r -1 on quirky Kobos"
    )]
    pub bootrota: Option<NativeRotation>,
    #[arg(long, default_value = DEFAULT_FB_PATH, help = "Framebuffer device node")]
    pub fb: PathBuf,
}

/// A read-only query and how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryAction {
    pub what: Query,
    pub print: bool,
    pub as_exit_code: bool,
}

impl Cli {
    /// The first query requested, bitdepth before rotation before canonical rotation.
    pub fn query_action(&self) -> Option<QueryAction> {
        [
            (Query::Bitdepth, self.get, self.getcode),
            (Query::Rotation, self.getrota, self.getrotacode),
            (
                Query::CanonicalRotation,
                self.getcanonicalrota,
                self.getcanonicalrotacode,
            ),
        ]
        .into_iter()
        .find(|&(_, print, code)| print || code)
        .map(|(what, print, as_exit_code)| QueryAction {
            what,
            print,
            as_exit_code,
        })
    }

    /// Whether stdout must stay clean for a printed value.
    pub fn prints_value(&self) -> bool {
        self.get || self.getrota || self.getcanonicalrota
    }

    pub fn request(&self) -> TargetRequest {
        TargetRequest {
            bitdepth: self.depth,
            rotation: self
                .rota
                .or(self.canonicalrota.map(RotationRequest::Canonical)),
            night_mode: self.nightmode.unwrap_or_default(),
        }
    }

    /// The selected family's capabilities, with `--bootrota` applied.
    pub fn caps(&self) -> DeviceCaps {
        let caps = self.device.caps();
        DeviceCaps {
            boot_rotation: self.bootrota.or(caps.boot_rotation),
            ..caps
        }
    }

    /// Reject flags the device family can't honor, before opening anything.
    pub fn check_supported(&self, caps: &DeviceCaps) -> Result<(), FbDepthError> {
        if self.canonicalrota.is_some() && !caps.supports_canonical_rotation {
            return Err(FbDepthError::UnsupportedOperation(
                "Canonical rotation (-R, --canonicalrota)",
            ));
        }
        if self.rota == Some(RotationRequest::AutoPortrait) {
            rotation::check_auto_portrait(caps)?;
        }
        if let Some(action) = self.query_action() {
            action.what.check_supported(caps)?;
        }
        Ok(())
    }
}
