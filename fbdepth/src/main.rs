use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use fbdepth_core::{Bitdepth, FbDepthError, Framebuffer, Outcome, Reconciler, query};
use log::{LevelFilter, info, warn};
use std::io::Write;
use std::path::Path;

mod cli;

use cli::Cli;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match (err.print(), err.kind()) {
                (Err(io_err), _) => FbDepthError::from(io_err).exit_code(),
                (Ok(()), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => 0,
                (Ok(()), kind) => FbDepthError::Parse {
                    what: "arguments",
                    value: format!("{kind:?}"),
                }
                .exit_code(),
            };
            std::process::exit(code);
        }
    };

    // A printed value must be the only thing on stdout.
    let quiet = cli.quiet || cli.prints_value();
    init_logging(cli.verbose && !quiet, quiet);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[FBDepth] {err}!");
            if err.wants_usage() {
                if let Err(io_err) = Cli::command().print_help() {
                    warn!("Failed to print usage: {}", io_err);
                }
            }
            err.exit_code()
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::Off
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            if record.level() <= log::Level::Warn {
                writeln!(buf, "[FBDepth] {}", record.args())
            } else {
                writeln!(buf, "{}", record.args())
            }
        })
        .init();
}

#[cfg(target_os = "linux")]
fn open_framebuffer(
    path: &Path,
    caps: fbdepth_core::DeviceCaps,
) -> Result<Box<dyn Framebuffer>, FbDepthError> {
    Ok(Box::new(fbdepth_core::LinuxFramebuffer::open(path, caps)?))
}

#[cfg(not(target_os = "linux"))]
fn open_framebuffer(
    _path: &Path,
    _caps: fbdepth_core::DeviceCaps,
) -> Result<Box<dyn Framebuffer>, FbDepthError> {
    Err(FbDepthError::UnsupportedOperation("Framebuffer access"))
}

/// Returns the process exit code. The framebuffer is closed before this returns.
fn run(cli: &Cli) -> Result<i32, FbDepthError> {
    let caps = cli.caps();
    cli.check_supported(&caps)?;

    if cli.depth == Some(Bitdepth::TwentyFour) {
        warn!("24bpp handling appears to be broken *somewhere*, you probably don't want to use it");
    }

    let fb = open_framebuffer(&cli.fb, caps.clone())?;

    if let Some(action) = cli.query_action() {
        let value = query(fb.as_ref(), &caps, action.what)?;
        if action.print {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{value}")?;
            stdout.flush()?;
        }
        return Ok(if action.as_exit_code { value as i32 } else { 0 });
    }

    let reconciler = Reconciler::new(caps);
    match reconciler.run(fb.as_ref(), &cli.request())? {
        Outcome::NoOp { snapshot } => {
            info!(
                "Nothing to do: already {}bpp @ rotation {} with grayscale {}",
                snapshot.bitdepth, snapshot.rotation, snapshot.grayscale
            );
        }
        Outcome::Applied { after, verdict, .. } => {
            info!(
                "Now {}bpp @ rotation {} with grayscale {} ({:?})",
                after.bitdepth, after.rotation, after.grayscale, verdict
            );
        }
    }
    Ok(0)
}
