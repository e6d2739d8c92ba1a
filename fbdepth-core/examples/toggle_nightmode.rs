//! Example: Toggle night mode on a Kobo.
//!
//! Run with: `cargo run --example toggle_nightmode`

#[cfg(target_os = "linux")]
fn main() -> Result<(), fbdepth_core::FbDepthError> {
    use fbdepth_core::{
        DeviceFamily, Framebuffer, LinuxFramebuffer, NightMode, Outcome, Reconciler, TargetRequest,
    };

    // Initialize logging (optional)
    env_logger::init();

    let caps = DeviceFamily::Kobo.caps();
    let fb = LinuxFramebuffer::open(LinuxFramebuffer::DEFAULT_PATH, caps.clone())?;

    let state = fb.probe()?;
    println!(
        "Current state: {}bpp, rotation={}, grayscale={}",
        state.bitdepth, state.rotation, state.grayscale
    );

    // Inversion only exists at 8bpp, so switch there too.
    let request = TargetRequest {
        bitdepth: Some("8".parse()?),
        night_mode: NightMode::Toggle,
        ..TargetRequest::default()
    };

    match Reconciler::new(caps).run(&fb, &request) {
        Ok(Outcome::Applied { after, .. }) => println!("Grayscale flag is now {}", after.grayscale),
        Ok(Outcome::NoOp { .. }) => println!("Nothing to do"),
        Err(e) => eprintln!("Error toggling night mode: {}", e),
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("This example needs a Linux framebuffer");
}
