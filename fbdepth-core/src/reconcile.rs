//! The reconciliation pass.

use log::{debug, info, warn};

use crate::decision::{self, ChangeVerdict};
use crate::device::DeviceCaps;
use crate::error::FbDepthError;
use crate::framebuffer::Framebuffer;
use crate::grayscale;
use crate::request::{ResolvedTarget, RotationRequest, TargetRequest};
use crate::rotation;
use crate::state::HardwareSnapshot;

/// Steps of a reconciliation pass.
///
/// `Start → Probed → Resolved → Decided → {NoOpDone | Applying → Reprobed → Done}`,
/// with any step able to end in `Failed` instead. Only probing, applying and
/// re-probing talk to the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing done yet.
    Start,
    /// Hardware state read.
    Probed,
    /// Target resolved against the device quirks.
    Resolved,
    /// Verdict computed.
    Decided,
    /// Nothing to do; no hardware mutation happened.
    NoOpDone,
    /// Mode switch in progress.
    Applying,
    /// Post-switch state read back.
    Reprobed,
    /// Mode switched and confirmed.
    Done,
    /// A step failed; the error is returned to the caller.
    Failed,
}

impl Phase {
    /// Whether the pass is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NoOpDone | Self::Done | Self::Failed)
    }
}

/// How a reconciliation pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The hardware already matched the request.
    NoOp {
        /// State at probe time.
        snapshot: HardwareSnapshot,
    },
    /// A new mode was applied.
    Applied {
        /// State before the switch.
        before: HardwareSnapshot,
        /// State read back after the switch.
        after: HardwareSnapshot,
        /// What differed.
        verdict: ChangeVerdict,
    },
}

impl Outcome {
    /// Whether the hardware was touched.
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Reconciles a framebuffer with a [`TargetRequest`] for one device family.
///
/// # Example
///
/// ```
/// use fbdepth_core::{DeviceFamily, MockFramebuffer, NightMode, Reconciler, TargetRequest};
///
/// let caps = DeviceFamily::Kobo.caps();
/// let mock = MockFramebuffer::new(caps.clone());
/// let reconciler = Reconciler::new(caps);
///
/// let request = TargetRequest {
///     bitdepth: Some("8".parse()?),
///     night_mode: NightMode::On,
///     ..TargetRequest::default()
/// };
/// assert!(reconciler.run(&mock, &request)?.applied());
/// // Already there.
/// assert!(!reconciler.run(&mock, &request)?.applied());
/// # Ok::<(), fbdepth_core::FbDepthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Reconciler {
    caps: DeviceCaps,
}

impl Reconciler {
    /// Create a reconciler for a device family.
    pub fn new(caps: DeviceCaps) -> Self {
        Self { caps }
    }

    /// The capability descriptor in use.
    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// Turn a request into concrete values for this device and snapshot.
    ///
    /// # Errors
    /// [`FbDepthError::UnsupportedOperation`] for canonical rotations on families
    /// without canonical addressing, and for automatic Portrait on quirky
    /// families whose boot rotation isn't pinned.
    pub fn resolve(
        &self,
        request: &TargetRequest,
        snapshot: &HardwareSnapshot,
    ) -> Result<ResolvedTarget, FbDepthError> {
        let bitdepth = request
            .bitdepth
            .map_or(snapshot.bitdepth, |depth| depth.bits());

        let rotation = match request.rotation {
            None => None,
            Some(RotationRequest::Native(rotation)) => Some(rotation),
            Some(RotationRequest::Canonical(canonical)) => {
                let native = rotation::to_native(canonical, &self.caps)?;
                debug!(
                    "Requested canonical rotation {:?} translates to {} for this device",
                    canonical, native
                );
                Some(native)
            }
            Some(RotationRequest::AutoPortrait) => {
                rotation::check_auto_portrait(&self.caps)?;
                let native = rotation::resolve_auto_portrait(snapshot);
                debug!(
                    "Device's expected Portrait orientation should be: {} ({})",
                    native,
                    rotation::describe(native)
                );
                Some(native)
            }
        };

        Ok(ResolvedTarget {
            bitdepth,
            rotation,
            grayscale: grayscale::derive_grayscale(bitdepth, request.night_mode),
        })
    }

    /// Run one full pass: probe, resolve, decide, and apply only if needed.
    ///
    /// Nothing is retried: a failed mode switch leaves the hardware in an
    /// unknown state that a blind second attempt could make worse.
    pub fn run(
        &self,
        fb: &dyn Framebuffer,
        request: &TargetRequest,
    ) -> Result<Outcome, FbDepthError> {
        self.run_traced(fb, request).1
    }

    /// Like [`run`](Self::run), but also reports the terminal [`Phase`].
    pub fn run_traced(
        &self,
        fb: &dyn Framebuffer,
        request: &TargetRequest,
    ) -> (Phase, Result<Outcome, FbDepthError>) {
        let mut phase = Phase::Start;
        let result = self.run_phases(fb, request, &mut phase);
        if let Err(err) = &result {
            debug!("reconciliation failed: {}", err);
            advance(&mut phase, Phase::Failed);
        }
        (phase, result)
    }

    fn run_phases(
        &self,
        fb: &dyn Framebuffer,
        request: &TargetRequest,
        phase: &mut Phase,
    ) -> Result<Outcome, FbDepthError> {
        let before = fb.probe()?;
        advance(phase, Phase::Probed);
        before.log_summary();

        let target = self.resolve(request, &before)?;
        advance(phase, Phase::Resolved);

        let verdict = decision::decide(&before, &target);
        advance(phase, Phase::Decided);
        debug!("{:?}", verdict);

        if !verdict.any_change() {
            advance(phase, Phase::NoOpDone);
            return Ok(Outcome::NoOp { snapshot: before });
        }

        advance(phase, Phase::Applying);
        info!(
            "Switching fb to {}bpp{} @ rotation {}",
            target.bitdepth,
            if target.bitdepth == before.bitdepth {
                " (current bitdepth)"
            } else {
                ""
            },
            target
                .rotation
                .map_or_else(|| "(current)".to_owned(), |r| r.to_string())
        );
        fb.apply(&target)?;

        let after = fb.probe()?;
        advance(phase, Phase::Reprobed);
        after.log_summary();

        let leftover = decision::decide(&after, &target);
        if leftover.bitdepth_changed || leftover.rotation_changed {
            warn!(
                "Framebuffer did not take the requested mode: now {}bpp @ rotation {}",
                after.bitdepth, after.rotation
            );
        }

        advance(phase, Phase::Done);
        Ok(Outcome::Applied {
            before,
            after,
            verdict,
        })
    }
}

fn advance(phase: &mut Phase, next: Phase) {
    debug!("{:?} -> {:?}", phase, next);
    *phase = next;
}
