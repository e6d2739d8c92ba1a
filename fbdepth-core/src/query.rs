//! Read-only queries.

use crate::device::DeviceCaps;
use crate::error::FbDepthError;
use crate::framebuffer::Framebuffer;
use crate::rotation;

/// What to report about the current framebuffer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Bits per pixel.
    Bitdepth,
    /// Native rotation code.
    Rotation,
    /// Canonical rotation code.
    CanonicalRotation,
}

impl Query {
    /// Check the query makes sense on this device before touching the hardware.
    ///
    /// # Errors
    /// [`FbDepthError::UnsupportedOperation`] for canonical queries on families
    /// without canonical addressing.
    pub fn check_supported(self, caps: &DeviceCaps) -> Result<(), FbDepthError> {
        if self == Self::CanonicalRotation && !caps.supports_canonical_rotation {
            return Err(FbDepthError::UnsupportedOperation("Canonical rotation"));
        }
        Ok(())
    }
}

/// Probe the framebuffer once and answer `what`. Never mutates anything.
pub fn query(fb: &dyn Framebuffer, caps: &DeviceCaps, what: Query) -> Result<u32, FbDepthError> {
    what.check_supported(caps)?;
    let snapshot = fb.probe()?;
    snapshot.log_summary();

    Ok(match what {
        Query::Bitdepth => snapshot.bitdepth,
        Query::Rotation => snapshot.rotation.into(),
        Query::CanonicalRotation => {
            u32::from(rotation::to_canonical(snapshot.rotation, caps)?.code())
        }
    })
}
