// Post-composition contract. The renderer itself stops at the raw buffer;
// passes that massage it afterwards plug in here and are provided by the
// embedding application.

use crate::render::buffer::{Layer, RenderBuffer};

/// A full-frame pass over one finished layer. Implementations read and
/// write the same buffer layout the tile workers produced and run after
/// every tile has completed.
///
/// The two passes the contract was shaped around:
///
/// * Auto-exposure scans a layer's luminance range, builds a 128-bin
///   histogram in log-luminance weighted toward the frame center,
///   discards configured low/high percentiles, and scales the layer so
///   the trimmed mean luminance meets a target.
/// * Vignette multiplies each pixel by `1 + jitter - k * |uv - 0.5|^2`.
pub trait PostProcess {
    fn apply(&self, buffer: &RenderBuffer, layer: Layer);
}
