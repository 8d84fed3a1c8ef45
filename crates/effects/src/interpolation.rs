//! Per-commit snapshots and linear blending for interpolated effects.
//!
//! On a boundary tick an effect commits its draw state normally and each
//! commit is recorded under a fingerprint of (call site, commit ordinal). On
//! an interior tick the effect recomputes its state and every commit is
//! blended against the recorded snapshot before being handed on.

use std::collections::HashMap;
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Identity of the code location that issued a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallSite(pub u32);

impl CallSite {
    /// Call site of the caller, stable for the lifetime of the binary.
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        // FNV-1a
        let mut hash: u32 = 0x811C_9DC5;
        let mut mix = |byte: u8| {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(0x0100_0193);
        };
        location.file().bytes().for_each(&mut mix);
        location.line().to_le_bytes().into_iter().for_each(&mut mix);
        location.column().to_le_bytes().into_iter().for_each(&mut mix);
        Self(hash)
    }
}

/// Cantor pairing of two 32-bit values. Injective over all inputs.
pub fn cantor_pair(x: u32, y: u32) -> u128 {
    let x = u128::from(x);
    let y = u128::from(y);
    (x + y) * (x + y + 1) / 2 + y
}

/// Snapshot key for the `ordinal`-th commit issued from `site`.
pub fn fingerprint(site: CallSite, ordinal: u32) -> u128 {
    cantor_pair(site.0, ordinal)
}

/// Model transform as laid out by the renderer: a fixed-point 3x3 rotation
/// plus translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationMatrix {
    /// Rotation sub-matrix in 4.12 fixed point.
    pub sub: [[i16; 3]; 3],
    /// Translation.
    pub position: [i32; 3],
}

/// Material animation parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialContext {
    /// Transparency level.
    pub transparency: i32,
    /// Blend parameter.
    pub blend: i32,
}

/// 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

/// Palette and texture scroll offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct PaletteOffsets {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub field_24: i32,
    pub z2: i32,
    pub scroll_v: i32,
    pub v: i32,
}

/// Everything recorded for one commit on a boundary tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Model transform.
    pub rotation: RotationMatrix,
    /// Material parameters.
    pub material: MaterialContext,
    /// Vertex colour.
    pub color: Color,
    /// Palette offsets.
    pub palette: PaletteOffsets,
}

/// Snapshot storage owned by an interpolating decorator.
#[derive(Debug, Clone, Default)]
pub struct InterpolationState {
    snapshots: HashMap<u128, Snapshot>,
    ordinal: u32,
    boundary_commits: u32,
}

impl InterpolationState {
    /// Number of snapshots recorded since the last boundary tick began.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub(crate) fn begin_invoke(&mut self, boundary: bool) {
        self.ordinal = 0;
        if boundary {
            self.snapshots.clear();
        }
    }

    pub(crate) fn end_boundary(&mut self) {
        self.boundary_commits = self.ordinal;
    }

    pub(crate) fn view(&mut self, phase: u32, period: u32) -> Interpolation<'_> {
        Interpolation {
            state: self,
            phase,
            period,
        }
    }
}

/// Interpolation handle passed to an effect routine for one invocation.
#[derive(Debug)]
pub struct Interpolation<'a> {
    state: &'a mut InterpolationState,
    phase: u32,
    period: u32,
}

impl Interpolation<'_> {
    /// Whether this invocation is on an interior tick (blend instead of save).
    pub fn is_interior(&self) -> bool {
        self.phase != 0
    }

    /// Position within the current period, `0` on boundary ticks.
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Decorator period.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Commit ordinal of the next commit in this invocation.
    pub fn ordinal(&self) -> u32 {
        self.state.ordinal
    }

    /// Commits made during the most recent boundary invocation.
    pub fn boundary_commits(&self) -> u32 {
        self.state.boundary_commits
    }

    /// Advance the commit ordinal. Call once per commit after saving or
    /// blending.
    pub fn next_commit(&mut self) {
        self.state.ordinal = self.state.ordinal.wrapping_add(1);
    }

    /// Record the state of the current commit. Ignored on interior ticks.
    pub fn save(&mut self, site: CallSite, snapshot: Snapshot) {
        if self.is_interior() {
            return;
        }
        let key = fingerprint(site, self.state.ordinal);
        self.state.snapshots.insert(key, snapshot);
    }

    fn previous(&self, site: CallSite) -> Option<&Snapshot> {
        if !self.is_interior() {
            return None;
        }
        self.state
            .snapshots
            .get(&fingerprint(site, self.state.ordinal))
    }

    /// Blend a transform against the boundary snapshot. Returns whether a
    /// snapshot was found.
    pub fn blend_rotation(&self, site: CallSite, next: &mut RotationMatrix) -> bool {
        let Some(previous) = self.previous(site) else {
            return false;
        };
        let prev = &previous.rotation;
        for (row, prev_row) in next.sub.iter_mut().zip(prev.sub.iter()) {
            for (value, &before) in row.iter_mut().zip(prev_row.iter()) {
                // Difference is kept in the element's own 16-bit width.
                let diff = value.wrapping_sub(before);
                let step = i32::from(diff) * self.phase as i32 / self.period as i32;
                *value = (i32::from(before) + step) as i16;
            }
        }
        for (value, &before) in next.position.iter_mut().zip(prev.position.iter()) {
            *value = blend_i32(before, *value, self.phase, self.period);
        }
        true
    }

    /// Blend material parameters against the boundary snapshot.
    pub fn blend_material(&self, site: CallSite, next: &mut MaterialContext) -> bool {
        let Some(previous) = self.previous(site) else {
            return false;
        };
        let prev = previous.material;
        next.transparency = blend_i32(prev.transparency, next.transparency, self.phase, self.period);
        next.blend = blend_i32(prev.blend, next.blend, self.phase, self.period);
        true
    }

    /// Blend a colour against the boundary snapshot.
    pub fn blend_color(&self, site: CallSite, next: &mut Color) -> bool {
        let Some(previous) = self.previous(site) else {
            return false;
        };
        let prev = previous.color;
        let channel = |before: u8, after: u8| {
            blend_i32(i32::from(before), i32::from(after), self.phase, self.period) as u8
        };
        next.r = channel(prev.r, next.r);
        next.g = channel(prev.g, next.g);
        next.b = channel(prev.b, next.b);
        next.a = channel(prev.a, next.a);
        true
    }

    /// Blend palette offsets against the boundary snapshot.
    pub fn blend_palette(&self, site: CallSite, next: &mut PaletteOffsets) -> bool {
        let Some(previous) = self.previous(site) else {
            return false;
        };
        let prev = previous.palette;
        let (phase, period) = (self.phase, self.period);
        next.x = blend_i32(prev.x, next.x, phase, period);
        next.y = blend_i32(prev.y, next.y, phase, period);
        next.z = blend_i32(prev.z, next.z, phase, period);
        next.field_24 = blend_i32(prev.field_24, next.field_24, phase, period);
        next.z2 = blend_i32(prev.z2, next.z2, phase, period);
        next.scroll_v = blend_i32(prev.scroll_v, next.scroll_v, phase, period);
        next.v = blend_i32(prev.v, next.v, phase, period);
        true
    }
}

/// `prev + (next - prev) * phase / period`, truncating toward zero.
fn blend_i32(prev: i32, next: i32, phase: u32, period: u32) -> i32 {
    let diff = i64::from(next) - i64::from(prev);
    let step = diff * i64::from(phase) / i64::from(period.max(1));
    (i64::from(prev) + step) as i32
}
