//! Extents: the sub-region of a node's output domain that is requested or held.
//!
//! An extent is either a *structured* six-component box
//! `[xmin, xmax, ymin, ymax, zmin, zmax]` or an *unstructured* piece triple
//! `(piece, num_pieces, ghost_level)`. A port declares which kind it carries;
//! the two kinds are never mixed on one port.

use serde::{Deserialize, Serialize};

/// Which kind of extent a port produces or consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtentKind {
    Structured,
    Pieces,
}

impl ExtentKind {
    pub fn name(self) -> &'static str {
        match self {
            ExtentKind::Structured => "structured",
            ExtentKind::Pieces => "pieces",
        }
    }
}

/// A structured box extent. Component order is
/// `[xmin, xmax, ymin, ymax, zmin, zmax]`, inclusive on both ends.
///
/// The canonical empty extent has `min = max + 1` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructuredExtent(pub [i32; 6]);

impl StructuredExtent {
    pub const fn new(xmin: i32, xmax: i32, ymin: i32, ymax: i32, zmin: i32, zmax: i32) -> Self {
        StructuredExtent([xmin, xmax, ymin, ymax, zmin, zmax])
    }

    /// A one-dimensional extent along x, collapsed to a single sample in y and z.
    pub const fn line(min: i32, max: i32) -> Self {
        StructuredExtent([min, max, 0, 0, 0, 0])
    }

    /// The canonical empty extent.
    pub const fn empty() -> Self {
        StructuredExtent([0, -1, 0, -1, 0, -1])
    }

    pub fn is_empty(&self) -> bool {
        let e = &self.0;
        e[0] > e[1] || e[2] > e[3] || e[4] > e[5]
    }

    /// True when `other` lies within `self` on all six components.
    ///
    /// An empty `other` is contained in anything; an empty `self` contains
    /// only empty extents.
    pub fn contains(&self, other: &StructuredExtent) -> bool {
        if other.is_empty() {
            return true;
        }
        let a = &self.0;
        let b = &other.0;
        b[0] >= a[0] && b[1] <= a[1] && b[2] >= a[2] && b[3] <= a[3] && b[4] >= a[4] && b[5] <= a[5]
    }

    /// Component-wise intersection; empty when the boxes do not overlap.
    pub fn intersect(&self, other: &StructuredExtent) -> StructuredExtent {
        let a = &self.0;
        let b = &other.0;
        let r = StructuredExtent([
            a[0].max(b[0]),
            a[1].min(b[1]),
            a[2].max(b[2]),
            a[3].min(b[3]),
            a[4].max(b[4]),
            a[5].min(b[5]),
        ]);
        if r.is_empty() { StructuredExtent::empty() } else { r }
    }

    /// Grows the box by `margin` samples on every face.
    pub fn grown(&self, margin: i32) -> StructuredExtent {
        if self.is_empty() {
            return *self;
        }
        let e = &self.0;
        StructuredExtent([
            e[0] - margin,
            e[1] + margin,
            e[2] - margin,
            e[3] + margin,
            e[4] - margin,
            e[5] + margin,
        ])
    }

    /// Sample counts per axis.
    pub fn dims(&self) -> [usize; 3] {
        if self.is_empty() {
            return [0, 0, 0];
        }
        let e = &self.0;
        [
            (e[1] - e[0] + 1) as usize,
            (e[3] - e[2] + 1) as usize,
            (e[5] - e[4] + 1) as usize,
        ]
    }

    pub fn num_points(&self) -> usize {
        let [nx, ny, nz] = self.dims();
        nx * ny * nz
    }

    /// Row-major linear index of a sample inside this extent, or `None` when
    /// the sample lies outside it.
    pub fn linear_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let e = &self.0;
        if x < e[0] || x > e[1] || y < e[2] || y > e[3] || z < e[4] || z > e[5] {
            return None;
        }
        let [nx, ny, _] = self.dims();
        let ix = (x - e[0]) as usize;
        let iy = (y - e[2]) as usize;
        let iz = (z - e[4]) as usize;
        Some((iz * ny + iy) * nx + ix)
    }

    /// Maps piece `piece` of `num_pieces` onto a z-axis slab of this extent,
    /// grown by `ghost_level` and clamped back to the whole box. Used when an
    /// unstructured request crosses into a structured producer.
    pub fn piece_slab(&self, piece: i32, num_pieces: i32, ghost_level: i32) -> StructuredExtent {
        if self.is_empty() || num_pieces <= 0 || piece < 0 || piece >= num_pieces {
            return StructuredExtent::empty();
        }
        let e = &self.0;
        let nz = (e[5] - e[4] + 1) as i64;
        let lo = e[4] as i64 + nz * piece as i64 / num_pieces as i64;
        let hi = e[4] as i64 + nz * (piece + 1) as i64 / num_pieces as i64 - 1;
        if lo > hi {
            return StructuredExtent::empty();
        }
        let slab = StructuredExtent([e[0], e[1], e[2], e[3], lo as i32, hi as i32]);
        slab.grown(ghost_level).intersect(self)
    }
}

/// An unstructured piece request or realization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceExtent {
    pub piece: i32,
    pub num_pieces: i32,
    pub ghost_level: i32,
}

impl PieceExtent {
    pub const fn new(piece: i32, num_pieces: i32, ghost_level: i32) -> Self {
        PieceExtent {
            piece,
            num_pieces,
            ghost_level,
        }
    }

    /// The default request: the single piece of a one-piece domain.
    pub const fn whole() -> Self {
        PieceExtent::new(0, 1, 0)
    }
}

/// A requested or realized sub-region of a node's output domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extent {
    Structured(StructuredExtent),
    Pieces(PieceExtent),
}

impl Extent {
    pub fn kind(&self) -> ExtentKind {
        match self {
            Extent::Structured(_) => ExtentKind::Structured,
            Extent::Pieces(_) => ExtentKind::Pieces,
        }
    }

    pub fn as_structured(&self) -> Option<&StructuredExtent> {
        match self {
            Extent::Structured(e) => Some(e),
            Extent::Pieces(_) => None,
        }
    }

    pub fn as_pieces(&self) -> Option<&PieceExtent> {
        match self {
            Extent::Pieces(p) => Some(p),
            Extent::Structured(_) => None,
        }
    }
}

impl From<StructuredExtent> for Extent {
    fn from(e: StructuredExtent) -> Self {
        Extent::Structured(e)
    }
}

impl From<PieceExtent> for Extent {
    fn from(p: PieceExtent) -> Self {
        Extent::Pieces(p)
    }
}
