use crate::TileId;

use bytemuck::{Pod, Zeroable};
use orbis_core::geometry::Uv;
use orbis_core::static_assertions::const_assert_eq;
use std::mem;

/// One RGBA pixel, 8 bits per channel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

unsafe impl Zeroable for Rgba8 {}
unsafe impl Pod for Rgba8 {}

const_assert_eq!(mem::size_of::<Rgba8>(), 4);

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Substituted for tiles whose [`ColorSource`] has no data, and for every pixel of a body that is missing a
    /// collaborator.
    pub const NEUTRAL: Self = Self::opaque(128, 128, 128);
    /// Painted where no tile could be resolved at all.
    pub const VOID: Self = Self::opaque(255, 0, 255);

    /// Component-wise linear interpolation, rounded to nearest.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let mix = |a: u8, b: u8| {
            (a as f64 + (b as f64 - a as f64) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

/// Appearance of a tile. Returning `None` means "no data"; the caller substitutes [`Rgba8::NEUTRAL`].
pub trait ColorSource {
    fn color(&self, tile: TileId, uv: Uv) -> Option<Rgba8>;
}

impl<F> ColorSource for F
where
    F: Fn(TileId, Uv) -> Option<Rgba8>,
{
    fn color(&self, tile: TileId, uv: Uv) -> Option<Rgba8> {
        self(tile, uv)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
