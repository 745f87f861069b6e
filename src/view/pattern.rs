//! Procedural overlays for sections that carry a coloration.
//!
//! Every [`PatternKind`] lays out its own elements across the section's
//! bounding box. Elements are clipped to the section before they reach the
//! mesh, so wedges and the centre hexagon share the same generators.

use std::f32::consts::TAU;

use bevy::prelude::*;
use noise::{NoiseFn, Perlin};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::mesh::LayerMeshBuilder;
use crate::math;
use crate::world::Rgb;
use crate::world::props::{PatternKind, VariationKind};
use crate::world::tile::SectionOverride;

/// Emits `overlay`'s pattern inside the convex `shape`, then the noise
/// overlay when the variation asks for one. `cell` is the nominal element
/// size in pixels.
pub fn pattern_overlay(
    mesh: &mut LayerMeshBuilder,
    shape: &[Vec2],
    overlay: &SectionOverride,
    cell: f32,
) {
    if cell <= 0.0 || shape.len() < 3 {
        return;
    }
    let mut painter = Painter::new(mesh, shape, overlay, cell);
    match overlay.coloration.pattern {
        PatternKind::Solid => {}
        PatternKind::Bricks => painter.bricks(),
        PatternKind::Cobblestone => painter.cobblestone(),
        PatternKind::OrganicScatter => painter.organic_scatter(),
        PatternKind::Tiles => painter.tiles(),
        PatternKind::Herringbone => painter.herringbone(),
        PatternKind::SandRipples => painter.sand_ripples(),
        PatternKind::Rocky => painter.rocky(),
    }
    if matches!(
        overlay.coloration.variation.kind,
        VariationKind::NoiseOverlay | VariationKind::Combo
    ) {
        painter.noise_overlay();
    }
}

struct Painter<'a> {
    mesh: &'a mut LayerMeshBuilder,
    clip: &'a [Vec2],
    swatch: &'a [Rgb],
    fallback: Rgb,
    min: Vec2,
    max: Vec2,
    cell: f32,
    jitter: f32,
    intensity: f32,
    seed: u64,
    rng: SmallRng,
}

impl<'a> Painter<'a> {
    fn new(
        mesh: &'a mut LayerMeshBuilder,
        clip: &'a [Vec2],
        overlay: &'a SectionOverride,
        cell: f32,
    ) -> Self {
        let (min, max) = clip.iter().fold(
            (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
            |(lo, hi), &p| (lo.min(p), hi.max(p)),
        );
        let variation = &overlay.coloration.variation;
        let intensity = variation.intensity.clamp(0.0, 1.0);
        let jitter = match variation.kind {
            VariationKind::RandomPositioning | VariationKind::Combo => cell * 0.6 * intensity,
            _ => 0.0,
        };
        Self {
            mesh,
            clip,
            swatch: &overlay.swatch,
            fallback: overlay.coloration.primary(),
            min,
            max,
            cell,
            jitter,
            intensity,
            seed: overlay.seed,
            rng: SmallRng::seed_from_u64(overlay.seed),
        }
    }

    fn color(&mut self) -> Rgb {
        if self.swatch.is_empty() {
            return self.fallback;
        }
        self.swatch[self.rng.random_range(0..self.swatch.len())]
    }

    /// Shifts an element anchor for positional variation.
    fn nudge(&mut self, p: Vec2) -> Vec2 {
        if self.jitter <= 0.0 {
            return p;
        }
        let j = self.jitter;
        p + Vec2::new(
            self.rng.random_range(-j..=j),
            self.rng.random_range(-j..=j),
        )
    }

    fn uniform_point(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.random_range(self.min.x..=self.max.x),
            self.rng.random_range(self.min.y..=self.max.y),
        )
    }

    /// Elements to scatter for a given per-element footprint.
    fn scatter_count(&self, footprint: f32) -> usize {
        let area = (self.max - self.min).element_product();
        (area / (self.cell * self.cell * footprint)).ceil().max(1.0) as usize
    }

    fn fill(&mut self, element: &[Vec2], color: Rgb) -> Vec<Vec2> {
        let clipped = math::clip_to_convex(element, self.clip);
        self.mesh.polygon(&clipped, color.to_color());
        clipped
    }

    /// Fill plus a darker rim.
    fn fill_edged(&mut self, element: &[Vec2], color: Rgb, rim: f32) {
        let clipped = self.fill(element, color);
        if clipped.len() >= 3 {
            self.mesh.outline(&clipped, 1.0, color.shaded(rim).to_color());
        }
    }

    // ── generators ──────────────────────────────────────────────────

    /// Running bond: every other row is shifted by half a brick.
    fn bricks(&mut self) {
        let size = Vec2::new(self.cell * 1.6, self.cell * 0.8);
        let mortar = self.cell * 0.12;
        let mut y = self.min.y;
        let mut row = 0;
        while y < self.max.y {
            let shift = if row % 2 == 1 { size.x / 2.0 } else { 0.0 };
            let mut x = self.min.x - shift;
            while x < self.max.x {
                let origin = self.nudge(Vec2::new(x, y));
                let color = self.color();
                self.fill_edged(&rect(origin, size - mortar), color, 0.85);
                x += size.x;
            }
            y += size.y;
            row += 1;
        }
    }

    /// Square grid with grout gaps and a lighter top lip.
    fn tiles(&mut self) {
        let side = self.cell * 1.2;
        let grout = self.cell * 0.15;
        let mut y = self.min.y;
        while y < self.max.y {
            let mut x = self.min.x;
            while x < self.max.x {
                let origin = self.nudge(Vec2::new(x, y));
                let color = self.color();
                self.fill(&rect(origin, Vec2::splat(side - grout)), color);
                let lip = Vec2::new(side - grout, (side - grout) * 0.15);
                self.fill(&rect(origin, lip), color.shaded(1.15));
                x += side;
            }
            y += side;
        }
    }

    /// Rounded stones on a loose grid; stones always wander a little.
    fn cobblestone(&mut self) {
        let step = self.cell * 0.9;
        let mut y = self.min.y;
        while y < self.max.y + step {
            let mut x = self.min.x;
            while x < self.max.x + step {
                let wander = step * 0.25;
                let center = Vec2::new(
                    x + self.rng.random_range(-wander..=wander),
                    y + self.rng.random_range(-wander..=wander),
                );
                let center = self.nudge(center);
                let radius = step * 0.5 * self.rng.random_range(0.8..=1.1);
                let turn = self.rng.random_range(0.0..TAU);
                let color = self.color();
                self.fill_edged(&ellipse(center, Vec2::splat(radius), turn, 8), color, 0.8);
                x += step;
            }
            y += step;
        }
    }

    /// Overlapping blobs of random size and heading.
    fn organic_scatter(&mut self) {
        for _ in 0..self.scatter_count(0.9) {
            let center = self.uniform_point();
            let radii = Vec2::new(
                self.cell * self.rng.random_range(0.5..=1.3),
                self.cell * self.rng.random_range(0.4..=0.9),
            ) / 2.0;
            let turn = self.rng.random_range(0.0..TAU);
            let color = self.color();
            self.fill(&ellipse(center, radii, turn, 10), color);
        }
    }

    /// Slanted planks alternating direction per column, forming chevrons.
    fn herringbone(&mut self) {
        let run = self.cell * 1.2;
        let thickness = run * 0.4;
        let pitch = thickness * 1.15;
        let mut y = self.min.y - run;
        while y < self.max.y + run {
            let mut x = self.min.x;
            let mut column = 0;
            while x < self.max.x {
                let (start, rise) = if column % 2 == 0 {
                    (y, -run / 2.0)
                } else {
                    (y - run / 2.0, run / 2.0)
                };
                let a = self.nudge(Vec2::new(x, start));
                let plank = [
                    a,
                    a + Vec2::new(run, rise),
                    a + Vec2::new(run, rise + thickness),
                    a + Vec2::new(0.0, thickness),
                ];
                let color = self.color();
                self.fill_edged(&plank, color, 0.85);
                x += run;
                column += 1;
            }
            y += pitch;
        }
    }

    /// Thin sine bands, one color per band.
    fn sand_ripples(&mut self) {
        let spacing = self.cell * 0.6;
        let amplitude = self.cell * 0.15;
        let half = self.cell * 0.1;
        let wavenumber = TAU / (self.cell * 2.5);
        let dx = self.cell * 0.5;
        let mut y = self.min.y;
        while y < self.max.y + spacing {
            let color = self.color();
            let phase = if self.jitter > 0.0 {
                self.rng.random_range(0.0..TAU) * self.intensity
            } else {
                0.0
            };
            let wave = |x: f32| y + (wavenumber * x + phase).sin() * amplitude;
            let mut x = self.min.x;
            while x < self.max.x {
                let (y0, y1) = (wave(x), wave(x + dx));
                let quad = [
                    Vec2::new(x, y0 - half),
                    Vec2::new(x + dx, y1 - half),
                    Vec2::new(x + dx, y1 + half),
                    Vec2::new(x, y0 + half),
                ];
                self.fill(&quad, color);
                x += dx;
            }
            y += spacing;
        }
    }

    /// Irregular 4 to 6 sided fragments. Fragments may be concave, so they
    /// are filled as a fan of triangles around their centre.
    fn rocky(&mut self) {
        for _ in 0..self.scatter_count(1.6) {
            let center = self.uniform_point();
            let sides = self.rng.random_range(4..=6);
            let rim: Vec<Vec2> = (0..sides)
                .map(|i| {
                    let angle =
                        TAU * i as f32 / sides as f32 + self.rng.random_range(-0.3..=0.3);
                    let radius = self.cell * self.rng.random_range(0.35..=1.0);
                    center + Vec2::from_angle(angle) * radius
                })
                .collect();
            let color = self.color();
            for (i, &a) in rim.iter().enumerate() {
                self.fill(&[center, a, rim[(i + 1) % rim.len()]], color);
            }
            let outline = math::clip_to_convex(&rim, self.clip);
            if outline.len() >= 3 {
                self.mesh.outline(&outline, 1.0, color.shaded(0.75).to_color());
            }
        }
    }

    /// Perlin-driven speckle, lightening and darkening the primary color.
    fn noise_overlay(&mut self) {
        let perlin = Perlin::new((self.seed ^ (self.seed >> 32)) as u32);
        let step = self.cell * 0.35;
        let dot = Vec2::splat(step * 0.45);
        let scale = f64::from(self.cell) * 1.5;
        let mut y = self.min.y;
        while y < self.max.y {
            let mut x = self.min.x;
            while x < self.max.x {
                let p = Vec2::new(x, y);
                let n = perlin.get([f64::from(p.x) / scale, f64::from(p.y) / scale]) as f32;
                if n.abs() >= 0.15 && math::point_in_convex_polygon(p, self.clip) {
                    let color = self.fallback.shaded(1.0 + n * self.intensity * 1.5);
                    self.fill(&rect(p, dot), color);
                }
                x += step;
            }
            y += step;
        }
    }
}

/// Axis-aligned rectangle from its top-left corner (pixel space).
fn rect(origin: Vec2, size: Vec2) -> [Vec2; 4] {
    [
        origin,
        origin + Vec2::new(size.x, 0.0),
        origin + size,
        origin + Vec2::new(0.0, size.y),
    ]
}

fn ellipse(center: Vec2, radii: Vec2, turn: f32, segments: usize) -> Vec<Vec2> {
    let rotation = Vec2::from_angle(turn);
    (0..segments)
        .map(|i| {
            let a = TAU * i as f32 / segments as f32;
            center + rotation.rotate(Vec2::new(a.cos(), a.sin()) * radii)
        })
        .collect()
}
