//! Hex geometry: pure computation helpers shared by rendering and picking.
//!
//! All functions in this module are free of Bevy ECS dependencies and operate
//! on plain numeric / `Vec2` inputs in *pixel space* (x right, y down), making
//! them straightforward to unit-test.
//!
//! Tiles use the pointy-top orientation. Vertex `i` of a hexagon sits at
//! [`vertex_angle`]`(i)`; wedge `i` is the trapezoid spanning vertices `i` and
//! `i + 1`. Every consumer that needs a wedge direction (trapezoid fill, prop
//! centring, hit-testing) derives it from [`vertex_angle`], never from a
//! separate formula.

use std::f32::consts::{FRAC_PI_3, FRAC_PI_6, TAU};

use bevy::prelude::Vec2;
use hexx::{Hex, HexLayout};

/// Number of corners (and wedges) of a hexagon.
pub const HEX_CORNERS: usize = 6;

/// Angle (radians) of hexagon vertex `index` for the pointy-top orientation.
///
/// `index` is deliberately *not* wrapped: `vertex_angle(6)` is `2π − π/6`, so
/// the angular span of wedge 5 stays contiguous.
pub fn vertex_angle(index: usize) -> f32 {
    FRAC_PI_3 * index as f32 - FRAC_PI_6
}

/// Projects an axial coordinate (plus layer) to the pixel centre of its hexagon.
///
/// The `z` term is a visual elevation shear: each layer is lifted by a quarter
/// of the hex size.
///
/// # Examples
/// ```
/// # use hex_sections::math::axial_to_pixel;
/// let p = axial_to_pixel(0, 0, 0, 10.0);
/// assert_eq!((p.x, p.y), (0.0, 0.0));
/// let lifted = axial_to_pixel(0, 0, 4, 10.0);
/// assert_eq!(lifted.y, -10.0);
/// ```
pub fn axial_to_pixel(q: i32, r: i32, z: i32, hex_size: f32) -> Vec2 {
    hex_layout(hex_size).hex_to_world_pos(Hex::new(q, r)) - layer_shear(z, hex_size)
}

/// Inverse of [`axial_to_pixel`] for a known layer `z`.
///
/// Layers overlap in projection, so the layer cannot be recovered from the
/// pixel alone; callers pick the layer (see `HexGrid::pick`).
pub fn pixel_to_axial(pixel: Vec2, z: i32, hex_size: f32) -> (i32, i32, i32) {
    let hex = hex_layout(hex_size).world_pos_to_hex(pixel + layer_shear(z, hex_size));
    (hex.x, hex.y, z)
}

/// Pointy-top layout for a given hex size. Pixel `y` grows with `r`.
pub fn hex_layout(hex_size: f32) -> HexLayout {
    HexLayout::pointy().with_hex_size(hex_size)
}

/// Upward offset of layer `z`: a quarter hex size per layer.
fn layer_shear(z: i32, hex_size: f32) -> Vec2 {
    Vec2::new(0.0, z as f32 * hex_size / 4.0)
}

/// The six vertices of a hexagon centred on `center` with radius `size * scale`.
///
/// `scale = 1.0` gives the outer hexagon; the tile's centre fraction gives the
/// inner "center" hexagon.
pub fn hex_vertices(center: Vec2, size: f32, scale: f32) -> [Vec2; HEX_CORNERS] {
    let radius = size * scale;
    std::array::from_fn(|i| {
        let angle = vertex_angle(i);
        center + Vec2::new(angle.cos(), angle.sin()) * radius
    })
}

/// Four vertices of wedge `wedge_index`:
/// `[inner[i], inner[i+1], outer[i+1], outer[i]]`.
///
/// The ordering fixes winding for fills and is relied on by centroid maths.
pub fn wedge_trapezoid(
    inner: &[Vec2; HEX_CORNERS],
    outer: &[Vec2; HEX_CORNERS],
    wedge_index: usize,
) -> [Vec2; 4] {
    assert!(
        wedge_index < HEX_CORNERS,
        "wedge index {wedge_index} out of range"
    );
    let next = (wedge_index + 1) % HEX_CORNERS;
    [
        inner[wedge_index],
        inner[next],
        outer[next],
        outer[wedge_index],
    ]
}

/// Angle bisecting the span of vertices `i` and `i + 1`.
pub fn wedge_centroid_angle(wedge_index: usize) -> f32 {
    assert!(
        wedge_index < HEX_CORNERS,
        "wedge index {wedge_index} out of range"
    );
    (vertex_angle(wedge_index) + vertex_angle(wedge_index + 1)) / 2.0
}

/// Pixel position where a prop sitting on wedge `wedge_index` is centred.
///
/// `radius = (inner + outer) * radius_factor`; with the default factor of
/// 0.45 this lands roughly mid-wedge, leaning toward the inner edge.
pub fn wedge_prop_center(
    center: Vec2,
    size: f32,
    center_scale: f32,
    radius_factor: f32,
    wedge_index: usize,
) -> Vec2 {
    let angle = wedge_centroid_angle(wedge_index);
    let radius = (size * center_scale + size) * radius_factor;
    center + Vec2::new(angle.cos(), angle.sin()) * radius
}

/// Which wedge the direction from a hex centre to `offset` falls into.
pub fn wedge_at_angle(offset: Vec2) -> usize {
    let angle = offset.y.atan2(offset.x);
    let from_first = (angle - vertex_angle(0)).rem_euclid(TAU);
    ((from_first / FRAC_PI_3) as usize).min(HEX_CORNERS - 1)
}

/// Whether `point` lies inside (or on the edge of) a convex polygon.
///
/// Works for either winding, so it accepts both hexagons and trapezoids.
pub fn point_in_convex_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    let mut sign = 0.0_f32;
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let cross = (b - a).perp_dot(point - a);
        if cross.abs() < 1e-4 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Clips `subject` against the convex polygon `clip` (Sutherland-Hodgman).
///
/// Either winding is accepted for `clip`. Returns an empty vector when the
/// two do not overlap.
pub fn clip_to_convex(subject: &[Vec2], clip: &[Vec2]) -> Vec<Vec2> {
    let winding = signed_area(clip).signum();
    let mut output = subject.to_vec();
    for (i, &a) in clip.iter().enumerate() {
        if output.is_empty() {
            break;
        }
        let b = clip[(i + 1) % clip.len()];
        let inside = |p: Vec2| (b - a).perp_dot(p - a) * winding >= 0.0;
        let input = std::mem::take(&mut output);
        for (j, &cur) in input.iter().enumerate() {
            let prev = input[(j + input.len() - 1) % input.len()];
            match (inside(prev), inside(cur)) {
                (true, true) => output.push(cur),
                (true, false) => output.push(edge_crossing(prev, cur, a, b)),
                (false, true) => {
                    output.push(edge_crossing(prev, cur, a, b));
                    output.push(cur);
                }
                (false, false) => {}
            }
        }
    }
    output
}

fn signed_area(polygon: &[Vec2]) -> f32 {
    polygon
        .iter()
        .enumerate()
        .map(|(i, &a)| a.perp_dot(polygon[(i + 1) % polygon.len()]))
        .sum::<f32>()
        / 2.0
}

/// Point where segment `p`-`q` crosses the line through `a`-`b`.
fn edge_crossing(p: Vec2, q: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let edge = b - a;
    let denom = edge.perp_dot(q - p);
    if denom.abs() < f32::EPSILON {
        return q;
    }
    let t = edge.perp_dot(a - p) / denom;
    p + (q - p) * t
}

/// Average of polygon vertices; adequate for the convex shapes used here.
pub fn polygon_centroid(polygon: &[Vec2]) -> Vec2 {
    polygon.iter().copied().sum::<Vec2>() / polygon.len() as f32
}

/// Scales each RGB channel by `factor`, truncating like integer shading does.
pub fn shade_channel(channel: u8, factor: f32) -> u8 {
    (channel as f32 * factor).clamp(0.0, 255.0) as u8
}

/// Pixel space (y down) to Bevy 2D world space (y up). Self-inverse.
pub fn pixel_to_world(pixel: Vec2) -> Vec2 {
    Vec2::new(pixel.x, -pixel.y)
}

/// Per-frame lerp factor easing a follower onto its target over roughly
/// `transition` seconds.
pub fn follow_factor(dt: f32, transition: f32, rate: f32) -> f32 {
    if transition <= 0.0 {
        return 1.0;
    }
    (dt / transition * rate).clamp(0.0, 1.0)
}
