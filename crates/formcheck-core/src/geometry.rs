//! Geometric utilities for joint-angle and body-line computations.
//!
//! All inputs are image-space landmarks (x to the right, y downward).
//! Functions taking `Option<Landmark>` return `None` when any input is
//! missing rather than guessing a value.

use nalgebra::{Rotation2, Vector2};

use crate::types::Landmark;

/// Interior angle at `b` formed by `a-b-c`, in degrees within [0, 180]
pub fn joint_angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// [`joint_angle`] over optional landmarks
pub fn angle(a: Option<Landmark>, b: Option<Landmark>, c: Option<Landmark>) -> Option<f64> {
    Some(joint_angle(&a?, &b?, &c?))
}

/// [`angle`] with a neutral fallback when a landmark is missing
pub fn angle_or(a: Option<Landmark>, b: Option<Landmark>, c: Option<Landmark>, default: f64) -> f64 {
    angle(a, b, c).unwrap_or(default)
}

/// Angle at `b` measured over the top of the `a-c` line, in [0, 360).
///
/// Equals the interior angle when `b` sits on or above the line and
/// `360 - interior` when `b` sags below it, so a dropped hip reads as an
/// over-extension rather than a bend.
pub fn body_line_angle(a: Option<Landmark>, b: Option<Landmark>, c: Option<Landmark>) -> Option<f64> {
    let (a, b, c) = (a?, b?, c?);
    let interior = joint_angle(&a, &b, &c);
    match offset_below_line(&b, &a, &c) {
        Some(offset) if offset > 0.0 => Some(360.0 - interior),
        _ => Some(interior),
    }
}

/// Vertical distance of `p` below the line through `a` and `b` at `p.x`.
///
/// Positive means lower in the image. `None` for a (near) vertical line.
pub fn offset_below_line(p: &Landmark, a: &Landmark, b: &Landmark) -> Option<f64> {
    let dx = b.x - a.x;
    if dx.abs() < 1e-9 {
        return None;
    }
    let line_y = a.y + (p.x - a.x) * (b.y - a.y) / dx;
    Some(p.y - line_y)
}

/// Perpendicular distance of `p` from the line `start-end`, normalised by the
/// segment length. A zero-length segment divides by 1.
pub fn point_line_deviation(p: &Landmark, start: &Landmark, end: &Landmark) -> f64 {
    let seg = Vector2::new(end.x - start.x, end.y - start.y);
    let rel = Vector2::new(p.x - start.x, p.y - start.y);
    let len = match seg.norm() {
        n if n > 0.0 => n,
        _ => 1.0,
    };
    seg.perp(&rel).abs() / len / len
}

/// Roll of the line through `a` and `b` in radians, folded into (-pi/2, pi/2].
///
/// A line has no direction, so swapping the endpoints (e.g. a mirrored
/// camera) yields the same roll.
pub fn line_roll(a: &Landmark, b: &Landmark) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};
    let roll = (b.y - a.y).atan2(b.x - a.x);
    if roll > FRAC_PI_2 {
        roll - PI
    } else if roll <= -FRAC_PI_2 {
        roll + PI
    } else {
        roll
    }
}

/// Deviation of the segment `pivot -> end` from vertical, in degrees within [0, 90],
/// after undoing `reference_roll` (radians) around the pivot.
pub fn segment_tilt(end: &Landmark, pivot: &Landmark, reference_roll: f64) -> f64 {
    let v = Rotation2::new(-reference_roll) * Vector2::new(end.x - pivot.x, end.y - pivot.y);
    v.x.abs().atan2(v.y.abs()).to_degrees()
}

/// Deviation of the segment `a-b` from horizontal, in degrees within [0, 90]
pub fn horizontal_tilt(a: &Landmark, b: &Landmark) -> f64 {
    (b.y - a.y).abs().atan2((b.x - a.x).abs()).to_degrees()
}

pub fn midpoint(a: &Landmark, b: &Landmark) -> Landmark {
    Landmark::new(
        (a.x + b.x) / 2.0,
        (a.y + b.y) / 2.0,
        a.confidence.min(b.confidence),
    )
}

/// Midpoint of whichever of the pair is present
pub fn midpoint_or_either(a: Option<Landmark>, b: Option<Landmark>) -> Option<Landmark> {
    match (a, b) {
        (Some(a), Some(b)) => Some(midpoint(&a, &b)),
        (one, other) => one.or(other),
    }
}

pub fn distance(a: &Landmark, b: &Landmark) -> f64 {
    a.distance_to(b)
}
