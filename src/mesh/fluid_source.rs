//! Point sources/sinks of incompressibility.

use crate::geometry::Point;
use crate::Index;

/// A point source, with a location and a scalar strength. Zero strength
/// everywhere in the core (cell growth is an external collaborator's
/// concern) but the field exists so the invariant "sum of source
/// strengths is zero" is meaningful and checkable.
#[derive(Debug, Clone, Copy)]
pub struct FluidSource {
    pub index: Index,
    pub location: Point,
    pub strength: f64,
}

impl FluidSource {
    pub fn new(index: Index, location: Point, strength: f64) -> FluidSource {
        FluidSource {
            index,
            location,
            strength,
        }
    }
}

/// Builds the mesh's fixed row of balancing sources on the midline
/// `y = 0`, spaced at `4 * dx`, used to zero net mass injection (spec
/// section 3).
pub fn build_balancing_sources(dx: f64, total_strength: f64) -> Vec<FluidSource> {
    let spacing = 4. * dx;
    let count = (1.0 / spacing).floor().max(1.) as usize;
    let strength_each = if count > 0 {
        total_strength / count as f64
    } else {
        0.
    };

    (0..count)
        .map(|i| {
            FluidSource::new(
                i,
                Point::new(i as f64 * spacing, 0.),
                strength_each,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balancing_sources_sum_to_requested_strength() {
        let sources = build_balancing_sources(1.0 / 32.0, -2.0);
        let sum: f64 = sources.iter().map(|s| s.strength).sum();
        assert!((sum - -2.0).abs() < 1e-10, "sum = {}", sum);
    }
}
