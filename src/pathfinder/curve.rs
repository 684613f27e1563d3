/// Piecewise-linear curve over sorted `(x, y)` points, flat beyond both ends.
#[derive(Debug, Clone, Copy)]
pub struct SimpleCurve {
    points: &'static [(f32, f32)],
}

// Heuristic multiplier for humanlike agents by straight-line distance to the goal.
pub const HEURISTIC_STRENGTH_BY_DISTANCE: SimpleCurve =
    SimpleCurve::new(&[(40.0, 1.0), (120.0, 2.8)]);

// Weight of the region heuristic by nodes opened since escalation.
pub const REGION_HEURISTIC_WEIGHT_BY_NODES_OPENED: SimpleCurve = SimpleCurve::new(&[
    (0.0, 1.0),
    (3500.0, 1.0),
    (4500.0, 5.0),
    (30000.0, 50.0),
    (100000.0, 500.0),
]);

impl SimpleCurve {
    pub const fn new(points: &'static [(f32, f32)]) -> Self {
        SimpleCurve { points }
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let Some(&(first_x, first_y)) = self.points.first() else {
            return 0.0;
        };
        if x <= first_x {
            return first_y;
        }

        for pair in self.points.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if x <= x1 {
                let t = (x - x0) / (x1 - x0);
                return y0 + (y1 - y0) * t;
            }
        }

        self.points.last().map_or(first_y, |&(_, y)| y)
    }
}
