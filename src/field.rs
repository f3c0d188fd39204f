use crate::types::{Point, Value, Vector};

/// The scalar field whose zero level-set the extractor polygonises.
///
/// The field is positive inside the surface and falls off to negative values
/// outside. The extractor owns the field exclusively for the duration of a
/// frame: it calls [`advance`](ScalarField::advance) exactly once, then treats
/// [`value`](ScalarField::value) as pure for the rest of the frame.
pub trait ScalarField {
    /// Evaluates the field at `p`.
    fn value(&self, p: Point) -> Value;

    /// Snapshot of the current ball centres, used to bound the grid scan.
    ///
    /// May be empty, in which case the frame produces an empty mesh.
    fn ball_positions(&self) -> Vec<Point>;

    /// Advances the field's internal motion state by `dt` seconds.
    fn advance(&mut self, dt: f32);
}

/// One source of a [`MetaballField`].
#[derive(Debug, Clone, Copy)]
pub struct Metaball {
    /// Rest position the ball wanders around.
    pub anchor: Point,
    /// Radius at which an isolated ball's field crosses zero.
    pub radius: Value,
}

impl Metaball {
    pub fn new(anchor: Point, radius: Value) -> Self {
        Self { anchor, radius }
    }
}

/// A sum of inverse-square ball kernels:
///
/// ```text
/// F(p) = Σ r_i² / |p − c_i|²  −  1
/// ```
///
/// An isolated ball's surface sits at distance `r` from its centre; nearby
/// balls merge smoothly as their kernels overlap. Each centre orbits its
/// anchor on a deterministic sinusoidal path driven by accumulated time, so
/// two fields advanced by the same sequence of `dt`s stay identical.
pub struct MetaballField {
    balls: Vec<Metaball>,
    centers: Vec<Point>,
    /// Amplitude of each ball's wander around its anchor.
    pub wander: Value,
    time: f32,
}

impl MetaballField {
    pub fn new(balls: Vec<Metaball>) -> Self {
        let centers = balls.iter().map(|b| b.anchor).collect();
        let mut field = Self {
            balls,
            centers,
            wander: 0.6,
            time: 0.0,
        };
        field.reposition();
        field
    }

    /// Sets the wander amplitude (0 pins every ball to its anchor).
    pub fn with_wander(mut self, wander: Value) -> Self {
        self.wander = wander;
        self.reposition();
        self
    }

    pub fn balls(&self) -> &[Metaball] {
        &self.balls
    }

    /// Recomputes every centre from the current time. Per-ball frequency and
    /// phase are derived from the ball's index so the motion is repeatable.
    fn reposition(&mut self) {
        for (i, ball) in self.balls.iter().enumerate() {
            let phase = i as f32 * 2.399; // golden-angle spacing in radians
            let freq = 0.7 + 0.13 * i as f32;
            let t = self.time * freq + phase;
            self.centers[i] = ball.anchor
                + self.wander * Vector::new(t.sin(), (1.3 * t).cos(), (0.8 * t + phase).sin());
        }
    }
}

impl ScalarField for MetaballField {
    fn value(&self, p: Point) -> Value {
        let mut sum = 0.0;
        for (ball, center) in self.balls.iter().zip(&self.centers) {
            // Clamp the squared distance so a sample at the exact centre
            // reads as a large finite value rather than infinity.
            let dist_sq = (p - center).norm_squared().max(1e-9);
            sum += ball.radius * ball.radius / dist_sq;
        }
        sum - 1.0
    }

    fn ball_positions(&self) -> Vec<Point> {
        self.centers.clone()
    }

    fn advance(&mut self, dt: f32) {
        self.time += dt;
        self.reposition();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_ball_crosses_zero_at_its_radius() {
        let field = MetaballField::new(vec![Metaball::new(Point::origin(), 1.0)]).with_wander(0.0);
        assert!(field.value(Point::new(0.5, 0.0, 0.0)) > 0.0);
        assert!(field.value(Point::new(2.0, 0.0, 0.0)) < 0.0);
        let at_radius = field.value(Point::new(1.0, 0.0, 0.0));
        assert!(at_radius.abs() < 1e-6, "F at radius was {at_radius}");
    }

    #[test]
    fn sample_at_ball_center_is_finite() {
        let field = MetaballField::new(vec![Metaball::new(Point::origin(), 1.0)]).with_wander(0.0);
        assert!(field.value(Point::origin()).is_finite());
    }

    #[test]
    fn advance_is_deterministic() {
        let balls = vec![
            Metaball::new(Point::new(-1.0, 0.0, 0.0), 0.8),
            Metaball::new(Point::new(1.0, 0.5, 0.0), 1.1),
        ];
        let mut a = MetaballField::new(balls.clone());
        let mut b = MetaballField::new(balls);
        for _ in 0..5 {
            a.advance(1.0 / 60.0);
            b.advance(1.0 / 60.0);
        }
        assert_eq!(a.ball_positions(), b.ball_positions());
    }

    #[test]
    fn zero_wander_keeps_balls_anchored() {
        let anchor = Point::new(2.0, -1.0, 3.0);
        let mut field = MetaballField::new(vec![Metaball::new(anchor, 1.0)]).with_wander(0.0);
        field.advance(3.7);
        assert_eq!(field.ball_positions(), vec![anchor]);
    }
}
