use serde::Deserialize;

/// Piecewise-linear lookup table over `(x, y)` points, sorted by `x`.
///
/// Used for transponder backoff curves, antenna noise temperature versus
/// elevation, ALC full-load backoff and beam contours.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(from = "Vec<(f64, f64)>")]
pub struct Curve {
    points: Vec<(f64, f64)>,
}

impl From<Vec<(f64, f64)>> for Curve {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Curve::new(points)
    }
}

impl Curve {
    pub fn new(mut points: Vec<(f64, f64)>) -> Curve {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Curve { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<(f64, f64)> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }

    /// Linear interpolation, holding the end values outside the table.
    pub fn interpolate(&self, x: f64) -> Option<f64> {
        let (first, last) = (self.first()?, self.last()?);
        if x <= first.0 {
            return Some(first.1);
        }
        if x >= last.0 {
            return Some(last.1);
        }
        self.points.windows(2).find_map(|pair| {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if x >= x0 && x <= x1 {
                Some(lerp(x, x0, y0, x1, y1))
            } else {
                None
            }
        })
    }

    /// Linear interpolation, extending the end segments outside the table.
    pub fn extrapolate(&self, x: f64) -> Option<f64> {
        if self.points.len() < 2 {
            return self.first().map(|(_, y)| y);
        }
        let n = self.points.len();
        let (x0, y0, x1, y1) = if x < self.points[0].0 {
            let ((x0, y0), (x1, y1)) = (self.points[0], self.points[1]);
            (x0, y0, x1, y1)
        } else if x > self.points[n - 1].0 {
            let ((x0, y0), (x1, y1)) = (self.points[n - 2], self.points[n - 1]);
            (x0, y0, x1, y1)
        } else {
            return self.interpolate(x);
        };
        Some(lerp(x, x0, y0, x1, y1))
    }

    /// Smallest `x` whose interpolated value equals `y`, if `y` is inside the
    /// range of the table.
    pub fn inverse(&self, y: f64) -> Option<f64> {
        if self.points.len() == 1 {
            let (x0, y0) = self.points[0];
            return (y0 == y).then_some(x0);
        }
        self.points.windows(2).find_map(|pair| {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            let (lo, hi) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
            if y < lo || y > hi {
                None
            } else if y1 == y0 {
                Some(x0)
            } else {
                Some(x0 + (y - y0) * (x1 - x0) / (y1 - y0))
            }
        })
    }

    /// The points from the smallest `y` onward, starting at the first point
    /// that reaches it.
    pub fn from_minimum(&self) -> Curve {
        let start = self
            .points
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1).1.total_cmp(&(b.1).1))
            .map_or(0, |(index, _)| index);
        Curve {
            points: self.points[start..].to_vec(),
        }
    }

    pub fn is_non_increasing(&self) -> bool {
        self.points.windows(2).all(|pair| pair[1].1 <= pair[0].1)
    }

    pub fn is_non_decreasing(&self) -> bool {
        self.points.windows(2).all(|pair| pair[1].1 >= pair[0].1)
    }
}

fn lerp(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Curve {
        Curve::new(vec![(10.0, 5.0), (0.0, 0.0), (20.0, 15.0)])
    }

    #[test]
    fn sorts_points_on_construction() {
        let curve = ramp();
        assert_eq!(curve.first(), Some((0.0, 0.0)));
        assert_eq!(curve.last(), Some((20.0, 15.0)));
    }

    #[test]
    fn interpolates_inside_and_holds_outside() {
        let curve = ramp();
        assert_eq!(curve.interpolate(5.0), Some(2.5));
        assert_eq!(curve.interpolate(15.0), Some(10.0));
        assert_eq!(curve.interpolate(-3.0), Some(0.0));
        assert_eq!(curve.interpolate(30.0), Some(15.0));
    }

    #[test]
    fn extrapolates_end_segments() {
        let curve = ramp();
        assert_eq!(curve.extrapolate(30.0), Some(25.0));
        assert_eq!(curve.extrapolate(-2.0), Some(-1.0));
    }

    #[test]
    fn inverse_finds_smallest_x() {
        let curve = Curve::new(vec![(0.0, 0.0), (1.0, 0.0), (3.0, 2.0)]);
        assert_eq!(curve.inverse(0.0), Some(0.0));
        assert_eq!(curve.inverse(1.0), Some(2.0));
        assert_eq!(curve.inverse(5.0), None);
    }

    #[test]
    fn empty_curve_has_no_values() {
        let curve = Curve::default();
        assert!(curve.is_empty());
        assert_eq!(curve.interpolate(1.0), None);
        assert_eq!(curve.extrapolate(1.0), None);
        assert_eq!(curve.inverse(1.0), None);
    }

    #[test]
    fn from_minimum_drops_the_falling_head() {
        let curve = Curve::new(vec![(-4.0, 1.0), (0.0, 0.0), (2.0, 0.0), (4.0, 1.5)]);
        assert_eq!(curve.from_minimum().first(), Some((0.0, 0.0)));
        assert_eq!(curve.from_minimum().points().len(), 3);
        assert_eq!(ramp().from_minimum(), ramp());
        assert!(Curve::default().from_minimum().is_empty());
    }

    #[test]
    fn monotonic_checks() {
        assert!(ramp().is_non_decreasing());
        assert!(!ramp().is_non_increasing());
        let contour = Curve::new(vec![(0.0, 0.0), (1.0, -2.0), (2.0, -2.0)]);
        assert!(contour.is_non_increasing());
    }
}
