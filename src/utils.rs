use geo::{Point, Polygon};
use geo_types::LineString;

/// Longest substring common to every string in `data`. Whitespace-only
/// results are stripped down to the empty string.
pub fn long_substr(data: &[&str]) -> String {
    if data.is_empty() {
        return String::new();
    }
    if data.len() == 1 {
        return data[0].trim().to_string();
    }
    let first: Vec<char> = data[0].chars().collect();
    let mut substr = String::new();
    for i in 0..first.len() {
        for j in 1..=(first.len() - i) {
            if j <= substr.chars().count() {
                continue;
            }
            let window: String = first[i..i + j].iter().collect();
            if data.iter().all(|s| s.contains(&window)) {
                substr = window;
            }
        }
    }
    substr.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

const CIRCLE_EPSILON: f64 = 1e-12;

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        let dx = p.0 - self.x;
        let dy = p.1 - self.y;
        (dx * dx + dy * dy).sqrt() <= self.radius * (1.0 + CIRCLE_EPSILON) + CIRCLE_EPSILON
    }
}

/// Minimum bounding circle of a point set (Welzl-style incremental build).
/// Planar coordinates; callers pass lon/lat degrees directly and get a
/// circle in degrees back.
pub fn make_circle(points: &[(f64, f64)]) -> Option<Circle> {
    let mut circle: Option<Circle> = None;
    for (i, &p) in points.iter().enumerate() {
        match circle {
            Some(c) if c.contains(p) => {}
            _ => circle = Some(circle_with_boundary_point(&points[..=i], p)),
        }
    }
    circle
}

fn circle_with_boundary_point(points: &[(f64, f64)], p: (f64, f64)) -> Circle {
    let mut circle = Circle {
        x: p.0,
        y: p.1,
        radius: 0.0,
    };
    for (i, &q) in points.iter().enumerate() {
        if circle.contains(q) {
            continue;
        }
        if circle.radius == 0.0 {
            circle = circle_from_two(p, q);
        } else {
            circle = circle_with_two_boundary_points(&points[..=i], p, q);
        }
    }
    circle
}

fn circle_with_two_boundary_points(points: &[(f64, f64)], p: (f64, f64), q: (f64, f64)) -> Circle {
    let base = circle_from_two(p, q);
    let mut left: Option<Circle> = None;
    let mut right: Option<Circle> = None;

    for &r in points {
        if base.contains(r) {
            continue;
        }
        let side = cross(p, q, r);
        let Some(c) = circle_from_three(p, q, r) else {
            continue;
        };
        let centre_side = cross(p, q, (c.x, c.y));
        if side > 0.0 && left.map_or(true, |l| centre_side > cross(p, q, (l.x, l.y))) {
            left = Some(c);
        } else if side < 0.0 && right.map_or(true, |r2| centre_side < cross(p, q, (r2.x, r2.y))) {
            right = Some(c);
        }
    }

    match (left, right) {
        (None, None) => base,
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (Some(l), Some(r)) => {
            if l.radius <= r.radius {
                l
            } else {
                r
            }
        }
    }
}

fn circle_from_two(a: (f64, f64), b: (f64, f64)) -> Circle {
    let cx = (a.0 + b.0) / 2.0;
    let cy = (a.1 + b.1) / 2.0;
    let radius = ((a.0 - cx).hypot(a.1 - cy)).max((b.0 - cx).hypot(b.1 - cy));
    Circle {
        x: cx,
        y: cy,
        radius,
    }
}

fn circle_from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Circle> {
    // Offset towards the centroid for numerical stability.
    let ox = (a.0 + b.0 + c.0) / 3.0;
    let oy = (a.1 + b.1 + c.1) / 3.0;
    let (ax, ay) = (a.0 - ox, a.1 - oy);
    let (bx, by) = (b.0 - ox, b.1 - oy);
    let (cx, cy) = (c.0 - ox, c.1 - oy);
    let d = (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by)) * 2.0;
    if d == 0.0 {
        return None;
    }
    let x = ox
        + ((ax * ax + ay * ay) * (by - cy)
            + (bx * bx + by * by) * (cy - ay)
            + (cx * cx + cy * cy) * (ay - by))
            / d;
    let y = oy
        + ((ax * ax + ay * ay) * (cx - bx)
            + (bx * bx + by * by) * (ax - cx)
            + (cx * cx + cy * cy) * (bx - ax))
            / d;
    let radius = ((a.0 - x).hypot(a.1 - y))
        .max((b.0 - x).hypot(b.1 - y))
        .max((c.0 - x).hypot(c.1 - y));
    Some(Circle { x, y, radius })
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Approximates a circle as a closed 64-gon.
pub fn circle_to_polygon(circle: &Circle) -> Polygon<f64> {
    let segments = 64;
    let mut coordinates = Vec::with_capacity(segments + 1);
    for j in 0..segments {
        let angle = (j as f64) * 2.0 * std::f64::consts::PI / (segments as f64);
        coordinates.push((
            circle.x + circle.radius * angle.cos(),
            circle.y + circle.radius * angle.sin(),
        ));
    }
    coordinates.push(coordinates[0]);
    Polygon::new(LineString::from(coordinates), vec![])
}

/// The point in `points` nearest `target`, by planar distance.
pub fn point_nearest_point(points: &[Point<f64>], target: Point<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in points.iter().enumerate() {
        let d = (p.x() - target.x()).hypot(p.y() - target.y());
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_substr_finds_shared_suffix() {
        let data = vec![
            "12 Acacia Avenue, Wellington",
            "12a Acacia Avenue, Wellington",
            "14 Acacia Avenue, Wellington",
        ];
        assert_eq!(long_substr(&data), "Acacia Avenue, Wellington");
    }

    #[test]
    fn long_substr_with_nothing_in_common_is_empty() {
        assert_eq!(long_substr(&["abc", "xyz"]), "");
    }

    #[test]
    fn long_substr_single_entry_returns_it() {
        assert_eq!(long_substr(&["only one"]), "only one");
    }

    #[test]
    fn make_circle_of_two_points_spans_them() {
        let circle = make_circle(&[(0.0, 0.0), (2.0, 0.0)]).unwrap();
        assert!((circle.x - 1.0).abs() < 1e-9);
        assert!((circle.y - 0.0).abs() < 1e-9);
        assert!((circle.radius - 1.0).abs() < 1e-9);
    }

    #[test]
    fn make_circle_contains_all_points() {
        let points = vec![
            (0.0, 0.0),
            (3.0, 1.0),
            (1.0, 4.0),
            (-2.0, 2.0),
            (1.5, 1.5),
        ];
        let circle = make_circle(&points).unwrap();
        for p in &points {
            assert!(circle.contains(*p), "{:?} outside {:?}", p, circle);
        }
    }

    #[test]
    fn make_circle_of_empty_set_is_none() {
        assert!(make_circle(&[]).is_none());
    }

    #[test]
    fn circle_polygon_is_closed() {
        let poly = circle_to_polygon(&Circle {
            x: 0.0,
            y: 0.0,
            radius: 1.0,
        });
        let ring = poly.exterior();
        assert_eq!(ring.0.len(), 65);
        assert_eq!(ring.0.first(), ring.0.last());
    }

    #[test]
    fn nearest_point_picks_closest_index() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(1.0, 1.0),
        ];
        assert_eq!(point_nearest_point(&points, Point::new(1.2, 1.2)), Some(2));
        assert_eq!(point_nearest_point(&[], Point::new(0.0, 0.0)), None);
    }
}
