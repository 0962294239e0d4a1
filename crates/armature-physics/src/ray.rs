//! Segment rays, bounding boxes and analytic ray tests for primitive shapes.
//!
//! All tests work in scene units and return the entry parameter `t` in
//! `[0, 1]` along the segment; a segment starting inside a solid hits at 0.

use nalgebra::{Isometry3, Point3, Vector3};

const EPSILON: f64 = 1e-12;

/// A segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    /// Start point.
    pub start: Point3<f64>,
    /// End point.
    pub end: Point3<f64>,
}

impl Ray3 {
    /// Create a ray.
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self { start, end }
    }

    /// `end - start`.
    pub fn direction(&self) -> Vector3<f64> {
        self.end - self.start
    }

    /// Segment length.
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Point at parameter `t`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.start + t * self.direction()
    }

    /// The same segment expressed in the local frame of `pose`.
    pub fn to_local(&self, pose: &Isometry3<f64>) -> Ray3 {
        Ray3::new(
            pose.inverse_transform_point(&self.start),
            pose.inverse_transform_point(&self.end),
        )
    }
}

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from its corners.
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Box centred at `center`.
    pub fn from_half_extents(center: Point3<f64>, half: Vector3<f64>) -> Self {
        Self::new(center - half, center + half)
    }

    /// Half extents.
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) / 2.0
    }

    /// Centre.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Corner `i`; bit 0 selects x, bit 1 y, bit 2 z.
    pub fn corner(&self, i: usize) -> Point3<f64> {
        Point3::new(
            if i & 1 == 0 { self.min.x } else { self.max.x },
            if i & 2 == 0 { self.min.y } else { self.max.y },
            if i & 4 == 0 { self.min.z } else { self.max.z },
        )
    }

    /// World-aligned box around this box placed at `pose`.
    pub fn transformed(&self, pose: &Isometry3<f64>) -> Aabb {
        let first = pose * self.corner(0);
        let (min, max) = (1..8)
            .map(|i| pose * self.corner(i))
            .fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)));
        Aabb::new(min, max)
    }

    /// Whether two boxes overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// The 12 edges of a box placed at `pose`, as rays.
///
/// Every edge joins one corner of even bit parity to one of odd parity, so
/// walking the three axis neighbours of the even corners covers each edge
/// exactly once.
pub fn box_edges(bounds: &Aabb, pose: &Isometry3<f64>) -> Vec<Ray3> {
    let mut edges = Vec::with_capacity(12);
    for start in [0, 3, 5, 6] {
        for axis in [1, 2, 4] {
            edges.push(Ray3::new(
                pose * bounds.corner(start),
                pose * bounds.corner(start ^ axis),
            ));
        }
    }
    edges
}

/// Slab test against an axis-aligned box in the ray's frame.
pub fn intersect_aabb(ray: &Ray3, bounds: &Aabb) -> Option<f64> {
    let d = ray.direction();
    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;

    for axis in 0..3 {
        let origin = ray.start[axis];
        let (low, high) = (bounds.min[axis], bounds.max[axis]);
        if d[axis].abs() < EPSILON {
            if origin < low || origin > high {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[axis];
        let (t0, t1) = ((low - origin) * inv, (high - origin) * inv);
        let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_max < t_min {
            return None;
        }
    }

    if t_max < 0.0 || t_min > 1.0 {
        return None;
    }
    Some(t_min.max(0.0))
}

/// Box with the given half extents centred on `pose`.
pub fn intersect_box(ray: &Ray3, pose: &Isometry3<f64>, half_extents: &Vector3<f64>) -> Option<f64> {
    let local = ray.to_local(pose);
    intersect_aabb(&local, &Aabb::from_half_extents(Point3::origin(), *half_extents))
}

/// Sphere. Solves `|start - center + t d|^2 = r^2`.
pub fn intersect_sphere(ray: &Ray3, center: &Point3<f64>, radius: f64) -> Option<f64> {
    let oc = ray.start - center;
    let c = oc.dot(&oc) - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let d = ray.direction();
    let a = d.dot(&d);
    if a < EPSILON {
        return None;
    }
    let b = 2.0 * oc.dot(&d);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    // Starting outside, both roots share a sign; the smaller is the entry.
    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Cylinder around the local Z axis of `pose`, spanning
/// `-half_height..=half_height`.
pub fn intersect_cylinder(ray: &Ray3, pose: &Isometry3<f64>, radius: f64, half_height: f64) -> Option<f64> {
    let local = ray.to_local(pose);
    let o = local.start;
    let d = local.direction();
    let r2 = radius * radius;

    if o.x * o.x + o.y * o.y <= r2 && o.z.abs() <= half_height {
        return Some(0.0);
    }

    let mut best: Option<f64> = None;
    let mut consider = |t: f64| {
        if (0.0..=1.0).contains(&t) && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    };

    // Side wall.
    let a = d.x * d.x + d.y * d.y;
    if a > EPSILON {
        let b = 2.0 * (o.x * d.x + o.y * d.y);
        let c = o.x * o.x + o.y * o.y - r2;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let sqrt_disc = discriminant.sqrt();
            for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
                if (o.z + t * d.z).abs() <= half_height {
                    consider(t);
                }
            }
        }
    }

    // Caps.
    if d.z.abs() > EPSILON {
        for z in [-half_height, half_height] {
            let t = (z - o.z) / d.z;
            let (x, y) = (o.x + t * d.x, o.y + t * d.y);
            if x * x + y * y <= r2 {
                consider(t);
            }
        }
    }

    best
}
