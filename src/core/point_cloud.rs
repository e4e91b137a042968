use nalgebra::{Point3, Vector3};

/// Read-only access to the sample points of a fit.
///
/// The minimizer only ever iterates all points and asks for their count, and
/// never mutates the collection while a fit is running.
pub trait PointSource: Sync {
    /// All points in the collection.
    fn points(&self) -> &[Point3<f64>];

    fn len(&self) -> usize {
        self.points().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PointSource for [Point3<f64>] {
    fn points(&self) -> &[Point3<f64>] {
        self
    }
}

impl PointSource for Vec<Point3<f64>> {
    fn points(&self) -> &[Point3<f64>] {
        self.as_slice()
    }
}

/// Owned, unordered collection of 3D sample points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Point3<f64>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: Point3<f64>) {
        self.points.push(point);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3<f64>> {
        self.points.iter()
    }

    /// Mean of all points, `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / self.points.len() as f64))
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for an empty cloud.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.points.first()?;
        let (min, max) = self
            .points
            .iter()
            .fold((first.coords, first.coords), |(min, max), p| {
                (min.inf(&p.coords), max.sup(&p.coords))
            });
        Some((Point3::from(min), Point3::from(max)))
    }
}

impl From<Vec<Point3<f64>>> for PointCloud {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }
}

impl FromIterator<Point3<f64>> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3<f64>>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl PointSource for PointCloud {
    fn points(&self) -> &[Point3<f64>] {
        &self.points
    }
}
