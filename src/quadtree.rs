//! Arena-based quadtree over node positions
//!
//! The tree is rebuilt from scratch whenever a force needs it, because every
//! position changes every tick. Cells live contiguously in a `Vec` and refer
//! to their four children by the index of the first one. Leaves hold a bucket
//! of point indices chained through `next`; below [`MAX_DEPTH`] a bucket only
//! ever holds coincident points.
//!
//! Aggregates are filled in by separate bottom-up passes so each force pays
//! only for what it reads: [`QuadTree::accumulate_mass`] for Barnes-Hut and
//! [`QuadTree::accumulate_radius`] for collision.

use glam::DVec2;

/// Depth at which cells stop splitting and keep every point in one bucket
pub const MAX_DEPTH: u32 = 32;

/// Side length used when all points coincide
const DEGENERATE_SIZE: f64 = 1.0;

/// A square region of the tree
#[derive(Debug, Clone)]
pub struct Cell {
    /// Minimum corner
    pub origin: DVec2,
    /// Side length
    pub size: f64,
    /// Total mass of the points below this cell
    pub mass: f64,
    /// Mass-weighted centroid of the points below this cell
    pub centroid: DVec2,
    /// Largest radius of the points below this cell
    pub radius: f64,
    /// Index of the first of four contiguous children
    children: Option<usize>,
    /// First point of the leaf bucket
    head: Option<usize>,
}

impl Cell {
    fn new(origin: DVec2, size: f64) -> Self {
        Self {
            origin,
            size,
            mass: 0.0,
            centroid: DVec2::ZERO,
            radius: 0.0,
            children: None,
            head: None,
        }
    }

    /// Maximum corner
    pub fn max(&self) -> DVec2 {
        self.origin + DVec2::splat(self.size)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// True when neither points nor children live here
    pub fn is_empty(&self) -> bool {
        self.children.is_none() && self.head.is_none()
    }

    /// Indices of the four child cells, if subdivided
    pub fn children(&self) -> Option<[usize; 4]> {
        self.children.map(|first| [first, first + 1, first + 2, first + 3])
    }

    /// Quadrant index (bit 0 = right half, bit 1 = upper half)
    fn quadrant(&self, point: DVec2) -> usize {
        let mid = self.origin + DVec2::splat(self.size * 0.5);
        (point.x >= mid.x) as usize | (((point.y >= mid.y) as usize) << 1)
    }

    fn child_origin(&self, quadrant: usize) -> DVec2 {
        let half = self.size * 0.5;
        self.origin
            + DVec2::new(
                if quadrant & 1 != 0 { half } else { 0.0 },
                if quadrant & 2 != 0 { half } else { 0.0 },
            )
    }

    /// Squared distance from `point` to the nearest point of this cell
    pub fn distance_squared_to(&self, point: DVec2) -> f64 {
        let clamped = point.clamp(self.origin, self.max());
        point.distance_squared(clamped)
    }
}

/// A quadtree over a fixed set of points
#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<Cell>,
    points: Vec<DVec2>,
    next: Vec<Option<usize>>,
}

impl QuadTree {
    /// Index of the root cell
    pub const ROOT: usize = 0;

    /// Build a tree over `points`; point `i` keeps index `i`.
    pub fn new(points: Vec<DVec2>) -> Self {
        let (origin, size) = bounding_square(&points);
        let mut tree = Self {
            cells: Vec::with_capacity(points.len().max(1) * 2),
            next: vec![None; points.len()],
            points,
        };
        tree.cells.push(Cell::new(origin, size));
        for index in 0..tree.points.len() {
            tree.insert(index);
        }
        tree
    }

    fn insert(&mut self, index: usize) {
        let point = self.points[index];
        let mut cell = Self::ROOT;
        let mut depth = 0;

        loop {
            if let Some(first) = self.cells[cell].children {
                cell = first + self.cells[cell].quadrant(point);
                depth += 1;
                continue;
            }

            let Some(existing) = self.cells[cell].head else {
                self.cells[cell].head = Some(index);
                return;
            };

            let occupant = self.points[existing];
            if occupant == point || depth >= MAX_DEPTH {
                self.next[index] = Some(existing);
                self.cells[cell].head = Some(index);
                return;
            }

            // Split the leaf and move its (coincident) bucket down one level
            let first = self.subdivide(cell);
            let bucket = self.cells[cell].head.take();
            let quadrant = self.cells[cell].quadrant(occupant);
            self.cells[first + quadrant].head = bucket;
        }
    }

    fn subdivide(&mut self, cell: usize) -> usize {
        let first = self.cells.len();
        let half = self.cells[cell].size * 0.5;
        for quadrant in 0..4 {
            let origin = self.cells[cell].child_origin(quadrant);
            self.cells.push(Cell::new(origin, half));
        }
        self.cells[cell].children = Some(first);
        first
    }

    /// Number of points in the tree
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position of point `index`
    pub fn point(&self, index: usize) -> DVec2 {
        self.points[index]
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub fn root(&self) -> &Cell {
        &self.cells[Self::ROOT]
    }

    /// Number of cells, empty ones included
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Point indices stored directly in `cell` (empty for internal cells)
    pub fn bucket(&self, cell: &Cell) -> Bucket<'_> {
        Bucket {
            next: &self.next,
            current: cell.head,
        }
    }

    /// Fill in total mass and mass-weighted centroid of every cell.
    ///
    /// Masses must be positive; cells without points keep zero mass.
    pub fn accumulate_mass(&mut self, masses: &[f64]) {
        debug_assert_eq!(masses.len(), self.points.len());
        // Children are always allocated after their parent, so a reverse
        // sweep visits every child before its parent.
        for index in (0..self.cells.len()).rev() {
            let (mass, weighted) = match self.cells[index].children() {
                Some(children) => children.iter().fold((0.0, DVec2::ZERO), |(m, w), &c| {
                    let child = &self.cells[c];
                    (m + child.mass, w + child.centroid * child.mass)
                }),
                None => self
                    .bucket(&self.cells[index])
                    .fold((0.0, DVec2::ZERO), |(m, w), p| {
                        (m + masses[p], w + self.points[p] * masses[p])
                    }),
            };
            let cell = &mut self.cells[index];
            cell.mass = mass;
            if mass > 0.0 {
                cell.centroid = weighted / mass;
            }
        }
    }

    /// Fill in the largest point radius below every cell
    pub fn accumulate_radius(&mut self, radii: &[f64]) {
        debug_assert_eq!(radii.len(), self.points.len());
        for index in (0..self.cells.len()).rev() {
            let radius = match self.cells[index].children() {
                Some(children) => children
                    .iter()
                    .map(|&c| self.cells[c].radius)
                    .fold(0.0, f64::max),
                None => self
                    .bucket(&self.cells[index])
                    .map(|p| radii[p])
                    .fold(0.0, f64::max),
            };
            self.cells[index].radius = radius;
        }
    }

    /// Pre-order traversal from the root.
    ///
    /// The visitor returns `true` to descend into the cell's children and
    /// `false` to skip them. Empty cells are never visited.
    pub fn visit(&self, mut visitor: impl FnMut(&Cell) -> bool) {
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            let cell = &self.cells[index];
            if cell.is_empty() {
                continue;
            }
            if visitor(cell) {
                if let Some(children) = cell.children() {
                    // Reversed so quadrant 0 is visited first
                    stack.extend(children.iter().rev());
                }
            }
        }
    }

    /// The point nearest to `target` within `radius`, if any.
    ///
    /// A negative or NaN radius matches nothing.
    pub fn find(&self, target: DVec2, radius: f64) -> Option<usize> {
        if radius.is_nan() || radius < 0.0 {
            return None;
        }
        let mut best = None;
        let mut best_distance = radius * radius;
        let mut stack = vec![Self::ROOT];

        while let Some(index) = stack.pop() {
            let cell = &self.cells[index];
            if cell.is_empty() || cell.distance_squared_to(target) > best_distance {
                continue;
            }
            match cell.children() {
                Some(children) => {
                    // Visit the quadrant containing the target first
                    let nearest = cell.quadrant(target);
                    stack.extend(
                        children
                            .iter()
                            .enumerate()
                            .filter(|(quadrant, _)| *quadrant != nearest)
                            .map(|(_, child)| *child),
                    );
                    stack.push(children[nearest]);
                }
                None => {
                    for p in self.bucket(cell) {
                        let distance = self.points[p].distance_squared(target);
                        if distance <= best_distance {
                            best_distance = distance;
                            best = Some(p);
                        }
                    }
                }
            }
        }
        best
    }

    /// The highest-indexed point whose own radius covers `target`.
    ///
    /// Reads the cell radii filled in by [`QuadTree::accumulate_radius`] with
    /// the same `radii`. Points with a negative or NaN radius never match.
    pub fn find_covering(&self, target: DVec2, radii: &[f64]) -> Option<usize> {
        debug_assert_eq!(radii.len(), self.points.len());
        let mut best: Option<usize> = None;
        self.visit(|cell| {
            // A covering point lies inside the cell, so the cell box is at
            // least as close as the point itself
            if cell.distance_squared_to(target) > cell.radius * cell.radius {
                return false;
            }
            if cell.is_leaf() {
                for p in self.bucket(cell) {
                    let r = radii[p];
                    if r >= 0.0
                        && self.points[p].distance_squared(target) <= r * r
                        && best.is_none_or(|b| p > b)
                    {
                        best = Some(p);
                    }
                }
            }
            true
        });
        best
    }
}

/// Iterator over the point indices of a leaf bucket
pub struct Bucket<'a> {
    next: &'a [Option<usize>],
    current: Option<usize>,
}

impl Iterator for Bucket<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.current?;
        self.current = self.next[index];
        Some(index)
    }
}

/// Smallest square (origin, side) enclosing all points
fn bounding_square(points: &[DVec2]) -> (DVec2, f64) {
    if points.is_empty() {
        return (DVec2::ZERO, DEGENERATE_SIZE);
    }
    let (min, max) = points.iter().fold(
        (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    );
    let extent = (max - min).max_element();
    let size = if extent > 0.0 {
        extent
    } else {
        DEGENERATE_SIZE
    };
    (min, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(n: usize) -> Vec<DVec2> {
        (0..n * n)
            .map(|i| DVec2::new((i % n) as f64 * 10.0, (i / n) as f64 * 10.0))
            .collect()
    }

    fn leaf_of(tree: &QuadTree, index: usize) -> usize {
        let mut hits = 0;
        tree.visit(|cell| {
            if cell.is_leaf() {
                hits += tree.bucket(cell).filter(|&p| p == index).count();
            }
            true
        });
        hits
    }

    #[test]
    fn empty_tree_has_a_root() {
        let tree = QuadTree::new(vec![]);
        assert!(tree.is_empty());
        assert!(tree.root().is_empty());
        assert_eq!(tree.find(DVec2::ZERO, f64::INFINITY), None);
    }

    #[test]
    fn single_point_stays_in_root() {
        let mut tree = QuadTree::new(vec![DVec2::new(3.0, 4.0)]);
        tree.accumulate_mass(&[2.0]);
        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().mass, 2.0);
        assert_eq!(tree.root().centroid, DVec2::new(3.0, 4.0));
    }

    #[test]
    fn coincident_points_share_a_bucket() {
        let p = DVec2::new(1.0, 1.0);
        let mut tree = QuadTree::new(vec![p, p, p, DVec2::new(5.0, 5.0)]);
        tree.accumulate_mass(&[1.0; 4]);

        let mut largest_bucket = 0;
        tree.visit(|cell| {
            if cell.is_leaf() {
                largest_bucket = largest_bucket.max(tree.bucket(cell).count());
            }
            true
        });
        assert_eq!(largest_bucket, 3);
        assert_eq!(tree.root().mass, 4.0);
    }

    #[test]
    fn all_points_coincident_does_not_recurse_forever() {
        let tree = QuadTree::new(vec![DVec2::ZERO; 100]);
        assert_eq!(tree.cell_count(), 1);
        assert_eq!(tree.bucket(tree.root()).count(), 100);
    }

    #[test]
    fn nearly_coincident_points_stop_at_max_depth() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(1e-300, 0.0);
        let far = DVec2::new(1.0, 1.0);
        let tree = QuadTree::new(vec![a, b, far]);
        assert_eq!(leaf_of(&tree, 0), 1);
        assert_eq!(leaf_of(&tree, 1), 1);
        assert!(tree.cell_count() <= 1 + 4 * MAX_DEPTH as usize);
    }

    #[test]
    fn centroid_is_mass_weighted() {
        let mut tree = QuadTree::new(vec![DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0)]);
        tree.accumulate_mass(&[3.0, 1.0]);
        assert_eq!(tree.root().mass, 4.0);
        assert!((tree.root().centroid - DVec2::new(2.5, 0.0)).length() < 1e-12);
    }

    #[test]
    fn radius_is_maximum_below_cell() {
        let mut tree = QuadTree::new(grid(4));
        let radii: Vec<f64> = (0..16).map(|i| i as f64).collect();
        tree.accumulate_radius(&radii);
        assert_eq!(tree.root().radius, 15.0);
    }

    #[test]
    fn find_returns_nearest_within_radius() {
        let tree = QuadTree::new(grid(5));
        assert_eq!(tree.find(DVec2::new(21.0, 19.0), 5.0), Some(12));
        assert_eq!(tree.find(DVec2::new(5.0, 5.0), 1.0), None);
        assert_eq!(tree.find(DVec2::new(-100.0, -100.0), f64::INFINITY), Some(0));
    }

    #[test]
    fn find_with_negative_or_nan_radius_matches_nothing() {
        let tree = QuadTree::new(grid(5));
        assert_eq!(tree.find(DVec2::new(30.0, 30.0), -1.0), None);
        assert_eq!(tree.find(DVec2::new(30.0, 30.0), f64::NAN), None);
        assert_eq!(tree.find(DVec2::new(30.0, 30.0), 0.0), Some(18));
    }

    #[test]
    fn find_covering_uses_each_point_radius() {
        let points = vec![DVec2::ZERO, DVec2::new(12.0, 0.0), DVec2::new(50.0, 50.0)];
        let radii = [20.0, 1.0, 2.0];
        let mut tree = QuadTree::new(points);
        tree.accumulate_radius(&radii);

        // Closer to the small node's center but only inside the large one
        assert_eq!(tree.find_covering(DVec2::new(9.0, 0.0), &radii), Some(0));
        // Inside both: the later node is on top
        assert_eq!(tree.find_covering(DVec2::new(12.5, 0.0), &radii), Some(1));
        assert_eq!(tree.find_covering(DVec2::new(51.0, 51.0), &radii), Some(2));
        assert_eq!(tree.find_covering(DVec2::new(30.0, 30.0), &radii), None);
    }

    #[test]
    fn visit_can_prune_subtrees() {
        let tree = QuadTree::new(grid(8));
        let mut visited = 0;
        tree.visit(|_| {
            visited += 1;
            false
        });
        assert_eq!(visited, 1);
    }

    proptest! {
        #[test]
        fn every_point_lands_in_exactly_one_leaf(
            coords in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 1..200)
        ) {
            let points: Vec<DVec2> = coords.iter().map(|&(x, y)| DVec2::new(x, y)).collect();
            let tree = QuadTree::new(points);
            for i in 0..tree.len() {
                prop_assert_eq!(leaf_of(&tree, i), 1);
            }
        }

        #[test]
        fn root_aggregates_total_mass_and_centroid(
            bodies in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3, 0.1f64..10.0), 1..200)
        ) {
            let points: Vec<DVec2> = bodies.iter().map(|&(x, y, _)| DVec2::new(x, y)).collect();
            let masses: Vec<f64> = bodies.iter().map(|&(_, _, m)| m).collect();
            let total: f64 = masses.iter().sum();
            let expected = points
                .iter()
                .zip(&masses)
                .fold(DVec2::ZERO, |acc, (p, m)| acc + *p * *m)
                / total;

            let mut tree = QuadTree::new(points);
            tree.accumulate_mass(&masses);

            prop_assert!((tree.root().mass - total).abs() < 1e-9 * total);
            prop_assert!((tree.root().centroid - expected).length() < 1e-6);
        }
    }
}
