//! Quadtree spatial partitioning used for neighbor lookup.
//!
//! The tree is rebuilt from scratch every tick and never outlives it.

use flock_core::{Agent, AgentId, AgentStore, Vec2};
use smallvec::SmallVec;

/// Maximum number of points a leaf node can hold before subdividing.
const QUADTREE_CAPACITY: usize = 8;
/// Maximum depth of the tree. Leaves at this depth hold any number of points,
/// which bounds recursion when many agents share one coordinate.
const QUADTREE_MAX_DEPTH: usize = 10;

/// Axis-aligned bounding box with inclusive edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Rect {
    /// Creates a new Rect, swapping bounds given in the wrong order.
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_min.max(x_max),
            y_max: y_min.max(y_max),
        }
    }

    /// Square centered on `center` extending `half_extent` on every side.
    pub fn around(center: Vec2, half_extent: f32) -> Self {
        Self::new(
            center.x - half_extent,
            center.y - half_extent,
            center.x + half_extent,
            center.y + half_extent,
        )
    }

    /// Smallest Rect holding every point, or `None` for an empty input.
    pub fn bounding(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::new(min.x, min.y, max.x, max.y))
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new((self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0)
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x_min
            && point.x <= self.x_max
            && point.y >= self.y_min
            && point.y <= self.y_max
    }

    /// Overlap test. Touching edges count as intersecting, matching the
    /// inclusive `contains`.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x_min > self.x_max
            || other.x_max < self.x_min
            || other.y_min > self.y_max
            || other.y_max < self.y_min)
    }

    /// Splits into four quadrants, ordered NW, NE, SW, SE.
    fn subdivide(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect::new(self.x_min, c.y, c.x, self.y_max),
            Rect::new(c.x, c.y, self.x_max, self.y_max),
            Rect::new(self.x_min, self.y_min, c.x, c.y),
            Rect::new(c.x, self.y_min, self.x_max, c.y),
        ]
    }
}

/// A point stored in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    /// Position of the agent in the store it was built from.
    pub index: usize,
    pub id: AgentId,
    pub position: Vec2,
}

#[derive(Debug)]
enum QuadTreeNode {
    Leaf {
        boundary: Rect,
        points: SmallVec<[IndexEntry; QUADTREE_CAPACITY]>,
    },
    Internal {
        boundary: Rect,
        // Order: NW[0], NE[1], SW[2], SE[3]
        children: Box<[QuadTreeNode; 4]>,
    },
}

impl QuadTreeNode {
    fn new_leaf(boundary: Rect) -> Self {
        QuadTreeNode::Leaf { boundary, points: SmallVec::new() }
    }

    fn boundary(&self) -> Rect {
        match self {
            QuadTreeNode::Leaf { boundary, .. } | QuadTreeNode::Internal { boundary, .. } => {
                *boundary
            }
        }
    }

    /// Inserts a point known to lie within this node's boundary.
    fn insert(&mut self, entry: IndexEntry, depth: usize) {
        match self {
            QuadTreeNode::Leaf { boundary, points } => {
                if points.len() < QUADTREE_CAPACITY || depth >= QUADTREE_MAX_DEPTH {
                    points.push(entry);
                    return;
                }

                let existing = std::mem::take(points);
                let [nw, ne, sw, se] = boundary.subdivide();
                let mut children = Box::new([
                    QuadTreeNode::new_leaf(nw),
                    QuadTreeNode::new_leaf(ne),
                    QuadTreeNode::new_leaf(sw),
                    QuadTreeNode::new_leaf(se),
                ]);
                let center = boundary.center();
                for point in existing.into_iter().chain(std::iter::once(entry)) {
                    children[Self::quadrant(center, point.position)].insert(point, depth + 1);
                }
                *self = QuadTreeNode::Internal { boundary: *boundary, children };
            }
            QuadTreeNode::Internal { boundary, children } => {
                let quadrant = Self::quadrant(boundary.center(), entry.position);
                children[quadrant].insert(entry, depth + 1);
            }
        }
    }

    /// Picks the child a point belongs to. Points on a split line go north/east.
    #[inline]
    fn quadrant(center: Vec2, p: Vec2) -> usize {
        match (p.y >= center.y, p.x >= center.x) {
            (true, false) => 0,
            (true, true) => 1,
            (false, false) => 2,
            (false, true) => 3,
        }
    }

    fn visit_range<'a, F: FnMut(&'a IndexEntry)>(&'a self, range: &Rect, visit: &mut F) {
        if !self.boundary().intersects(range) {
            return;
        }

        match self {
            QuadTreeNode::Leaf { points, .. } => {
                for point in points.iter().filter(|p| range.contains(p.position)) {
                    visit(point);
                }
            }
            QuadTreeNode::Internal { children, .. } => {
                for child in children.iter() {
                    child.visit_range(range, visit);
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            QuadTreeNode::Leaf { .. } => 1,
            QuadTreeNode::Internal { children, .. } => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }
}

/// Region-bucketed index over agent positions.
#[derive(Debug)]
pub struct SpatialIndex {
    root: QuadTreeNode,
    len: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            root: QuadTreeNode::new_leaf(Rect::new(0.0, 0.0, 0.0, 0.0)),
            len: 0,
        }
    }

    /// Builds an index over every agent in `store` accepted by `filter`.
    pub fn from_store(store: &AgentStore, filter: impl Fn(&Agent) -> bool) -> Self {
        let mut index = Self::new();
        index.build(
            store
                .iter()
                .enumerate()
                .filter(|(_, agent)| filter(agent))
                .map(|(idx, agent)| IndexEntry {
                    index: idx,
                    id: agent.id,
                    position: agent.position,
                }),
        );
        index
    }

    /// Discards prior contents and inserts every entry.
    ///
    /// The root is sized to the bounding box of the entries, so agents that
    /// drifted outside the viewport are still indexed. Entries with
    /// non-finite positions are skipped.
    pub fn build(&mut self, entries: impl IntoIterator<Item = IndexEntry>) {
        let entries: Vec<IndexEntry> =
            entries.into_iter().filter(|e| e.position.is_finite()).collect();
        let boundary = Rect::bounding(entries.iter().map(|e| e.position))
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));

        self.root = QuadTreeNode::new_leaf(boundary);
        self.len = entries.len();
        for entry in entries {
            self.root.insert(entry, 0);
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns all entries whose point lies within `rect` (edges inclusive).
    /// No ordering guarantee.
    pub fn query(&self, rect: &Rect) -> Vec<&IndexEntry> {
        let mut found = Vec::new();
        self.root.visit_range(rect, &mut |entry| found.push(entry));
        found
    }

    /// Allocation-free variant of [`SpatialIndex::query`].
    pub fn for_each_in<'a, F: FnMut(&'a IndexEntry)>(&'a self, rect: &Rect, mut visit: F) {
        self.root.visit_range(rect, &mut visit);
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}
