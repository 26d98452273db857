//! Tile grid model for the city map.
//!
//! Provides the value types every other crate speaks in ([`TilePosition`],
//! [`Direction`], [`Rect`]), the [`MapService`] trait through which the
//! simulation consumes map geometry and pathfinding, and [`TileMap`], a dense
//! grid implementation with roads.

use serde::{Deserialize, Serialize};

pub mod tilemap;
pub use tilemap::TileMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position on the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl TilePosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &TilePosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Chebyshev (chessboard) distance to another position.
    pub fn chebyshev_distance(&self, other: &TilePosition) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }

    /// Squared euclidean distance. Used for disc-shaped coverage areas.
    pub fn distance_squared(&self, other: &TilePosition) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// The position `steps` tiles away in `direction`.
    pub fn step(&self, direction: Direction, steps: i32) -> TilePosition {
        let (dx, dy) = direction.offset();
        TilePosition::new(self.x + dx * steps, self.y + dy * steps)
    }
}

impl std::ops::Add<(i32, i32)> for TilePosition {
    type Output = TilePosition;

    fn add(self, (dx, dy): (i32, i32)) -> TilePosition {
        TilePosition::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for TilePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions, in compass order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction. North is negative y.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The axis a move in this direction travels along.
    pub fn orientation(&self) -> Orientation {
        match self {
            Direction::North | Direction::South => Orientation::Vertical,
            Direction::East | Direction::West => Orientation::Horizontal,
        }
    }
}

/// Axis of a road or cable run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn perpendicular(&self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// An axis-aligned rectangle of tiles. Both corners are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub min: TilePosition,
    pub max: TilePosition,
}

impl Rect {
    /// Build a rectangle from any two opposite corners.
    pub fn new(a: TilePosition, b: TilePosition) -> Self {
        Self {
            min: TilePosition::new(a.x.min(b.x), a.y.min(b.y)),
            max: TilePosition::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> u32 {
        (self.max.x - self.min.x + 1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max.y - self.min.y + 1) as u32
    }

    /// Number of tiles covered.
    pub fn len(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn contains(&self, pos: TilePosition) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    pub fn center(&self) -> TilePosition {
        TilePosition::new(
            self.min.x + (self.max.x - self.min.x) / 2,
            self.min.y + (self.max.y - self.min.y) / 2,
        )
    }

    /// The overlapping part of two rectangles, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let min = TilePosition::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = TilePosition::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        if min.x > max.x || min.y > max.y {
            None
        } else {
            Some(Rect { min, max })
        }
    }

    /// Iterate over all tiles, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = TilePosition> + use<> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| TilePosition::new(x, y)))
    }

    /// The four corner tiles (duplicates collapse for degenerate rects).
    pub fn corners(&self) -> Vec<TilePosition> {
        let mut corners = vec![
            self.min,
            TilePosition::new(self.max.x, self.min.y),
            TilePosition::new(self.min.x, self.max.y),
            self.max,
        ];
        corners.sort();
        corners.dedup();
        corners
    }
}

/// What occupies a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Empty,
    Road(RoadKind),
    Building,
    Water,
}

/// Road layout on a road tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadKind {
    Horizontal,
    Vertical,
    Intersection,
}

impl TileKind {
    /// Cables can be laid over empty land and roads.
    pub fn is_passable(&self) -> bool {
        matches!(self, TileKind::Empty | TileKind::Road(_))
    }

    pub fn is_road(&self) -> bool {
        matches!(self, TileKind::Road(_))
    }

    /// Orientation of a straight road piece. Intersections have none.
    pub fn road_orientation(&self) -> Option<Orientation> {
        match self {
            TileKind::Road(RoadKind::Horizontal) => Some(Orientation::Horizontal),
            TileKind::Road(RoadKind::Vertical) => Some(Orientation::Vertical),
            _ => None,
        }
    }
}

/// Errors from spatial operations.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    #[error("position {0} is outside the map")]
    OutOfBounds(TilePosition),
    #[error("unknown map glyph '{0}'")]
    UnknownGlyph(char),
    #[error("map rows have uneven widths")]
    RaggedRows,
}

// ---------------------------------------------------------------------------
// MapService
// ---------------------------------------------------------------------------

/// The map as seen by the simulation.
///
/// Implementors supply bounds, tile lookup and pathfinding; the geometric
/// queries have default implementations built on those.
pub trait MapService: Send + Sync {
    /// The rectangle covering every valid tile.
    fn bounds(&self) -> Rect;

    /// The tile at `pos`, or `None` outside the map.
    fn tile(&self, pos: TilePosition) -> Option<TileKind>;

    /// Shortest passable path from `start` to `end`, both ends included.
    /// `None` when either end is impassable or no route exists.
    fn pathfind(&self, start: TilePosition, end: TilePosition) -> Option<Vec<TilePosition>>;

    fn in_bounds(&self, pos: TilePosition) -> bool {
        self.bounds().contains(pos)
    }

    fn is_passable(&self, pos: TilePosition) -> bool {
        self.tile(pos).is_some_and(|t| t.is_passable())
    }

    /// All in-bounds tiles within euclidean `radius` of `center`.
    fn area(&self, center: TilePosition, radius: u32) -> Vec<TilePosition> {
        let r = radius as i32;
        let square = Rect::new(
            TilePosition::new(center.x - r, center.y - r),
            TilePosition::new(center.x + r, center.y + r),
        );
        let Some(clipped) = square.intersect(&self.bounds()) else {
            return Vec::new();
        };
        let limit = (radius as i64) * (radius as i64);
        clipped
            .tiles()
            .filter(|pos| pos.distance_squared(&center) <= limit)
            .collect()
    }

    /// A rectangle reaching `distance` tiles from `start` in `direction`,
    /// `distance` tiles wide and centred on `start`'s axis. Clipped to the map.
    fn area_in_direction(
        &self,
        start: TilePosition,
        direction: Direction,
        distance: u32,
    ) -> Option<Rect> {
        let d = distance.max(1) as i32;
        let half = d / 2;
        let rect = match direction {
            Direction::North => Rect::new(
                TilePosition::new(start.x - half, start.y - d),
                TilePosition::new(start.x + half, start.y - 1),
            ),
            Direction::South => Rect::new(
                TilePosition::new(start.x - half, start.y + 1),
                TilePosition::new(start.x + half, start.y + d),
            ),
            Direction::East => Rect::new(
                TilePosition::new(start.x + 1, start.y - half),
                TilePosition::new(start.x + d, start.y + half),
            ),
            Direction::West => Rect::new(
                TilePosition::new(start.x - d, start.y - half),
                TilePosition::new(start.x - 1, start.y + half),
            ),
        };
        rect.intersect(&self.bounds())
    }

    /// The passable tile closest to `pos` by chessboard rings, scanning each
    /// ring row by row.
    fn nearest_valid(&self, pos: TilePosition) -> Option<TilePosition> {
        let bounds = self.bounds();
        let max_ring = bounds.width().max(bounds.height()) as i32;
        for ring in 0..=max_ring {
            let square = Rect::new(
                TilePosition::new(pos.x - ring, pos.y - ring),
                TilePosition::new(pos.x + ring, pos.y + ring),
            );
            let found = square
                .tiles()
                .filter(|t| t.chebyshev_distance(&pos) == ring as u32)
                .find(|t| self.is_passable(*t));
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// The dominant straight-road orientation inside `rect`. Ties favour
    /// horizontal; `None` when the rectangle has no straight road tiles.
    fn road_orientation(&self, rect: &Rect) -> Option<Orientation> {
        let (mut horizontal, mut vertical) = (0u32, 0u32);
        for pos in rect.tiles() {
            match self.tile(pos).and_then(|t| t.road_orientation()) {
                Some(Orientation::Horizontal) => horizontal += 1,
                Some(Orientation::Vertical) => vertical += 1,
                None => {}
            }
        }
        match (horizontal, vertical) {
            (0, 0) => None,
            (h, v) if h >= v => Some(Orientation::Horizontal),
            _ => Some(Orientation::Vertical),
        }
    }
}
