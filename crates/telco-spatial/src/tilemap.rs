//! Dense tile grid implementing [`MapService`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{Direction, MapService, Rect, RoadKind, SpatialError, TileKind, TilePosition};

/// A rectangular map stored row-major, with the origin at (0, 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
}

impl TileMap {
    /// An all-empty map.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![TileKind::Empty; (width * height) as usize],
        }
    }

    /// A city block layout: roads every `spacing` tiles in both axes,
    /// buildings in between.
    pub fn with_road_grid(width: u32, height: u32, spacing: u32) -> Self {
        let spacing = spacing.max(2);
        let mut map = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let kind = match (x % spacing == 0, y % spacing == 0) {
                    (true, true) => TileKind::Road(RoadKind::Intersection),
                    (true, false) => TileKind::Road(RoadKind::Vertical),
                    (false, true) => TileKind::Road(RoadKind::Horizontal),
                    (false, false) => TileKind::Building,
                };
                map.tiles[(y * width + x) as usize] = kind;
            }
        }
        map
    }

    /// Parse an ASCII layout, one string per row.
    ///
    /// `.` empty, `-` horizontal road, `|` vertical road, `+` intersection,
    /// `#` building, `~` water.
    pub fn from_rows(rows: &[&str]) -> Result<Self, SpatialError> {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0) as u32;
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for row in rows {
            if row.chars().count() as u32 != width {
                return Err(SpatialError::RaggedRows);
            }
            for glyph in row.chars() {
                tiles.push(match glyph {
                    '.' => TileKind::Empty,
                    '-' => TileKind::Road(RoadKind::Horizontal),
                    '|' => TileKind::Road(RoadKind::Vertical),
                    '+' => TileKind::Road(RoadKind::Intersection),
                    '#' => TileKind::Building,
                    '~' => TileKind::Water,
                    other => return Err(SpatialError::UnknownGlyph(other)),
                });
            }
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_tile(&mut self, pos: TilePosition, kind: TileKind) -> Result<(), SpatialError> {
        let idx = self.index(pos).ok_or(SpatialError::OutOfBounds(pos))?;
        self.tiles[idx] = kind;
        Ok(())
    }

    /// Iterate over every tile with its position, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (TilePosition, TileKind)> + '_ {
        self.tiles.iter().enumerate().map(|(i, kind)| (self.position(i), *kind))
    }

    fn index(&self, pos: TilePosition) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        Some((pos.y as u32 * self.width + pos.x as u32) as usize)
    }

    fn position(&self, index: usize) -> TilePosition {
        let w = self.width as usize;
        TilePosition::new((index % w) as i32, (index / w) as i32)
    }
}

impl MapService for TileMap {
    fn bounds(&self) -> Rect {
        Rect::new(
            TilePosition::new(0, 0),
            TilePosition::new(self.width as i32 - 1, self.height as i32 - 1),
        )
    }

    fn tile(&self, pos: TilePosition) -> Option<TileKind> {
        self.index(pos).map(|i| self.tiles[i])
    }

    /// Breadth-first search over passable 4-neighbours, expanded in compass
    /// order so equal-length routes resolve the same way every run.
    fn pathfind(&self, start: TilePosition, end: TilePosition) -> Option<Vec<TilePosition>> {
        let start_idx = self.index(start)?;
        let end_idx = self.index(end)?;
        if !self.tiles[start_idx].is_passable() || !self.tiles[end_idx].is_passable() {
            return None;
        }
        if start_idx == end_idx {
            return Some(vec![start]);
        }

        let mut came_from: Vec<Option<usize>> = vec![None; self.tiles.len()];
        let mut visited = vec![false; self.tiles.len()];
        let mut queue = VecDeque::new();
        visited[start_idx] = true;
        queue.push_back(start_idx);

        while let Some(current) = queue.pop_front() {
            if current == end_idx {
                break;
            }
            let pos = self.position(current);
            for dir in Direction::all() {
                let Some(next) = self.index(pos.step(dir, 1)) else {
                    continue;
                };
                if visited[next] || !self.tiles[next].is_passable() {
                    continue;
                }
                visited[next] = true;
                came_from[next] = Some(current);
                queue.push_back(next);
            }
        }

        if !visited[end_idx] {
            return None;
        }

        let mut path = vec![end];
        let mut cursor = end_idx;
        while let Some(prev) = came_from[cursor] {
            path.push(self.position(prev));
            cursor = prev;
        }
        path.reverse();
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Orientation;

    #[test]
    fn road_grid_layout() {
        let map = TileMap::with_road_grid(9, 9, 4);
        assert_eq!(
            map.tile(TilePosition::new(0, 0)),
            Some(TileKind::Road(RoadKind::Intersection))
        );
        assert_eq!(
            map.tile(TilePosition::new(4, 2)),
            Some(TileKind::Road(RoadKind::Vertical))
        );
        assert_eq!(
            map.tile(TilePosition::new(2, 4)),
            Some(TileKind::Road(RoadKind::Horizontal))
        );
        assert_eq!(map.tile(TilePosition::new(1, 1)), Some(TileKind::Building));
        assert_eq!(map.tile(TilePosition::new(9, 0)), None);
    }

    #[test]
    fn parse_rows() {
        let map = TileMap::from_rows(&["+-+", "|#|", "+~+"]).unwrap();
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 3);
        assert_eq!(map.tile(TilePosition::new(1, 1)), Some(TileKind::Building));
        assert_eq!(map.tile(TilePosition::new(1, 2)), Some(TileKind::Water));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            TileMap::from_rows(&["..", "."]),
            Err(SpatialError::RaggedRows)
        ));
        assert!(matches!(
            TileMap::from_rows(&[".x"]),
            Err(SpatialError::UnknownGlyph('x'))
        ));
    }

    #[test]
    fn set_tile_out_of_bounds() {
        let mut map = TileMap::new(2, 2);
        assert!(map.set_tile(TilePosition::new(1, 1), TileKind::Water).is_ok());
        assert!(matches!(
            map.set_tile(TilePosition::new(2, 0), TileKind::Water),
            Err(SpatialError::OutOfBounds(_))
        ));
    }

    #[test]
    fn pathfind_straight_line() {
        let map = TileMap::new(10, 10);
        let path = map
            .pathfind(TilePosition::new(0, 0), TilePosition::new(0, 4))
            .unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], TilePosition::new(0, 0));
        assert_eq!(path[4], TilePosition::new(0, 4));
    }

    #[test]
    fn pathfind_is_shortest_and_contiguous() {
        let map = TileMap::new(10, 10);
        let start = TilePosition::new(1, 1);
        let end = TilePosition::new(6, 4);
        let path = map.pathfind(start, end).unwrap();
        assert_eq!(path.len() as u32, start.manhattan_distance(&end) + 1);
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan_distance(&pair[1]), 1);
        }
    }

    #[test]
    fn pathfind_routes_around_buildings() {
        let map = TileMap::from_rows(&[
            ".....", //
            ".###.", //
            ".....",
        ])
        .unwrap();
        let path = map
            .pathfind(TilePosition::new(0, 1), TilePosition::new(4, 1))
            .unwrap();
        assert!(path.iter().all(|p| map.is_passable(*p)));
        assert_eq!(path.len(), 7);
    }

    #[test]
    fn pathfind_blocked_returns_none() {
        let map = TileMap::from_rows(&["..~..", "..~..", "..~.."]).unwrap();
        assert!(
            map.pathfind(TilePosition::new(0, 0), TilePosition::new(4, 0))
                .is_none()
        );
        assert!(
            map.pathfind(TilePosition::new(0, 0), TilePosition::new(2, 0))
                .is_none()
        );
    }

    #[test]
    fn pathfind_same_tile() {
        let map = TileMap::new(3, 3);
        let p = TilePosition::new(1, 1);
        assert_eq!(map.pathfind(p, p), Some(vec![p]));
    }

    #[test]
    fn area_is_clipped_disc() {
        let map = TileMap::new(10, 10);
        let area = map.area(TilePosition::new(0, 0), 2);
        // Quarter disc of radius 2: (0..=2, 0..=2) minus (2,1), (1,2), (2,2).
        assert_eq!(area.len(), 6);
        assert!(area.iter().all(|p| map.in_bounds(*p)));
        let full = map.area(TilePosition::new(5, 5), 1);
        assert_eq!(full.len(), 5);
    }

    #[test]
    fn area_in_direction_shapes() {
        let map = TileMap::new(20, 20);
        let start = TilePosition::new(10, 10);
        let north = map.area_in_direction(start, Direction::North, 4).unwrap();
        assert_eq!(north.min, TilePosition::new(8, 6));
        assert_eq!(north.max, TilePosition::new(12, 9));
        let east = map.area_in_direction(start, Direction::East, 4).unwrap();
        assert_eq!(east.min, TilePosition::new(11, 8));
        assert_eq!(east.max, TilePosition::new(14, 12));
        assert!(
            map.area_in_direction(TilePosition::new(0, 0), Direction::West, 4)
                .is_none()
        );
    }

    #[test]
    fn nearest_valid_skips_buildings() {
        let map = TileMap::from_rows(&["###", "#.#", "###"]).unwrap();
        assert_eq!(
            map.nearest_valid(TilePosition::new(0, 0)),
            Some(TilePosition::new(1, 1))
        );
        let solid = TileMap::from_rows(&["##"]).unwrap();
        assert_eq!(solid.nearest_valid(TilePosition::new(0, 0)), None);
    }

    #[test]
    fn dominant_road_orientation() {
        let map = TileMap::from_rows(&["----", "#|##", "#|##"]).unwrap();
        let all = map.bounds();
        assert_eq!(map.road_orientation(&all), Some(Orientation::Horizontal));
        let lower = Rect::new(TilePosition::new(0, 1), TilePosition::new(3, 2));
        assert_eq!(map.road_orientation(&lower), Some(Orientation::Vertical));
        let empty = TileMap::new(3, 3);
        assert_eq!(empty.road_orientation(&empty.bounds()), None);
    }
}
