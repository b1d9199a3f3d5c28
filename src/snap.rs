use crate::model::Point;

pub const GRID_SIZE: f32 = 20.0;

/// Grid used for snapping positions. Snapping rounds to the nearest grid line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    pub snap: bool,
    pub size: f32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            snap: true,
            size: GRID_SIZE,
        }
    }
}

impl Grid {
    pub fn snap(&self, value: f32) -> f32 {
        if !self.snap {
            return value;
        }
        (value / self.size).round() * self.size
    }

    pub fn snap_point(&self, p: Point) -> Point {
        Point::new(self.snap(p.x), self.snap(p.y))
    }
}
