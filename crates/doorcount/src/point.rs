use serde::{Deserialize, Serialize};

/// Point represents an image-space position of an observed person.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal pixel coordinate (grows to the right)
    x: f32,
    /// Vertical pixel coordinate (grows downwards)
    y: f32,
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Point {
    /// Returns a new Point
    ///
    /// # Parameters
    ///
    /// * `x`: Horizontal coordinate.
    /// * `y`: Vertical coordinate.
    pub fn new(x: f32, y: f32) -> Point {
        Point { x, y }
    }

    /// Returns the x of the point
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Returns the y of the point
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the Euclidean distance to `other`
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
