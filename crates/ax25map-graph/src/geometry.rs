use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_angle(radians: f32) -> Self {
        Self::new(radians.cos(), radians.sin())
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2-D cross product (z component).
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector, or zero for a degenerate input.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned box in canvas coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: Vec2::new(pos.x + size.x, pos.y + size.y),
        }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.min.x + self.width() * 0.5,
            self.min.y + self.height() * 0.5,
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Grow (or shrink, for negative `amount`) on all sides. Shrinking never
    /// inverts the box; it collapses onto its center instead.
    pub fn expand(&self, amount: f32) -> Rect {
        let center = self.center();
        let half_w = (self.width() * 0.5 + amount).max(0.0);
        let half_h = (self.height() * 0.5 + amount).max(0.0);
        Rect {
            min: Vec2::new(center.x - half_w, center.y - half_h),
            max: Vec2::new(center.x + half_w, center.y + half_h),
        }
    }

    /// Does the segment `a -> b` pass through this box? Liang-Barsky slab
    /// clipping; touching the boundary counts.
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        let delta = b - a;
        let mut t_enter = 0.0f32;
        let mut t_exit = 1.0f32;

        for (start, dir, lo, hi) in [
            (a.x, delta.x, self.min.x, self.max.x),
            (a.y, delta.y, self.min.y, self.max.y),
        ] {
            if dir.abs() < f32::EPSILON {
                if start < lo || start > hi {
                    return false;
                }
                continue;
            }
            let t1 = (lo - start) / dir;
            let t2 = (hi - start) / dir;
            let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
            t_enter = t_enter.max(near);
            t_exit = t_exit.min(far);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}

/// One of the four sides of a node box an edge can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl AnchorSide {
    pub const ALL: [AnchorSide; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    pub fn opposite(&self) -> Self {
        match self {
            AnchorSide::Left => AnchorSide::Right,
            AnchorSide::Right => AnchorSide::Left,
            AnchorSide::Top => AnchorSide::Bottom,
            AnchorSide::Bottom => AnchorSide::Top,
        }
    }

    /// Outward unit normal of this side.
    pub fn direction_vector(&self) -> Vec2 {
        match self {
            AnchorSide::Left => Vec2::new(-1.0, 0.0),
            AnchorSide::Right => Vec2::new(1.0, 0.0),
            AnchorSide::Top => Vec2::new(0.0, -1.0),
            AnchorSide::Bottom => Vec2::new(0.0, 1.0),
        }
    }

    /// Midpoint of this side of `rect`.
    pub fn anchor_point(&self, rect: &Rect) -> Vec2 {
        let c = rect.center();
        match self {
            AnchorSide::Left => Vec2::new(rect.min.x, c.y),
            AnchorSide::Right => Vec2::new(rect.max.x, c.y),
            AnchorSide::Top => Vec2::new(c.x, rect.min.y),
            AnchorSide::Bottom => Vec2::new(c.x, rect.max.y),
        }
    }
}
