use crate::theme::{Palette, Rgb};

pub const INITIAL_SPEED: f32 = 2.0;
pub const ACCELERATION: f32 = 1.05;
/// Horizontal distance to the target that counts as arrival.
const ARRIVAL_DISTANCE: f32 = 10.0;
/// How many frames of displacement the trail covers.
const TRAIL_FRAMES: f32 = 3.0;

/// A shell on its way up.
#[derive(Debug, Clone, PartialEq)]
pub struct Rocket {
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub angle: f32,
    pub speed: f32,
    pub acceleration: f32,
    pub color: Rgb,
}

impl Rocket {
    pub fn new(origin: (f32, f32), target: (f32, f32), color: Rgb) -> Self {
        let (x, y) = origin;
        let (target_x, target_y) = target;
        Self {
            x,
            y,
            target_x,
            target_y,
            angle: (target_y - y).atan2(target_x - x),
            speed: INITIAL_SPEED,
            acceleration: ACCELERATION,
            color,
        }
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.angle.cos() * self.speed, self.angle.sin() * self.speed)
    }

    /// Advance one frame. Returns true when the rocket should detonate.
    pub fn update(&mut self) -> bool {
        self.speed *= self.acceleration;
        let (vx, vy) = self.velocity();
        self.x += vx;
        self.y += vy;

        // Not a true distance check: risen past the target altitude, or close
        // enough horizontally.
        self.y <= self.target_y || (self.x - self.target_x).abs() < ARRIVAL_DISTANCE
    }

    /// Segment from a few frames back to the current position.
    pub fn trail(&self) -> ((f32, f32), (f32, f32)) {
        let (vx, vy) = self.velocity();
        (
            (self.x - vx * TRAIL_FRAMES, self.y - vy * TRAIL_FRAMES),
            (self.x, self.y),
        )
    }
}

/// Roll for an automatic launch this frame.
///
/// Launches from the middle half of the ground toward a random point in the upper
/// half of the sky.
pub fn maybe_auto_launch(
    width: f32,
    height: f32,
    frequency: f32,
    palette: &Palette,
    rng: &mut fastrand::Rng,
) -> Option<Rocket> {
    if rng.f32() >= frequency {
        return None;
    }

    let x = width / 2.0 + (rng.f32() * 2.0 - 1.0) * (width / 4.0);
    let target_x = rng.f32() * width;
    let target_y = rng.f32() * (height / 2.0);

    Some(Rocket::new((x, height), (target_x, target_y), palette.pick(rng)))
}

/// Launch toward a chosen point, whatever the launch frequency.
pub fn manual_launch(
    origin: (f32, f32),
    target: (f32, f32),
    palette: &Palette,
    rng: &mut fastrand::Rng,
) -> Rocket {
    Rocket::new(origin, target, palette.pick(rng))
}
