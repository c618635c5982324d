use crate::theme::{MAX_PARTICLE_COUNT, Pattern, Rgb, Theme};
use std::f32::consts::PI;

pub const GRAVITY: f32 = 0.05;
pub const FRICTION: f32 = 0.95;
const DECAY_RANGE: (f32, f32) = (0.01, 0.03);

/// One fragment of an explosion.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub alpha: f32,
    pub color: Rgb,
    pub radius: f32,
    pub gravity: f32,
    pub friction: f32,
    pub decay: f32,
}

impl Particle {
    /// Advance one frame. Returns false once the particle has burned out.
    pub fn update(&mut self) -> bool {
        self.vx *= self.friction;
        self.vy *= self.friction;
        self.vy += self.gravity;
        self.x += self.vx;
        self.y += self.vy;
        self.alpha -= self.decay;

        // One more decay step would take it to zero or below
        self.alpha > self.decay
    }
}

fn range(rng: &mut fastrand::Rng, lo: f32, hi: f32) -> f32 {
    lo + rng.f32() * (hi - lo)
}

/// Initial velocity of particle `i` out of `count` for a pattern.
pub fn velocity(pattern: Pattern, i: usize, count: usize, rng: &mut fastrand::Rng) -> (f32, f32) {
    let t = i as f32 / count.max(1) as f32;

    match pattern {
        Pattern::Standard => {
            let angle = rng.f32() * PI * 2.0;
            let speed = range(rng, 1.0, 10.0);
            (angle.cos() * speed, angle.sin() * speed)
        }
        Pattern::Ring => {
            let angle = t * PI * 2.0;
            let speed = range(rng, 4.0, 6.0);
            (angle.cos() * speed, angle.sin() * speed)
        }
        Pattern::Star => {
            // Winding five times around aliases the even spacing into points
            let angle = t * PI * 10.0;
            let speed = range(rng, 2.0, 8.0);
            (angle.cos() * speed, angle.sin() * speed)
        }
        Pattern::Heart => {
            let angle = t * PI * 2.0;
            let scale = range(rng, 3.0, 5.0) / 10.0;
            let vx = 16.0 * angle.sin().powi(3) * scale;
            // Negated so the lobes sit on top with y growing downward
            let vy = -(13.0 * angle.cos()
                - 5.0 * (2.0 * angle).cos()
                - 2.0 * (3.0 * angle).cos()
                - (4.0 * angle).cos())
                * scale;
            (vx, vy)
        }
    }
}

/// Detonate a shell at `(x, y)`, appending `theme.particle_count` particles
/// (at most [`MAX_PARTICLE_COUNT`]).
pub fn spawn(
    particles: &mut Vec<Particle>,
    x: f32,
    y: f32,
    color: Rgb,
    theme: &Theme,
    rng: &mut fastrand::Rng,
) {
    let count = theme.particle_count.min(MAX_PARTICLE_COUNT);
    particles.reserve(count);

    for i in 0..count {
        let (vx, vy) = velocity(theme.pattern, i, count, rng);
        particles.push(Particle {
            x,
            y,
            vx,
            vy,
            alpha: 1.0,
            color,
            radius: range(rng, theme.particle_size * 0.5, theme.particle_size * 1.5),
            gravity: GRAVITY,
            friction: FRICTION,
            decay: range(rng, DECAY_RANGE.0, DECAY_RANGE.1),
        });
    }
}
