//! The show itself: every live rocket and particle, advanced and drawn once per frame.

use crate::burst::{self, Particle};
use crate::canvas::Surface;
use crate::launch::{self, Rocket};
use crate::theme::{Palette, Theme};

/// Share of the previous frame's light erased before drawing the next one.
pub const FADE_AMOUNT: f32 = 0.3;

pub struct Sky {
    theme: Theme,
    palette: Palette,
    rockets: Vec<Rocket>,
    particles: Vec<Particle>,
    paused: bool,
    bursts: u64,
    rng: fastrand::Rng,
}

impl Sky {
    pub fn new(theme: Theme, rng: fastrand::Rng) -> Self {
        let palette = Palette::from_theme(&theme);
        Self {
            theme,
            palette,
            rockets: Vec::new(),
            particles: Vec::with_capacity(1024),
            paused: false,
            bursts: 0,
            rng,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Swap in a new theme. Shells already in the air keep their colors.
    pub fn set_theme(&mut self, theme: Theme) {
        self.palette = Palette::from_theme(&theme);
        if self.palette.is_empty() {
            log::warn!("theme '{}' has no usable colors, drawing in white", theme.name);
        }
        log::info!(
            "theme '{}': pattern={} frequency={:.3} count={} size={:.1}",
            theme.name,
            theme.pattern.name(),
            theme.launch_frequency,
            theme.particle_count,
            theme.particle_size
        );
        self.theme = theme;
    }

    pub fn rockets(&self) -> &[Rocket] {
        &self.rockets
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_paused(&mut self) {
        self.paused = !self.paused;
    }

    /// Fire a shell from the middle of the ground toward `target`.
    pub fn launch_toward<S: Surface>(&mut self, target: (f32, f32), surface: &S) {
        let (width, height) = surface.size();
        let rocket = launch::manual_launch((width / 2.0, height), target, &self.palette, &mut self.rng);
        self.rockets.push(rocket);
    }

    /// Run one frame. A paused sky leaves both its state and the surface untouched.
    pub fn frame<S: Surface>(&mut self, surface: &mut S) {
        if self.paused {
            return;
        }

        surface.fade(FADE_AMOUNT);

        // Reverse order so swap_remove only moves entries that were already visited
        let mut i = self.rockets.len();
        while i > 0 {
            i -= 1;
            let rocket = &mut self.rockets[i];
            let arrived = rocket.update();

            let (from, to) = rocket.trail();
            surface.stroke(from, to, rocket.color);

            if arrived {
                let rocket = self.rockets.swap_remove(i);
                burst::spawn(
                    &mut self.particles,
                    rocket.x,
                    rocket.y,
                    rocket.color,
                    &self.theme,
                    &mut self.rng,
                );
                self.bursts += 1;
                log::debug!(
                    "burst #{} at ({:.0}, {:.0}), {} particles live",
                    self.bursts,
                    rocket.x,
                    rocket.y,
                    self.particles.len()
                );
            }
        }

        let mut i = self.particles.len();
        while i > 0 {
            i -= 1;
            let particle = &mut self.particles[i];
            if !particle.update() {
                self.particles.swap_remove(i);
                continue;
            }
            surface.fill_disc((particle.x, particle.y), particle.radius, particle.color, particle.alpha);
        }

        let (width, height) = surface.size();
        if let Some(rocket) = launch::maybe_auto_launch(
            width,
            height,
            self.theme.launch_frequency,
            &self.palette,
            &mut self.rng,
        ) {
            self.rockets.push(rocket);
        }
    }
}
