//! Celebration fireworks
//!
//! Purely decorative: spawned once when the race ends, advanced every
//! celebration tick, never read back by the race itself. Coordinates are
//! field fractions with +y pointing down the screen.

use glam::Vec2;

use super::rng::RandomSource;
use super::state::Particle;
use crate::consts::CELEBRATION_DURATION;

pub const FIREWORK_PALETTE: [u32; 8] = [
    0xff4d4f, 0x40c463, 0xffd700, 0x60a5fa, 0xf472b6, 0x22d3ee, 0xa78bfa, 0xf97316,
];

/// Particles per burst: 60 + [0, 50)
const BURST_BASE: usize = 60;
const BURST_EXTRA: f64 = 50.0;
/// Burst origins stay near the middle of the field
const ORIGIN_MIN: Vec2 = Vec2::new(0.3, 0.35);
const ORIGIN_SPAN: Vec2 = Vec2::new(0.4, 0.3);
const SPEED_MIN: f64 = 0.35;
const SPEED_MAX: f64 = 1.2;
const LIFE_MIN: f64 = 1.0;
const LIFE_SPAN: f64 = 1.2;

/// Per-tick velocity retention
const DRAG: f32 = 0.985;
/// Downward acceleration (field units / s^2)
const GRAVITY: f32 = 5.0;
/// Field aspect correction applied when integrating position
const FIELD_SCALE: f32 = 0.5;
/// Life lost per second
const LIFE_DECAY: f32 = 0.5;

/// Fireworks plus the celebration clock
#[derive(Debug, Clone)]
pub struct Celebration {
    pub particles: Vec<Particle>,
    /// Wall seconds since the celebration started
    pub elapsed: f64,
    pub duration: f64,
}

impl Celebration {
    /// Spawn `bursts` fireworks
    pub fn launch(rng: &mut RandomSource, bursts: usize) -> Self {
        let mut particles = Vec::new();

        for burst in 0..bursts {
            let origin = ORIGIN_MIN
                + Vec2::new(rng.next_f64() as f32, rng.next_f64() as f32) * ORIGIN_SPAN;
            let count = BURST_BASE + (rng.next_f64() * BURST_EXTRA).floor() as usize;

            particles.extend((0..count).map(|j| {
                let angle = rng.range(0.0, std::f64::consts::TAU) as f32;
                let speed = rng.range(SPEED_MIN, SPEED_MAX) as f32;
                let life = (LIFE_MIN + rng.next_f64() * LIFE_SPAN) as f32;
                Particle {
                    pos: origin,
                    vel: Vec2::from_angle(angle) * speed,
                    life,
                    color: FIREWORK_PALETTE[(burst + j) % FIREWORK_PALETTE.len()],
                }
            }));
        }

        Self {
            particles,
            elapsed: 0.0,
            duration: CELEBRATION_DURATION,
        }
    }

    /// Advance the celebration clock by `wall_dt` and the particles by `dt`
    pub fn advance(&mut self, wall_dt: f64, dt: f64) {
        self.elapsed += wall_dt;
        update_particles(&mut self.particles, dt as f32);
    }

    pub fn is_over(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Drag, gravity, integrate, age; drop spent particles
pub fn update_particles(particles: &mut Vec<Particle>, dt: f32) {
    for p in particles.iter_mut() {
        p.vel *= DRAG;
        p.vel.y += GRAVITY * dt;
        p.pos += p.vel * dt * FIELD_SCALE;
        p.life -= dt * LIFE_DECAY;
    }
    particles.retain(|p| p.life > 0.0);
}
