use rand::Rng;

use super::entity::Vec2;

const PARTICLE_LIFE_TICKS: f32 = 30.0;
const PARTICLE_GRAVITY_SCALE: f32 = 0.25;
pub const DAMAGE_NUMBER_LIFE_TICKS: f32 = 40.0;
const DAMAGE_NUMBER_RISE_PER_TICK: f32 = 1.0;
pub const HIT_PARTICLE_COUNT: usize = 6;
pub const DEATH_PARTICLE_COUNT: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub life: f32,
    pub max_life: f32,
    pub color: &'static str,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageNumber {
    pub position: Vec2,
    pub life: f32,
    pub value: u32,
    pub critical: bool,
}

/// Short-lived visual feedback. Not pooled: every entry expires on its own
/// within a second or so.
#[derive(Debug, Clone, Default)]
pub struct FxStore {
    pub particles: Vec<Particle>,
    pub damage_numbers: Vec<DamageNumber>,
}

impl FxStore {
    pub fn spawn_burst<R: Rng>(
        &mut self,
        rng: &mut R,
        origin: Vec2,
        count: usize,
        speed: f32,
        color: &'static str,
    ) {
        for _ in 0..count {
            let jitter_x: f32 = rng.random_range(-1.0..=1.0);
            let jitter_y: f32 = rng.random_range(-1.0..=0.25);
            self.particles.push(Particle {
                position: origin,
                velocity: Vec2::new(jitter_x * speed, jitter_y * speed),
                life: PARTICLE_LIFE_TICKS,
                max_life: PARTICLE_LIFE_TICKS,
                color,
                size: rng.random_range(2.0..=5.0),
            });
        }
    }

    pub fn spawn_damage_number(&mut self, position: Vec2, value: u32, critical: bool) {
        self.damage_numbers.push(DamageNumber {
            position,
            life: DAMAGE_NUMBER_LIFE_TICKS,
            value,
            critical,
        });
    }

    pub fn update(&mut self, time_scale: f32, gravity: f32) {
        for particle in &mut self.particles {
            particle.velocity.y += gravity * PARTICLE_GRAVITY_SCALE * time_scale;
            particle.position.x += particle.velocity.x * time_scale;
            particle.position.y += particle.velocity.y * time_scale;
            particle.life -= time_scale;
        }
        self.particles.retain(|particle| particle.life > 0.0);

        for number in &mut self.damage_numbers {
            number.position.y -= DAMAGE_NUMBER_RISE_PER_TICK * time_scale;
            number.life -= time_scale;
        }
        self.damage_numbers.retain(|number| number.life > 0.0);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.damage_numbers.clear();
    }
}
