use crate::config::{PhysicsConfig, WorldConfig};

use super::entity::{Body, Facing};

pub fn apply_gravity(body: &mut Body, config: &PhysicsConfig, time_scale: f32) {
    body.velocity.y += config.gravity * time_scale;
}

/// Exponential decay keeps the per-second loss identical regardless of how
/// the second is split into ticks.
pub fn apply_friction(body: &mut Body, config: &PhysicsConfig, time_scale: f32) {
    body.velocity.x *= friction_factor(config.friction_base, time_scale);
}

pub fn friction_factor(friction_base: f32, time_scale: f32) -> f32 {
    friction_base.powf(time_scale.max(0.0))
}

pub fn integrate(body: &mut Body, time_scale: f32) {
    body.position.x += body.velocity.x * time_scale;
    body.position.y += body.velocity.y * time_scale;
}

pub fn clamp_to_bounds(body: &mut Body, world: &WorldConfig) {
    body.grounded = false;
    let floor_top = world.floor_y - body.size.y;
    if body.position.y >= floor_top {
        body.position.y = floor_top;
        if body.velocity.y > 0.0 {
            body.velocity.y = 0.0;
        }
        body.grounded = true;
    }
    if body.position.x < 0.0 {
        body.position.x = 0.0;
        body.velocity.x = 0.0;
    }
    let right_limit = world.width - body.size.x;
    if body.position.x > right_limit {
        body.position.x = right_limit;
        body.velocity.x = 0.0;
    }
}

/// Gravity, friction, integration and clamping in the order every actor uses.
pub fn step_body(body: &mut Body, physics: &PhysicsConfig, world: &WorldConfig, time_scale: f32) {
    apply_gravity(body, physics, time_scale);
    apply_friction(body, physics, time_scale);
    integrate(body, time_scale);
    clamp_to_bounds(body, world);
}

pub fn accelerate_horizontal(body: &mut Body, accel: f32, max_speed: f32, time_scale: f32) {
    body.velocity.x = (body.velocity.x + accel * time_scale).clamp(-max_speed, max_speed);
}

pub fn try_jump(body: &mut Body, jump_velocity: f32) -> bool {
    if !body.grounded {
        return false;
    }
    body.velocity.y = jump_velocity;
    body.grounded = false;
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashRejection {
    CoolingDown,
}

/// Overrides the velocity for this tick and starts the dash cooldown.
pub fn try_dash(
    body: &mut Body,
    dash_cooldown: &mut f32,
    facing: Facing,
    dash_speed: f32,
    cooldown_ticks: f32,
) -> Result<(), DashRejection> {
    if *dash_cooldown > 0.0 {
        return Err(DashRejection::CoolingDown);
    }
    body.velocity.x = facing.sign() * dash_speed;
    body.velocity.y = 0.0;
    *dash_cooldown = cooldown_ticks;
    Ok(())
}

pub fn decay_timer(timer: &mut f32, time_scale: f32) {
    *timer = (*timer - time_scale).max(0.0);
}
