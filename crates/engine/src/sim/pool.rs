use super::entity::{Aabb, DamageType, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectileOwner {
    #[default]
    Player,
    Enemy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projectile {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub damage: u32,
    pub damage_type: DamageType,
    /// Remaining life in ticks.
    pub life: f32,
    pub owner: ProjectileOwner,
    pub color: &'static str,
}

impl Projectile {
    pub fn aabb(&self) -> Aabb {
        Aabb::from_position_size(self.position, self.size)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Fixed-capacity free list of projectile records. Acquisition never fails:
/// an empty list falls back to a transient record that is only kept on
/// release if there is room.
#[derive(Debug)]
pub struct ProjectilePool {
    free: Vec<Projectile>,
    capacity: usize,
    transient_allocations: u64,
    dropped_on_release: u64,
}

impl ProjectilePool {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut free = Vec::with_capacity(capacity);
        free.resize_with(capacity, Projectile::default);
        Self {
            free,
            capacity,
            transient_allocations: 0,
            dropped_on_release: 0,
        }
    }

    pub fn acquire(&mut self) -> Projectile {
        match self.free.pop() {
            Some(projectile) => projectile,
            None => {
                self.transient_allocations = self.transient_allocations.saturating_add(1);
                Projectile::default()
            }
        }
    }

    pub fn release(&mut self, mut projectile: Projectile) {
        if self.free.len() >= self.capacity {
            self.dropped_on_release = self.dropped_on_release.saturating_add(1);
            return;
        }
        projectile.reset();
        self.free.push(projectile);
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn transient_allocations(&self) -> u64 {
        self.transient_allocations
    }

    pub fn dropped_on_release(&self) -> u64 {
        self.dropped_on_release
    }
}
