/// Number of quick-slot keys the input surface exposes.
pub const QUICK_SLOT_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Dash,
    Attack,
    Quit,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Dash => 3,
            InputAction::Attack => 4,
            InputAction::Quit => 5,
        }
    }
}

/// Input for one tick: held actions plus keys pressed since the previous
/// snapshot. Edge presses are reported exactly once by the host collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
    jump_pressed: bool,
    dash_pressed: bool,
    attack_pressed: bool,
    quick_slots_pressed: [bool; QUICK_SLOT_COUNT],
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn quit_requested(&self) -> bool {
        self.actions.is_down(InputAction::Quit)
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    pub fn dash_pressed(&self) -> bool {
        self.dash_pressed
    }

    pub fn attack_pressed(&self) -> bool {
        self.attack_pressed
    }

    pub fn quick_slot_pressed(&self, slot: u8) -> bool {
        self.quick_slots_pressed
            .get(usize::from(slot))
            .copied()
            .unwrap_or(false)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_jump_pressed(mut self, pressed: bool) -> Self {
        self.jump_pressed = pressed;
        self
    }

    pub fn with_dash_pressed(mut self, pressed: bool) -> Self {
        self.dash_pressed = pressed;
        self
    }

    pub fn with_attack_pressed(mut self, pressed: bool) -> Self {
        self.attack_pressed = pressed;
        self
    }

    /// Out-of-range slots are ignored.
    pub fn with_quick_slot_pressed(mut self, slot: u8, pressed: bool) -> Self {
        if let Some(entry) = self.quick_slots_pressed.get_mut(usize::from(slot)) {
            *entry = pressed;
        }
        self
    }
}

/// What the player asked for this tick, independent of key layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intents {
    /// -1.0, 0.0 or 1.0. Opposing keys cancel.
    pub move_axis: f32,
    pub jump: bool,
    pub dash: bool,
    pub attack: bool,
    pub quick_slots: Vec<u8>,
}

impl Intents {
    pub fn from_snapshot(input: &InputSnapshot) -> Self {
        let left = input.is_down(InputAction::MoveLeft);
        let right = input.is_down(InputAction::MoveRight);
        let move_axis = match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        let quick_slots = (0..QUICK_SLOT_COUNT as u8)
            .filter(|slot| input.quick_slot_pressed(*slot))
            .collect();
        Self {
            move_axis,
            jump: input.jump_pressed(),
            dash: input.dash_pressed(),
            attack: input.attack_pressed(),
            quick_slots,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.move_axis == 0.0
            && !self.jump
            && !self.dash
            && !self.attack
            && self.quick_slots.is_empty()
    }
}
