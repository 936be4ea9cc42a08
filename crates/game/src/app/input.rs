use skirmish_engine::{InputAction, InputSnapshot, QUICK_SLOT_COUNT};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Folds keyboard events into per-tick snapshots. Held keys persist across
/// snapshots; presses are reported to exactly one snapshot.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    held: InputSnapshot,
    jump_pressed_edge: bool,
    dash_pressed_edge: bool,
    attack_pressed_edge: bool,
    quick_slot_edges: [bool; QUICK_SLOT_COUNT],
}

impl InputCollector {
    pub(crate) fn quit_requested(&self) -> bool {
        self.held.quit_requested()
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        self.held = self.held.with_action_down(InputAction::Quit, true);
    }

    pub(crate) fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        self.handle_physical_key(key_event.physical_key, key_event.state);
    }

    pub(crate) fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let Some(action) = action_for_key(code) else {
            if let Some(slot) = quick_slot_for_key(code) {
                self.handle_quick_slot_key(slot, state);
            }
            return;
        };

        let is_pressed = state == ElementState::Pressed;
        let was_down = self.held.is_down(action);
        if is_pressed && !was_down {
            match action {
                InputAction::Jump => self.jump_pressed_edge = true,
                InputAction::Dash => self.dash_pressed_edge = true,
                InputAction::Attack => self.attack_pressed_edge = true,
                _ => {}
            }
        }
        if action == InputAction::Quit {
            // Quit latches; releasing Escape does not cancel it.
            if is_pressed {
                self.mark_quit_requested();
            }
            return;
        }
        self.held = self.held.with_action_down(action, is_pressed);
    }

    fn handle_quick_slot_key(&mut self, slot: u8, state: ElementState) {
        let index = usize::from(slot);
        match state {
            ElementState::Pressed => {
                if !self.held.quick_slot_pressed(slot) {
                    self.quick_slot_edges[index] = true;
                }
                self.held = self.held.with_quick_slot_pressed(slot, true);
            }
            ElementState::Released => {
                self.held = self.held.with_quick_slot_pressed(slot, false);
            }
        }
    }

    pub(crate) fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let mut snapshot = InputSnapshot::empty()
            .with_jump_pressed(self.jump_pressed_edge)
            .with_dash_pressed(self.dash_pressed_edge)
            .with_attack_pressed(self.attack_pressed_edge);
        for action in HELD_ACTIONS {
            snapshot = snapshot.with_action_down(action, self.held.is_down(action));
        }
        for (index, pressed) in self.quick_slot_edges.iter().enumerate() {
            snapshot = snapshot.with_quick_slot_pressed(index as u8, *pressed);
        }

        self.jump_pressed_edge = false;
        self.dash_pressed_edge = false;
        self.attack_pressed_edge = false;
        self.quick_slot_edges = [false; QUICK_SLOT_COUNT];
        snapshot
    }
}

const HELD_ACTIONS: [InputAction; 6] = [
    InputAction::MoveLeft,
    InputAction::MoveRight,
    InputAction::Jump,
    InputAction::Dash,
    InputAction::Attack,
    InputAction::Quit,
];

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    match code {
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::Space | KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::Jump),
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(InputAction::Dash),
        KeyCode::KeyJ => Some(InputAction::Attack),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

fn quick_slot_for_key(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Digit1 => Some(0),
        KeyCode::Digit2 => Some(1),
        KeyCode::Digit3 => Some(2),
        KeyCode::Digit4 => Some(3),
        _ => None,
    }
}
