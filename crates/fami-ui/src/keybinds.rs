use std::collections::HashMap;

use fami_core::controller::buttons;
use winit::keyboard::KeyCode;

/// Keyboard mapping for the joypad plus the emulator's own keys.
///
///  Up/Down/Left/Right | arrow keys
///  A / B              | Z / X
///  Turbo A / Turbo B  | S / D
///  Select / Start     | Right Shift / Enter
///  Fast-forward       | backtick
///  Quit               | Escape
pub struct KeyBindings {
    joypad: HashMap<KeyCode, u8>,
    pub turbo_a: KeyCode,
    pub turbo_b: KeyCode,
    pub fast_forward: KeyCode,
    pub quit: KeyCode,
}

impl KeyBindings {
    pub fn defaults() -> Self {
        let mut joypad = HashMap::new();
        joypad.insert(KeyCode::KeyZ, buttons::A);
        joypad.insert(KeyCode::KeyX, buttons::B);
        joypad.insert(KeyCode::ShiftRight, buttons::SELECT);
        joypad.insert(KeyCode::Enter, buttons::START);
        joypad.insert(KeyCode::ArrowUp, buttons::UP);
        joypad.insert(KeyCode::ArrowDown, buttons::DOWN);
        joypad.insert(KeyCode::ArrowLeft, buttons::LEFT);
        joypad.insert(KeyCode::ArrowRight, buttons::RIGHT);

        Self {
            joypad,
            turbo_a: KeyCode::KeyS,
            turbo_b: KeyCode::KeyD,
            fast_forward: KeyCode::Backquote,
            quit: KeyCode::Escape,
        }
    }

    pub fn joypad_mask(&self, key: KeyCode) -> Option<u8> {
        self.joypad.get(&key).copied()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::defaults()
    }
}
