//! Browser event extraction.

use retype_core::{Key, KeyInput, Modifiers};
use web_sys::KeyboardEvent;

/// Modifier state of a keyboard event.
pub fn modifiers_from_event(event: &KeyboardEvent) -> Modifiers {
    Modifiers {
        ctrl: event.ctrl_key(),
        alt: event.alt_key(),
        shift: event.shift_key(),
        meta: event.meta_key(),
    }
}

/// Convert a `keydown` event into the core key model.
pub fn key_input_from_event(event: &KeyboardEvent) -> KeyInput {
    KeyInput::with_modifiers(Key::from_dom_key(&event.key()), modifiers_from_event(event))
}
