//! Key routing over (focused pane × optional overlay).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::overlay::OverlayKind;
use crate::pane::{Binding, PaneAction, PaneId, lookup};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Quit,
    /// Hand the key to the top overlay.
    Overlay,
    Focus(PaneId),
    Move(i32),
    Pane(PaneAction),
    Ignore,
}

/// Decide who handles `key`. Pure so it can be tested without an app.
pub fn route(
    overlay: Option<OverlayKind>,
    bindings: &[Binding],
    key: &KeyEvent,
) -> Dispatch {
    // An open overlay owns every key, Ctrl-C included; it cancels the overlay there.
    if overlay.is_some() {
        return Dispatch::Overlay;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Dispatch::Quit;
    }

    let plain = !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Esc => return Dispatch::Quit,
        KeyCode::Char('q') if plain => return Dispatch::Quit,
        KeyCode::Char(ch @ '1'..='5') if plain => {
            if let Some(pane) = PaneId::from_digit(ch) {
                return Dispatch::Focus(pane);
            }
        }
        KeyCode::Char('j') | KeyCode::Down if plain => return Dispatch::Move(1),
        KeyCode::Char('k') | KeyCode::Up if plain => return Dispatch::Move(-1),
        KeyCode::PageDown => return Dispatch::Move(10),
        KeyCode::PageUp => return Dispatch::Move(-10),
        _ => {}
    }

    match lookup(bindings, key) {
        Some(action) => Dispatch::Pane(action),
        None => Dispatch::Ignore,
    }
}
