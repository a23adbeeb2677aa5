use crate::coords::Extent;

/// Keyboard key identifier.
///
/// Platform backends map their key codes onto these variants where possible.
/// Unsupported keys use `Key::Unknown(u32)` with a stable platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digits
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    /// Platform-dependent key not represented here.
    Unknown(u32),
}

/// Event delivered by a [`super::WindowSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowEvent {
    /// The user asked to close the window.
    Close,
    Key { key: Key, pressed: bool },
    /// New drawable size in physical pixels.
    Resize(Extent),
}

impl WindowEvent {
    #[inline]
    pub fn key_pressed(key: Key) -> Self {
        WindowEvent::Key { key, pressed: true }
    }

    #[inline]
    pub fn key_released(key: Key) -> Self {
        WindowEvent::Key { key, pressed: false }
    }
}
