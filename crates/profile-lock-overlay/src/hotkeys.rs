//! Keyboard shortcuts suppressed while guarding.

/// One keydown as seen at the capture phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInput {
    /// `KeyboardEvent.key` value.
    pub key: String,
    /// `KeyboardEvent.code` value (physical key, e.g. `KeyI`). Empty when the
    /// host does not report it.
    pub code: String,
    /// Control modifier.
    pub ctrl: bool,
    /// Shift modifier.
    pub shift: bool,
    /// Alt/Option modifier.
    pub alt: bool,
    /// Meta/Command modifier.
    pub meta: bool,
}

impl KeyInput {
    /// Key without modifiers.
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Sets the physical key code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Adds the control modifier.
    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Adds the shift modifier.
    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Adds the alt/option modifier.
    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Adds the meta/command modifier.
    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// What the host should do with a keydown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Let the default action run.
    Allow,
    /// Cancel the default action and stop propagation.
    Suppress,
}

/// Shortcut families suppressed while guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassKey {
    /// F12, Ctrl+Shift+I/J/C, Cmd+Opt+I/J/C.
    Inspector,
    /// Ctrl+U, Cmd+U.
    ViewSource,
    /// Escape inside the overlay.
    Escape,
}

/// Classifies a keydown; `None` means the key is allowed.
///
/// Letter chords match on the physical code when present: with Option held,
/// macOS reports dead keys or accented characters in `key`.
pub fn classify_key(input: &KeyInput) -> Option<BypassKey> {
    let key = input.key.to_ascii_lowercase();
    if key == "f12" || input.code == "F12" {
        return Some(BypassKey::Inspector);
    }
    if matches!(key.as_str(), "escape" | "esc") || input.code == "Escape" {
        return Some(BypassKey::Escape);
    }

    let letter = physical_letter(&input.code).or_else(|| single_letter(&key));
    let inspector_chord = (input.ctrl && input.shift) || (input.meta && input.alt);
    if inspector_chord && matches!(letter, Some('i' | 'j' | 'c')) {
        return Some(BypassKey::Inspector);
    }

    if (input.ctrl || input.meta) && letter == Some('u') {
        return Some(BypassKey::ViewSource);
    }

    None
}

fn physical_letter(code: &str) -> Option<char> {
    single_letter(&code.strip_prefix("Key")?.to_ascii_lowercase())
}

fn single_letter(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => Some(letter),
        _ => None,
    }
}
