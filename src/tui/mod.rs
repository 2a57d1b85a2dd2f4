mod input;
pub mod terminal;
mod theme;

pub use input::TextInput;
pub use theme::Theme;

/// What a screen asks its event loop to do after handling a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenAction {
    Continue,
    Save,
    Exit,
}
