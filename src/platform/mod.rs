//! Desktop implementations of the display, clipboard and file-dialog seams.

pub mod clipboard;
pub mod dialogs;
pub mod screen;

pub use clipboard::SystemClipboard;
pub use dialogs::NativeDialogs;
pub use screen::ScreenDisplays;
