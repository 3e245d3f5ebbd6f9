use crate::overlay::toolkit::FileDialogs;
use rfd::FileDialog;
use std::path::PathBuf;

/// Native open/save dialogs. Only PNG is offered; the alpha channel is the
/// point of saving.
#[derive(Debug, Clone)]
pub struct NativeDialogs {
    start_dir: PathBuf,
}

impl NativeDialogs {
    pub fn new(start_dir: PathBuf) -> Self {
        Self { start_dir }
    }
}

impl FileDialogs for NativeDialogs {
    fn open_image_file(&mut self) -> Option<PathBuf> {
        let path = FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_directory(&self.start_dir)
            .pick_file()?;
        if let Some(dir) = path.parent() {
            self.start_dir = dir.to_path_buf();
        }
        Some(path)
    }

    fn save_image_file(&mut self, suggested_name: &str) -> Option<PathBuf> {
        let path = FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_directory(&self.start_dir)
            .set_file_name(suggested_name)
            .save_file()?;
        if let Some(dir) = path.parent() {
            self.start_dir = dir.to_path_buf();
        }
        Some(path)
    }
}
