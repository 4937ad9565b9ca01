pub mod json_loader;

pub use json_loader::{intermediate_json_path, load_sections, save_sections};
