pub mod toml_loader;

pub use toml_loader::{load_all_application_files, load_application};
