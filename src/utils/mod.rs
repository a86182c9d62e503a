pub mod file_names;
pub mod logging;
