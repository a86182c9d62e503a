pub mod headless;

pub use headless::{launch_job_browser, LaunchedBrowser};
