pub mod chromium_portal;
pub mod js_executor;
pub mod portal_driver;
pub mod selectors;
pub mod session;

pub use chromium_portal::{ChromiumPortal, ChromiumSessionFactory};
pub use js_executor::JsExecutor;
pub use portal_driver::{Credentials, Locator, PortalDriver, RadioChoice};
pub use session::{PortalSession, SessionClose, SessionFactory, SessionOpenFailure};
