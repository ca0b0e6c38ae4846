pub mod auth;
pub mod logging;

pub use auth::{AuthMode, AuthState, Session, UserAuth};
pub use logging::RequestLogger;
