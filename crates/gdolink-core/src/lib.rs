pub mod callbacks;
pub mod constants;
pub mod error;
pub mod observable;
pub mod types;

pub use callbacks::OnceCallbacks;
pub use error::{Error, Result};
pub use observable::Observable;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
