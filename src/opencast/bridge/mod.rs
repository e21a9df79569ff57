pub mod acl;
pub mod config;
pub mod directory;
pub mod error;
pub mod io;
pub mod model;
pub mod sync;
pub mod template;

pub use error::{BridgeError, Result};
