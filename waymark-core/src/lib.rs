//! WAYMARK Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no business logic.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod providers;
pub mod template;

pub use config::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use providers::*;
pub use template::*;
