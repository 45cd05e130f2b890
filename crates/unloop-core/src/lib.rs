pub mod error;
pub mod identity;
pub mod reconcile;
pub mod run;
pub mod session_log;
pub mod settings;
pub mod types;

pub use error::*;
pub use identity::*;
pub use reconcile::*;
pub use run::*;
pub use session_log::*;
pub use settings::*;
pub use types::*;
