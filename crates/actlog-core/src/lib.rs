//! actlog-core – domain model and persistence for user-interaction event logs.
//!
//! A client submits a batch of timestamped actions tied to a user/session; the
//! batch is validated into a [`NewLogSession`] and committed atomically through
//! an [`ActionLogStore`]. Stored actions are read back as flat
//! [`ActionRecord`]s selected by an [`ActionFilter`].

pub mod error;
pub mod model;
pub mod properties;
pub mod store;
pub mod time;

pub use error::Error;
pub use model::{ActionFilter, ActionRecord, LogSession, NewActionEvent, NewLogSession};
pub use properties::ActionProperties;
pub use store::{ActionLogStore, sqlite::{SqliteStore, StoreOptions}};
pub use time::parse_datetime;
