//! HTTP handlers for the MeteoWatch backend

pub mod alerts;
pub mod auth;
pub mod health;
pub mod jobs;
pub mod snapshots;
pub mod sources;
pub mod triggered;
pub mod users;

pub use alerts::*;
pub use auth::*;
pub use health::*;
pub use jobs::*;
pub use snapshots::*;
pub use sources::*;
pub use triggered::*;
pub use users::*;
