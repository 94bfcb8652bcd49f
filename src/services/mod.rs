//! Business logic services for the MeteoWatch backend

pub mod alert_rules;
pub mod auth;
pub mod collection;
pub mod evaluation;
pub mod snapshots;
pub mod sources;
pub mod triggered;
pub mod users;

pub use alert_rules::AlertRuleService;
pub use auth::AuthService;
pub use collection::CollectionService;
pub use evaluation::EvaluationService;
pub use snapshots::SnapshotStore;
pub use sources::SourceService;
pub use triggered::TriggeredAlertService;
pub use users::UserService;
