//! # tallysync
//!
//! Offline-first storage and cloud sync for tasks, habits, goals, rewards and
//! points.
//!
//! The local SQLite store (through SeaORM) is the source of truth and works
//! without any network. A hierarchical cloud document store is reconciled on
//! demand: [`push`](TallySync::push) uploads field-level diffs, and
//! [`pull`](TallySync::pull) merges remote records whose `updated_at` is newer.
//!
//! ## Quick start
//!
//! ```ignore
//! use tallysync::{NewTask, RemoteConfig, TallySyncBuilder};
//!
//! let app = TallySyncBuilder::new("sqlite:./tally.db?mode=rwc")
//!     .with_remote_config(RemoteConfig::from_google_services("google-services.json")?)
//!     .build()
//!     .await?;
//!
//! app.local()
//!     .create_task(NewTask { title: "Buy milk".into(), ..Default::default() })
//!     .await?;
//! app.credentials().sign_in("ana@example.com", "secret").await?;
//!
//! let result = app.push().await;
//! println!("{}", result.message);
//! ```
//!
//! ## Key types
//!
//! - [`TallySyncBuilder`] / [`TallySync`]: wire everything together
//! - [`LocalStore`]: local tables and application operations
//! - [`CredentialManager`]: sign-in and access tokens
//! - [`SyncService`]: push/pull with the refresh-and-retry policy
//! - [`RemoteStore`]: the remote tree, implemented by [`FirebaseRemote`] and [`MemoryRemote`]

pub mod auth;
pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod local;
pub mod remote;
pub mod sync;

pub use auth::{AuthBackend, CredentialManager, FirebaseAuth, Session, SessionStore};
pub use builder::{TallySync, TallySyncBuilder};
pub use config::RemoteConfig;
pub use error::{
    AuthError, BuildError, ConfigError, ErrorClass, ParseError, StoreError, SyncError,
    ValidationError,
};
pub use local::{
    LevelInfo, LocalStore, NewGoal, NewHabit, NewReward, NewSubtask, NewTask, SkillLevel,
};
pub use remote::{FirebaseRemote, MemoryRemote, RemoteStore, RemoteValue};
pub use sync::{Direction, SyncPass, SyncResult, SyncService};

// Re-export sea-orm for users of the library
pub use sea_orm;
