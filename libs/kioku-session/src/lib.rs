//! Client-side study sessions over a remote progress store.
//!
//! The session state machine ([`session::StudySession`]) is a deterministic
//! state container with no I/O of its own; [`manager::SessionManager`]
//! orchestrates the asynchronous parts around it: the snapshot subscription,
//! review writes with a bounded timeout, the durable pending-write cache,
//! and the daily-limit preference.

pub mod clock;
pub mod error;
pub mod manager;
pub mod pending;
pub mod session;
pub mod store;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{SessionError, SyncError};
pub use manager::{ManagerConfig, SessionHandle, SessionManager};
pub use pending::PendingCache;
pub use session::{ReviewTicket, SessionPhase, StudySession};
pub use store::{HttpProgressStore, MemoryProgressStore, ProgressStore};
pub use sync::{fingerprint, SnapshotFilter, SyncEngine};
