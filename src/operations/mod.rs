//! Browser-mediated bulk operations.
//!
//! - [`driver`] - The generic state machine every operation runs through
//! - [`fetch`], [`index`], [`export`], [`delete`] - The four tasks it runs
//! - [`browser`] - Traits a host implements for its embedded browser
//! - [`state`] - Operation status and the shared [`OperationHandle`]

pub mod browser;
pub mod delete;
pub mod driver;
pub mod export;
pub mod fetch;
pub mod index;
pub mod script;
pub mod state;

pub use browser::{BrowserSession, SessionLauncher};
pub use delete::{DeleteSummary, DeleteTask};
pub use driver::{DriverSettings, OperationDriver, ReadyContext, Task};
pub use export::{ExportSummary, ExportTask, export_metadata};
pub use fetch::{FetchSummary, FetchTask, ListingPage, PageWalk, StopReason};
pub use index::{IndexSummary, IndexTask};
pub use state::{OperationHandle, OperationSnapshot, OperationStatus, ProgressMode};
