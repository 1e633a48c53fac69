//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. Within-transaction operations are associated functions
//! generic over the connection so they run equally on a pooled
//! connection or an open transaction.

pub mod approval;
pub mod audit;
pub mod binding;
pub mod event_history;
pub mod queue;
pub mod user;
pub mod workflow;

pub use approval::ApprovalRepository;
pub use audit::AuditRepository;
pub use binding::WorkflowBinding;
pub use event_history::EventHistoryRepository;
pub use queue::{QueueDisposition, QueueRepository};
pub use user::{SYSTEM_WORKFLOW_USER_ID, UserRepository};
pub use workflow::WorkflowRepository;
