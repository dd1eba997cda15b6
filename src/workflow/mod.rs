pub mod engine;
pub mod kind;
pub mod resource;
pub mod status;

pub use engine::{ApprovalEngine, BulkOutcome, SubmitPayload, TransitionOutcome, WorkflowError};
pub use kind::{KindDescriptor, ResourceKind};
pub use resource::ApprovableResource;
pub use status::{RejectionReason, ResourceStatus, WorkflowAction};
