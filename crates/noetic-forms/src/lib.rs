pub mod error;
pub mod handler;
pub mod pending;
pub mod types;

pub use error::{FormError, Result};
pub use handler::{submit, ContinuationOutcome, SubmittedAction};
pub use pending::PendingFormTable;
pub use types::{
    assess_complexity, ComplexityLevel, ContinuationContext, DisplayType, ExternalStepRequest,
    FieldOption, FieldType, FormAction, FormField, RequestContext, RequestKind,
    DISPLAY_DISMISS_ACTION,
};
