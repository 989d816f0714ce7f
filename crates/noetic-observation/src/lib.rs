//! Read-only projections from `ExecutionContract` to observation views (§4.L).
//!
//! Nothing here mutates a Contract or holds state of its own; every function
//! is a pure projection of `noetic_contracts` types, callable from the
//! gateway's status endpoints or from tests without standing up a graph run.

pub mod snapshot;
pub mod timeline;
pub mod topology;
pub mod translator;

pub use snapshot::{consequence_view, consequence_views, snapshot, ExecutionConsequenceView, ExecutionSnapshot};
pub use timeline::{timeline, ExecutionTimeline, TransitionRecord};
pub use topology::{topology, StateMachineTopology, StateNode, StateTransitionEdge};
pub use translator::ExecutionUiTranslator;
