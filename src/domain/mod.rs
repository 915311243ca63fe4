//! Domain layer: identifiers, clock values, children, observation records
//! and timeline events.

pub mod child;
pub mod clock;
pub mod event;
pub mod ids;
pub mod record;

pub use child::{Child, ChildProfile};
pub use event::{
    Event, EventDraft, EventLog, EventPatch, EventState, FeedingEvent, FeedingState, SleepEvent,
    SleepState,
};
pub use ids::{ChildId, EntryId};
pub use record::{Record, RecordKind, RecordQuery, Stored};
