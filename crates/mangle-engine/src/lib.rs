//! Mangle Engine - timeline, operation ledger, and render pipeline
//!
//! The non-destructive core of the editor. A project is an initial state
//! (clips and their rendered base audio) plus an ordered ledger of
//! operations:
//!
//! - **Processing ops** (effects, automations) are cheap to re-apply and
//!   carry no audio.
//! - **Structural ops** (cuts, splits, fades, clip changes) reshape the
//!   timeline and carry an immutable snapshot of the project taken right
//!   after they ran.
//!
//! Rendering restores the most recent enabled structural snapshot (or the
//! initial state) and replays every enabled processing op after it, so the
//! current audio is always a pure function of the initial audio and the
//! ledger. Undo, redo, toggling, deleting, and reordering all reduce to
//! partial replays.

pub mod automation;
pub mod error;
pub mod ledger;
pub mod session;
pub mod timeline;

pub use automation::{AutoLane, DEFAULT_CHUNK_SIZE, LaneMode, apply_automation_multi};
pub use error::{EngineError, Result};
pub use ledger::{
    ClipState, HistorySnapshot, OpId, OpKind, Operation, StateSnapshot, StructuralAction,
    last_structural_index, last_structural_index_any,
};
pub use session::{EditorSession, Selection};
pub use timeline::{Clip, FadeParams, Timeline, distinct_color};
