//! Error types for the editing engine.

use mangle_core::EffectError;
use thiserror::Error;

/// Errors surfaced by the timeline and the operation ledger.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Effect id not present in the registry.
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    /// A sample range selected nothing.
    #[error("selection is empty")]
    EmptySelection,

    /// No audio has been loaded yet.
    #[error("no audio loaded")]
    NoAudio,

    /// Clip id not found on the timeline.
    #[error("clip not found: {0}")]
    ClipNotFound(u64),

    /// Operation id not found in the ledger.
    #[error("operation not found: {0}")]
    OpNotFound(u64),

    /// The last clip cannot be deleted.
    #[error("cannot delete the last clip")]
    LastClipProtected,

    /// Structural operations cannot be toggled.
    #[error("structural operations cannot be toggled")]
    NotToggleable,

    /// A move would cross a structural operation.
    #[error("cannot move an operation across a structural boundary")]
    MoveBlocked,

    /// A destructive action was declined by the confirmation gate.
    #[error("action cancelled")]
    ConfirmationDeclined,

    /// A split position fell outside the clip.
    #[error("split position outside clip")]
    SplitOutOfRange,

    /// Nothing on the undo stack.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Nothing on the redo stack.
    #[error("nothing to redo")]
    NothingToRedo,

    /// An effect failed while applying an operation.
    #[error(transparent)]
    Effect(#[from] EffectError),
}

/// Convenience result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
