//! Framework methods with built-in semantics.

use crate::analysis::cfg::{known, ControlFlowGraph, SemanticModel, SymbolId};

/// Classification of an invoked method.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum KnownMethod {
    /// `Monitor.Enter(obj)` and `Monitor.TryEnter(obj)`
    MonitorEnter,
    /// `Monitor.Exit(obj)`
    MonitorExit,
    /// `Monitor.IsEntered(obj)`
    MonitorIsEntered,
    /// Acquires the lock the receiver represents
    LockAcquire,
    /// Releases the lock the receiver represents
    LockRelease,
    /// `Debug.Assert(condition, ...)`
    DebugAssert,
    /// `string.IsNullOrEmpty(s)` and `string.IsNullOrWhiteSpace(s)`
    StringIsNullOrEmpty,
    /// Anything else
    Other,
}

const RWLOCK_ACQUIRE: &[&str] = &["AcquireReaderLock", "AcquireWriterLock", "UpgradeToWriterLock"];
const RWLOCK_RELEASE: &[&str] = &["ReleaseLock", "ReleaseReaderLock", "ReleaseWriterLock"];
const SLIM_ACQUIRE: &[&str] = &[
    "EnterReadLock",
    "EnterWriteLock",
    "EnterUpgradeableReadLock",
    "TryEnterReadLock",
    "TryEnterWriteLock",
    "TryEnterUpgradeableReadLock",
];
const SLIM_RELEASE: &[&str] = &["ExitReadLock", "ExitWriteLock", "ExitUpgradeableReadLock"];

/// Reader-writer-lock properties whose getters never throw.
const RWLOCK_HELD_PROPERTIES: &[&str] = &[
    "IsReaderLockHeld",
    "IsWriterLockHeld",
    "IsReadLockHeld",
    "IsWriteLockHeld",
    "IsUpgradeableReadLockHeld",
];

impl KnownMethod {
    /// Classifies `method` by its name and containing type.
    #[must_use]
    pub fn classify(graph: &ControlFlowGraph, semantic: &dyn SemanticModel, method: SymbolId) -> Self {
        let symbol = graph.symbol(method);
        let Some(owner) = symbol.containing_type.and_then(|ty| semantic.type_name(ty)) else {
            return KnownMethod::Other;
        };
        let name = symbol.name.as_str();
        match (owner, name) {
            (known::MONITOR, "Enter" | "TryEnter") => KnownMethod::MonitorEnter,
            (known::MONITOR, "Exit") => KnownMethod::MonitorExit,
            (known::MONITOR, "IsEntered") => KnownMethod::MonitorIsEntered,
            (known::MUTEX, "WaitOne") => KnownMethod::LockAcquire,
            (known::MUTEX, "ReleaseMutex") => KnownMethod::LockRelease,
            (known::SPIN_LOCK, "Enter" | "TryEnter") => KnownMethod::LockAcquire,
            (known::SPIN_LOCK, "Exit") => KnownMethod::LockRelease,
            (known::READER_WRITER_LOCK, name) if RWLOCK_ACQUIRE.contains(&name) => KnownMethod::LockAcquire,
            (known::READER_WRITER_LOCK, name) if RWLOCK_RELEASE.contains(&name) => KnownMethod::LockRelease,
            (known::READER_WRITER_LOCK_SLIM, name) if SLIM_ACQUIRE.contains(&name) => KnownMethod::LockAcquire,
            (known::READER_WRITER_LOCK_SLIM, name) if SLIM_RELEASE.contains(&name) => KnownMethod::LockRelease,
            (known::DEBUG, "Assert") => KnownMethod::DebugAssert,
            (known::STRING, "IsNullOrEmpty" | "IsNullOrWhiteSpace") => KnownMethod::StringIsNullOrEmpty,
            _ => KnownMethod::Other,
        }
    }

    /// Returns `true` for methods known not to throw.
    #[must_use]
    pub const fn never_throws(self) -> bool {
        matches!(
            self,
            KnownMethod::MonitorExit
                | KnownMethod::MonitorIsEntered
                | KnownMethod::LockRelease
                | KnownMethod::DebugAssert
        )
    }

    /// Returns `true` for methods that change lock state.
    #[must_use]
    pub const fn is_lock_method(self) -> bool {
        matches!(
            self,
            KnownMethod::MonitorEnter
                | KnownMethod::MonitorExit
                | KnownMethod::LockAcquire
                | KnownMethod::LockRelease
        )
    }
}

/// Returns `true` if `property` is one of the reader-writer-lock `Is*LockHeld` properties.
pub(crate) fn is_lock_held_property(
    graph: &ControlFlowGraph,
    semantic: &dyn SemanticModel,
    property: SymbolId,
) -> bool {
    let symbol = graph.symbol(property);
    symbol.containing_type.is_some_and(|ty| {
        (semantic.is_type(ty, known::READER_WRITER_LOCK)
            || semantic.is_type(ty, known::READER_WRITER_LOCK_SLIM))
            && RWLOCK_HELD_PROPERTIES.contains(&symbol.name.as_str())
    })
}
