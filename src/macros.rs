#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let mut diagnostics = lock!(self.diagnostics);
///  diagnostics.push(diagnostic);
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}
