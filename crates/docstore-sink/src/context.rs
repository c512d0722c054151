//! Diagnostic contexts consulted by include rules.
//!
//! Two scopes are provided:
//!
//! - [`tdc`] — thread diagnostic context, scoped to the calling thread.
//!   Typical use: per-request values set at the top of a handler.
//! - [`gdc`] — global diagnostic context, process-wide. Typical use:
//!   host name, deployment environment, application version.
//!
//! Both store `serde_json::Value`s so looked-up values embed into
//! documents without conversion.

/// Thread-scoped diagnostic context.
pub mod tdc {
    use serde_json::Value;
    use std::cell::RefCell;
    use std::collections::HashMap;

    thread_local! {
        static CONTEXT: RefCell<HashMap<String, Value>> = RefCell::new(HashMap::new());
    }

    /// Sets a value for the calling thread, replacing any previous one.
    pub fn set(name: impl Into<String>, value: impl Into<Value>) {
        CONTEXT.with(|ctx| {
            ctx.borrow_mut().insert(name.into(), value.into());
        });
    }

    /// Returns the value set on the calling thread, if any.
    #[must_use]
    pub fn get(name: &str) -> Option<Value> {
        CONTEXT.with(|ctx| ctx.borrow().get(name).cloned())
    }

    /// Removes one value from the calling thread's context.
    pub fn remove(name: &str) {
        CONTEXT.with(|ctx| {
            ctx.borrow_mut().remove(name);
        });
    }

    /// Clears the calling thread's context.
    pub fn clear() {
        CONTEXT.with(|ctx| ctx.borrow_mut().clear());
    }
}

/// Process-wide diagnostic context.
pub mod gdc {
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{OnceLock, PoisonError, RwLock};

    fn context() -> &'static RwLock<HashMap<String, Value>> {
        static CONTEXT: OnceLock<RwLock<HashMap<String, Value>>> = OnceLock::new();
        CONTEXT.get_or_init(|| RwLock::new(HashMap::new()))
    }

    /// Sets a process-wide value, replacing any previous one.
    pub fn set(name: impl Into<String>, value: impl Into<Value>) {
        context()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    /// Returns the process-wide value, if any.
    #[must_use]
    pub fn get(name: &str) -> Option<Value> {
        context()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Removes one process-wide value.
    pub fn remove(name: &str) {
        context()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Clears the process-wide context.
    pub fn clear() {
        context()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
