//! Named extension points around writes and statement execution.
//!
//! Listeners receive a mutable [`HookContext`]. After a `before` event the
//! caller re-reads the id, field map, SQL and parameters from the context,
//! so a listener may rewrite any of them.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use wlib_sql_core::Params;

use crate::record::Fields;

/// Fired before every statement reaches the driver.
pub const EXECUTE_BEFORE: &str = "wlib.db.execute.before";
/// Fired after every statement completed.
pub const EXECUTE_AFTER: &str = "wlib.db.execute.after";

/// Which side of an operation an event fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the operation.
    Before,
    /// After the operation.
    After,
}

impl Phase {
    /// Event name suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// Builds a table lifecycle event name: `db.<table>.<action>.<phase>`.
#[must_use]
pub fn event_name(table: &str, action: &str, phase: Phase) -> String {
    format!("db.{table}.{action}.{}", phase.as_str())
}

/// Mutable state shared with listeners.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookContext {
    /// Table of a lifecycle event.
    pub table: Option<String>,
    /// Action of a lifecycle event (`add`, `update`, ...).
    pub action: Option<String>,
    /// Primary key involved, 0 when none.
    pub id: i64,
    /// Submitted or filtered fields.
    pub fields: Fields,
    /// Statement text of an execute event.
    pub sql: String,
    /// Parameters of an execute event.
    pub params: Params,
    /// Execution time, set on `after` events.
    pub elapsed: Option<Duration>,
    /// Rows affected or returned, set on `after` events.
    pub affected: Option<u64>,
}

impl HookContext {
    /// Context of a table lifecycle event.
    pub fn lifecycle(table: &str, action: &str, id: i64, fields: Fields) -> Self {
        Self {
            table: Some(table.to_string()),
            action: Some(action.to_string()),
            id,
            fields,
            ..Self::default()
        }
    }
}

/// A hook listener.
pub type Listener = Box<dyn Fn(&mut HookContext)>;

/// Registry of listeners keyed by event name.
#[derive(Default)]
pub struct Hooks {
    listeners: HashMap<String, Vec<Listener>>,
}

impl Hooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event`. Listeners run in registration order.
    pub fn on(&mut self, event: impl Into<String>, listener: impl Fn(&mut HookContext) + 'static) {
        self.listeners
            .entry(event.into())
            .or_default()
            .push(Box::new(listener));
    }

    /// Returns whether `event` has listeners.
    #[must_use]
    pub fn has(&self, event: &str) -> bool {
        self.listeners.get(event).is_some_and(|l| !l.is_empty())
    }

    /// Runs the listeners of `event`.
    pub fn fire(&self, event: &str, ctx: &mut HookContext) {
        if let Some(listeners) = self.listeners.get(event) {
            for listener in listeners {
                listener(ctx);
            }
        }
    }

    /// Removes every listener of `event`.
    pub fn clear(&mut self, event: &str) {
        self.listeners.remove(event);
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self
            .listeners
            .iter()
            .map(|(event, listeners)| (event.as_str(), listeners.len()))
            .collect();
        events.sort_unstable();
        f.debug_struct("Hooks").field("events", &events).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use wlib_sql_core::Value;

    use super::*;

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("post", "add", Phase::Before), "db.post.add.before");
        assert_eq!(event_name("post", "restore", Phase::After), "db.post.restore.after");
    }

    #[test]
    fn test_listeners_mutate_context_in_order() {
        let mut hooks = Hooks::new();
        hooks.on("db.post.add.before", |ctx| {
            ctx.fields.insert("title".into(), Value::text("rewritten"));
        });
        hooks.on("db.post.add.before", |ctx| ctx.id += 1);
        assert!(hooks.has("db.post.add.before"));
        assert!(!hooks.has("db.post.add.after"));

        let mut ctx = HookContext::lifecycle("post", "add", 0, Fields::new());
        hooks.fire("db.post.add.before", &mut ctx);
        assert_eq!(ctx.id, 1);
        assert_eq!(ctx.fields.get("title"), Some(&Value::text("rewritten")));
    }

    #[test]
    fn test_clear() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let mut hooks = Hooks::new();
        hooks.on(EXECUTE_AFTER, move |_| seen.set(seen.get() + 1));
        hooks.fire(EXECUTE_AFTER, &mut HookContext::default());
        hooks.clear(EXECUTE_AFTER);
        hooks.fire(EXECUTE_AFTER, &mut HookContext::default());
        assert_eq!(calls.get(), 1);
        assert_eq!(format!("{hooks:?}"), "Hooks { events: [] }");
    }
}
