use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use fluxion_error::FluxionError;

/// Type-erased hook for a value that could not be delivered downstream
///. Mirrors the `Consumer<Object>` shape
/// of the design this is ported from: the hook doesn't know the element
/// type, operators box the value before handing it over.
pub type DropHook = Arc<dyn Fn(Box<dyn Any + Send>) + Send + Sync>;

/// Type-erased hook for an error that could not be delivered downstream
///.
pub type ErrorDropHook = Arc<dyn Fn(&FluxionError) + Send + Sync>;

#[derive(Clone)]
enum ValueNode {
    Empty,
    Entry {
        key: Cow<'static, str>,
        value: Arc<dyn Any + Send + Sync>,
        parent: Arc<ValueNode>,
    },
}

/// An immutable, cheaply-cloneable map propagated **upstream** during
/// subscription (sink to source) and read-only from the source side.
///
/// Besides arbitrary user values, a `Context` carries the three hooks that
/// serve as the debug surface for signals that cannot reach a subscriber
/// through the normal protocol: [`Context::on_discard`],
/// [`Context::on_error_dropped`] and [`Context::on_next_dropped`]. Each
/// lookup is context-first, falling back to the process-wide table in
/// [`crate::hooks`] per the design's recommended resolution order.
#[derive(Clone, Default)]
pub struct Context {
    on_discard: Option<DropHook>,
    on_next_dropped: Option<DropHook>,
    on_error_dropped: Option<ErrorDropHook>,
    values: Arc<ValueNode>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("has_discard_hook", &self.on_discard.is_some())
            .field("has_next_dropped_hook", &self.on_next_dropped.is_some())
            .field("has_error_dropped_hook", &self.on_error_dropped.is_some())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// An empty context with no hooks and no user values.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            on_discard: None,
            on_next_dropped: None,
            on_error_dropped: None,
            values: Arc::new(ValueNode::Empty),
        }
    }

    /// Return a new `Context` with `key` bound to `value`, shadowing any
    /// prior binding for the same key. `self` is left untouched: contexts
    /// are immutable, so `put` always returns a derived copy.
    #[must_use]
    pub fn put<V: Any + Send + Sync>(&self, key: impl Into<Cow<'static, str>>, value: V) -> Self {
        let mut next = self.clone();
        next.values = Arc::new(ValueNode::Entry {
            key: key.into(),
            value: Arc::new(value),
            parent: Arc::clone(&self.values),
        });
        next
    }

    /// Look up a previously [`Context::put`] value by key, downcasting to
    /// `V`. Returns `None` if the key is absent or bound to a different type.
    #[must_use]
    pub fn get<V: Any + Send + Sync>(&self, key: &str) -> Option<Arc<V>> {
        let mut node = &*self.values;
        loop {
            match node {
                ValueNode::Empty => return None,
                ValueNode::Entry {
                    key: k,
                    value,
                    parent,
                } => {
                    if k == key {
                        return Arc::clone(value).downcast::<V>().ok();
                    }
                    node = parent;
                }
            }
        }
    }

    /// Install the discard hook (used for values an operator must drop
    /// rather than deliver, e.g. on cancellation).
    #[must_use]
    pub fn with_on_discard(mut self, hook: DropHook) -> Self {
        self.on_discard = Some(hook);
        self
    }

    /// Install the dropped-`onNext` hook (used for values produced after
    /// termination or on a cancelled subscription).
    #[must_use]
    pub fn with_on_next_dropped(mut self, hook: DropHook) -> Self {
        self.on_next_dropped = Some(hook);
        self
    }

    /// Install the dropped-error hook.
    #[must_use]
    pub fn with_on_error_dropped(mut self, hook: ErrorDropHook) -> Self {
        self.on_error_dropped = Some(hook);
        self
    }

    pub(crate) fn discard_hook(&self) -> Option<&DropHook> {
        self.on_discard.as_ref()
    }

    pub(crate) fn next_dropped_hook(&self) -> Option<&DropHook> {
        self.on_next_dropped.as_ref()
    }

    pub(crate) fn error_dropped_hook(&self) -> Option<&ErrorDropHook> {
        self.on_error_dropped.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let ctx = Context::empty().put("answer", 42i32);
        assert_eq!(*ctx.get::<i32>("answer").unwrap(), 42);
    }

    #[test]
    fn get_missing_key_is_none() {
        let ctx = Context::empty();
        assert!(ctx.get::<i32>("missing").is_none());
    }

    #[test]
    fn put_does_not_mutate_the_original() {
        let base = Context::empty();
        let derived = base.clone().put("x", 1i32);
        assert!(base.get::<i32>("x").is_none());
        assert_eq!(*derived.get::<i32>("x").unwrap(), 1);
    }

    #[test]
    fn later_put_shadows_earlier_one() {
        let ctx = Context::empty().put("x", 1i32).put("x", 2i32);
        assert_eq!(*ctx.get::<i32>("x").unwrap(), 2);
    }
}
