//! Lifecycle hooks invoked by [`LruPool`](crate::LruPool)

/// Callbacks a pool invokes around the life of each pooled object.
///
/// Every method defaults to a no-op, so an implementation only overrides
/// the events it cares about. The hooks run synchronously on the calling
/// thread, before the pool returns.
///
/// # Examples
///
/// ```
/// use lru_objectpool::{LruAction, LruPool, LruPoolManager};
///
/// /// Shrink scratch buffers before they sit idle in the pool
/// struct ClearOnPush;
///
/// impl LruAction<Vec<u8>> for ClearOnPush {
///     fn push(&self, buf: &mut Vec<u8>) {
///         buf.clear();
///     }
/// }
///
/// let mut pool = LruPool::with_action(ClearOnPush);
/// pool.init(LruPoolManager::create());
///
/// pool.push("scratch", vec![1, 2, 3]).unwrap();
/// assert!(pool.pull(&"scratch").unwrap().is_empty());
/// ```
pub trait LruAction<T> {
    /// The object has just been handed to the pool
    fn push(&self, _obj: &mut T) {}

    /// The object is leaving the pool for the caller
    fn pull(&self, _obj: &mut T) {}

    /// The object is about to be reused, runs right after `pull`
    fn reset(&self, _obj: &mut T) {}

    /// The object is being discarded by eviction, it is dropped afterwards
    fn gc(&self, _obj: &mut T) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAction;

impl<T> LruAction<T> for DefaultAction {}

impl<T, A: LruAction<T> + ?Sized> LruAction<T> for std::rc::Rc<A> {
    fn push(&self, obj: &mut T) {
        (**self).push(obj);
    }

    fn pull(&self, obj: &mut T) {
        (**self).pull(obj);
    }

    fn reset(&self, obj: &mut T) {
        (**self).reset(obj);
    }

    fn gc(&self, obj: &mut T) {
        (**self).gc(obj);
    }
}
