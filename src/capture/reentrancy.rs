// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-thread call depth, so only the outermost of nested intercepted calls
//! touches the capture buffer.
//!
//! A `read_line` that is built from intercepted single-byte reads would
//! otherwise count every byte twice.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

thread_local! {
    static CALL_DEPTH: RefCell<HashMap<OperationKey, usize>> = RefCell::new(HashMap::new());
}

/// Identity of an operation class, e.g. "reads on `CaptureReader<R>`".
///
/// Every intercepted method of one class shares a key, which is what lets
/// a line read see the byte reads it is built from as nested.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationKey(&'static str);

impl OperationKey {
    pub const fn named(name: &'static str) -> Self {
        Self(name)
    }

    /// Key derived from a type, for wrappers that are generic over the
    /// wrapped I/O type.
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>())
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationKey({})", self.0)
    }
}

/// Increment the depth for `key`, returning the depth before the increment.
pub fn enter(key: OperationKey) -> usize {
    CALL_DEPTH
        .try_with(|depths| {
            let mut depths = depths.borrow_mut();
            let depth = depths.entry(key).or_insert(0);
            let before = *depth;
            *depth += 1;
            before
        })
        // Thread-local storage is gone during thread teardown; treat every
        // call there as outermost
        .unwrap_or(0)
}

/// Decrement the depth for `key`, returning the depth after the decrement.
pub fn exit(key: OperationKey) -> usize {
    CALL_DEPTH
        .try_with(|depths| {
            let mut depths = depths.borrow_mut();
            match depths.get_mut(&key) {
                Some(depth) if *depth > 1 => {
                    *depth -= 1;
                    *depth
                }
                Some(_) => {
                    depths.remove(&key);
                    0
                }
                None => 0,
            }
        })
        .unwrap_or(0)
}

/// Forget the depth for `key` on this thread.
pub fn reset(key: OperationKey) {
    let _ = CALL_DEPTH.try_with(|depths| {
        depths.borrow_mut().remove(&key);
    });
}

/// Current depth for `key` on this thread.
pub fn depth(key: OperationKey) -> usize {
    CALL_DEPTH
        .try_with(|depths| depths.borrow().get(&key).copied().unwrap_or(0))
        .unwrap_or(0)
}

/// RAII scope for one intercepted call. Exits on drop, including when the
/// wrapped call returns early with an error.
///
/// Not `Send`: the depth it incremented belongs to the current thread.
#[must_use = "the depth is released when the guard is dropped"]
pub struct CallDepthGuard {
    key: OperationKey,
    depth_before: usize,
    _not_send: PhantomData<*const ()>,
}

impl CallDepthGuard {
    pub fn enter(key: OperationKey) -> Self {
        Self {
            key,
            depth_before: enter(key),
            _not_send: PhantomData,
        }
    }

    /// Whether this is the outermost call, the only one allowed to mutate
    /// capture state.
    pub fn is_outermost(&self) -> bool {
        self.depth_before == 0
    }

    pub fn depth_before(&self) -> usize {
        self.depth_before
    }
}

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        exit(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const READ: OperationKey = OperationKey::named("test::read");

    #[test]
    fn test_enter_exit_counts() {
        reset(READ);
        assert_eq!(enter(READ), 0);
        assert_eq!(enter(READ), 1);
        assert_eq!(depth(READ), 2);
        assert_eq!(exit(READ), 1);
        assert_eq!(exit(READ), 0);
        assert_eq!(exit(READ), 0, "exit never underflows");
    }

    #[test]
    fn test_reset() {
        enter(READ);
        enter(READ);
        reset(READ);
        assert_eq!(depth(READ), 0);
    }

    #[test]
    fn test_guard_nesting() {
        let outer = CallDepthGuard::enter(READ);
        assert!(outer.is_outermost());
        {
            let inner = CallDepthGuard::enter(READ);
            assert!(!inner.is_outermost());
            assert_eq!(inner.depth_before(), 1);
        }
        assert_eq!(depth(READ), 1);
        drop(outer);
        assert_eq!(depth(READ), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let write = OperationKey::named("test::write");
        let _read = CallDepthGuard::enter(READ);
        let write_guard = CallDepthGuard::enter(write);
        assert!(write_guard.is_outermost());
    }

    #[test]
    fn test_depth_is_per_thread() {
        let _outer = CallDepthGuard::enter(READ);
        let outermost_elsewhere = thread::spawn(|| CallDepthGuard::enter(READ).is_outermost())
            .join()
            .unwrap();
        assert!(outermost_elsewhere);
    }

    #[test]
    fn test_type_keys() {
        struct A;
        struct B;
        assert_eq!(OperationKey::of::<A>(), OperationKey::of::<A>());
        assert_ne!(OperationKey::of::<A>(), OperationKey::of::<B>());
    }
}
