//! # Interrupt-masking mutex

use core::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use crate::Interrupts;

/// A mutual exclusion primitive protecting data shared with interrupt context.
///
/// Locking masks interrupts through `I` and the returned guard restores the previous mask level
/// when dropped. On a single core this excludes every other execution context, so the lock never
/// spins and never blocks.
///
/// The lock is **not** reentrant: locking it again while a guard for the same mutex is alive
/// in the same context hands out a second mutable reference and is undefined behaviour. Code
/// reached from inside the critical section must be given the guarded data instead.
pub struct IrqMutex<I: Interrupts, T: ?Sized> {
    _irq: PhantomData<fn() -> I>,
    data: UnsafeCell<T>,
}

// SAFETY: Access to `data` only happens through a guard, and a guard only exists while
// interrupts are masked on the single core.
unsafe impl<I: Interrupts, T: ?Sized + Send> Send for IrqMutex<I, T> {}
unsafe impl<I: Interrupts, T: ?Sized + Send> Sync for IrqMutex<I, T> {}

impl<I: Interrupts, T> IrqMutex<I, T> {
    /// Creates a new mutex.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            _irq: PhantomData,
            data: UnsafeCell::new(data),
        }
    }

    /// Consumes this mutex, returning the underlying data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<I: Interrupts, T: ?Sized> IrqMutex<I, T> {
    /// Masks interrupts and returns a guard giving exclusive access to the data.
    #[inline]
    pub fn lock(&self) -> IrqMutexGuard<'_, I, T> {
        let level = I::disable();
        IrqMutexGuard { mutex: self, level }
    }

    /// Runs `f` on the protected data inside a critical section.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Returns a mutable reference to the underlying data.
    ///
    /// Since this call borrows the `IrqMutex` mutably, no masking needs to take place.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<I: Interrupts, T: Default> Default for IrqMutex<I, T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<I: Interrupts, T: ?Sized> fmt::Debug for IrqMutex<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrqMutex").finish_non_exhaustive()
    }
}

/// RAII guard of an [`IrqMutex`]. Restores the interrupt mask level on drop.
#[must_use = "if unused the IrqMutex will immediately unlock"]
pub struct IrqMutexGuard<'a, I: Interrupts, T: ?Sized> {
    mutex: &'a IrqMutex<I, T>,
    level: I::Level,
}

impl<I: Interrupts, T: ?Sized> Deref for IrqMutexGuard<'_, I, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Interrupts are masked for the lifetime of the guard.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<I: Interrupts, T: ?Sized> DerefMut for IrqMutexGuard<'_, I, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Interrupts are masked for the lifetime of the guard.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<I: Interrupts, T: ?Sized> Drop for IrqMutexGuard<'_, I, T> {
    #[inline]
    fn drop(&mut self) {
        I::restore(self.level);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    thread_local! {
        static ENABLED: Cell<bool> = const { Cell::new(true) };
        static LOG: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    struct FakeIrq;

    impl Interrupts for FakeIrq {
        type Level = bool;

        fn disable() -> bool {
            LOG.with(|l| l.borrow_mut().push("disable"));
            ENABLED.with(|e| e.replace(false))
        }

        fn restore(level: bool) {
            LOG.with(|l| l.borrow_mut().push("restore"));
            ENABLED.with(|e| e.set(level));
        }
    }

    fn enabled() -> bool {
        ENABLED.with(Cell::get)
    }

    #[test]
    fn guard_masks_until_dropped() {
        let mutex = IrqMutex::<FakeIrq, u32>::new(1);

        {
            let mut guard = mutex.lock();
            assert!(!enabled());
            *guard += 1;
        }

        assert!(enabled());
        assert_eq!(mutex.with(|v| *v), 2);
    }

    #[test]
    fn nested_sections_restore_outer_level() {
        let outer = IrqMutex::<FakeIrq, ()>::new(());
        let inner = IrqMutex::<FakeIrq, ()>::new(());

        let g1 = outer.lock();
        {
            let _g2 = inner.lock();
            assert!(!enabled());
        }
        // Dropping the inner guard must not unmask while the outer one lives.
        assert!(!enabled());
        drop(g1);
        assert!(enabled());
    }
}
