use std::{
    fmt::{self, Debug},
    ops::{Deref, DerefMut},
    ptr,
};

/// Owning wrapper of a C pointer, released by `destructor` on drop unless null.
pub(crate) struct CBox<T> {
    ptr: *mut T,
    destructor: fn(*mut T),
}

impl<T> CBox<T> {
    pub(crate) fn new(ptr: *mut T, destructor: fn(*mut T)) -> Self {
        Self { ptr, destructor }
    }
    pub(crate) fn null(destructor: fn(*mut T)) -> Self {
        Self::new(ptr::null_mut(), destructor)
    }
}

impl<T> Drop for CBox<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            (self.destructor)(self.ptr);
        }
    }
}

impl<T> Deref for CBox<T> {
    type Target = *mut T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

impl<T> Debug for CBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CBox({:p})", self.ptr)
    }
}

// SQLite is built serialized: its handles can move across threads.
unsafe impl<T> Send for CBox<T> {}
unsafe impl<T> Sync for CBox<T> {}

#[cfg(test)]
mod tests {
    use crate::cbox::CBox;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn cbox_raw_pointer() {
        {
            let ptr = CBox::<i32>::null(|_| {
                DESTROYED.fetch_add(1, Ordering::Relaxed);
            });
            assert!(ptr.is_null());
        }
        assert_eq!(DESTROYED.load(Ordering::Relaxed), 0);
        let value = Box::into_raw(Box::new(123));
        {
            let ptr = CBox::new(value, |p| {
                drop(unsafe { Box::from_raw(p) });
                DESTROYED.fetch_add(1, Ordering::Relaxed);
            });
            assert_eq!(unsafe { **ptr }, 123);
            assert_eq!(DESTROYED.load(Ordering::Relaxed), 0);
        }
        assert_eq!(DESTROYED.load(Ordering::Relaxed), 1);
    }
}
