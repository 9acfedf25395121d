//! Cross-target bound compatability traits and a shared state cell.
//!
//! On `wasm32-unknown-unknown` the browser runs everything on one thread, so
//! the traits represent no bound at all. On other targets they represent
//! `Send` or `Send + Sync`, which lets the same async traits be implemented
//! by `reqwest` transports on both.

#[allow(missing_docs)]
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<S> ConditionalSend for S where S: Send {}

#[allow(missing_docs)]
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<S> ConditionalSync for S where S: Send + Sync {}

#[allow(missing_docs)]
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSend {}

#[cfg(target_arch = "wasm32")]
impl<S> ConditionalSend for S {}

#[allow(missing_docs)]
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSync {}

#[cfg(target_arch = "wasm32")]
impl<S> ConditionalSync for S {}

/// Interior mutability cell for state that must be readable synchronously
/// from anywhere in the application.
///
/// - Native: [`parking_lot::RwLock`], so readers never observe a write that
///   is only partially applied
/// - WASM: [`std::cell::RefCell`], since the browser event loop is single
///   threaded
///
/// Guards must not be held across an `.await`.
///
/// ```
/// use tollgate_common::StateCell;
///
/// let cell = StateCell::new(String::from("before"));
/// cell.write().push_str(" and after");
///
/// assert_eq!(cell.read().as_str(), "before and after");
/// ```
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct StateCell<T>(parking_lot::RwLock<T>);

#[cfg(not(target_arch = "wasm32"))]
impl<T> StateCell<T> {
    /// Wraps `value` in a new cell
    pub fn new(value: T) -> Self {
        Self(parking_lot::RwLock::new(value))
    }

    /// Acquires shared access to the value
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Acquires exclusive access to the value
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, T> {
        self.0.write()
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct StateCell<T>(std::cell::RefCell<T>);

#[cfg(target_arch = "wasm32")]
impl<T> StateCell<T> {
    /// Wraps `value` in a new cell
    pub fn new(value: T) -> Self {
        Self(std::cell::RefCell::new(value))
    }

    /// Borrows the value immutably
    ///
    /// # Panics
    /// Panics if the value is currently mutably borrowed
    pub fn read(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    /// Borrows the value mutably
    ///
    /// # Panics
    /// Panics if the value is currently borrowed
    pub fn write(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }
}
