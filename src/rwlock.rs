//! Reader-writer lock.
//!
//! Many readers or one writer. Backed by `parking_lot::RwLock`, whose
//! eventual-fairness policy keeps a steady stream of readers from starving a
//! waiting writer. Read and write guards release on drop.
//!
//! ```
//! use threadkit::RwLock;
//!
//! let lock = RwLock::new(vec![1, 2]);
//! {
//!     let a = lock.read();
//!     let b = lock.read();
//!     assert_eq!(a.len() + b.len(), 4);
//! }
//! lock.write().push(3);
//! assert_eq!(lock.read().len(), 3);
//! ```

pub use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard,
    RwLockUpgradableReadGuard, RwLockWriteGuard,
};
