//! Locking primitives: the reentrant window lock and the surface/device lock
//! layered on top of it

pub mod recursive_lock;
pub mod surface;

pub use recursive_lock::{LockState, RecursiveLock, RecursiveLockGuard};
pub use surface::{SurfaceLock, SurfaceLockStatus};
