//! # Teardown Coordinator
//!
//! Every subsystem that caches user-scoped data registers a reset callback
//! once at startup. On logout the session manager calls
//! [`Teardown::teardown_all`], which fans out to every callback without
//! knowing what the subsystems are.
//!
//! ## Lifecycle
//! 1. Build a [`TeardownRegistry`] while wiring the application
//! 2. Freeze it with [`TeardownRegistry::build`] into a [`Teardown`]
//! 3. Hand the `Teardown` to the session context; it is read-only from then on
//!
//! ## Example
//! ```rust
//! use passkey_session::teardown::{TeardownRegistry, UserScoped};
//!
//! let courses: UserScoped<Vec<String>> = UserScoped::new();
//! let xp: UserScoped<u64> = UserScoped::new();
//!
//! let teardown = TeardownRegistry::new()
//!     .with(courses.teardown_target("courses"))
//!     .with(xp.teardown_target("xp"))
//!     .build();
//!
//! xp.set(120);
//! teardown.teardown_all();
//! assert_eq!(xp.get(), 0);
//! ```

use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

type ResetFn = Arc<dyn Fn() + Send + Sync>;

/// Handle to one subsystem's reset procedure.
///
/// The callback must be idempotent: logout may run more than once per
/// process, and a reset of already-empty data must be a no-op.
#[derive(Clone)]
pub struct TeardownTarget {
    /// Label used in logs (e.g. "courses")
    name: String,

    /// Puts the subsystem's cached data back to its logged-out state
    reset: ResetFn,
}

impl TeardownTarget {
    pub fn new(name: impl Into<String>, reset: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            reset: Arc::new(reset),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for TeardownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownTarget")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Collects teardown targets during startup.
///
/// Targets run in registration order. There is no way to remove a target;
/// a subsystem that no longer caches anything simply resets nothing.
#[derive(Debug, Default)]
pub struct TeardownRegistry {
    targets: Vec<TeardownTarget>,
}

impl TeardownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reset callback under `name`.
    pub fn register(&mut self, name: impl Into<String>, reset: impl Fn() + Send + Sync + 'static) {
        self.add(TeardownTarget::new(name, reset));
    }

    /// Register a prebuilt target, e.g. from [`UserScoped::teardown_target`].
    pub fn add(&mut self, target: TeardownTarget) {
        debug!(target = %target.name, "teardown target registered");
        self.targets.push(target);
    }

    /// Builder-style [`TeardownRegistry::add`].
    pub fn with(mut self, target: TeardownTarget) -> Self {
        self.add(target);
        self
    }

    /// Freeze the registry. No targets can be added afterwards.
    pub fn build(self) -> Teardown {
        Teardown {
            targets: self.targets.into(),
        }
    }
}

/// Frozen set of teardown targets, shared by the session context.
///
/// Cloning is cheap; all clones see the same targets.
#[derive(Debug, Clone)]
pub struct Teardown {
    targets: Arc<[TeardownTarget]>,
}

impl Default for Teardown {
    fn default() -> Self {
        TeardownRegistry::new().build()
    }
}

impl Teardown {
    /// Invoke every registered reset, returning how many were invoked.
    ///
    /// Always total: a target that panics is logged and the remaining
    /// targets still run. Safe to call repeatedly.
    pub fn teardown_all(&self) -> usize {
        for target in self.targets.iter() {
            if catch_unwind(AssertUnwindSafe(|| (target.reset)())).is_err() {
                error!(target = %target.name, "teardown target panicked");
            }
        }

        debug!(count = self.targets.len(), "teardown complete");
        self.targets.len()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Target names in the order they run.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(TeardownTarget::name)
    }
}

/// Shared cell for user-scoped cached data.
///
/// Clones share the same value. [`UserScoped::teardown_target`] yields a
/// target that puts the value back to `T::default()`.
#[derive(Debug)]
pub struct UserScoped<T> {
    value: Arc<RwLock<T>>,
}

impl<T> Clone for UserScoped<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Default> Default for UserScoped<T> {
    fn default() -> Self {
        Self {
            value: Arc::new(RwLock::new(T::default())),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> UserScoped<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }

    /// Mutate in place under the write lock. Keep `f` short; it must not
    /// touch this cell again.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.write());
    }

    pub fn reset(&self) {
        *self.value.write() = T::default();
    }

    /// Target that resets this cell (and every clone of it) on logout.
    pub fn teardown_target(&self, name: impl Into<String>) -> TeardownTarget {
        let cell = self.clone();
        TeardownTarget::new(name, move || cell.reset())
    }
}
