//! Backend registration by name.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::{Options, StoreHandle};

/// How a backend plugs into the registry.
#[derive(Clone, Copy)]
pub struct Registration {
    /// Opens an existing store.
    pub new_fn: fn(path: &str, opts: &Options) -> Result<StoreHandle>,
    /// Creates a new store; `None` for backends with nothing to create.
    pub init_fn: Option<fn(path: &str, opts: &Options) -> Result<()>>,
    /// Whether the backend survives process restarts.
    pub is_persistent: bool,
}

static REGISTRY: Lazy<RwLock<HashMap<String, Registration>>> = Lazy::new(|| {
    let mut backends = HashMap::new();
    backends.insert(
        crate::memstore::STORE_TYPE.to_owned(),
        crate::memstore::registration(),
    );
    RwLock::new(backends)
});

/// Registers a backend under a name. Registering a name twice is an
/// error; pick a new name instead of shadowing.
pub fn register(name: &str, reg: Registration) -> Result<()> {
    let mut registry = REGISTRY.write();
    if registry.contains_key(name) {
        return Err(StoreError::Backend(format!(
            "quad store {name:?} is already registered"
        )));
    }
    debug!(backend = name, persistent = reg.is_persistent, "registered quad store backend");
    registry.insert(name.to_owned(), reg);
    Ok(())
}

/// Opens a store through its registered backend.
pub fn open(name: &str, path: &str, opts: &Options) -> Result<StoreHandle> {
    let reg = lookup(name)?;
    (reg.new_fn)(path, opts)
}

/// Creates a new store. Backends that have nothing to initialize
/// (the in-memory reference backend) reject this.
pub fn init(name: &str, path: &str, opts: &Options) -> Result<()> {
    let reg = lookup(name)?;
    match reg.init_fn {
        Some(init_fn) => (init_fn)(path, opts),
        None => Err(StoreError::Unsupported("backend does not support init")),
    }
}

/// Whether a registered backend persists its data.
pub fn is_persistent(name: &str) -> Result<bool> {
    Ok(lookup(name)?.is_persistent)
}

fn lookup(name: &str) -> Result<Registration> {
    REGISTRY
        .read()
        .get(name)
        .copied()
        .ok_or_else(|| StoreError::NotRegistered(name.to_owned()))
}
