//! Process-wide driver registry.
//!
//! Rust has no import-time side effects, so drivers are registered through an
//! explicit call (the runtime crate exposes a one-shot
//! `register_default_drivers`). Registration happens at program
//! initialization, before any `open` in steady state; lookups are safe from
//! any thread.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::error::ConfigError;
use crate::socket::Driver;

static DRIVERS: LazyLock<RwLock<HashMap<String, Arc<dyn Driver>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a driver under the given name.
///
/// # Panics
///
/// Panics if the name is already taken: registering the same driver twice is
/// a programmer error.
pub fn register(name: &str, driver: Arc<dyn Driver>) {
    let mut db = DRIVERS.write().unwrap_or_else(PoisonError::into_inner);
    if db.contains_key(name) {
        panic!("mqpipe: driver with name {name:?} already registered");
    }
    db.insert(name.to_owned(), driver);
}

/// Look up a previously registered driver.
///
/// Repeated lookups of the same name return the same driver handle.
pub fn open(name: &str) -> Result<Arc<dyn Driver>, ConfigError> {
    let db = DRIVERS.read().unwrap_or_else(PoisonError::into_inner);
    db.get(name)
        .cloned()
        .ok_or_else(|| ConfigError::NoSuchDriver(name.to_owned()))
}
