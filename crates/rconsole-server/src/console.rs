//! Host-side collaborators: console variables and level enumeration.
//!
//! The remote console does not own either. It talks to them through the
//! [`Console`] and [`LevelSystem`] traits. [`CVarRegistry`] and
//! [`StaticLevels`] are small in-memory implementations used by the host
//! binary and the tests.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Console variable store.
pub trait Console: Send + Sync {
    /// Integer value of `name`, or `None` if it is not registered as an int.
    fn get_int(&self, name: &str) -> Option<i32>;

    /// String value of `name`, or `None` if it is not registered as a string.
    fn get_string(&self, name: &str) -> Option<String>;

    /// Returns `false` if `name` is not a registered int.
    fn set_int(&self, name: &str, value: i32) -> bool;

    /// Returns `false` if `name` is not a registered string.
    fn set_string(&self, name: &str, value: &str) -> bool;

    /// Registering an existing name keeps its current value.
    fn register_int(&self, name: &str, default: i32, help: &str);

    fn register_string(&self, name: &str, default: &str, help: &str);

    fn unregister(&self, name: &str);

    /// All registered variable names.
    fn variable_names(&self) -> Vec<String>;
}

/// Level enumeration.
pub trait LevelSystem: Send + Sync {
    /// Names of every loadable level. May carry a directory prefix.
    fn level_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CVarValue {
    Int(i32),
    Str(String),
}

#[derive(Debug, Clone)]
struct CVar {
    value: CVarValue,
    help: String,
}

/// In-memory, thread-safe console variable registry.
///
/// Names iterate in sorted order.
#[derive(Debug, Default)]
pub struct CVarRegistry {
    vars: RwLock<BTreeMap<String, CVar>>,
}

impl CVarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<CVarValue> {
        self.read().get(name).map(|v| v.value.clone())
    }

    pub fn help(&self, name: &str) -> Option<String> {
        self.read().get(name).map(|v| v.help.clone())
    }

    /// Assign from text the way a console command line would: ints are
    /// parsed, strings taken as-is. Returns the new value.
    pub fn set_from_str(&self, name: &str, text: &str) -> Option<CVarValue> {
        let mut vars = self.write();
        let var = vars.get_mut(name)?;
        match &mut var.value {
            CVarValue::Int(v) => *v = text.trim().parse().ok()?,
            CVarValue::Str(s) => *s = text.to_string(),
        }
        Some(var.value.clone())
    }

    fn register(&self, name: &str, value: CVarValue, help: &str) {
        self.write().entry(name.to_string()).or_insert_with(|| CVar {
            value,
            help: help.to_string(),
        });
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, CVar>> {
        self.vars.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, CVar>> {
        self.vars.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Console for CVarRegistry {
    fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            CVarValue::Int(v) => Some(v),
            CVarValue::Str(_) => None,
        }
    }

    fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            CVarValue::Str(s) => Some(s),
            CVarValue::Int(_) => None,
        }
    }

    fn set_int(&self, name: &str, value: i32) -> bool {
        match self.write().get_mut(name).map(|v| &mut v.value) {
            Some(CVarValue::Int(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    fn set_string(&self, name: &str, value: &str) -> bool {
        match self.write().get_mut(name).map(|v| &mut v.value) {
            Some(CVarValue::Str(s)) => {
                *s = value.to_string();
                true
            }
            _ => false,
        }
    }

    fn register_int(&self, name: &str, default: i32, help: &str) {
        self.register(name, CVarValue::Int(default), help);
    }

    fn register_string(&self, name: &str, default: &str, help: &str) {
        self.register(name, CVarValue::Str(default.to_string()), help);
    }

    fn unregister(&self, name: &str) {
        self.write().remove(name);
    }

    fn variable_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}

/// A fixed list of level names.
#[derive(Debug, Clone, Default)]
pub struct StaticLevels {
    names: Vec<String>,
}

impl StaticLevels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticLevels {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl LevelSystem for StaticLevels {
    fn level_names(&self) -> Vec<String> {
        self.names.clone()
    }
}
