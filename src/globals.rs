use std::collections::HashMap;

use crate::error::LispResult;
use crate::eval::Machine;
use crate::primitives::BUILTINS;
use crate::value::ObjId;

/// The global environment: one flat name -> object mapping shared by the
/// whole machine. A later `define` overwrites an earlier one.
#[derive(Debug, Default)]
pub struct Environment {
    bindings: HashMap<String, ObjId>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<ObjId> {
        self.bindings.get(name).copied()
    }

    /// Set or add a binding. Returns the value it replaced, if any.
    pub fn define(&mut self, name: &str, value: ObjId) -> Option<ObjId> {
        self.bindings.insert(name.to_string(), value)
    }

    /// Drop every binding whose value is `id`. Returns how many were removed.
    pub fn purge_value(&mut self, id: ObjId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|_, value| *value != id);
        before - self.bindings.len()
    }

    pub fn values(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.bindings.values().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Allocate every builtin and bind it under its own name.
pub fn install_builtins(m: &mut Machine) -> LispResult<()> {
    for builtin in BUILTINS {
        if builtin.eager {
            m.define_function(builtin.name, builtin.op)?;
        } else {
            m.define_syntax(builtin.name, builtin.op)?;
        }
    }
    Ok(())
}
