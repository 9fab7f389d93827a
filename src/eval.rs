use std::mem;

use log::{debug, error};

use crate::error::{LispError, LispResult};
use crate::globals::{self, Environment};
use crate::heap::{Heap, DEFAULT_CAPACITY, DEFAULT_GC_THRESHOLD};
use crate::printer;
use crate::stack::OperandStack;
use crate::value::{NativeFn, ObjId, Object};

/// Recovered errors kept for `take_diagnostics`. Older ones are dropped.
pub const MAX_DIAGNOSTICS: usize = 64;

/// Tunables for a `Machine`.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Number of arena slots.
    pub capacity: usize,
    /// Live-object count that triggers the first collection.
    pub initial_threshold: usize,
    /// Evaluate the bound expression at `define` time instead of binding it
    /// unevaluated.
    pub eager_define: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            capacity: DEFAULT_CAPACITY,
            initial_threshold: DEFAULT_GC_THRESHOLD,
            eager_define: false,
        }
    }
}

/// The evaluation machine.
/// All interpreter state lives here so GC can find roots.
pub struct Machine {
    pub heap: Heap,
    /// Global bindings. Every value is a GC root.
    pub env: Environment,
    /// Operand stack. Every entry is a GC root.
    pub stack: OperandStack,
    pub eager_define: bool,

    /// Most recent recoverable errors since the last `take_diagnostics`,
    /// at most `MAX_DIAGNOSTICS`.
    diagnostics: Vec<LispError>,
    collections: usize,
}

impl Machine {
    pub fn new() -> LispResult<Self> {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> LispResult<Self> {
        let mut m = Machine {
            heap: Heap::new(config.capacity, config.initial_threshold),
            env: Environment::new(),
            stack: OperandStack::new(),
            eager_define: config.eager_define,
            diagnostics: Vec::new(),
            collections: 0,
        };
        globals::install_builtins(&mut m)?;
        Ok(m)
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Run a collection first if the arena is at its threshold or full.
    fn reserve(&mut self) -> LispResult<()> {
        if self.heap.should_gc() {
            self.collect()?;
        }
        Ok(())
    }

    /// Register a new object in the arena. Any handle the object holds must
    /// already be reachable from a root, since a collection may run first.
    pub fn alloc(&mut self, object: Object) -> LispResult<ObjId> {
        self.reserve()?;
        self.heap.place(object)
    }

    pub fn nil(&mut self) -> LispResult<ObjId> {
        self.alloc(Object::Nil)
    }

    pub fn void(&mut self) -> LispResult<ObjId> {
        self.alloc(Object::Void)
    }

    pub fn integer(&mut self, n: i64) -> LispResult<ObjId> {
        self.alloc(Object::Integer(n))
    }

    pub fn boolean(&mut self, b: bool) -> LispResult<ObjId> {
        self.alloc(Object::Bool(b))
    }

    pub fn symbol(&mut self, name: &str) -> LispResult<ObjId> {
        self.alloc(Object::Symbol(name.to_string()))
    }

    /// Build a pair from the top two stack entries: pops the cdr, then the
    /// car. Both stay rooted until the pair itself is placed.
    pub fn cons_from_stack(&mut self) -> LispResult<ObjId> {
        self.reserve()?;
        let cdr = self.stack.pop()?;
        let car = self.stack.pop()?;
        self.heap.place(Object::Cons { car, cdr })
    }

    /// Build a nil-terminated list of `items`.
    pub fn list(&mut self, items: &[ObjId]) -> LispResult<ObjId> {
        for &item in items {
            self.stack.push(item);
        }
        let mut tail = self.nil()?;
        for &item in items.iter().rev() {
            self.stack.push(item);
            self.stack.push(tail);
            tail = self.cons_from_stack()?;
        }
        self.stack.pop_n_discard(items.len())?;
        Ok(tail)
    }

    /// Allocate a builtin and bind it under its own name.
    pub fn define_function(&mut self, name: &str, op: NativeFn) -> LispResult<ObjId> {
        let id = self.alloc(Object::Function {
            name: name.to_string(),
            op,
        })?;
        self.env.define(name, id);
        Ok(id)
    }

    /// Allocate a special form and bind it under its own name.
    pub fn define_syntax(&mut self, name: &str, op: NativeFn) -> LispResult<ObjId> {
        let id = self.alloc(Object::Syntax {
            name: name.to_string(),
            op,
        })?;
        self.env.define(name, id);
        Ok(id)
    }

    /// Empty a slot, dropping any global binding whose value is this object.
    pub fn free(&mut self, id: ObjId) -> LispResult<()> {
        if !self.heap.is_occupied(id) {
            return Err(LispError::DoubleFree(id));
        }
        self.env.purge_value(id);
        self.heap.release(id)?;
        Ok(())
    }

    pub fn object(&self, id: ObjId) -> LispResult<&Object> {
        self.heap
            .get(id)
            .ok_or_else(|| LispError::Internal(format!("dangling handle {:?}", id)))
    }

    // ========================================================================
    // GC
    // ========================================================================

    /// Mark everything reachable from the environment and the operand stack,
    /// then free the rest. Returns the number of objects freed.
    pub fn collect(&mut self) -> LispResult<usize> {
        let before = self.heap.live_count();
        self.heap.clear_marks();
        let mut worklist = Vec::new();

        for id in self.env.values() {
            self.heap.mark_value(id, &mut worklist);
        }
        for id in self.stack.iter() {
            self.heap.mark_value(id, &mut worklist);
        }
        self.heap.process_worklist(&mut worklist);

        let garbage = self.heap.unmarked();
        for &id in &garbage {
            self.free(id)?;
        }
        self.heap.clear_marks();
        self.heap.adjust_gc_threshold();
        self.collections += 1;

        debug!(
            "gc #{}: {} live, {} freed, {} remaining of {}, next at {}",
            self.collections,
            before,
            garbage.len(),
            self.heap.live_count(),
            self.heap.capacity(),
            self.heap.gc_threshold()
        );
        Ok(garbage.len())
    }

    pub fn collections(&self) -> usize {
        self.collections
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Fatal errors pass through. Anything else is reported and replaced
    /// with a fresh Void.
    pub fn recover(&mut self, err: LispError) -> LispResult<ObjId> {
        if err.is_fatal() {
            return Err(err);
        }
        error!("{}", err);
        if self.diagnostics.len() == MAX_DIAGNOSTICS {
            self.diagnostics.remove(0);
        }
        self.diagnostics.push(err);
        self.void()
    }

    pub fn take_diagnostics(&mut self) -> Vec<LispError> {
        mem::take(&mut self.diagnostics)
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Evaluate an expression handed over by the reader. The expression is
    /// kept on the operand stack while it runs so collections see it.
    pub fn evaluate_top_level(&mut self, expr: ObjId) -> LispResult<ObjId> {
        self.stack.push(expr);
        let depth = self.stack.len();
        let result = self.evaluate(expr)?;
        if self.stack.len() != depth {
            return Err(LispError::Internal(format!(
                "operand stack unbalanced: {} entries, expected {}",
                self.stack.len(),
                depth
            )));
        }
        self.stack.pop()?;
        Ok(result)
    }

    /// Reduce an object to a value.
    pub fn evaluate(&mut self, id: ObjId) -> LispResult<ObjId> {
        match self.object(id)? {
            Object::Symbol(name) => {
                let name = name.clone();
                match self.env.get(&name) {
                    Some(value) => Ok(value),
                    None => self.recover(LispError::UnboundVariable(name)),
                }
            }
            Object::Cons { car, cdr } => {
                let (car, cdr) = (*car, *cdr);
                self.evaluate_pair(id, car, cdr)
            }
            _ => Ok(id),
        }
    }

    /// Apply a pair whose head evaluates to a callable; otherwise the pair
    /// quotes itself.
    fn evaluate_pair(&mut self, pair: ObjId, car: ObjId, cdr: ObjId) -> LispResult<ObjId> {
        let head = self.evaluate(car)?;
        let eager = match self.object(head)?.native() {
            Some((_, _, eager)) => eager,
            None => return Ok(pair),
        };

        // the callee sits under its arguments until the call returns
        self.stack.push(head);
        let mut argc = 0;
        let mut rest = cdr;
        loop {
            let (arg, next) = match self.object(rest)? {
                o if o.is_list_end() => break,
                Object::Cons { car, cdr } => (*car, *cdr),
                _ => {
                    self.stack.pop_n_discard(argc + 1)?;
                    return self.recover(LispError::MalformedList);
                }
            };
            let arg = if eager { self.evaluate(arg)? } else { arg };
            self.stack.push(arg);
            argc += 1;
            rest = next;
        }

        let result = self.apply(head, argc)?;
        self.stack.pop()?;
        Ok(result)
    }

    /// Invoke a callable with `argc` pending stack entries.
    pub fn apply(&mut self, callee: ObjId, argc: usize) -> LispResult<ObjId> {
        let native = self.object(callee)?.native().map(|(_, op, _)| op);
        match native {
            Some(op) => match op(self, argc) {
                Ok(value) => Ok(value),
                Err(err) => self.recover(err),
            },
            None => {
                let err = self.object(callee)?.unsupported("apply");
                self.stack.pop_n_discard(argc)?;
                self.recover(err)
            }
        }
    }

    pub fn render(&self, id: ObjId) -> String {
        printer::render(id, &self.heap)
    }
}
