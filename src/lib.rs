//! A small Lisp runtime: tagged objects in a fixed-size arena, a
//! mark-and-sweep collector, and an S-expression evaluator with a handful
//! of builtins.

pub mod error;
pub mod eval;
pub mod globals;
pub mod heap;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod stack;
pub mod value;

pub use error::{LispError, LispResult};
pub use eval::{Machine, MachineConfig};
pub use value::{Kind, ObjId, Object};
