//! Dalvik instruction handling.
//!
//! - [`InstructionResolver`] maps a statement (`Lcls;->method(sig)(line)`) to the
//!   instruction text stored in per-class JSON tables.
//! - [`translate`] lowers one instruction to a three-address statement.
//! - [`TypeDescriptor`], [`MethodRef`] and [`FieldRef`] render descriptors in Java
//!   notation.

mod mnemonic;
mod resolver;
mod translate;
mod types;

pub use mnemonic::{BinaryOp, Condition, InvokeKind, Opcode, OperandForm, Primitive, UnaryOp};
pub use resolver::{ClassTable, InstructionRecord, InstructionResolver, StatementRef};
pub use translate::{translate, ThreeAddress};
pub use types::{FieldRef, MethodRef, TypeDescriptor};
