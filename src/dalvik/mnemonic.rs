//! Mnemonic decoding into a closed opcode set.
//!
//! Each mnemonic is classified exactly once; the translator then matches on
//! [`Opcode`] instead of re-inspecting strings per instruction family.

use std::str::FromStr;

use strum::{Display, EnumString};

/// Invocation kinds and their three-address prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InvokeKind {
    /// `invoke-virtual`
    Virtual,
    /// `invoke-super`
    Super,
    /// `invoke-direct`
    Direct,
    /// `invoke-static`
    Static,
    /// `invoke-interface`
    Interface,
}

impl InvokeKind {
    /// The invoke expression keyword.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            InvokeKind::Virtual => "virtualinvoke",
            InvokeKind::Super | InvokeKind::Direct => "specialinvoke",
            InvokeKind::Static => "staticinvoke",
            InvokeKind::Interface => "interfaceinvoke",
        }
    }

    /// Whether the first register is the receiver.
    #[must_use]
    pub fn has_receiver(self) -> bool {
        self != InvokeKind::Static
    }
}

/// Two-operand arithmetic, bitwise and comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    /// `add-*`
    Add,
    /// `sub-*`
    Sub,
    /// `rsub-int*`, operands reversed.
    Rsub,
    /// `mul-*`
    Mul,
    /// `div-*`
    Div,
    /// `rem-*`
    Rem,
    /// `and-*`
    And,
    /// `or-*`
    Or,
    /// `xor-*`
    Xor,
    /// `shl-*`
    Shl,
    /// `shr-*`
    Shr,
    /// `ushr-*`
    Ushr,
    /// `cmp-long`
    Cmp,
    /// `cmpl-float`, `cmpl-double`
    Cmpl,
    /// `cmpg-float`, `cmpg-double`
    Cmpg,
}

impl BinaryOp {
    /// Infix symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub | BinaryOp::Rsub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::Cmp => "cmp",
            BinaryOp::Cmpl => "cmpl",
            BinaryOp::Cmpg => "cmpg",
        }
    }
}

/// Operand layout of a binary instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    /// `op vA, vB, vC`
    ThreeRegister,
    /// `op/2addr vA, vB`
    TwoAddress,
    /// `op/lit8 vA, vB, #+CC`
    Literal,
}

/// Branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Condition {
    /// `if-eq`
    Eq,
    /// `if-ne`
    Ne,
    /// `if-lt`
    Lt,
    /// `if-ge`
    Ge,
    /// `if-gt`
    Gt,
    /// `if-le`
    Le,
}

impl Condition {
    /// Comparison symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Condition::Eq => "==",
            Condition::Ne => "!=",
            Condition::Lt => "<",
            Condition::Ge => ">=",
            Condition::Gt => ">",
            Condition::Le => "<=",
        }
    }
}

/// Primitive conversion targets, `int-to-long` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Primitive {
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOp {
    /// `neg-*`
    Neg,
    /// `not-*`
    Not,
}

/// Decoded instruction family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `nop`
    Nop,
    /// `move`, `move-wide`, `move-object` and their `/from16` forms.
    Move,
    /// `move-result*`
    MoveResult,
    /// `move-exception`
    MoveException,
    /// `return-void`
    ReturnVoid,
    /// `return`, `return-wide`, `return-object`
    Return,
    /// `const*`
    Const,
    /// `throw`
    Throw,
    /// `goto*`
    Goto,
    /// `if-<cond>` and `if-<cond>z`
    If {
        /// Comparison
        condition: Condition,
        /// Compares against zero.
        zero: bool,
    },
    /// `aget*`
    ArrayGet,
    /// `aput*`
    ArrayPut,
    /// `iget*` / `sget*`
    FieldGet {
        /// `sget`
        is_static: bool,
    },
    /// `iput*` / `sput*`
    FieldPut {
        /// `sput`
        is_static: bool,
    },
    /// `invoke-<kind>` and `invoke-<kind>/range`
    Invoke {
        /// Dispatch kind
        kind: InvokeKind,
        /// Register range `{vA .. vB}`
        range: bool,
    },
    /// `check-cast`
    CheckCast,
    /// `instance-of`
    InstanceOf,
    /// `array-length`
    ArrayLength,
    /// `new-instance`
    NewInstance,
    /// `new-array`
    NewArray,
    /// `<from>-to-<to>`
    Convert {
        /// Target type
        to: Primitive,
    },
    /// `neg-*`, `not-*`
    Unary(UnaryOp),
    /// Arithmetic, bitwise and comparison.
    Binary {
        /// Operator
        op: BinaryOp,
        /// Operand layout
        form: OperandForm,
    },
    /// Anything else.
    Unsupported,
}

impl Opcode {
    /// Classifies a mnemonic.
    #[must_use]
    pub fn decode(mnemonic: &str) -> Opcode {
        match mnemonic {
            "nop" => return Opcode::Nop,
            "return-void" => return Opcode::ReturnVoid,
            "return" | "return-wide" | "return-object" => return Opcode::Return,
            "move-exception" => return Opcode::MoveException,
            "throw" => return Opcode::Throw,
            "check-cast" => return Opcode::CheckCast,
            "instance-of" => return Opcode::InstanceOf,
            "array-length" => return Opcode::ArrayLength,
            "new-instance" => return Opcode::NewInstance,
            "new-array" => return Opcode::NewArray,
            _ => {}
        }

        if mnemonic.starts_with("move-result") {
            return Opcode::MoveResult;
        }
        if mnemonic.starts_with("move") {
            return Opcode::Move;
        }
        if mnemonic.starts_with("const") {
            return Opcode::Const;
        }
        if mnemonic.starts_with("goto") {
            return Opcode::Goto;
        }
        if let Some(cond) = mnemonic.strip_prefix("if-") {
            let (cond, zero) = match cond.strip_suffix('z') {
                Some(stripped) => (stripped, true),
                None => (cond, false),
            };
            return Condition::from_str(cond)
                .map(|condition| Opcode::If { condition, zero })
                .unwrap_or(Opcode::Unsupported);
        }
        if mnemonic.starts_with("aget") {
            return Opcode::ArrayGet;
        }
        if mnemonic.starts_with("aput") {
            return Opcode::ArrayPut;
        }
        if mnemonic.starts_with("iget") || mnemonic.starts_with("sget") {
            return Opcode::FieldGet {
                is_static: mnemonic.starts_with('s'),
            };
        }
        if mnemonic.starts_with("iput") || mnemonic.starts_with("sput") {
            return Opcode::FieldPut {
                is_static: mnemonic.starts_with('s'),
            };
        }
        if let Some(kind) = mnemonic.strip_prefix("invoke-") {
            let (kind, range) = match kind.strip_suffix("/range") {
                Some(stripped) => (stripped, true),
                None => (kind, false),
            };
            return InvokeKind::from_str(kind)
                .map(|kind| Opcode::Invoke { kind, range })
                .unwrap_or(Opcode::Unsupported);
        }
        if let Some((_, to)) = mnemonic.split_once("-to-") {
            return Primitive::from_str(to)
                .map(|to| Opcode::Convert { to })
                .unwrap_or(Opcode::Unsupported);
        }

        Self::decode_arithmetic(mnemonic)
    }

    fn decode_arithmetic(mnemonic: &str) -> Opcode {
        let (base, form) = if let Some(base) = mnemonic.strip_suffix("/2addr") {
            (base, OperandForm::TwoAddress)
        } else if let Some(base) = mnemonic
            .strip_suffix("/lit8")
            .or_else(|| mnemonic.strip_suffix("/lit16"))
        {
            (base, OperandForm::Literal)
        } else {
            (mnemonic, OperandForm::ThreeRegister)
        };

        let Some((op, _ty)) = base.split_once('-') else {
            return Opcode::Unsupported;
        };

        if form == OperandForm::ThreeRegister {
            if let Ok(unary) = UnaryOp::from_str(op) {
                return Opcode::Unary(unary);
            }
        }

        match BinaryOp::from_str(op) {
            // rsub-int carries a literal even without a /lit suffix
            Ok(BinaryOp::Rsub) => Opcode::Binary {
                op: BinaryOp::Rsub,
                form: OperandForm::Literal,
            },
            Ok(op) => Opcode::Binary { op, form },
            Err(_) => Opcode::Unsupported,
        }
    }
}
