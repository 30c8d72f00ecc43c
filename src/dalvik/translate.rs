//! Lowering of single Dalvik instructions to three-address statements.
//!
//! The output notation is Jimple-like:
//!
//! ```text
//! invoke-virtual {v1, v2}, Ljava/io/PrintStream;->println(Ljava/lang/String;)V
//!     => virtualinvoke v1.<java.io.PrintStream: void println(java.lang.String)>(v2)
//! add-int/2addr v0, v1
//!     => v0 = v0 + v1
//! ```
//!
//! A mnemonic outside the closed [`Opcode`] set, or an instruction whose operands
//! do not match its family, lowers to [`ThreeAddress::Unsupported`]. Lowering
//! never fails.

use std::fmt;

use crate::dalvik::{
    mnemonic::{BinaryOp, OperandForm, Opcode, UnaryOp},
    types::{FieldRef, MethodRef, TypeDescriptor},
};

/// Result of lowering one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreeAddress {
    /// A rendered statement.
    Statement(String),
    /// Carries the mnemonic that could not be lowered.
    Unsupported(String),
}

impl ThreeAddress {
    /// Returns `true` for [`ThreeAddress::Unsupported`].
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ThreeAddress::Unsupported(_))
    }

    /// Returns the statement text, `None` if unsupported.
    #[must_use]
    pub fn statement(&self) -> Option<&str> {
        match self {
            ThreeAddress::Statement(text) => Some(text),
            ThreeAddress::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for ThreeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreeAddress::Statement(text) => f.write_str(text),
            ThreeAddress::Unsupported(mnemonic) => write!(f, "unsupported {mnemonic}"),
        }
    }
}

/// Lowers one instruction.
///
/// Accepts the spliced `move-result vX=<invoke ...>` form produced by the
/// instruction resolver and renders it as `vX = <invoke expression>`.
#[must_use]
pub fn translate(text: &str) -> ThreeAddress {
    let text = text.trim();

    if text.starts_with("move-result") {
        if let Some((result, call)) = text.split_once('=') {
            let Some(dest) = result.split_whitespace().nth(1) else {
                return unsupported(result);
            };
            return match translate(call) {
                ThreeAddress::Statement(expr) => ThreeAddress::Statement(format!("{dest} = {expr}")),
                other => other,
            };
        }
    }

    let (mnemonic, operands) = match text.split_once(char::is_whitespace) {
        Some((mnemonic, operands)) => (mnemonic, operands.trim()),
        None => (text, ""),
    };

    lower(mnemonic, Opcode::decode(mnemonic), operands).unwrap_or_else(|| unsupported(mnemonic))
}

fn unsupported(mnemonic: &str) -> ThreeAddress {
    ThreeAddress::Unsupported(
        mnemonic
            .split_whitespace()
            .next()
            .unwrap_or(mnemonic)
            .to_string(),
    )
}

fn lower(mnemonic: &str, opcode: Opcode, operands: &str) -> Option<ThreeAddress> {
    let statement = match opcode {
        Opcode::Nop => "nop".to_string(),
        Opcode::ReturnVoid => "return".to_string(),
        Opcode::Return => format!("return {}", single(operands)?),
        Opcode::Throw => format!("throw {}", single(operands)?),
        Opcode::MoveException => format!("{} = @caughtexception", single(operands)?),
        Opcode::Move => {
            let [dest, src] = fixed(operands)?;
            format!("{dest} = {src}")
        }
        Opcode::Const => {
            let [dest, value] = fixed(operands)?;
            format!("{dest} = {value}")
        }
        Opcode::Goto => format!("goto {}", single(operands)?),
        Opcode::If { condition, zero } => {
            if zero {
                let [a, target] = fixed(operands)?;
                format!("if {a} {} 0 goto {target}", condition.symbol())
            } else {
                let [a, b, target] = fixed(operands)?;
                format!("if {a} {} {b} goto {target}", condition.symbol())
            }
        }
        Opcode::ArrayGet => {
            let [dest, array, index] = fixed(operands)?;
            format!("{dest} = {array}[{index}]")
        }
        Opcode::ArrayPut => {
            let [src, array, index] = fixed(operands)?;
            format!("{array}[{index}] = {src}")
        }
        Opcode::FieldGet { is_static: true } => {
            let [dest, field] = fixed(operands)?;
            format!("{dest} = {}", FieldRef::parse(field).ok()?)
        }
        Opcode::FieldGet { is_static: false } => {
            let [dest, object, field] = fixed(operands)?;
            format!("{dest} = {object}.{}", FieldRef::parse(field).ok()?)
        }
        Opcode::FieldPut { is_static: true } => {
            let [src, field] = fixed(operands)?;
            format!("{} = {src}", FieldRef::parse(field).ok()?)
        }
        Opcode::FieldPut { is_static: false } => {
            let [src, object, field] = fixed(operands)?;
            format!("{object}.{} = {src}", FieldRef::parse(field).ok()?)
        }
        Opcode::Invoke { kind, range } => {
            let (registers, reference) = register_list(operands, range)?;
            let method = MethodRef::parse(reference).ok()?;
            if kind.has_receiver() {
                let (receiver, args) = registers.split_first()?;
                format!("{} {receiver}.{method}({})", kind.keyword(), args.join(", "))
            } else {
                format!("{} {method}({})", kind.keyword(), registers.join(", "))
            }
        }
        Opcode::CheckCast => {
            let [register, ty] = fixed(operands)?;
            let ty = TypeDescriptor::parse(ty).ok()?;
            format!("{register} = ({ty}) {register}")
        }
        Opcode::InstanceOf => {
            let [dest, src, ty] = fixed(operands)?;
            let ty = TypeDescriptor::parse(ty).ok()?;
            format!("{dest} = {src} instanceof {ty}")
        }
        Opcode::ArrayLength => {
            let [dest, array] = fixed(operands)?;
            format!("{dest} = lengthof {array}")
        }
        Opcode::NewInstance => {
            let [dest, ty] = fixed(operands)?;
            let ty = TypeDescriptor::parse(ty).ok()?;
            format!("{dest} = new {ty}")
        }
        Opcode::NewArray => {
            let [dest, size, ty] = fixed(operands)?;
            let ty = TypeDescriptor::parse(ty).ok()?;
            let element = ty.element()?;
            format!("{dest} = newarray ({element})[{size}]")
        }
        Opcode::Convert { to } => {
            let [dest, src] = fixed(operands)?;
            format!("{dest} = ({to}) {src}")
        }
        Opcode::Unary(UnaryOp::Neg) => {
            let [dest, src] = fixed(operands)?;
            format!("{dest} = neg {src}")
        }
        Opcode::Unary(UnaryOp::Not) => {
            let [dest, src] = fixed(operands)?;
            format!("{dest} = {src} ^ -1")
        }
        Opcode::Binary { op, form } => match form {
            OperandForm::TwoAddress => {
                let [dest, src] = fixed(operands)?;
                format!("{dest} = {dest} {} {src}", op.symbol())
            }
            OperandForm::ThreeRegister | OperandForm::Literal => {
                let [dest, a, b] = fixed(operands)?;
                let b = b.trim_start_matches('#');
                if op == BinaryOp::Rsub {
                    format!("{dest} = {b} - {a}")
                } else {
                    format!("{dest} = {a} {} {b}", op.symbol())
                }
            }
        },
        Opcode::MoveResult | Opcode::Unsupported => {
            log::trace!("No lowering for {}", mnemonic);
            return None;
        }
    };

    Some(ThreeAddress::Statement(statement))
}

/// Splits exactly `N` comma separated operands; the last one keeps any commas.
fn fixed<const N: usize>(operands: &str) -> Option<[&str; N]> {
    let mut parts = operands.splitn(N, ',').map(str::trim);
    let mut out = [""; N];
    for slot in &mut out {
        let part = parts.next()?;
        if part.is_empty() {
            return None;
        }
        *slot = part;
    }
    Some(out)
}

fn single(operands: &str) -> Option<&str> {
    fixed::<1>(operands).map(|[operand]| operand)
}

/// Parses `{v0, v1}, <ref>` or `{v0 .. v3}, <ref>`.
fn register_list(operands: &str, range: bool) -> Option<(Vec<String>, &str)> {
    let inner = operands.strip_prefix('{')?;
    let (list, rest) = inner.split_once('}')?;
    let reference = rest.trim_start().strip_prefix(',')?.trim();

    let registers = if range {
        expand_range(list)?
    } else {
        list.split(',')
            .map(str::trim)
            .filter(|register| !register.is_empty())
            .map(ToString::to_string)
            .collect()
    };

    Some((registers, reference))
}

fn expand_range(list: &str) -> Option<Vec<String>> {
    let list = list.trim();
    if list.is_empty() {
        return Some(Vec::new());
    }
    let Some((first, last)) = list.split_once("..") else {
        // a one-register range is printed without '..'
        return Some(vec![list.to_string()]);
    };

    let (prefix, start) = split_register(first.trim())?;
    let (last_prefix, end) = split_register(last.trim())?;
    if prefix != last_prefix || end < start {
        return None;
    }

    Some((start..=end).map(|n| format!("{prefix}{n}")).collect())
}

fn split_register(register: &str) -> Option<(char, u32)> {
    let mut chars = register.chars();
    let prefix = chars.next()?;
    let number = chars.as_str().parse().ok()?;
    Some((prefix, number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(text: &str) -> String {
        match translate(text) {
            ThreeAddress::Statement(s) => s,
            ThreeAddress::Unsupported(m) => panic!("unsupported {m} for {text}"),
        }
    }

    #[test]
    fn invoke_forms() {
        assert_eq!(
            stmt("invoke-virtual {v1, v2}, Ljava/io/PrintStream;->println(Ljava/lang/String;)V"),
            "virtualinvoke v1.<java.io.PrintStream: void println(java.lang.String)>(v2)"
        );
        assert_eq!(
            stmt("invoke-static {v0}, Landroid/util/Log;->d(Ljava/lang/String;)I"),
            "staticinvoke <android.util.Log: int d(java.lang.String)>(v0)"
        );
        assert_eq!(
            stmt("invoke-direct {p0}, Ljava/lang/Object;-><init>()V"),
            "specialinvoke p0.<java.lang.Object: void <init>()>()"
        );
        assert_eq!(
            stmt("invoke-interface {v3, v4, v5}, Ljava/util/Map;->put(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;"),
            "interfaceinvoke v3.<java.util.Map: java.lang.Object put(java.lang.Object,java.lang.Object)>(v4, v5)"
        );
    }

    #[test]
    fn invoke_range_expands_registers() {
        assert_eq!(
            stmt("invoke-static/range {v0 .. v2}, Lcom/a/B;->f(IJ)V"),
            "staticinvoke <com.a.B: void f(int,long)>(v0, v1, v2)"
        );
        assert_eq!(
            stmt("invoke-virtual/range {p1 .. p2}, Lcom/a/B;->g(I)V"),
            "virtualinvoke p1.<com.a.B: void g(int)>(p2)"
        );
        assert!(translate("invoke-static/range {v3 .. v1}, Lcom/a/B;->f()V").is_unsupported());
    }

    #[test]
    fn spliced_move_result() {
        assert_eq!(
            stmt("move-result-object v0=invoke-virtual {v1}, Landroid/telephony/TelephonyManager;->getDeviceId()Ljava/lang/String;"),
            "v0 = virtualinvoke v1.<android.telephony.TelephonyManager: java.lang.String getDeviceId()>()"
        );
        assert_eq!(
            translate("move-result v0"),
            ThreeAddress::Unsupported("move-result".to_string())
        );
    }

    #[test]
    fn fields_and_arrays() {
        assert_eq!(
            stmt("iget-object v0, p0, Lcom/app/Main;->secret:Ljava/lang/String;"),
            "v0 = p0.<com.app.Main: java.lang.String secret>"
        );
        assert_eq!(
            stmt("sput v1, Lcom/app/Main;->count:I"),
            "<com.app.Main: int count> = v1"
        );
        assert_eq!(
            stmt("iput-object v2, p0, Lcom/app/Main;->secret:Ljava/lang/String;"),
            "p0.<com.app.Main: java.lang.String secret> = v2"
        );
        assert_eq!(
            stmt("sget-object v0, Ljava/lang/System;->out:Ljava/io/PrintStream;"),
            "v0 = <java.lang.System: java.io.PrintStream out>"
        );
        assert_eq!(stmt("aget-object v0, v1, v2"), "v0 = v1[v2]");
        assert_eq!(stmt("aput v0, v1, v2"), "v1[v2] = v0");
    }

    #[test]
    fn moves_consts_and_returns() {
        assert_eq!(stmt("move-object/from16 v0, v17"), "v0 = v17");
        assert_eq!(stmt("const/4 v0, 0x1"), "v0 = 0x1");
        assert_eq!(stmt("const-string v0, \"a, b\""), "v0 = \"a, b\"");
        assert_eq!(stmt("return-void"), "return");
        assert_eq!(stmt("return-object v0"), "return v0");
        assert_eq!(stmt("throw v3"), "throw v3");
        assert_eq!(stmt("move-exception v1"), "v1 = @caughtexception");
        assert_eq!(stmt("nop"), "nop");
    }

    #[test]
    fn control_flow() {
        assert_eq!(stmt("if-eqz v0, :cond_0"), "if v0 == 0 goto :cond_0");
        assert_eq!(stmt("if-lt v0, v1, :cond_1"), "if v0 < v1 goto :cond_1");
        assert_eq!(stmt("goto :goto_0"), "goto :goto_0");
    }

    #[test]
    fn type_operations() {
        assert_eq!(stmt("check-cast v0, Ljava/lang/String;"), "v0 = (java.lang.String) v0");
        assert_eq!(
            stmt("instance-of v0, v1, Ljava/lang/String;"),
            "v0 = v1 instanceof java.lang.String"
        );
        assert_eq!(stmt("array-length v0, v1"), "v0 = lengthof v1");
        assert_eq!(stmt("new-instance v0, Ljava/lang/StringBuilder;"), "v0 = new java.lang.StringBuilder");
        assert_eq!(stmt("new-array v0, v1, [B"), "v0 = newarray (byte)[v1]");
        assert_eq!(stmt("int-to-long v0, v1"), "v0 = (long) v1");
    }

    #[test]
    fn arithmetic() {
        assert_eq!(stmt("add-int v0, v1, v2"), "v0 = v1 + v2");
        assert_eq!(stmt("xor-int/2addr v0, v1"), "v0 = v0 ^ v1");
        assert_eq!(stmt("shl-int/lit8 v0, v1, 0x2"), "v0 = v1 << 0x2");
        assert_eq!(stmt("ushr-long v0, v2, v4"), "v0 = v2 >>> v4");
        assert_eq!(stmt("rsub-int v0, v1, 0x10"), "v0 = 0x10 - v1");
        assert_eq!(stmt("cmp-long v0, v1, v3"), "v0 = v1 cmp v3");
        assert_eq!(stmt("neg-int v0, v1"), "v0 = neg v1");
        assert_eq!(stmt("not-int v0, v1"), "v0 = v1 ^ -1");
    }

    #[test]
    fn unsupported_instructions() {
        assert_eq!(
            translate("monitor-enter v0"),
            ThreeAddress::Unsupported("monitor-enter".to_string())
        );
        assert_eq!(translate("packed-switch v0, :pswitch_data_0").to_string(), "unsupported packed-switch");
        // malformed operands of a known family
        assert!(translate("iget-object v0, p0").is_unsupported());
        assert!(translate("check-cast v0, Q").is_unsupported());
        assert!(translate("").is_unsupported());
    }
}
