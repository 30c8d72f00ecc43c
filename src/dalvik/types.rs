//! Dalvik type, method and field descriptors.
//!
//! Descriptors are decoded into a typed form once and rendered in Java source
//! notation (`[Ljava/lang/String;` → `java.lang.String[]`), which is what the
//! three-address output and the method column of path files use.

use std::fmt;

use crate::Result;

/// A decoded field or value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// `V`
    Void,
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `S`
    Short,
    /// `C`
    Char,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `Lpkg/Name;`, stored in dotted form.
    Object(String),
    /// `[<element>`
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Parses exactly one descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty, unknown or trailing-garbage descriptor.
    pub fn parse(text: &str) -> Result<TypeDescriptor> {
        let (descriptor, rest) = Self::parse_prefix(text.trim())?;
        if !rest.is_empty() {
            return Err(malformed_error!("Trailing data after type descriptor - {}", text));
        }
        Ok(descriptor)
    }

    /// Parses a concatenated parameter list such as `ILjava/lang/String;[J`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if any element does not decode.
    pub fn parse_list(mut text: &str) -> Result<Vec<TypeDescriptor>> {
        let mut list = Vec::new();
        while !text.is_empty() {
            let (descriptor, rest) = Self::parse_prefix(text)?;
            list.push(descriptor);
            text = rest;
        }
        Ok(list)
    }

    fn parse_prefix(text: &str) -> Result<(TypeDescriptor, &str)> {
        let mut dimensions = 0;
        let mut rest = text;
        while let Some(stripped) = rest.strip_prefix('[') {
            dimensions += 1;
            rest = stripped;
        }

        let Some(tag) = rest.chars().next() else {
            return Err(malformed_error!("Empty type descriptor - {}", text));
        };

        let (mut descriptor, rest) = match tag {
            'V' => (TypeDescriptor::Void, &rest[1..]),
            'Z' => (TypeDescriptor::Boolean, &rest[1..]),
            'B' => (TypeDescriptor::Byte, &rest[1..]),
            'S' => (TypeDescriptor::Short, &rest[1..]),
            'C' => (TypeDescriptor::Char, &rest[1..]),
            'I' => (TypeDescriptor::Int, &rest[1..]),
            'J' => (TypeDescriptor::Long, &rest[1..]),
            'F' => (TypeDescriptor::Float, &rest[1..]),
            'D' => (TypeDescriptor::Double, &rest[1..]),
            'L' => {
                let Some(end) = rest.find(';') else {
                    return Err(malformed_error!("Unterminated class descriptor - {}", text));
                };
                let name = &rest[1..end];
                if name.is_empty() {
                    return Err(malformed_error!("Empty class name - {}", text));
                }
                (TypeDescriptor::Object(name.replace('/', ".")), &rest[end + 1..])
            }
            other => {
                return Err(malformed_error!("Unknown type tag '{}' - {}", other, text));
            }
        };

        for _ in 0..dimensions {
            descriptor = TypeDescriptor::Array(Box::new(descriptor));
        }
        Ok((descriptor, rest))
    }

    /// Element type of an array, `None` for non-arrays.
    #[must_use]
    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Void => f.write_str("void"),
            TypeDescriptor::Boolean => f.write_str("boolean"),
            TypeDescriptor::Byte => f.write_str("byte"),
            TypeDescriptor::Short => f.write_str("short"),
            TypeDescriptor::Char => f.write_str("char"),
            TypeDescriptor::Int => f.write_str("int"),
            TypeDescriptor::Long => f.write_str("long"),
            TypeDescriptor::Float => f.write_str("float"),
            TypeDescriptor::Double => f.write_str("double"),
            TypeDescriptor::Object(name) => f.write_str(name),
            TypeDescriptor::Array(element) => write!(f, "{element}[]"),
        }
    }
}

/// A method reference, `Lpkg/Cls;->name(Params)Ret`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Declaring class.
    pub class: TypeDescriptor,
    /// Method name.
    pub name: String,
    /// Parameter types.
    pub params: Vec<TypeDescriptor>,
    /// Return type.
    pub ret: TypeDescriptor,
}

impl MethodRef {
    /// Parses a full method reference.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the reference is incomplete.
    pub fn parse(text: &str) -> Result<MethodRef> {
        let Some((class, method)) = text.trim().split_once("->") else {
            return Err(malformed_error!("Method reference without '->' - {}", text));
        };
        Self::from_parts(class, method)
    }

    /// Parses a method reference from a class descriptor and a `name(Params)Ret` part.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if either part does not decode.
    pub fn from_parts(class: &str, method: &str) -> Result<MethodRef> {
        let Some((name, signature)) = method.split_once('(') else {
            return Err(malformed_error!("Method without parameter list - {}", method));
        };
        let Some((params, ret)) = signature.split_once(')') else {
            return Err(malformed_error!("Unterminated parameter list - {}", method));
        };

        Ok(MethodRef {
            class: TypeDescriptor::parse(class)?,
            name: name.to_string(),
            params: TypeDescriptor::parse_list(params)?,
            ret: TypeDescriptor::parse(ret)?,
        })
    }

    /// Returns `true` for `java.lang.reflect.Method.invoke`.
    #[must_use]
    pub fn is_reflective_invoke(&self) -> bool {
        self.name == "invoke"
            && self.class == TypeDescriptor::Object("java.lang.reflect.Method".to_string())
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {} {}(", self.class, self.ret, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")>")
    }
}

/// A field reference, `Lpkg/Cls;->name:Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Declaring class.
    pub class: TypeDescriptor,
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeDescriptor,
}

impl FieldRef {
    /// Parses a field reference.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the reference is incomplete.
    pub fn parse(text: &str) -> Result<FieldRef> {
        let Some((class, field)) = text.trim().split_once("->") else {
            return Err(malformed_error!("Field reference without '->' - {}", text));
        };
        let Some((name, ty)) = field.split_once(':') else {
            return Err(malformed_error!("Field reference without type - {}", text));
        };

        Ok(FieldRef {
            class: TypeDescriptor::parse(class)?,
            name: name.to_string(),
            ty: TypeDescriptor::parse(ty)?,
        })
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {} {}>", self.class, self.ty, self.name)
    }
}
