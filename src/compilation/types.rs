use std::fmt;

use serde::Serialize;

use crate::syntax::ast::PredefinedType;

/// The type of an expression, member or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeRef {
    Void,
    Object,
    String,
    Int,
    Long,
    Double,
    Bool,
    Char,
    /// Type of the `null` literal.
    Null,
    /// A host type by full name, e.g. `System.IO.StringWriter`.
    Host(&'static str),
    /// A class declared in source, including `Script`.
    User(String),
    Array(Box<TypeRef>),
    /// Placeholder after a reported error; converts to and from anything.
    Error,
}

impl TypeRef {
    pub fn from_predefined(p: PredefinedType) -> TypeRef {
        match p {
            PredefinedType::Object => TypeRef::Object,
            PredefinedType::String => TypeRef::String,
            PredefinedType::Int => TypeRef::Int,
            PredefinedType::Long => TypeRef::Long,
            PredefinedType::Double => TypeRef::Double,
            PredefinedType::Bool => TypeRef::Bool,
            PredefinedType::Char => TypeRef::Char,
            PredefinedType::Void => TypeRef::Void,
        }
    }

    /// Host type by full name; the core primitives map to their keyword form.
    pub fn from_host_name(full_name: &'static str) -> TypeRef {
        match full_name {
            "System.Object" => TypeRef::Object,
            "System.String" => TypeRef::String,
            "System.Int32" => TypeRef::Int,
            "System.Int64" => TypeRef::Long,
            "System.Double" => TypeRef::Double,
            "System.Boolean" => TypeRef::Bool,
            "System.Char" => TypeRef::Char,
            "System.Void" => TypeRef::Void,
            _ => TypeRef::Host(full_name),
        }
    }

    /// Full name of the host type that carries this type's members.
    pub fn host_name(&self) -> Option<&'static str> {
        match self {
            TypeRef::Object => Some("System.Object"),
            TypeRef::String => Some("System.String"),
            TypeRef::Int => Some("System.Int32"),
            TypeRef::Long => Some("System.Int64"),
            TypeRef::Double => Some("System.Double"),
            TypeRef::Bool => Some("System.Boolean"),
            TypeRef::Char => Some("System.Char"),
            TypeRef::Host(name) => Some(name),
            TypeRef::Void | TypeRef::Null | TypeRef::User(_) | TypeRef::Array(_) | TypeRef::Error => None,
        }
    }

    /// Position in the implicit widening chain `char → int → long → double`.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            TypeRef::Char => Some(0),
            TypeRef::Int => Some(1),
            TypeRef::Long => Some(2),
            TypeRef::Double => Some(3),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Whether `null` converts to this type.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            TypeRef::Object | TypeRef::String | TypeRef::Host(_) | TypeRef::User(_) | TypeRef::Array(_)
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TypeRef::Error)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Object => f.write_str("object"),
            TypeRef::String => f.write_str("string"),
            TypeRef::Int => f.write_str("int"),
            TypeRef::Long => f.write_str("long"),
            TypeRef::Double => f.write_str("double"),
            TypeRef::Bool => f.write_str("bool"),
            TypeRef::Char => f.write_str("char"),
            TypeRef::Null => f.write_str("<null>"),
            TypeRef::Host(name) => f.write_str(name),
            TypeRef::User(name) => f.write_str(name),
            TypeRef::Array(inner) => write!(f, "{inner}[]"),
            TypeRef::Error => f.write_str("?"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn primitives_normalize_from_host_names() {
        assert_eq!(TypeRef::from_host_name("System.String"), TypeRef::String);
        assert_eq!(TypeRef::from_host_name("System.Int32"), TypeRef::Int);
        assert_eq!(
            TypeRef::from_host_name("System.IO.StringWriter"),
            TypeRef::Host("System.IO.StringWriter")
        );
        assert_eq!(TypeRef::Int.host_name(), Some("System.Int32"));
    }

    #[test]
    fn display() {
        assert_eq!(TypeRef::Array(Box::new(TypeRef::Int)).to_string(), "int[]");
        assert_eq!(TypeRef::Host("System.Console").to_string(), "System.Console");
        assert_eq!(TypeRef::User("Helper".into()).to_string(), "Helper");
    }

    #[test]
    fn numeric_chain() {
        assert!(TypeRef::Char.numeric_rank() < TypeRef::Int.numeric_rank());
        assert!(TypeRef::Long.numeric_rank() < TypeRef::Double.numeric_rank());
        assert!(!TypeRef::Bool.is_numeric());
    }
}
