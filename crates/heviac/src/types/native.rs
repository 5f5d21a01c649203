//! Native primitives and type descriptors

use crate::ast::Name;

/// Fixed primitive types known without any declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Void,
    Null,
    Int,
    Int8,
    Int32,
    Int64,
    Uint8,
    Uint64,
    Double,
    Float,
    Boolean,
    String,
    Character,
}

impl NativeType {
    pub const ALL: [NativeType; 13] = [
        NativeType::Void,
        NativeType::Null,
        NativeType::Int,
        NativeType::Int8,
        NativeType::Int32,
        NativeType::Int64,
        NativeType::Uint8,
        NativeType::Uint64,
        NativeType::Double,
        NativeType::Float,
        NativeType::Boolean,
        NativeType::String,
        NativeType::Character,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NativeType::Void => "Void",
            NativeType::Null => "Null",
            NativeType::Int => "Int",
            NativeType::Int8 => "Int8",
            NativeType::Int32 => "Int32",
            NativeType::Int64 => "Int64",
            NativeType::Uint8 => "Uint8",
            NativeType::Uint64 => "Uint64",
            NativeType::Double => "Double",
            NativeType::Float => "Float",
            NativeType::Boolean => "Boolean",
            NativeType::String => "String",
            NativeType::Character => "Character",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.as_str() == name)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            NativeType::Int
                | NativeType::Int8
                | NativeType::Int32
                | NativeType::Int64
                | NativeType::Uint8
                | NativeType::Uint64
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, NativeType::Double | NativeType::Float)
    }
}

/// A type named by its (interned) name.
///
/// This stands in for a synthetic literal carrying only a type name; it is
/// never part of the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    pub name: Name,
    pub native: Option<NativeType>,
}

impl TypeDesc {
    pub fn named(name: Name) -> Self {
        Self { name, native: None }
    }

    pub fn is_native(&self) -> bool {
        self.native.is_some()
    }

    pub fn is(&self, native: NativeType) -> bool {
        self.native == Some(native)
    }

    pub fn is_numeric(&self) -> bool {
        self.native.is_some_and(|n| n.is_numeric())
    }

    /// Type identity is name identity; no implicit widening exists
    pub fn same(&self, other: &TypeDesc) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_names_round_trip() {
        for ty in NativeType::ALL {
            assert_eq!(NativeType::from_name(ty.as_str()), Some(ty));
        }
        assert_eq!(NativeType::from_name("Point"), None);
    }

    #[test]
    fn test_numeric_classes() {
        assert!(NativeType::Uint8.is_integer());
        assert!(NativeType::Double.is_numeric());
        assert!(!NativeType::Double.is_integer());
        assert!(!NativeType::String.is_numeric());
    }
}
