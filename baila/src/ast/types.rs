//! Type descriptors as written in annotations (`?<T>Name`)

use std::fmt;

/// A declared or runtime type: class name, nullability and generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BailaType {
    pub name: String,
    pub nullable: bool,
    pub generics: Vec<BailaType>,
}

impl BailaType {
    pub const NUMBER: &'static str = "Number";
    pub const STRING: &'static str = "String";
    pub const BOOLEAN: &'static str = "Boolean";
    pub const FUNCTION: &'static str = "Function";
    pub const LIST: &'static str = "List";
    pub const OBJECT: &'static str = "Object";
    pub const TYPE: &'static str = "Type";

    pub fn named(name: impl Into<String>) -> Self {
        BailaType {
            name: name.into(),
            nullable: false,
            generics: Vec::new(),
        }
    }

    pub fn number() -> Self {
        Self::named(Self::NUMBER)
    }

    pub fn string() -> Self {
        Self::named(Self::STRING)
    }

    pub fn boolean() -> Self {
        Self::named(Self::BOOLEAN)
    }

    pub fn function() -> Self {
        Self::named(Self::FUNCTION)
    }

    pub fn list() -> Self {
        Self::named(Self::LIST)
    }

    pub fn object() -> Self {
        Self::named(Self::OBJECT)
    }

    /// Runtime type of the null reference.
    pub fn null() -> Self {
        Self::object().into_nullable()
    }

    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_generics(mut self, generics: Vec<BailaType>) -> Self {
        self.generics = generics;
        self
    }

    /// Value types that never hold a null reference.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.name.as_str(),
            Self::NUMBER | Self::STRING | Self::BOOLEAN | Self::FUNCTION | Self::LIST
        )
    }
}

/// Canonical form, same syntax as annotations: `?<Number>List`.
impl fmt::Display for BailaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "?")?;
        }
        if !self.generics.is_empty() {
            write!(f, "<")?;
            for (i, generic) in self.generics.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{generic}")?;
            }
            write!(f, ">")?;
        }
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain() {
        assert_eq!(BailaType::number().to_string(), "Number");
    }

    #[test]
    fn test_display_nullable_generic() {
        let ty = BailaType::list()
            .with_generics(vec![BailaType::number(), BailaType::named("Point").into_nullable()])
            .into_nullable();
        assert_eq!(ty.to_string(), "?<Number, ?Point>List");
    }

    #[test]
    fn test_primitive() {
        assert!(BailaType::string().is_primitive());
        assert!(!BailaType::object().is_primitive());
        assert!(!BailaType::named("Point").is_primitive());
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(BailaType::named("A"), BailaType::named("A"));
        assert_ne!(BailaType::named("A"), BailaType::named("A").into_nullable());
    }
}
