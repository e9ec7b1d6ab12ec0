//! Attribute parsing for the Reflect derive macro

use darling::{FromDeriveInput, FromField, FromVariant};
use syn::{DeriveInput, Generics, Ident, Path, Type};

/// Parsed #[reflect(...)] attributes on the type
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(reflect), supports(struct_named, enum_unit))]
pub struct ReflectArgs {
    /// Type identifier
    pub ident: Ident,

    pub generics: Generics,

    /// Fields or variants
    pub data: darling::ast::Data<ReflectVariantArgs, ReflectFieldArgs>,

    /// Registered type name (defaults to the Rust identifier)
    pub name: Option<String>,

    /// Register the struct as a reference type instead of a value type
    #[darling(default)]
    pub class: bool,

    /// `fn(TypeBuilder<Self>) -> TypeBuilder<Self>` adding methods,
    /// properties and constructors
    pub extend: Option<Path>,

    /// Interfaces the type implements, `implements = "Path"` (repeatable)
    #[darling(multiple)]
    pub implements: Vec<Path>,

    /// Marker attributes on the type, `attr = "Name"` (repeatable)
    #[darling(multiple, rename = "attr")]
    pub attr_names: Vec<String>,
}

impl ReflectArgs {
    pub fn type_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.ident.to_string())
    }
}

/// Parsed #[reflect(...)] attributes on a struct field
#[derive(Debug, FromField)]
#[darling(attributes(reflect))]
pub struct ReflectFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// Registered member name (defaults to the Rust identifier)
    #[darling(rename = "name")]
    pub member_name: Option<String>,

    /// Not visible to reflection
    #[darling(default)]
    pub skip: bool,

    /// No setter
    #[darling(default)]
    pub readonly: bool,

    /// Registered as non-public
    #[darling(default)]
    pub private: bool,

    /// Embedded base class (class types only)
    #[darling(default)]
    pub base: bool,

    /// Marker attributes on the field (repeatable)
    #[darling(multiple, rename = "attr")]
    pub attr_names: Vec<String>,
}

impl ReflectFieldArgs {
    pub fn member_name(&self) -> String {
        match (&self.member_name, &self.ident) {
            (Some(name), _) => name.clone(),
            (None, Some(ident)) => ident.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Parsed #[reflect(...)] attributes on an enum variant
#[derive(Debug, FromVariant)]
#[darling(attributes(reflect))]
pub struct ReflectVariantArgs {
    /// Variant identifier
    pub ident: Ident,

    /// Registered member name (defaults to the Rust identifier)
    #[darling(rename = "name")]
    pub member_name: Option<String>,

    /// Marker attributes on the enum member (repeatable)
    #[darling(multiple, rename = "attr")]
    pub attr_names: Vec<String>,
}

impl ReflectVariantArgs {
    pub fn member_name(&self) -> String {
        self.member_name
            .clone()
            .unwrap_or_else(|| self.ident.to_string())
    }
}

/// Parse a DeriveInput into ReflectArgs
pub fn parse_reflect(input: &DeriveInput) -> darling::Result<ReflectArgs> {
    ReflectArgs::from_derive_input(input)
}
