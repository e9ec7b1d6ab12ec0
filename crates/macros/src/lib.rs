//! rapidflect Proc Macros
//!
//! This crate provides `#[derive(Reflect)]`, which generates the type
//! metadata the accessor engine compiles against.
//!
//! # Value Type Example
//!
//! ```ignore
//! use rapidflect_core::Reflect;
//!
//! #[derive(Debug, Clone, PartialEq, Default, Reflect)]
//! #[reflect(name = "Point")]
//! pub struct Point {
//!     #[reflect(name = "X")]
//!     x: i32,
//!
//!     #[reflect(name = "Y")]
//!     y: i32,
//! }
//! ```
//!
//! # Class Example
//!
//! ```ignore
//! #[derive(Reflect)]
//! #[reflect(class, extend = "describe_employee")]
//! pub struct Employee {
//!     #[reflect(base)]
//!     person: Person,
//!
//!     #[reflect(name = "Salary")]
//!     salary: i64,
//!
//!     #[reflect(skip)]
//!     audit: Vec<String>,
//! }
//!
//! fn describe_employee(builder: TypeBuilder<Employee>) -> TypeBuilder<Employee> {
//!     builder.method(MethodInfo::instance(/* ... */))
//! }
//! ```
//!
//! # Attributes
//!
//! ## Type Attributes
//!
//! - `#[reflect(name = "Name")]` - Registered type name (default: the Rust identifier).
//! - `#[reflect(class)]` - Register a struct as a reference type. Without it the
//!   struct is a value type and must implement `Clone + PartialEq + Debug + Default`.
//! - `#[reflect(extend = "path")]` - Function applied to the generated builder,
//!   used to add properties, methods and constructors.
//! - `#[reflect(implements = "Path")]` - Interface the type implements (repeatable).
//! - `#[reflect(attr = "Name")]` - Marker attribute on the type (repeatable).
//!
//! ## Field Attributes
//!
//! - `#[reflect(name = "Name")]` - Registered member name.
//! - `#[reflect(readonly)]` - No setter.
//! - `#[reflect(private)]` - Registered as non-public.
//! - `#[reflect(skip)]` - Not registered.
//! - `#[reflect(base)]` - The embedded base class (classes only).
//! - `#[reflect(attr = "Name")]` - Marker attribute on the field (repeatable).
//!
//! ## Variant Attributes
//!
//! - `#[reflect(name = "Name")]` - Registered member name.
//! - `#[reflect(attr = "Name")]` - Marker attribute on the enum member (repeatable).

mod parse;
mod reflect;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for reflectable types
///
/// # Generated Code
///
/// - `impl Reflect` describing every non-skipped field (or enum member)
/// - `impl IntoValue` and `From<T> for Value`
/// - `impl FromValue` for value types and enums
///
/// Field types must themselves implement `Reflect`, `IntoValue`, `FromValue`
/// and `Clone`.
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect::derive_reflect(input).into()
}
