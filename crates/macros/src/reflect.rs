//! Reflect derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::parse::{parse_reflect, ReflectArgs, ReflectFieldArgs, ReflectVariantArgs};

/// Generate the Reflect implementation
pub fn derive_reflect(input: DeriveInput) -> TokenStream {
    match parse_reflect(&input) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: ReflectArgs) -> TokenStream {
    if !args.generics.params.is_empty() {
        return syn::Error::new_spanned(&args.generics, "Reflect cannot be derived for generic types")
            .to_compile_error();
    }

    let type_name = args.type_name();
    let ident = &args.ident;
    let finish = match &args.extend {
        Some(path) => quote! { #path(builder) },
        None => quote! { builder },
    };
    let interfaces = &args.implements;
    let type_attrs = &args.attr_names;
    let header = quote! {
        #(.implements::<#interfaces>())*
        #(.attribute(::rapidflect_core::meta::Attribute::marker(#type_attrs)))*
    };

    match &args.data {
        darling::ast::Data::Struct(fields) => {
            generate_struct(ident, &type_name, args.class, &fields.fields, &header, &finish)
        }
        darling::ast::Data::Enum(variants) => {
            if args.class {
                return syn::Error::new_spanned(ident, "enums cannot be registered as classes")
                    .to_compile_error();
            }
            generate_enum(ident, &type_name, variants, &header, &finish)
        }
    }
}

fn generate_struct(
    ident: &syn::Ident,
    type_name: &str,
    class: bool,
    fields: &[ReflectFieldArgs],
    header: &TokenStream,
    finish: &TokenStream,
) -> TokenStream {
    let mut base = quote! {};
    let mut members = Vec::new();

    for field in fields.iter().filter(|f| !f.skip) {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let field_ty = &field.ty;

        if field.base {
            if !class {
                return syn::Error::new_spanned(field_ident, "only classes can declare a base")
                    .to_compile_error();
            }
            base = quote! {
                .base::<#field_ty>(|this| &this.#field_ident, |this| &mut this.#field_ident)
            };
            continue;
        }

        members.push(generate_field(field, field_ident));
    }

    let constructor = if class {
        quote! { ::rapidflect_core::meta::TypeBuilder::<Self>::class(#type_name) }
    } else {
        quote! { ::rapidflect_core::meta::TypeBuilder::<Self>::value_type(#type_name) }
    };

    let conversions = if class {
        quote! {
            impl ::rapidflect_core::meta::IntoValue for #ident {
                fn into_value(self) -> ::rapidflect_core::meta::Value {
                    ::rapidflect_core::meta::Value::new_object(self)
                }
            }
        }
    } else {
        quote! {
            impl ::rapidflect_core::meta::IntoValue for #ident {
                fn into_value(self) -> ::rapidflect_core::meta::Value {
                    ::rapidflect_core::meta::Value::new_struct(self)
                }
            }

            impl ::rapidflect_core::meta::FromValue for #ident {
                fn from_value(
                    value: &::rapidflect_core::meta::Value,
                ) -> ::rapidflect_core::meta::InvokeResult<Self> {
                    match value {
                        ::rapidflect_core::meta::Value::Struct(boxed) => boxed
                            .downcast_ref::<Self>()
                            .cloned()
                            .ok_or_else(|| ::rapidflect_core::meta::InvokeError::InvalidCast {
                                expected: #type_name.to_string(),
                                found: value.describe(),
                            }),
                        ::rapidflect_core::meta::Value::Cell(cell) => Self::from_value(&cell.get()),
                        other => Err(::rapidflect_core::meta::InvokeError::InvalidCast {
                            expected: #type_name.to_string(),
                            found: other.describe(),
                        }),
                    }
                }
            }
        }
    };

    quote! {
        impl ::rapidflect_core::meta::Reflect for #ident {
            fn describe() -> ::rapidflect_core::meta::TypeBuilder<Self> {
                let builder = #constructor
                    #base
                    #header
                    #(#members)*;
                #finish
            }
        }

        #conversions

        impl ::core::convert::From<#ident> for ::rapidflect_core::meta::Value {
            fn from(value: #ident) -> Self {
                ::rapidflect_core::meta::IntoValue::into_value(value)
            }
        }
    }
}

fn generate_field(field: &ReflectFieldArgs, field_ident: &syn::Ident) -> TokenStream {
    let member_name = field.member_name();
    let field_ty = &field.ty;

    let getter = quote! {
        |this: &Self| ::rapidflect_core::meta::IntoValue::into_value(
            ::core::clone::Clone::clone(&this.#field_ident)
        )
    };

    let info = if field.readonly {
        quote! {
            ::rapidflect_core::meta::FieldInfo::readonly(
                #member_name,
                ::rapidflect_core::meta::TypeHandle::of::<#field_ty>(),
                #getter,
            )
        }
    } else {
        quote! {
            ::rapidflect_core::meta::FieldInfo::instance(
                #member_name,
                ::rapidflect_core::meta::TypeHandle::of::<#field_ty>(),
                #getter,
                |this: &mut Self, value: ::rapidflect_core::meta::Value| {
                    this.#field_ident = ::rapidflect_core::meta::FromValue::from_value(&value)?;
                    Ok(())
                },
            )
        }
    };

    let visibility = if field.private {
        quote! { .non_public() }
    } else {
        quote! {}
    };

    let attrs = &field.attr_names;

    quote! {
        .field(#info #visibility
            #(.with_attribute(::rapidflect_core::meta::Attribute::marker(#attrs)))*)
    }
}

fn generate_enum(
    ident: &syn::Ident,
    type_name: &str,
    variants: &[ReflectVariantArgs],
    header: &TokenStream,
    finish: &TokenStream,
) -> TokenStream {
    let registrations = variants.iter().map(|variant| {
        let variant_ident = &variant.ident;
        let member_name = variant.member_name();
        let attrs = &variant.attr_names;
        quote! {
            .variant(#member_name, Self::#variant_ident as i64)
            #(.member_attribute(
                #member_name,
                ::rapidflect_core::meta::Attribute::marker(#attrs),
            ))*
        }
    });

    let matches = variants.iter().map(|variant| {
        let variant_ident = &variant.ident;
        quote! {
            if raw == Self::#variant_ident as i64 {
                return Ok(Self::#variant_ident);
            }
        }
    });

    quote! {
        impl ::rapidflect_core::meta::Reflect for #ident {
            fn describe() -> ::rapidflect_core::meta::TypeBuilder<Self> {
                let builder = ::rapidflect_core::meta::TypeBuilder::<Self>::enumeration(#type_name)
                    #header
                    #(#registrations)*;
                #finish
            }
        }

        impl ::rapidflect_core::meta::IntoValue for #ident {
            fn into_value(self) -> ::rapidflect_core::meta::Value {
                ::rapidflect_core::meta::Value::Enum(::rapidflect_core::meta::EnumValue::new(
                    ::rapidflect_core::meta::TypeHandle::of::<Self>(),
                    self as i64,
                ))
            }
        }

        impl ::rapidflect_core::meta::FromValue for #ident {
            fn from_value(
                value: &::rapidflect_core::meta::Value,
            ) -> ::rapidflect_core::meta::InvokeResult<Self> {
                let raw = match value {
                    ::rapidflect_core::meta::Value::Enum(e)
                        if e.ty == ::rapidflect_core::meta::TypeHandle::of::<Self>() => e.value,
                    ::rapidflect_core::meta::Value::Cell(cell) => {
                        return Self::from_value(&cell.get());
                    }
                    other => {
                        return Err(::rapidflect_core::meta::InvokeError::InvalidCast {
                            expected: #type_name.to_string(),
                            found: other.describe(),
                        });
                    }
                };
                #(#matches)*
                Err(::rapidflect_core::meta::InvokeError::InvalidArgument(format!(
                    "{} is not a member of {}",
                    raw, #type_name
                )))
            }
        }

        impl ::core::convert::From<#ident> for ::rapidflect_core::meta::Value {
            fn from(value: #ident) -> Self {
                ::rapidflect_core::meta::IntoValue::into_value(value)
            }
        }
    }
}
