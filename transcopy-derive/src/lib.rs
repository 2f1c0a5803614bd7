//! # Transcopy Derive Macros
//!
//! This crate provides `#[derive(Reflect)]` for `transcopy`. It generates the
//! schema registration and the conversions to and from `transcopy::Value`.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derives `transcopy::Reflect` for structs with named fields and unit-only enums.
///
/// Field attributes: `#[transcopy(alias = "...")]`, `#[transcopy(exclude)]`.
/// Struct attributes: `#[transcopy(name = "...")]`,
/// `#[transcopy(exclusions("a", "b"))]`, `#[transcopy(constructor_exclude("a"))]`.
/// Enum variant attribute: `#[transcopy(rename = "...")]`.
///
/// The registered name defaults to `module_path!()` joined with the type
/// identifier. Same-named types in one module, such as types local to two
/// test functions, therefore share a name; give one of them an explicit
/// `#[transcopy(name = "...")]`. Registering a struct under a name that is
/// already taken by different attributes fails with `InvalidInput`.
#[proc_macro_derive(Reflect, attributes(transcopy))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let expanded = match expand(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error(),
    };
    TokenStream::from(expanded)
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic types",
        ));
    }

    let type_attrs = parse_type_attributes(&input.attrs)?;
    let ident = &input.ident;
    let ident_str = ident.to_string();
    let type_name = match &type_attrs.name {
        Some(name) => quote! { #name },
        None => quote! { concat!(module_path!(), "::", #ident_str) },
    };

    match &input.data {
        Data::Struct(ds) => match &ds.fields {
            Fields::Named(named) => {
                let mut fields = Vec::new();
                for field in &named.named {
                    let Some(ident) = field.ident.clone() else {
                        continue;
                    };
                    fields.push(StructField {
                        ident,
                        ty: field.ty.clone(),
                        attrs: parse_field_attributes(&field.attrs)?,
                    });
                }
                Ok(generate_struct(ident, &type_name, &type_attrs, &fields))
            }
            _ => Err(syn::Error::new(
                ident.span(),
                "Reflect only supports structs with named fields",
            )),
        },
        Data::Enum(de) => {
            let mut variants = Vec::new();
            for variant in &de.variants {
                if !matches!(variant.fields, Fields::Unit) {
                    return Err(syn::Error::new_spanned(
                        variant,
                        "Reflect only supports enums with unit variants",
                    ));
                }
                let constant = parse_variant_rename(&variant.attrs)?
                    .unwrap_or_else(|| variant.ident.to_string());
                variants.push((variant.ident.clone(), constant));
            }
            if variants.is_empty() {
                return Err(syn::Error::new(ident.span(), "Reflect needs at least one variant"));
            }
            Ok(generate_enum(ident, &type_name, &variants))
        }
        Data::Union(_) => Err(syn::Error::new(ident.span(), "Reflect does not support unions")),
    }
}

// --- Internal Data Structures ---

#[derive(Default)]
struct TypeAttributes {
    name: Option<String>,
    exclusions: Vec<String>,
    constructor_exclusions: Vec<String>,
}

#[derive(Default)]
struct FieldAttributes {
    alias: Option<String>,
    exclude: bool,
}

struct StructField {
    ident: syn::Ident,
    ty: syn::Type,
    attrs: FieldAttributes,
}

fn parse_string_list(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<Vec<String>> {
    let content;
    syn::parenthesized!(content in meta.input);
    let list = content.parse_terminated(<LitStr as syn::parse::Parse>::parse, syn::Token![,])?;
    Ok(list.iter().map(LitStr::value).collect())
}

fn parse_type_attributes(attrs: &[Attribute]) -> syn::Result<TypeAttributes> {
    let mut parsed = TypeAttributes::default();
    for attr in attrs {
        if !attr.path().is_ident("transcopy") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let s: LitStr = meta.value()?.parse()?;
                parsed.name = Some(s.value());
                return Ok(());
            }
            if meta.path.is_ident("exclusions") {
                parsed.exclusions.extend(parse_string_list(&meta)?);
                return Ok(());
            }
            if meta.path.is_ident("constructor_exclude") {
                parsed.constructor_exclusions.extend(parse_string_list(&meta)?);
                return Ok(());
            }
            Err(meta.error(
                "Unknown transcopy type attribute. Supported: name, exclusions, constructor_exclude",
            ))
        })?;
    }
    Ok(parsed)
}

fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut parsed = FieldAttributes::default();
    for attr in attrs {
        if !attr.path().is_ident("transcopy") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("alias") {
                let s: LitStr = meta.value()?.parse()?;
                parsed.alias = Some(s.value());
                return Ok(());
            }
            if meta.path.is_ident("exclude") {
                parsed.exclude = true;
                return Ok(());
            }
            Err(meta.error("Unknown transcopy field attribute. Supported: alias, exclude"))
        })?;
    }
    Ok(parsed)
}

fn parse_variant_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident("transcopy") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let s: LitStr = meta.value()?.parse()?;
                rename = Some(s.value());
                return Ok(());
            }
            Err(meta.error("Unknown transcopy variant attribute. Supported: rename"))
        })?;
    }
    Ok(rename)
}

// --- Generator: structs ---

fn generate_struct(
    ident: &syn::Ident,
    type_name: &TokenStream2,
    type_attrs: &TypeAttributes,
    fields: &[StructField],
) -> TokenStream2 {
    let declare_attributes = fields.iter().map(|f| {
        let fname = f.ident.to_string();
        let fty = &f.ty;
        let alias = f.attrs.alias.as_ref().map(|a| quote! { .alias(#a) });
        let exclude = f.attrs.exclude.then(|| quote! { .excluded() });
        quote! {
            .attribute(
                ::transcopy::schema::AttributeDescriptor::new(
                    #fname,
                    <#fty as ::transcopy::Reflect>::type_ref(),
                )
                .default_value(<#fty as ::transcopy::Reflect>::default_value())
                #alias
                #exclude
            )
        }
    });

    let field_names = fields.iter().map(|f| f.ident.to_string());

    let register_fields = fields.iter().map(|f| {
        let fty = &f.ty;
        quote! { <#fty as ::transcopy::Reflect>::register(registry)?; }
    });

    let exclusions = &type_attrs.exclusions;
    let exclude = (!exclusions.is_empty()).then(|| {
        quote! { .exclude([#(#exclusions),*]) }
    });
    let constructor_exclusions = &type_attrs.constructor_exclusions;
    let exclude_as_destination = (!constructor_exclusions.is_empty()).then(|| {
        quote! { .exclude_as_destination([#(#constructor_exclusions),*]) }
    });

    let default_fields = fields.iter().map(|f| {
        let fname = f.ident.to_string();
        let fty = &f.ty;
        quote! { .with(#fname, <#fty as ::transcopy::Reflect>::default_value()) }
    });

    let to_fields = fields.iter().map(|f| {
        let fname = &f.ident;
        let fname_str = fname.to_string();
        quote! { .with(#fname_str, ::transcopy::Reflect::to_value(&self.#fname)) }
    });

    let from_fields = fields.iter().map(|f| {
        let fname = &f.ident;
        let fname_str = fname.to_string();
        quote! { #fname: ::transcopy::rt::take_field(&mut object, #fname_str)?, }
    });

    quote! {
        impl ::transcopy::Reflect for #ident {
            fn type_ref() -> ::transcopy::TypeRef {
                ::transcopy::TypeRef::Object(::transcopy::TypeName::new(#type_name))
            }

            fn register(registry: &::transcopy::TypeRegistry) -> ::transcopy::Result<()> {
                let name = ::transcopy::TypeName::new(#type_name);
                if ::transcopy::rt::already_registered(registry, &name, &[#(#field_names),*])? {
                    return Ok(());
                }
                registry.register_struct(
                    ::transcopy::schema::StructSchema::builder(name)
                        #(#declare_attributes)*
                        #exclude
                        #exclude_as_destination
                        .build(),
                )?;
                #(#register_fields)*
                Ok(())
            }

            fn default_value() -> ::transcopy::Value {
                ::transcopy::Object::new(#type_name)
                    #(#default_fields)*
                    .into()
            }

            fn to_value(&self) -> ::transcopy::Value {
                ::transcopy::Object::new(#type_name)
                    #(#to_fields)*
                    .into()
            }

            fn from_value(value: ::transcopy::Value) -> ::transcopy::Result<Self> {
                #[allow(unused_mut, unused_variables)]
                let mut object = ::transcopy::rt::expect_object(value, #type_name)?;
                Ok(Self {
                    #(#from_fields)*
                })
            }
        }
    }
}

// --- Generator: enums ---

fn generate_enum(ident: &syn::Ident, type_name: &TokenStream2, variants: &[(syn::Ident, String)]) -> TokenStream2 {
    let constants = variants.iter().map(|(_, c)| c);
    let first_constant = variants.first().map(|(_, c)| c.clone()).unwrap_or_default();

    let to_arms = variants.iter().map(|(v, c)| {
        quote! { Self::#v => #c, }
    });
    let from_arms = variants.iter().map(|(v, c)| {
        quote! { #c => Ok(Self::#v), }
    });

    quote! {
        impl ::transcopy::Reflect for #ident {
            fn type_ref() -> ::transcopy::TypeRef {
                ::transcopy::TypeRef::Enum(::transcopy::TypeName::new(#type_name))
            }

            fn register(registry: &::transcopy::TypeRegistry) -> ::transcopy::Result<()> {
                registry.register_enum(::transcopy::schema::EnumSchema::new(
                    #type_name,
                    [#(#constants),*],
                ));
                Ok(())
            }

            fn default_value() -> ::transcopy::Value {
                ::transcopy::EnumValue::new(#type_name, #first_constant).into()
            }

            fn to_value(&self) -> ::transcopy::Value {
                let constant = match self {
                    #(#to_arms)*
                };
                ::transcopy::EnumValue::new(#type_name, constant).into()
            }

            fn from_value(value: ::transcopy::Value) -> ::transcopy::Result<Self> {
                let constant = ::transcopy::rt::expect_enum(value, #type_name)?;
                match constant.as_str() {
                    #(#from_arms)*
                    other => Err(::transcopy::rt::unknown_constant(#type_name, other)),
                }
            }
        }
    }
}
