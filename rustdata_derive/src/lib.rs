use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
    parse_macro_input, spanned::Spanned,
};

/// Derives `rustdata::Entity` for a struct with named fields.
///
/// ```ignore
/// #[derive(Entity)]
/// #[entity(table = "books", naming = "snake_case")]
/// struct Book {
///     #[id]
///     #[generated]
///     id: Option<i64>,
///     #[column(name = "book_title", alias = "t")]
///     title: String,
///     #[column(transient)]
///     cached: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, id, generated, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct EntityOptions {
    name: Option<LitStr>,
    table: Option<LitStr>,
    naming: Option<LitStr>,
}

#[derive(Default)]
struct ColumnOptions {
    id: bool,
    generated: bool,
    name: Option<LitStr>,
    alias: Option<LitStr>,
    converter: Option<LitStr>,
    data_type: Option<Ident>,
    read_only: bool,
    transient: bool,
}

struct MappedField {
    ident: Ident,
    ty: Type,
    options: ColumnOptions,
}

fn parse_entity_options(attrs: &[Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("table") {
                options.table = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("naming") {
                options.naming = Some(meta.value()?.parse()?);
                return Ok(());
            }
            Err(meta.error("Unsupported entity option. Supported: name, table, naming"))
        })?;
    }
    Ok(options)
}

fn parse_column_options(attrs: &[Attribute]) -> syn::Result<ColumnOptions> {
    let mut options = ColumnOptions::default();
    for attr in attrs {
        if attr.path().is_ident("id") {
            attr.meta.require_path_only()?;
            options.id = true;
            continue;
        }
        if attr.path().is_ident("generated") {
            attr.meta.require_path_only()?;
            options.generated = true;
            continue;
        }
        if !attr.path().is_ident("column") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("alias") {
                options.alias = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("converter") {
                options.converter = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("data_type") {
                let lit: LitStr = meta.value()?.parse()?;
                options.data_type = Some(data_type_variant(&lit)?);
                return Ok(());
            }
            if meta.path.is_ident("read_only") {
                options.read_only = true;
                return Ok(());
            }
            if meta.path.is_ident("transient") {
                options.transient = true;
                return Ok(());
            }
            Err(meta.error(
                "Unsupported column option. Supported: name, alias, converter, data_type, read_only, transient",
            ))
        })?;
    }

    if options.transient && (options.id || options.name.is_some() || options.converter.is_some()) {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "transient fields cannot carry id, name or converter options",
        ));
    }
    Ok(options)
}

fn data_type_variant(lit: &LitStr) -> syn::Result<Ident> {
    let normalized = lit.value().trim().to_ascii_uppercase().replace('-', "_");
    let variant = match normalized.as_str() {
        "STRING" | "TEXT" => "String",
        "CHARACTER" | "CHAR" => "Character",
        "BOOLEAN" | "BOOL" => "Boolean",
        "BYTE" => "Byte",
        "SHORT" => "Short",
        "INTEGER" | "INT" => "Integer",
        "LONG" | "BIGINT" => "Long",
        "FLOAT" => "Float",
        "DOUBLE" => "Double",
        "BIGDECIMAL" | "DECIMAL" => "BigDecimal",
        "DATE" => "Date",
        "TIME" => "Time",
        "TIMESTAMP" => "Timestamp",
        "UUID" => "Uuid",
        "JSON" => "Json",
        "BYTE_ARRAY" | "BYTES" => "ByteArray",
        "OBJECT" => "Object",
        _ => {
            return Err(syn::Error::new(
                lit.span(),
                format!("unknown data type '{}'", lit.value()),
            ));
        }
    };
    Ok(format_ident!("{}", variant, span = lit.span()))
}

/// Inner type of `Option<T>`, if `ty` is one.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn property_tokens(field: &MappedField) -> TokenStream2 {
    let name = field.ident.to_string();
    let ty = &field.ty;
    let type_ref = match option_inner(ty) {
        Some(inner) => quote!(::rustdata::model::TypeRef::optional::<#inner>()),
        None => quote!(::rustdata::model::TypeRef::of::<#ty>()),
    };

    let options = &field.options;
    let mut chain = Vec::new();
    if options.id {
        chain.push(quote!(.id()));
    }
    if options.generated {
        chain.push(quote!(.generated()));
    }
    if let Some(column) = &options.name {
        chain.push(quote!(.persisted_name(#column)));
    }
    if let Some(alias) = &options.alias {
        chain.push(quote!(.alias(#alias)));
    }
    if let Some(converter) = &options.converter {
        chain.push(quote!(.converter(#converter)));
    }
    if let Some(variant) = &options.data_type {
        chain.push(quote!(.data_type(::rustdata::model::DataType::#variant)));
    }
    if options.read_only {
        chain.push(quote!(.read_only()));
    }

    quote! {
        ::rustdata::model::PropertyDef::new(#name, #type_ref) #(#chain)*
    }
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident.clone();
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(Entity)] does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "#[derive(Entity)] supports only structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "#[derive(Entity)] can only be used on structs",
            ));
        }
    };

    let mut mapped = Vec::new();
    let mut transient = Vec::new();
    for field in named {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new(field.span(), "expected a named field"));
        };
        let options = parse_column_options(&field.attrs)?;
        if options.transient {
            transient.push(ident);
            continue;
        }
        mapped.push(MappedField {
            ident,
            ty: field.ty.clone(),
            options,
        });
    }

    if mapped.is_empty() {
        return Err(syn::Error::new(
            input.span(),
            "an entity needs at least one persistent field",
        ));
    }
    if !mapped.iter().any(|field| field.options.id) {
        return Err(syn::Error::new(
            input.span(),
            format!("{struct_name} has no #[id] field"),
        ));
    }

    let entity_name = options
        .name
        .as_ref()
        .map(LitStr::value)
        .unwrap_or_else(|| struct_name.to_string());
    let table = options.table.as_ref().map(|table| quote!(.table(#table)));
    let naming = options.naming.as_ref().map(|naming| quote!(.naming(#naming)));
    let properties = mapped.iter().map(property_tokens);

    let to_values = mapped.iter().map(|field| {
        let ident = &field.ident;
        quote!(::rustdata::core::Value::from(::std::clone::Clone::clone(&self.#ident)))
    });
    let from_values = mapped.iter().map(|field| {
        let ident = &field.ident;
        quote! {
            #ident: ::rustdata::core::FromValue::from_value(
                values.next().unwrap_or(::rustdata::core::Value::Null),
            )
            .map_err(|err| err.context(concat!(stringify!(#struct_name), ".", stringify!(#ident))))?
        }
    });
    let transient_defaults = transient.iter().map(|ident| {
        quote!(#ident: ::std::default::Default::default())
    });
    let expected = mapped.len();

    Ok(quote! {
        impl ::rustdata::model::Entity for #struct_name {
            fn definition() -> ::rustdata::model::EntityDefinition {
                ::rustdata::model::EntityDefinition::new(#entity_name)
                    .type_name(::std::any::type_name::<Self>())
                    #table
                    #naming
                    #(.property(#properties))*
            }

            fn to_values(&self) -> ::std::vec::Vec<::rustdata::core::Value> {
                ::std::vec![#(#to_values),*]
            }

            fn from_values(
                values: ::std::vec::Vec<::rustdata::core::Value>,
            ) -> ::rustdata::core::Result<Self> {
                if values.len() != #expected {
                    return ::std::result::Result::Err(::rustdata::core::DataError::TypeMismatch(
                        ::std::format!(
                            "{} expects {} values, got {}",
                            stringify!(#struct_name),
                            #expected,
                            values.len()
                        ),
                    ));
                }
                let mut values = values.into_iter();
                ::std::result::Result::Ok(Self {
                    #(#from_values,)*
                    #(#transient_defaults,)*
                })
            }
        }
    })
}

/// Derives `rustdata::model::Introspected` for a read-only result struct.
///
/// Each field is filled from the entity property with the same name.
#[proc_macro_derive(Introspected)]
pub fn derive_introspected(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_introspected(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_introspected(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident.clone();
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(Introspected)] does not support generic structs",
        ));
    }
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) if !fields.named.is_empty() => &fields.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "#[derive(Introspected)] needs a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "#[derive(Introspected)] can only be used on structs",
            ));
        }
    };

    let idents = named
        .iter()
        .map(|field| {
            field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))
        })
        .collect::<syn::Result<Vec<_>>>()?;
    let names = idents.iter().map(Ident::to_string);
    let fields = idents.iter().map(|ident| {
        quote! {
            #ident: ::rustdata::core::FromValue::from_value(
                values.next().unwrap_or(::rustdata::core::Value::Null),
            )
            .map_err(|err| err.context(concat!(stringify!(#struct_name), ".", stringify!(#ident))))?
        }
    });
    let type_name = struct_name.to_string();
    let expected = idents.len();

    Ok(quote! {
        impl ::rustdata::model::Introspected for #struct_name {
            fn type_name() -> &'static str {
                #type_name
            }

            fn fields() -> ::std::vec::Vec<&'static str> {
                ::std::vec![#(#names),*]
            }

            fn from_values(
                values: ::std::vec::Vec<::rustdata::core::Value>,
            ) -> ::rustdata::core::Result<Self> {
                if values.len() != #expected {
                    return ::std::result::Result::Err(::rustdata::core::DataError::TypeMismatch(
                        ::std::format!(
                            "{} expects {} values, got {}",
                            stringify!(#struct_name),
                            #expected,
                            values.len()
                        ),
                    ));
                }
                let mut values = values.into_iter();
                ::std::result::Result::Ok(Self {
                    #(#fields,)*
                })
            }
        }
    })
}
