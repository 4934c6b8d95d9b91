//! Procedural macros for unikorm
//!
//! This crate provides the compile-time registration step for mapped types:
//!
//! - `#[derive(Entity)]` - table mapping, field access by name, relation loading
//! - `#[derive(Composite)]` - list holders filled from child tables

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Data, DeriveInput, Field, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
    parse_macro_input,
};

/// Derive `unikorm::Entity` and `unikorm::Fetchable` for a struct with
/// named fields.
///
/// # Usage
///
/// ```ignore
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "message")] // optional, defaults to "message" anyway
/// pub struct Message {
///     pub id: Option<i64>,
///     #[orm(references)]
///     pub user: User,
///     pub message: String,
///     #[orm(skip)]
///     pub draft: bool,
/// }
/// ```
///
/// # Generated Code
///
/// - `TABLE_NAME`: the `table` attribute, or the struct name lower-cased
/// - `fields()`: one `FieldDef` per persisted field, in declaration order
/// - `get`/`set`: field access keyed by field name; a `references` field
///   reads and writes the referenced entity's primary key
/// - `resolve_relations`: loads every `references` field (one hop)
/// - `Fetchable`: reload by primary key through `Database::fetch_entity`
///
/// # References
///
/// A field holding another entity is only treated as a foreign key when it
/// carries `#[orm(references)]`. A bare `user: User` field is read as a
/// plain column and fails to compile, because `User` does not implement
/// `unikorm::ColumnType`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive `unikorm::Fetchable` for a list holder.
///
/// # Usage
///
/// ```ignore
/// #[derive(Debug, Default, Composite)]
/// pub struct MessageList {
///     pub user_id: i64,
///     #[orm(has_many = "user_id")]
///     pub messages: Vec<Message>,
/// }
/// ```
///
/// `db.fetch(&mut list)` fills `messages` with every `Message` row whose
/// `user_id` column equals `list.user_id`. Use `key = "field"` when the
/// holder's field is named differently from the child column.
#[proc_macro_derive(Composite, attributes(orm))]
pub fn derive_composite(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_composite(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// How a field takes part in the mapping
enum FieldRole {
    Column,
    Reference,
    Skip,
    HasMany { column: String, key: Option<String> },
}

struct MappedField<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
    role: FieldRole,
}

fn named_fields(input: &DeriveInput) -> syn::Result<Vec<&Field>> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "mapped types cannot be generic",
        ));
    }
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter().collect()),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "mapped types need named fields",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "mapped types must be structs",
        )),
    }
}

fn parse_field(field: &Field) -> syn::Result<MappedField<'_>> {
    let mut role = FieldRole::Column;
    let mut has_many: Option<String> = None;
    let mut key: Option<String> = None;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("references") {
                role = FieldRole::Reference;
            } else if meta.path.is_ident("skip") {
                role = FieldRole::Skip;
            } else if meta.path.is_ident("has_many") {
                has_many = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("key") {
                key = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("unsupported orm field attribute"));
            }
            Ok(())
        })?;
    }

    if let Some(column) = has_many {
        role = FieldRole::HasMany { column, key };
    } else if key.is_some() {
        return Err(syn::Error::new_spanned(
            field,
            "`key` is only valid together with `has_many`",
        ));
    }

    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;

    Ok(MappedField {
        ident,
        name: ident.unraw().to_string(),
        ty: &field.ty,
        role,
    })
}

fn table_name(input: &DeriveInput) -> syn::Result<String> {
    let mut table = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("unsupported orm attribute"))
            }
        })?;
    }
    Ok(table.unwrap_or_else(|| input.ident.unraw().to_string().to_case(Case::Flat)))
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let type_label = struct_name.unraw().to_string();
    let table = table_name(input)?;

    let fields = named_fields(input)?
        .into_iter()
        .map(parse_field)
        .collect::<syn::Result<Vec<_>>>()?;

    let mut field_defs = Vec::new();
    let mut getters = Vec::new();
    let mut setters = Vec::new();
    let mut references = Vec::new();

    for field in &fields {
        let ident = field.ident;
        let name = &field.name;
        let ty = field.ty;

        match field.role {
            FieldRole::Skip => {}
            FieldRole::HasMany { .. } => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "`has_many` belongs on a #[derive(Composite)] holder",
                ));
            }
            FieldRole::Column => {
                field_defs.push(quote! {
                    ::unikorm::FieldDef {
                        name: #name,
                        field_type: <#ty as ::unikorm::ColumnType>::FIELD_TYPE,
                        nullable: <#ty as ::unikorm::ColumnType>::NULLABLE,
                    }
                });
                getters.push(quote! {
                    #name => ::core::option::Option::Some(
                        ::unikorm::ToSqlValue::to_sql_value(&self.#ident)
                    ),
                });
                setters.push(quote! {
                    #name => self.#ident = ::unikorm::value::decode_field(#name, value)?,
                });
            }
            FieldRole::Reference => {
                field_defs.push(quote! {
                    ::unikorm::FieldDef {
                        name: #name,
                        field_type: ::unikorm::FieldType::Reference(
                            <#ty as ::unikorm::Entity>::TABLE_NAME
                        ),
                        nullable: false,
                    }
                });
                getters.push(quote! {
                    #name => ::core::option::Option::Some(
                        match ::unikorm::Entity::identity(&self.#ident) {
                            ::core::option::Option::Some(id) => ::unikorm::SqlValue::Int(id),
                            ::core::option::Option::None => ::unikorm::SqlValue::Null,
                        }
                    ),
                });
                setters.push(quote! {
                    #name => self.#ident = ::unikorm::relation::reference_stub::<#ty>(value)?,
                });
                references.push(quote! {
                    ::unikorm::relation::resolve_reference(db, &mut self.#ident)?;
                });
            }
        }
    }

    let resolve_relations = if references.is_empty() {
        quote! {}
    } else {
        quote! {
            fn resolve_relations<C: ::unikorm::Connection>(
                &mut self,
                db: &::unikorm::Database<C>,
            ) -> ::unikorm::Result<()> {
                #(#references)*
                ::core::result::Result::Ok(())
            }
        }
    };

    Ok(quote! {
        impl ::unikorm::Entity for #struct_name {
            const TABLE_NAME: &'static str = #table;

            fn fields() -> &'static [::unikorm::FieldDef] {
                static FIELDS: &[::unikorm::FieldDef] = &[#(#field_defs),*];
                FIELDS
            }

            fn get(&self, field: &str) -> ::core::option::Option<::unikorm::SqlValue> {
                match field {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set(&mut self, field: &str, value: ::unikorm::SqlValue) -> ::unikorm::Result<()> {
                match field {
                    #(#setters)*
                    _ => {
                        return ::core::result::Result::Err(::unikorm::OrmError::UnknownField {
                            entity: #type_label,
                            field: field.to_string(),
                        });
                    }
                }
                ::core::result::Result::Ok(())
            }

            #resolve_relations
        }

        impl ::unikorm::Fetchable for #struct_name {
            fn fetch_from<C: ::unikorm::Connection>(
                &mut self,
                db: &::unikorm::Database<C>,
            ) -> ::unikorm::Result<()> {
                db.fetch_entity(self)
            }
        }
    })
}

fn expand_composite(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let fields = named_fields(input)?
        .into_iter()
        .map(parse_field)
        .collect::<syn::Result<Vec<_>>>()?;

    let mut loads = Vec::new();
    for field in &fields {
        let FieldRole::HasMany { column, key } = &field.role else {
            if matches!(field.role, FieldRole::Reference) {
                return Err(syn::Error::new_spanned(
                    field.ident,
                    "`references` belongs on a #[derive(Entity)] type",
                ));
            }
            continue;
        };

        let child = vec_element(field.ty).ok_or_else(|| {
            syn::Error::new_spanned(field.ty, "`has_many` fields must be `Vec<Entity>`")
        })?;
        let key_name = key.as_deref().unwrap_or(column);
        let key_field = fields
            .iter()
            .find(|f| f.name == key_name && matches!(f.role, FieldRole::Column))
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    field.ident,
                    format!("no field `{key_name}` to match `{column}` against"),
                )
            })?
            .ident;

        let ident = field.ident;
        loads.push(quote! {
            self.#ident = ::unikorm::relation::load_children::<#child, C>(
                db,
                #column,
                ::unikorm::ToSqlValue::to_sql_value(&self.#key_field),
            )?;
        });
    }

    if loads.is_empty() {
        return Err(syn::Error::new_spanned(
            struct_name,
            "a composite needs at least one `#[orm(has_many = \"...\")]` field",
        ));
    }

    Ok(quote! {
        impl ::unikorm::Fetchable for #struct_name {
            fn fetch_from<C: ::unikorm::Connection>(
                &mut self,
                db: &::unikorm::Database<C>,
            ) -> ::unikorm::Result<()> {
                #(#loads)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

/// `T` out of `Vec<T>`
fn vec_element(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Vec" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
