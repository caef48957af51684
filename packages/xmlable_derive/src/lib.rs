
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use syn::{
    ext::IdentExt,
    parse::ParseStream,
    parse_macro_input,
    parse_quote,
    spanned::Spanned,
    Attribute,
    Data,
    DataStruct,
    DeriveInput,
    Error,
    Field,
    Fields,
    FieldsNamed,
    GenericParam,
    Ident,
    LitStr,
    Result,
    Token,
};
use quote::quote;


/// Contents of a `#[xml(type = "...", name = "...")]` field attribute.
struct XmlAttr {
    name: Option<LitStr>,
    type_label: LitStr,
}

fn parse_xml_attr(attr: &Attribute) -> Result<XmlAttr> {
    attr.parse_args_with(|input: ParseStream| {
        let mut name = None;
        let mut type_label = None;
        while !input.is_empty() {
            // `type` is a keyword, so parse_any
            let key = input.call(Ident::parse_any)?;
            input.parse::<Token![=]>()?;
            let value = input.parse::<LitStr>()?;
            let slot = match key.to_string().as_str() {
                "name" => &mut name,
                "type" => &mut type_label,
                _ => return Err(Error::new(
                    key.span(),
                    "unsupported xml attribute, expected `type` or `name`",
                )),
            };
            if slot.is_some() {
                return Err(Error::new(key.span(), format!("duplicate `{}` in xml attribute", key)));
            }
            *slot = Some(value);
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        let type_label = type_label
            .ok_or_else(|| input.error("xml attribute is missing `type = \"...\"`"))?;
        Ok(XmlAttr { name, type_label })
    })
}

// Eg `#[xml(type = "String")] city: String` => `.field("city", "String", ..)`
//    `#[xml(type = "String", name = "streetname")] street: String`
//        => `.field("streetname", "String", ..)`
//    `cache: Vec<u8>` => nothing
fn field_registration(field: &Field) -> Result<Option<TokenStream2>> {
    let mut attrs = field.attrs.iter().filter(|attr| attr.path.is_ident("xml"));
    let attr = match attrs.next() {
        Some(attr) => attr,
        None => return Ok(None),
    };
    if let Some(extra) = attrs.next() {
        return Err(Error::new(
            extra.span(),
            "duplicate xml attribute, merge it into one `#[xml(...)]`",
        ));
    }
    let XmlAttr { name, type_label } = parse_xml_attr(attr)?;
    let ident = field.ident.as_ref().expect("named field without ident");
    let name = name.unwrap_or_else(|| LitStr::new(&ident.unraw().to_string(), ident.span()));
    Ok(Some(quote! {
        .field(#name, #type_label, |this| ::xmlable::ToValue::to_value(&this.#ident))
    }))
}

fn fields_registration(input: &DeriveInput) -> Result<(TokenStream2, Vec<&Field>)> {
    let fields = match &input.data {
        &Data::Struct(DataStruct { fields: Fields::Named(FieldsNamed { ref named, .. }), .. }) => {
            named.iter().collect::<Vec<_>>()
        }
        &Data::Struct(DataStruct { fields: Fields::Unit, .. }) => Vec::new(),
        &Data::Struct(DataStruct { fields: Fields::Unnamed(ref unnamed), .. }) => {
            return Err(Error::new(
                unnamed.span(),
                "cannot derive Xmlable on a tuple struct, fields need names",
            ));
        }
        &Data::Enum(ref data) => {
            return Err(Error::new(
                data.enum_token.span(),
                "cannot derive Xmlable on an enum",
            ));
        }
        &Data::Union(ref data) => {
            return Err(Error::new(
                data.union_token.span(),
                "cannot derive Xmlable on a union",
            ));
        }
    };

    let mut registration = TokenStream2::new();
    let mut serialized = Vec::new();
    for field in fields {
        if let Some(tokens) = field_registration(field)? {
            registration.extend(tokens);
            serialized.push(field);
        }
    }
    Ok((registration, serialized))
}

fn derive(mut input: DeriveInput) -> Result<TokenStream2> {
    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(Error::new(
            lifetime.span(),
            "cannot derive Xmlable on a type with lifetime parameters",
        ));
    }

    let (registration, serialized) = fields_registration(&input)?;
    let field_tys = serialized.iter().map(|field| field.ty.clone()).collect::<Vec<_>>();

    // values are read through `Any`, so type params must be 'static
    for param in input.generics.params.iter_mut() {
        if let &mut GenericParam::Type(ref mut param) = param {
            param.bounds.push(parse_quote!('static));
        }
    }
    let where_clause = input.generics.make_where_clause();
    for ty in field_tys {
        where_clause.predicates.push(parse_quote!(#ty: ::xmlable::ToValue));
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::xmlable::Xmlable for #name #ty_generics #where_clause {
            fn schema() -> ::xmlable::TypeSchema {
                ::xmlable::TypeSchema::builder::<Self>()
                    #registration
                    .build()
            }
        }

        impl #impl_generics ::xmlable::ToValue for #name #ty_generics #where_clause {
            fn to_value(&self) -> ::xmlable::Value<'_> {
                ::xmlable::Value::Object(self)
            }
        }
    })
}

/// Derive `xmlable::Xmlable`, and `xmlable::ToValue` as an object.
///
/// Only fields with an `#[xml(type = "...")]` attribute are serialized, in
/// declaration order. `name = "..."` overrides the element name, which
/// otherwise is the field's name.
#[proc_macro_derive(Xmlable, attributes(xml))]
pub fn derive_xmlable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn derive_err(input: DeriveInput) -> String {
        match derive(input) {
            Ok(tokens) => panic!("expected error, derived {}", tokens),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn derives_marked_fields_only() {
        let tokens = derive(parse_quote! {
            struct Address {
                #[xml(type = "String", name = "streetname")]
                street: String,
                cache: Vec<u8>,
            }
        }).unwrap().to_string();
        assert!(tokens.contains("\"streetname\""));
        assert!(!tokens.contains("cache"));
    }

    #[test]
    fn duplicate_attribute_rejected() {
        let msg = derive_err(parse_quote! {
            struct Address {
                #[xml(type = "String")]
                #[xml(name = "streetname")]
                street: String,
            }
        });
        assert!(msg.contains("duplicate xml attribute"), "{}", msg);
    }

    #[test]
    fn duplicate_key_rejected() {
        let msg = derive_err(parse_quote! {
            struct Address {
                #[xml(type = "String", type = "int")]
                street: String,
            }
        });
        assert!(msg.contains("duplicate `type`"), "{}", msg);
    }

    #[test]
    fn missing_type_rejected() {
        let msg = derive_err(parse_quote! {
            struct Address {
                #[xml(name = "streetname")]
                street: String,
            }
        });
        assert!(msg.contains("missing `type"), "{}", msg);
    }

    #[test]
    fn unsupported_shapes_rejected() {
        assert!(derive_err(parse_quote! { struct Pair(u8, u8); }).contains("tuple struct"));
        assert!(derive_err(parse_quote! { enum Color { Red } }).contains("enum"));
        assert!(derive_err(parse_quote! { struct View<'a> { s: &'a str } }).contains("lifetime"));
    }
}
