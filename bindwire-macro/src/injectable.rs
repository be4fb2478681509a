use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, Data, DeriveInput, Expr, Field, Fields,
    GenericArgument, PathArguments, Token, Type,
};

/// Arguments of `#[inject(...)]`
#[derive(Default)]
struct InjectArgs {
    id: Option<Expr>,
    skip: bool,
}

impl Parse for InjectArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = InjectArgs::default();

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;

            if key == "id" {
                input.parse::<Token![=]>()?;
                args.id = Some(input.parse()?);
            } else if key == "skip" {
                args.skip = true;
            } else {
                return Err(syn::Error::new_spanned(
                    key,
                    "expected `id = ...` or `skip`",
                ));
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

/// How a field is filled from the container
enum FieldKind<'a> {
    Required(&'a Type),
    Optional(&'a Type),
    All(&'a Type),
    Lazy(&'a Type),
}

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    generate_injectable_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn generate_injectable_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(fields) => {
                return Err(syn::Error::new_spanned(
                    fields,
                    "#[derive(Injectable)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "#[derive(Injectable)] can only be applied to structs",
            ))
        }
    };

    let field_injections = fields
        .iter()
        .map(|field| field_injection(field))
        .collect::<syn::Result<Vec<_>>>()?;

    let body = if matches!(&input.data, Data::Struct(data) if matches!(data.fields, Fields::Unit)) {
        quote!(Self)
    } else {
        quote!(Self { #(#field_injections),* })
    };

    Ok(quote! {
        impl #impl_generics ::bindwire::Injectable for #struct_name #ty_generics #where_clause {
            fn inject(
                ctx: &::bindwire::InjectContext<'_>
            ) -> ::bindwire::Result<Self> {
                Ok(#body)
            }
        }
    })
}

fn field_injection(field: &Field) -> syn::Result<TokenStream2> {
    let field_name = &field.ident;
    let member = field_name
        .as_ref()
        .map(|ident| ident.to_string())
        .unwrap_or_default();

    let mut args = InjectArgs::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("inject")) {
        let parsed: InjectArgs = attr.parse_args()?;
        args.id = parsed.id.or(args.id);
        args.skip |= parsed.skip;
    }

    if args.skip {
        return Ok(quote!(#field_name: ::core::default::Default::default()));
    }

    let with_id = args.id.as_ref().map(|id| quote!(.id(#id)));

    let request = |inner: &Type| {
        quote! {
            ctx.request::<#inner>()#with_id.member(#member)
        }
    };

    let value = match classify(&field.ty)? {
        FieldKind::Required(inner) => {
            let request = request(inner);
            quote!(#request.get()?)
        }
        FieldKind::Optional(inner) => {
            let request = request(inner);
            quote!(#request.try_get()?)
        }
        FieldKind::All(inner) => {
            let request = request(inner);
            quote!(#request.all()?.collect())
        }
        FieldKind::Lazy(inner) => {
            let request = request(inner);
            quote!(#request.lazy())
        }
    };

    Ok(quote!(#field_name: #value))
}

fn classify(ty: &Type) -> syn::Result<FieldKind<'_>> {
    let unsupported = || {
        syn::Error::new_spanned(
            ty,
            "injected fields must be Arc<T>, Option<Arc<T>>, Vec<Arc<T>> or Lazy<T> (use #[inject(skip)] otherwise)",
        )
    };

    let (wrapper, inner) = single_generic(ty).ok_or_else(unsupported)?;
    match wrapper.as_str() {
        "Arc" => Ok(FieldKind::Required(inner)),
        "Lazy" => Ok(FieldKind::Lazy(inner)),
        "Option" => match single_generic(inner) {
            Some((arc, inner)) if arc == "Arc" => Ok(FieldKind::Optional(inner)),
            _ => Err(unsupported()),
        },
        "Vec" => match single_generic(inner) {
            Some((arc, inner)) if arc == "Arc" => Ok(FieldKind::All(inner)),
            _ => Err(unsupported()),
        },
        _ => Err(unsupported()),
    }
}

/// Split `Wrapper<Inner>` into the wrapper's last path segment and `Inner`
fn single_generic(ty: &Type) -> Option<(String, &Type)> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some((segment.ident.to_string(), inner)),
        _ => None,
    }
}
