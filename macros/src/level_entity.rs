const ENTITY_KIND: &str = "entity_kind";

pub fn expand_level_entity(input: syn::DeriveInput) -> proc_macro::TokenStream {
    let ty = &input.ident;

    let override_name = input
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident(ENTITY_KIND))
        .map(|attr| match &attr.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(name),
                        ..
                    }),
                ..
            }) => name.value(),
            _ => panic!("expected #[{ENTITY_KIND} = \"Variant\"]"),
        });

    let variant = syn::Ident::new(
        &variant_name(&ty.to_string(), override_name.as_deref()),
        proc_macro2::Span::call_site(),
    );

    quote::quote! {
        impl crate::level::LevelEntity for #ty {
            const KIND: crate::level::EntityKind = crate::level::EntityKind::#variant;

            #[inline]
            fn into_entity(self) -> crate::level::Entity {
                crate::level::Entity::#variant(self)
            }

            #[inline]
            fn from_entity(entity: &crate::level::Entity) -> Option<&Self> {
                match entity {
                    crate::level::Entity::#variant(e) => Some(e),
                    _ => None,
                }
            }

            #[inline]
            fn from_entity_mut(entity: &mut crate::level::Entity) -> Option<&mut Self> {
                match entity {
                    crate::level::Entity::#variant(e) => Some(e),
                    _ => None,
                }
            }
        }
    }
    .into()
}

fn variant_name(ty: &str, override_name: Option<&str>) -> String {
    match override_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => ty.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_variant_name() {
        assert_eq!(variant_name("Texture", None), "Texture");
        assert_eq!(variant_name("IndexBuffer", Some("Buffer")), "Buffer");
        assert_eq!(variant_name("Program", Some("  ")), "Program");
    }
}
