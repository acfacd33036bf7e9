mod level_entity;

#[proc_macro_derive(LevelEntity, attributes(entity_kind))]
pub fn derive_level_entity(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    level_entity::expand_level_entity(syn::parse_macro_input!(input as syn::DeriveInput))
}
