use std::collections::HashSet;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{quote, quote_spanned};
use syn::parse::{Parse, ParseStream};
use syn::{braced, token, Attribute, Error, Expr, Ident, Result, Token, Type, Visibility};

use proc_macro_crate::{crate_name, FoundCrate};

/// Name of the zero-sized type generated inside every group module.
const GROUP_TYPE: &str = "Group";

/// Field names that would collide with generated associated items.
const RESERVED_FIELDS: &[&str] = &["new"];

/// Integer types whose range does not fit the registry's `i64`.
const WIDE_INTEGERS: &[&str] = &["u64", "usize", "isize", "u128", "i128"];

// =============================================================================
// Parsing
// =============================================================================

/// `field: Type = expr;` or `field: Type;`
struct FieldDef {
    attrs: Vec<Attribute>,
    name: Ident,
    ty: Type,
    /// `None` for a type-only placeholder.
    value: Option<Expr>,
}

/// `Name { members }`
struct GroupDef {
    attrs: Vec<Attribute>,
    name: Ident,
    members: Vec<Member>,
}

enum Member {
    Field(FieldDef),
    Group(GroupDef),
}

impl Member {
    fn name(&self) -> &Ident {
        match self {
            Member::Field(f) => &f.name,
            Member::Group(g) => &g.name,
        }
    }
}

struct ConstantsInput {
    vis: Visibility,
    root: GroupDef,
}

impl Parse for ConstantsInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let name: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let members = parse_members(&content)?;
        Ok(Self {
            vis,
            root: GroupDef {
                attrs,
                name,
                members,
            },
        })
    }
}

fn parse_members(input: ParseStream) -> Result<Vec<Member>> {
    let mut members = Vec::new();
    while !input.is_empty() {
        let attrs = input.call(Attribute::parse_outer)?;
        let name: Ident = input.parse()?;

        if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            let children = parse_members(&content)?;
            members.push(Member::Group(GroupDef {
                attrs,
                name,
                members: children,
            }));
            continue;
        }

        input.parse::<Token![:]>()?;
        let ty: Type = input.parse()?;
        let value = if input.peek(Token![=]) {
            input.parse::<Token![=]>()?;
            Some(input.parse::<Expr>()?)
        } else {
            None
        };
        input.parse::<Token![;]>()?;

        members.push(Member::Field(FieldDef {
            attrs,
            name,
            ty,
            value,
        }));
    }
    Ok(members)
}

// =============================================================================
// Validation (runs at macro expansion time)
// =============================================================================

/// Reject names that would produce conflicting items.
fn validate_group(group: &GroupDef) -> Result<()> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for member in &group.members {
        let name = member.name();
        let text = name.to_string();

        if !seen.insert(text.clone()) {
            errors.push(Error::new(
                name.span(),
                format!("duplicate name `{text}` in constant group `{}`", group.name),
            ));
        }
        if text == GROUP_TYPE {
            errors.push(Error::new(
                name.span(),
                format!("`{GROUP_TYPE}` is reserved for the generated group type"),
            ));
        }
        match member {
            Member::Field(_) if RESERVED_FIELDS.contains(&text.as_str()) => {
                errors.push(Error::new(
                    name.span(),
                    format!("field name `{text}` collides with the generated `{GROUP_TYPE}::{text}`"),
                ));
            }
            Member::Field(field) if field.value.is_some() => {
                if let Some(wide) = wide_integer(&field.ty) {
                    errors.push(Error::new_spanned(
                        &field.ty,
                        format!("`{wide}` values cannot be stored in the registry; declare `{text}` as `i64`"),
                    ));
                }
            }
            Member::Group(child) => {
                if let Err(err) = validate_group(child) {
                    errors.push(err);
                }
            }
            Member::Field(_) => {}
        }
    }

    let mut errors = errors.into_iter();
    match errors.next() {
        None => Ok(()),
        Some(mut first) => {
            first.extend(errors);
            Err(first)
        }
    }
}

/// The wide integer named by `ty`, looking through slices, arrays and references.
fn wide_integer(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .get_ident()
            .map(Ident::to_string)
            .filter(|ident| WIDE_INTEGERS.contains(&ident.as_str())),
        Type::Slice(slice) => wide_integer(&slice.elem),
        Type::Array(array) => wide_integer(&array.elem),
        Type::Reference(reference) => wide_integer(&reference.elem),
        _ => None,
    }
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn config_crate_path() -> TokenStream2 {
    match crate_name("robot-config") {
        Ok(FoundCrate::Itself) => {
            quote!(::robot_config)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::robot_config),
    }
}

// =============================================================================
// Type mapping
// =============================================================================

/// The type of the generated `const` for a declared field type.
///
/// - `[T]` becomes `&'static [T]`
/// - `str`, `String` and `&str` become `&'static str`
/// - any other reference without a lifetime gets `'static`
fn const_type(ty: &Type) -> Type {
    match ty {
        Type::Slice(slice) => syn::parse_quote!(&'static #slice),
        Type::Path(path) if path.qself.is_none() && (path.path.is_ident("str") || path.path.is_ident("String")) => {
            syn::parse_quote!(&'static str)
        }
        Type::Reference(reference) if reference.lifetime.is_none() => {
            let mut reference = reference.clone();
            reference.lifetime = Some(syn::Lifetime::new("'static", Span::call_site()));
            Type::Reference(reference)
        }
        other => other.clone(),
    }
}

/// A declared `[T]` with an array literal needs a borrow to fit `&'static [T]`.
fn const_value(ty: &Type, value: &Expr) -> TokenStream2 {
    match (ty, value) {
        (Type::Slice(_), Expr::Array(_)) => quote!(&#value),
        _ => quote!(#value),
    }
}

/// Human-readable type name: spaces survive only between identifier characters.
fn type_name(ty: &Type) -> String {
    let raw = quote!(#ty).to_string();
    let chars: Vec<char> = raw.chars().collect();
    let ident_char = |c: char| c.is_alphanumeric() || c == '_';

    let mut out = String::with_capacity(raw.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = out.chars().last();
            let next = chars.get(i + 1).copied();
            if let (Some(p), Some(n)) = (prev, next)
                && ident_char(p)
                && ident_char(n)
            {
                out.push(' ');
            }
            continue;
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Code generation
// =============================================================================

/// Generate the body of one group module, then recurse into nested groups.
///
/// ```ignore
/// constants! {
///     pub mod Constants {
///         Elevator {
///             kMotorIDs: [i64] = [5, 6];
///             kGyro: MotorHandle;
///             kPIDConstants { Kp: f64 = 0.0; }
///         }
///     }
/// }
///
/// // Generates (abridged):
/// pub mod Constants {
///     pub struct Group;                      // root is a group too
///     pub mod Elevator {
///         use super::*;
///         pub struct Group;
///         impl Group { pub const kMotorIDs: &'static [i64] = &[5, 6]; }
///         impl ConstantGroup for Group { ... }   // resolved once, on first use
///         pub const kMotorIDs: &'static [i64] = Group::kMotorIDs;
///         pub mod kPIDConstants { ... }
///     }
/// }
/// ```
fn generate_group_body(group: &GroupDef, prefix: &str, rc: &TokenStream2) -> TokenStream2 {
    let name_str = group.name.to_string();
    let path = if prefix.is_empty() {
        name_str.clone()
    } else {
        format!("{prefix}.{name_str}")
    };
    let name_lit = syn::LitStr::new(&name_str, Span::call_site());
    let path_lit = syn::LitStr::new(&path, Span::call_site());

    let mut assoc_consts = Vec::new();
    let mut module_consts = Vec::new();
    let mut declarations = Vec::new();
    let mut reserved_warnings = Vec::new();
    let mut children = Vec::new();

    for member in &group.members {
        match member {
            Member::Field(field) => {
                let fname = &field.name;
                let fname_lit = syn::LitStr::new(&fname.to_string(), fname.span());
                let attrs = &field.attrs;

                if *fname == "keys" {
                    reserved_warnings.push(reserved_keys_warning(fname, attrs, &path));
                }

                match &field.value {
                    Some(value) => {
                        let cty = const_type(&field.ty);
                        let cval = const_value(&field.ty, value);
                        assoc_consts.push(quote! {
                            #(#attrs)*
                            pub const #fname: #cty = #cval;
                        });
                        module_consts.push(quote! {
                            #(#attrs)*
                            pub const #fname: #cty = Group::#fname;
                        });
                        declarations.push(quote! {
                            #rc::Declaration::value(#fname_lit, Self::#fname)
                        });
                    }
                    None => {
                        let ty = &field.ty;
                        let ty_lit = syn::LitStr::new(&type_name(ty), Span::call_site());
                        declarations.push(quote! {
                            #rc::Declaration::placeholder::<#ty>(#fname_lit, #ty_lit)
                        });
                    }
                }
            }
            Member::Group(child) => {
                let cname = &child.name;
                let cname_lit = syn::LitStr::new(&cname.to_string(), cname.span());
                let cattrs = &child.attrs;
                let body = generate_group_body(child, &path, rc);

                declarations.push(quote! {
                    #rc::Declaration::group::<#cname::Group>(#cname_lit)
                });
                children.push(quote! {
                    #(#cattrs)*
                    #[allow(non_snake_case, non_upper_case_globals, dead_code)]
                    pub mod #cname {
                        #body
                    }
                });
            }
        }
    }

    quote! {
        #[allow(unused_imports)]
        use super::*;

        /// Zero-sized handle for this constant group.
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct Group;

        impl Group {
            #(#assoc_consts)*

            #[inline]
            pub const fn new() -> Self {
                Self
            }
        }

        impl #rc::ConstantGroup for Group {
            const NAME: &'static str = #name_lit;
            const PATH: &'static str = #path_lit;

            fn declarations() -> ::std::vec::Vec<#rc::Declaration> {
                ::std::vec![#(#declarations),*]
            }

            fn resolved() -> &'static #rc::ResolvedGroup {
                static RESOLVED: ::std::sync::OnceLock<#rc::ResolvedGroup> =
                    ::std::sync::OnceLock::new();
                RESOLVED.get_or_init(#rc::ResolvedGroup::resolve::<Self>)
            }
        }

        impl #rc::ImmutabilityGuard for Group {
            fn guard_target(&self) -> ::std::string::String {
                ::std::format!(
                    "constant group {}",
                    <Self as #rc::ConstantGroup>::PATH
                )
            }
        }

        impl ::core::fmt::Display for Group {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&<Self as #rc::ConstantGroup>::render())
            }
        }

        // Module-level convenience constants
        #(#module_consts)*

        #(#reserved_warnings)*

        // Nested groups
        #(#children)*
    }
}

/// A deprecation warning pointing at a field named `keys`.
///
/// Lint attributes on the field (`#[allow(deprecated)]`) apply to the warning.
fn reserved_keys_warning(field: &Ident, attrs: &[Attribute], group_path: &str) -> TokenStream2 {
    let lints = attrs.iter().filter(|attr| {
        ["allow", "expect", "warn", "deny"]
            .iter()
            .any(|lint| attr.path().is_ident(lint))
    });
    let note = format!(
        "`{group_path}.keys` shadows the `keys()` accessor; read it with `get(\"keys\")`"
    );
    let note_lit = syn::LitStr::new(&note, Span::call_site());
    let use_site = quote_spanned! {field.span()=>
        let _ = keys;
    };
    quote! {
        #(#lints)*
        const _: () = {
            #[deprecated(note = #note_lit)]
            #[allow(non_upper_case_globals)]
            const keys: () = ();
            #use_site
        };
    }
}

fn expand(input: ConstantsInput) -> Result<TokenStream2> {
    validate_group(&input.root)?;

    let rc = config_crate_path();
    let body = generate_group_body(&input.root, "", &rc);
    let vis = input.vis;
    let attrs = &input.root.attrs;
    let root = &input.root.name;

    Ok(quote! {
        #(#attrs)*
        #[allow(non_snake_case, non_upper_case_globals, dead_code)]
        #vis mod #root {
            #body
        }
    })
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare a tree of immutable constant groups.
///
/// ```ignore
/// use robot_config::constants;
///
/// constants! {
///     pub mod Constants {
///         Interface {
///             kDriverControllerPort: i64 = 0;
///         }
///         Drivetrain {
///             kRightMotorIDs: [i64] = [1, 2];
///             kGyroIDs: [i64];             // placeholder, filled with []
///         }
///     }
/// }
/// ```
///
/// Each group becomes a module with a zero-sized `Group` type implementing
/// `ConstantGroup`, associated and module-level consts for every valued
/// field, and one nested module per child group.
#[proc_macro]
pub fn constants(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as ConstantsInput);
    match expand(input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
