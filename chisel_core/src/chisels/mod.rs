//! Built-in chisels, grouped by category

pub mod bracket_balance;
pub mod def_use;
pub mod default_fields;
pub mod empty_groups;
pub mod move_routes;
pub mod quantize;
pub mod reformat;
pub mod shorten_defs;
pub mod strip_comments;
pub mod unused_defs;

use crate::transform::{Category, RegistryEntry, Transform, TransformRegistry};

pub use bracket_balance::BracketBalance;
pub use def_use::DefUseCheck;
pub use default_fields::DefaultFields;
pub use empty_groups::EmptyGroups;
pub use move_routes::MoveRoutes;
pub use quantize::Quantize;
pub use reformat::Reformat;
pub use shorten_defs::ShortenDefs;
pub use strip_comments::StripComments;
pub use unused_defs::UnusedDefs;

fn boxed<T: Transform + Default + 'static>() -> Box<dyn Transform> {
    Box::new(T::default())
}

/// Add every built-in chisel to `registry`, in run order within each category
pub fn register_builtins(registry: &mut TransformRegistry) {
    let builtins: [(&'static str, Category, &'static str, fn() -> Box<dyn Transform>); 10] = [
        (
            bracket_balance::KEY,
            Category::Validators,
            "Report unbalanced brackets and braces",
            boxed::<BracketBalance>,
        ),
        (
            def_use::KEY,
            Category::Validators,
            "Report undefined USE names and duplicate DEF names",
            boxed::<DefUseCheck>,
        ),
        (
            strip_comments::KEY,
            Category::Format,
            "Remove comments, keeping the #VRML header",
            boxed::<StripComments>,
        ),
        (
            reformat::KEY,
            Category::Format,
            "Re-indent the whole file with field-aware line breaks",
            boxed::<Reformat>,
        ),
        (
            unused_defs::KEY,
            Category::Clean,
            "Drop DEF names nothing refers to",
            boxed::<UnusedDefs>,
        ),
        (
            empty_groups::KEY,
            Category::Clean,
            "Remove grouping nodes without children",
            boxed::<EmptyGroups>,
        ),
        (
            default_fields::KEY,
            Category::Condense,
            "Remove fields set to their default value",
            boxed::<DefaultFields>,
        ),
        (
            quantize::KEY,
            Category::Reduce,
            "Round coordinates and interpolator key values",
            boxed::<Quantize>,
        ),
        (
            move_routes::KEY,
            Category::Reorganize,
            "Move top-level ROUTEs to the end of the file",
            boxed::<MoveRoutes>,
        ),
        (
            shorten_defs::KEY,
            Category::Mutate,
            "Rename DEFs to short generated names",
            boxed::<ShortenDefs>,
        ),
    ];

    for (key, category, description, constructor) in builtins {
        registry.register(RegistryEntry {
            key,
            category,
            description,
            constructor,
        });
    }
}
