//! Names for member references that do not point at a definition.
//!
//! Code may reference `Sub.run()` while `run` is declared on a supertype. Such references are
//! resolved the way the JVM would and take the name of their target.

use std::collections::HashMap;

use rayon::prelude::*;
use smol_str::SmolStr;

use crate::diagnostics::{Diagnostic, AMBIGUOUS_REFERENCE};
use crate::program::{FieldRef, MethodRef, MethodResolution, Program};

enum Outcome<R> {
    Renamed(R, SmolStr),
    Ambiguous(R, Vec<MethodRef>),
}

/// Adds entries for the non-rebound references of `program` and returns the references that
/// could not be named consistently.
pub(crate) fn fix_non_rebound_references(
    program: &Program,
    methods: &mut HashMap<MethodRef, SmolStr>,
    fields: &mut HashMap<FieldRef, SmolStr>,
) -> Vec<Diagnostic> {
    let _span = tracing::debug_span!(target: "nova.minify", "phase", name = "fixup").entered();
    let items = program.items();

    let method_outcomes: Vec<Outcome<MethodRef>> = {
        let methods = &*methods;
        program
            .method_references()
            .par_iter()
            .filter(|reference| program.method_definition(**reference).is_none())
            .filter_map(|reference| method_outcome(program, methods, *reference))
            .collect()
    };
    let field_outcomes: Vec<(FieldRef, SmolStr)> = {
        let fields = &*fields;
        program
            .field_references()
            .par_iter()
            .filter(|reference| program.field_definition(**reference).is_none())
            .filter_map(|reference| {
                let target = program.resolve_field(*reference)?;
                Some((*reference, fields.get(&target)?.clone()))
            })
            .collect()
    };

    let mut diagnostics = Vec::new();
    for outcome in method_outcomes {
        match outcome {
            Outcome::Renamed(reference, name) => {
                methods.entry(reference).or_insert(name);
            }
            Outcome::Ambiguous(reference, candidates) => {
                let candidates: Vec<String> = candidates
                    .iter()
                    .map(|candidate| items.method_to_string(*candidate))
                    .collect();
                let message = format!(
                    "{} resolves to differently renamed methods {}; keeping its name",
                    items.method_to_string(reference),
                    candidates.join(", ")
                );
                tracing::debug!(target: "nova.minify", "{message}");
                diagnostics.push(Diagnostic::error(AMBIGUOUS_REFERENCE, message));
            }
        }
    }
    for (reference, name) in field_outcomes {
        fields.entry(reference).or_insert(name);
    }
    diagnostics
}

fn method_outcome(
    program: &Program,
    methods: &HashMap<MethodRef, SmolStr>,
    reference: MethodRef,
) -> Option<Outcome<MethodRef>> {
    match program.resolve_method(reference) {
        MethodResolution::Resolved(target) => {
            let name = methods.get(&target)?;
            Some(Outcome::Renamed(reference, name.clone()))
        }
        MethodResolution::Failed(candidates) => {
            let items = program.items();
            let name_of = |candidate: &MethodRef| -> SmolStr {
                methods
                    .get(candidate)
                    .cloned()
                    .unwrap_or_else(|| SmolStr::new(items.str(candidate.name)))
            };
            let (first, rest) = candidates.split_first()?;
            let name = name_of(first);
            if rest.iter().all(|candidate| name_of(candidate) == name) {
                Some(Outcome::Renamed(reference, name))
            } else {
                Some(Outcome::Ambiguous(reference, candidates))
            }
        }
    }
}
