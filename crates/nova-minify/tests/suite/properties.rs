use std::collections::{HashMap, HashSet};

use nova_minify::{
    minify, CallSiteId, ClassSpec, FieldSpec, KeepRules, MethodSpec, Minifier, MinifyConfig,
    NamingLens, Program,
};
use proptest::prelude::*;

use super::support::builder;

const PROPTEST_CASES: u32 = 64;

const INTERFACES: usize = 3;

// Short originals collide with generated names, so kept ones must block them.
const METHODS: &[(&str, &str)] = &[
    ("a", "()V"),
    ("alpha", "()V"),
    ("alpha", "(I)V"),
    ("b", "(I)V"),
    ("beta", "()V"),
];

const FIELDS: &[(&str, &str)] = &[
    ("a", "I"),
    ("count", "I"),
    ("label", "Ljava/lang/String;"),
];

#[derive(Clone, Debug)]
struct InterfaceShape {
    /// Index of an earlier interface this one extends.
    parent: Option<usize>,
    methods: u8,
    kept: u8,
}

#[derive(Clone, Debug)]
struct ClassShape {
    /// Index of an earlier class, `None` for `java/lang/Object`.
    parent: Option<usize>,
    interfaces: u8,
    methods: u8,
    fields: u8,
    kept_methods: u8,
    kept_fields: u8,
}

#[derive(Clone, Debug)]
struct Shape {
    interfaces: Vec<InterfaceShape>,
    classes: Vec<ClassShape>,
    /// `(interface, method)` pairs implemented by lambda call sites.
    lambdas: Vec<(usize, usize)>,
}

struct Generated {
    program: Program,
    rules: KeepRules,
    lambdas: Vec<CallSiteId>,
}

fn earlier(index: prop::sample::Index, idx: usize) -> Option<usize> {
    index.index(idx + 1).checked_sub(1)
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let interfaces = prop::collection::vec(
        (any::<prop::sample::Index>(), 0u8..32, 0u8..32),
        INTERFACES,
    )
    .prop_map(|shapes| {
        shapes
            .into_iter()
            .enumerate()
            .map(|(idx, (parent, methods, kept))| InterfaceShape {
                parent: earlier(parent, idx),
                methods,
                kept: kept & methods,
            })
            .collect::<Vec<_>>()
    });
    let classes = prop::collection::vec(
        (any::<prop::sample::Index>(), 0u8..8, 0u8..32, 0u8..8, 0u8..32, 0u8..8),
        1..8,
    )
    .prop_map(|shapes| {
        shapes
            .into_iter()
            .enumerate()
            .map(
                |(idx, (parent, interfaces, methods, fields, kept_methods, kept_fields))| {
                    ClassShape {
                        parent: earlier(parent, idx),
                        interfaces,
                        methods,
                        fields,
                        kept_methods: kept_methods & methods,
                        kept_fields: kept_fields & fields,
                    }
                },
            )
            .collect::<Vec<_>>()
    });
    let lambdas = prop::collection::vec((0..INTERFACES, 0..METHODS.len()), 0..3);
    (interfaces, classes, lambdas).prop_map(|(interfaces, classes, lambdas)| Shape {
        interfaces,
        classes,
        lambdas,
    })
}

fn class(idx: usize) -> String {
    format!("Lgen/C{idx};")
}

fn interface(idx: usize) -> String {
    format!("Lgen/I{idx};")
}

fn declared<'a>(
    mask: u8,
    pool: &'a [(&'a str, &'a str)],
) -> impl Iterator<Item = (&'a str, &'a str)> {
    pool.iter()
        .enumerate()
        .filter(move |(bit, _)| mask & (1 << bit) != 0)
        .map(|(_, member)| *member)
}

fn params(descriptor: &str) -> &str {
    &descriptor[..descriptor.find(')').unwrap() + 1]
}

fn build(shape: &Shape) -> Generated {
    let mut builder = builder();
    let mut rules = KeepRules::new();
    for (idx, iface) in shape.interfaces.iter().enumerate() {
        let mut spec = ClassSpec::program(interface(idx)).interface();
        if let Some(parent) = iface.parent {
            spec = spec.implements(interface(parent));
        }
        for (name, desc) in declared(iface.methods, METHODS) {
            spec = spec.method(MethodSpec::abstract_method(name, desc));
        }
        for (name, desc) in declared(iface.kept, METHODS) {
            rules = rules.keep_method(interface(idx), name, desc);
        }
        builder.add_class(spec).unwrap();
    }
    for (idx, class_shape) in shape.classes.iter().enumerate() {
        let mut spec = ClassSpec::program(class(idx));
        if let Some(parent) = class_shape.parent {
            spec = spec.extends(class(parent));
        }
        for iface in (0..INTERFACES).filter(|iface| class_shape.interfaces & (1 << iface) != 0) {
            spec = spec.implements(interface(iface));
        }
        for (name, desc) in declared(class_shape.methods, METHODS) {
            spec = spec.method(MethodSpec::new(name, desc));
        }
        for (name, desc) in declared(class_shape.fields, FIELDS) {
            spec = spec.field(FieldSpec::new(name, desc));
        }
        for (name, desc) in declared(class_shape.kept_methods, METHODS) {
            rules = rules.keep_method(class(idx), name, desc);
        }
        for (name, desc) in declared(class_shape.kept_fields, FIELDS) {
            rules = rules.keep_field(class(idx), name, desc);
        }
        builder.add_class(spec).unwrap();
    }
    let mut lambdas = Vec::new();
    for (iface, method) in &shape.lambdas {
        let target = interface(*iface);
        let call_site = builder
            .add_call_site(METHODS[*method].0, &format!("(){target}"), &[target.as_str()])
            .unwrap();
        lambdas.push(call_site);
    }
    Generated {
        program: builder.build(),
        rules,
        lambdas,
    }
}

fn run(generated: &Generated) -> NamingLens {
    minify(
        &generated.program,
        &MinifyConfig::default(),
        generated.rules.clone(),
    )
    .unwrap()
}

/// The class itself followed by its program superclasses.
fn chain(shapes: &[ClassShape], idx: usize) -> Vec<usize> {
    std::iter::successors(Some(idx), |current| shapes[*current].parent).collect()
}

/// Every interface the class implements, through its superclasses and superinterfaces.
fn implemented(shape: &Shape, idx: usize) -> Vec<usize> {
    let mut result = Vec::new();
    for class in chain(&shape.classes, idx) {
        for iface in (0..INTERFACES).filter(|iface| shape.classes[class].interfaces & (1 << iface) != 0) {
            let mut current = Some(iface);
            while let Some(iface) = current {
                if !result.contains(&iface) {
                    result.push(iface);
                }
                current = shape.interfaces[iface].parent;
            }
        }
    }
    result
}

fn method_name<'a>(
    program: &Program,
    lens: &'a NamingLens,
    holder: &str,
    member: (&str, &str),
) -> &'a str {
    let method = program.lookup_method(holder, member.0, member.1).unwrap();
    lens.lookup_method_name(method)
}

fn field_name<'a>(
    program: &Program,
    lens: &'a NamingLens,
    holder: &str,
    member: (&str, &str),
) -> &'a str {
    let field = program.lookup_field(holder, member.0, member.1).unwrap();
    lens.lookup_field_name(field)
}

/// A member as seen from one class: its parameters (methods only), original and new name, and
/// whether a keep rule pins it.
struct Visible<'a> {
    params: &'a str,
    original: &'a str,
    renamed: &'a str,
    kept: bool,
}

fn visible_methods<'a>(
    shape: &Shape,
    program: &Program,
    lens: &'a NamingLens,
    idx: usize,
) -> Vec<Visible<'a>> {
    let mut visible = Vec::new();
    for current in chain(&shape.classes, idx) {
        let holder = class(current);
        let kept: Vec<_> = declared(shape.classes[current].kept_methods, METHODS).collect();
        for member in declared(shape.classes[current].methods, METHODS) {
            visible.push(Visible {
                params: params(member.1),
                original: member.0,
                renamed: method_name(program, lens, &holder, member),
                kept: kept.contains(&member),
            });
        }
    }
    for iface in implemented(shape, idx) {
        let holder = interface(iface);
        let kept: Vec<_> = declared(shape.interfaces[iface].kept, METHODS).collect();
        for member in declared(shape.interfaces[iface].methods, METHODS) {
            visible.push(Visible {
                params: params(member.1),
                original: member.0,
                renamed: method_name(program, lens, &holder, member),
                kept: kept.contains(&member),
            });
        }
    }
    visible
}

fn visible_fields<'a>(
    shape: &Shape,
    program: &Program,
    lens: &'a NamingLens,
    idx: usize,
) -> Vec<Visible<'a>> {
    let mut visible = Vec::new();
    for current in chain(&shape.classes, idx) {
        let holder = class(current);
        let kept: Vec<_> = declared(shape.classes[current].kept_fields, FIELDS).collect();
        for member in declared(shape.classes[current].fields, FIELDS) {
            visible.push(Visible {
                params: "",
                original: member.0,
                renamed: field_name(program, lens, &holder, member),
                kept: kept.contains(&member),
            });
        }
    }
    visible
}

proptest! {
    #![proptest_config(ProptestConfig { cases: PROPTEST_CASES, .. ProptestConfig::default() })]

    #[test]
    fn overrides_share_their_name(shape in arb_shape()) {
        let generated = build(&shape);
        let (program, lens) = (&generated.program, run(&generated));

        for idx in 0..shape.classes.len() {
            for member in declared(shape.classes[idx].methods, METHODS) {
                let name = method_name(program, &lens, &class(idx), member);
                for ancestor in chain(&shape.classes, idx).into_iter().skip(1) {
                    if declared(shape.classes[ancestor].methods, METHODS).any(|other| other == member) {
                        prop_assert_eq!(method_name(program, &lens, &class(ancestor), member), name);
                    }
                }
            }
        }
    }

    #[test]
    fn visible_members_get_distinct_names(shape in arb_shape()) {
        let generated = build(&shape);
        let (program, lens) = (&generated.program, run(&generated));

        for idx in 0..shape.classes.len() {
            // parameters -> renamed -> original
            let mut methods: HashMap<&str, HashMap<&str, &str>> = HashMap::new();
            for member in visible_methods(&shape, program, &lens, idx) {
                let original = *methods
                    .entry(member.params)
                    .or_default()
                    .entry(member.renamed)
                    .or_insert(member.original);
                prop_assert_eq!(original, member.original, "C{} method {}", idx, member.renamed);
            }
            let mut fields: HashMap<&str, &str> = HashMap::new();
            for member in visible_fields(&shape, program, &lens, idx) {
                let original = *fields.entry(member.renamed).or_insert(member.original);
                prop_assert_eq!(original, member.original, "C{} field {}", idx, member.renamed);
            }
        }

        let classes: HashSet<&str> = (0..shape.classes.len())
            .map(|idx| lens.lookup_descriptor(program.lookup_type(&class(idx)).unwrap()))
            .collect();
        prop_assert_eq!(classes.len(), shape.classes.len());
    }

    #[test]
    fn kept_names_are_never_handed_out_again(shape in arb_shape()) {
        let generated = build(&shape);
        let (program, lens) = (&generated.program, run(&generated));

        for idx in 0..shape.classes.len() {
            for members in [
                visible_methods(&shape, program, &lens, idx),
                visible_fields(&shape, program, &lens, idx),
            ] {
                for kept in members.iter().filter(|member| member.kept) {
                    prop_assert_eq!(kept.renamed, kept.original);
                    for other in &members {
                        if other.params == kept.params && other.original != kept.original {
                            prop_assert_ne!(other.renamed, kept.renamed, "C{} {}", idx, other.original);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn implementations_share_the_interface_name(shape in arb_shape()) {
        let generated = build(&shape);
        let (program, lens) = (&generated.program, run(&generated));

        for idx in 0..shape.classes.len() {
            for iface in implemented(&shape, idx) {
                for member in declared(shape.interfaces[iface].methods, METHODS) {
                    let name = method_name(program, &lens, &interface(iface), member);
                    for current in chain(&shape.classes, idx) {
                        if declared(shape.classes[current].methods, METHODS).any(|other| other == member) {
                            prop_assert_eq!(method_name(program, &lens, &class(current), member), name);
                        }
                    }
                }
            }
        }
        for (call_site, (iface, method)) in generated.lambdas.iter().zip(&shape.lambdas) {
            let member = METHODS[*method];
            if declared(shape.interfaces[*iface].methods, METHODS).any(|other| other == member) {
                let name = method_name(program, &lens, &interface(*iface), member);
                prop_assert_eq!(lens.lookup_call_site_name(*call_site), Some(name));
            }
        }
    }

    #[test]
    fn replaying_a_result_reproduces_it(shape in arb_shape()) {
        let generated = build(&shape);
        let first = run(&generated);
        let seed = first.to_seed_mapping();

        let config = MinifyConfig::default();
        let second = Minifier::new(&generated.program, &config)
            .with_keep_rules(generated.rules.clone())
            .with_seed(&seed)
            .run()
            .unwrap();
        prop_assert_eq!(second.class_namings(), first.class_namings());
        prop_assert!(second.diagnostics().is_empty());
    }

    #[test]
    fn renaming_is_deterministic(shape in arb_shape()) {
        let first = run(&build(&shape));
        let second = run(&build(&shape));
        prop_assert_eq!(first.class_namings(), second.class_namings());
        prop_assert_eq!(first.to_seed_mapping(), second.to_seed_mapping());
    }
}
