use nova_minify::{
    minify, ClassMapping, ClassNaming, ClassSpec, FieldSpec, KeepRules, MemberMapping,
    MemberSignature, MethodSpec, Minifier, MinifyConfig, Program, SeedMapping,
    MISSING_MAPPING_TARGET,
};
use pretty_assertions::assert_eq;

use super::support::{builder, class_name, method_name};

fn program() -> Program {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lcom/acme/Service;")
                .interface()
                .method(MethodSpec::abstract_method("handle", "(I)V")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lcom/acme/Base;")
                .implements("Lcom/acme/Service;")
                .method(MethodSpec::new("handle", "(I)V"))
                .method(MethodSpec::new("log", "()V").private())
                .field(FieldSpec::new("count", "I")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lcom/acme/impl/Fast;")
                .extends("Lcom/acme/Base;")
                .method(MethodSpec::new("handle", "(I)V"))
                .method(MethodSpec::new("warm", "()V"))
                .field(FieldSpec::new("speed", "J")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lcom/acme/impl/Slow;")
                .extends("Lcom/acme/Base;")
                .method(MethodSpec::new("cool", "()V")),
        )
        .unwrap();
    builder
        .add_method_reference("Lcom/acme/impl/Slow;", "handle", "(I)V")
        .unwrap();
    builder.build()
}

#[test]
fn replaying_a_result_reproduces_it() {
    let program = program();
    let config = MinifyConfig::default();
    let first = minify(&program, &config, KeepRules::new()).unwrap();
    let seed = first.to_seed_mapping();

    let second = Minifier::new(&program, &config)
        .with_seed(&seed)
        .run()
        .unwrap();
    assert_eq!(second.class_namings(), first.class_namings());
    assert_eq!(
        method_name(&program, &second, "Lcom/acme/impl/Slow;", "handle", "(I)V"),
        method_name(&program, &first, "Lcom/acme/impl/Slow;", "handle", "(I)V")
    );
    assert!(second.diagnostics().is_empty());
}

#[test]
fn seeded_names_win_and_new_items_avoid_them() {
    let program = program();
    let mut seed = SeedMapping::default();
    seed.classes.insert(
        "com/acme/Base".to_string(),
        ClassMapping {
            renamed: "z/Q".to_string(),
            methods: Vec::new(),
            fields: vec![MemberMapping {
                original: MemberSignature {
                    name: "count".to_string(),
                    descriptor: "I".to_string(),
                },
                renamed: "a".to_string(),
            }],
        },
    );
    seed.classes.insert(
        "com/acme/Gone".to_string(),
        ClassMapping {
            renamed: "z/G".to_string(),
            ..ClassMapping::default()
        },
    );
    let config = MinifyConfig::default();
    let lens = Minifier::new(&program, &config)
        .with_seed(&seed)
        .run()
        .unwrap();

    assert_eq!(class_name(&program, &lens, "Lcom/acme/Base;"), "Lz/Q;");
    let base = lens
        .class_namings()
        .iter()
        .find(|naming| naming.original == "com/acme/Base")
        .unwrap();
    assert_eq!(base.fields[0].renamed, "a");
    let fast = lens
        .class_namings()
        .iter()
        .find(|naming| naming.original == "com/acme/impl/Fast")
        .unwrap();
    assert_ne!(fast.fields[0].renamed, "a");

    assert_eq!(lens.diagnostics().len(), 1);
    assert_eq!(lens.diagnostics()[0].code, MISSING_MAPPING_TARGET);
}

#[test]
fn class_namings_serialize_as_plain_records() {
    let program = program();
    let lens = minify(&program, &MinifyConfig::default(), KeepRules::new()).unwrap();
    let namings = lens.class_namings();
    assert_eq!(namings.len(), 4);

    let json = serde_json::to_string(namings).unwrap();
    let decoded: Vec<ClassNaming> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, namings);

    let json = serde_json::to_string(&lens.to_seed_mapping()).unwrap();
    let seed: SeedMapping = serde_json::from_str(&json).unwrap();
    assert_eq!(seed, lens.to_seed_mapping());
    assert_eq!(seed.classes.len(), 4);
}
