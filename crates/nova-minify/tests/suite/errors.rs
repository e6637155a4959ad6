use nova_minify::{
    minify, ClassMapping, ClassSpec, KeepRules, MemberMapping, MemberSignature, MethodSpec,
    Minifier, MinifyConfig, MinifyError, OverloadKey, Program, SeedMapping,
};

use super::support::builder;

fn base_and_sub() -> Program {
    let mut builder = builder();
    builder
        .add_class(ClassSpec::program("Lp/Base;").method(MethodSpec::new("one", "()V")))
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lp/Sub;")
                .extends("Lp/Base;")
                .method(MethodSpec::new("two", "()V")),
        )
        .unwrap();
    builder.build()
}

fn method_mapping(name: &str, renamed: &str) -> MemberMapping {
    typed_method_mapping(name, "()V", renamed)
}

fn typed_method_mapping(name: &str, descriptor: &str, renamed: &str) -> MemberMapping {
    MemberMapping {
        original: MemberSignature {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        },
        renamed: renamed.to_string(),
    }
}

fn map_class(seed: &mut SeedMapping, original: &str, renamed: &str, methods: Vec<MemberMapping>) {
    seed.classes.insert(
        original.to_string(),
        ClassMapping {
            renamed: renamed.to_string(),
            methods,
            fields: Vec::new(),
        },
    );
}

#[test]
fn related_members_forced_to_one_name_fail() {
    let program = base_and_sub();
    let mut seed = SeedMapping::default();
    seed.classes.insert(
        "p/Base".to_string(),
        ClassMapping {
            renamed: "q/A".to_string(),
            methods: vec![method_mapping("one", "x")],
            fields: Vec::new(),
        },
    );
    seed.classes.insert(
        "p/Sub".to_string(),
        ClassMapping {
            renamed: "q/B".to_string(),
            methods: vec![method_mapping("two", "x")],
            fields: Vec::new(),
        },
    );
    let config = MinifyConfig::default();
    let result = Minifier::new(&program, &config).with_seed(&seed).run();
    match result {
        Err(MinifyError::ConflictingMemberName { name, .. }) => assert_eq!(name, "x"),
        other => panic!("expected a member name conflict, got {other:?}"),
    }
}

#[test]
fn interfaces_forcing_one_name_on_a_shared_implementor_fail() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lp/I;")
                .interface()
                .method(MethodSpec::abstract_method("m", "()V")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lp/J;")
                .interface()
                .method(MethodSpec::abstract_method("n", "()V")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lp/C;")
                .implements("Lp/I;")
                .implements("Lp/J;")
                .method(MethodSpec::new("m", "()V"))
                .method(MethodSpec::new("n", "()V")),
        )
        .unwrap();
    let program = builder.build();
    let mut seed = SeedMapping::default();
    map_class(&mut seed, "p/I", "q/I", vec![method_mapping("m", "x")]);
    map_class(&mut seed, "p/J", "q/J", vec![method_mapping("n", "x")]);

    let config = MinifyConfig::default();
    let result = Minifier::new(&program, &config).with_seed(&seed).run();
    match result {
        Err(MinifyError::ConflictingMemberName { name, first, second }) => {
            assert_eq!(name, "x");
            assert_eq!(first, "Lp/I;->m");
            assert_eq!(second, "Lp/J;->n");
        }
        other => panic!("expected a member name conflict, got {other:?}"),
    }
}

#[test]
fn unified_lambda_methods_forced_to_different_names_fail() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lp/I1;")
                .interface()
                .method(MethodSpec::abstract_method("m", "()Ljava/lang/Object;")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lp/I2;")
                .interface()
                .implements("Lp/I1;")
                .method(MethodSpec::abstract_method("m", "()Ljava/lang/String;")),
        )
        .unwrap();
    builder.add_call_site("m", "()Lp/I2;", &["Lp/I2;"]).unwrap();
    let program = builder.build();
    let mut seed = SeedMapping::default();
    map_class(
        &mut seed,
        "p/I1",
        "q/I1",
        vec![typed_method_mapping("m", "()Ljava/lang/Object;", "x")],
    );
    map_class(
        &mut seed,
        "p/I2",
        "q/I2",
        vec![typed_method_mapping("m", "()Ljava/lang/String;", "y")],
    );

    for overload_key in [OverloadKey::Parameters, OverloadKey::FullSignature] {
        let config = MinifyConfig {
            overload_key,
            ..MinifyConfig::default()
        };
        let result = Minifier::new(&program, &config).with_seed(&seed).run();
        match result {
            Err(MinifyError::ConflictingMemberName { name, first, second }) => {
                assert_eq!(name, "y", "{overload_key:?}");
                assert_eq!(first, "Lp/I1;->m");
                assert_eq!(second, "Lp/I2;->m");
            }
            other => panic!("expected a member name conflict, got {other:?}"),
        }
    }
}

#[test]
fn classes_seeded_to_one_name_fail() {
    let program = base_and_sub();
    let mut seed = SeedMapping::default();
    for class in ["p/Base", "p/Sub"] {
        seed.classes.insert(
            class.to_string(),
            ClassMapping {
                renamed: "q/Same".to_string(),
                ..ClassMapping::default()
            },
        );
    }
    let config = MinifyConfig::default();
    let result = Minifier::new(&program, &config).with_seed(&seed).run();
    assert!(matches!(result, Err(MinifyError::ConflictingClassName { .. })));
}

#[test]
fn exhausted_candidates_are_reported() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("LA;")
                .method(MethodSpec::new("a", "()V"))
                .method(MethodSpec::new("work", "()V")),
        )
        .unwrap();
    let program = builder.build();
    let config = MinifyConfig {
        max_name_attempts: 1,
        ..MinifyConfig::default()
    };
    let rules = KeepRules::new().keep_method("LA;", "a", "()V");
    let result = minify(&program, &config, rules);
    match result {
        Err(MinifyError::NameSpaceExhausted { item, attempts }) => {
            assert_eq!(item, "LA;->work()V");
            assert_eq!(attempts, 1);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[test]
fn invalid_configuration_is_rejected_before_renaming() {
    let program = base_and_sub();
    let config = MinifyConfig {
        member_dictionary: vec!["has space".to_string()],
        ..MinifyConfig::default()
    };
    let result = minify(&program, &config, KeepRules::new());
    assert!(matches!(result, Err(MinifyError::Config(_))));
}
