use nova_minify::{minify, ClassSpec, KeepRules, MethodSpec, MinifyConfig, OverloadKey};
use pretty_assertions::assert_eq;

use super::support::{builder, method_name};

#[test]
fn lambdas_unify_methods_that_differ_in_return_type() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("LI1;")
                .interface()
                .method(MethodSpec::abstract_method("m", "()Ljava/lang/Object;")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("LI2;")
                .interface()
                .implements("LI1;")
                .method(MethodSpec::abstract_method("m", "()Ljava/lang/String;")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("LImpl;")
                .implements("LI2;")
                .method(MethodSpec::new("m", "()Ljava/lang/String;")),
        )
        .unwrap();
    let call_site = builder.add_call_site("m", "()LI2;", &["LI2;"]).unwrap();
    let program = builder.build();
    let config = MinifyConfig {
        overload_key: OverloadKey::FullSignature,
        ..MinifyConfig::default()
    };
    let lens = minify(&program, &config, KeepRules::new()).unwrap();

    let name = method_name(&program, &lens, "LI1;", "m", "()Ljava/lang/Object;");
    assert_ne!(name, "m");
    assert_eq!(method_name(&program, &lens, "LI2;", "m", "()Ljava/lang/String;"), name);
    assert_eq!(method_name(&program, &lens, "LImpl;", "m", "()Ljava/lang/String;"), name);
    assert_eq!(lens.lookup_call_site_name(call_site), Some(name));
}

#[test]
fn intersection_markers_avoid_the_lambda_name() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("LFunction;")
                .interface()
                .method(MethodSpec::abstract_method("m", "()V")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("LMarker;")
                .interface()
                .method(MethodSpec::new("n", "()V")),
        )
        .unwrap();
    let call_site = builder
        .add_call_site("m", "()LFunction;", &["LFunction;", "LMarker;"])
        .unwrap();
    let program = builder.build();
    let lens = minify(&program, &MinifyConfig::default(), KeepRules::new()).unwrap();

    let lambda = method_name(&program, &lens, "LFunction;", "m", "()V");
    let marker = method_name(&program, &lens, "LMarker;", "n", "()V");
    assert_eq!(lens.lookup_call_site_name(call_site), Some(lambda));
    assert_ne!(marker, lambda);
}

#[test]
fn shared_implementations_get_one_name_across_interfaces() {
    let mut builder = builder();
    for iface in ["Lapi/Reader;", "Lapi/Source;"] {
        builder
            .add_class(
                ClassSpec::program(iface)
                    .interface()
                    .method(MethodSpec::abstract_method("read", "(I)I")),
            )
            .unwrap();
    }
    builder
        .add_class(
            ClassSpec::program("Lapi/FileSource;")
                .implements("Lapi/Reader;")
                .implements("Lapi/Source;")
                .method(MethodSpec::new("close", "(I)I"))
                .method(MethodSpec::new("read", "(I)I")),
        )
        .unwrap();
    builder
        .add_class(ClassSpec::program("Lapi/BufferedSource;").extends("Lapi/FileSource;"))
        .unwrap();
    builder
        .add_method_reference("Lapi/BufferedSource;", "read", "(I)I")
        .unwrap();
    let program = builder.build();
    let lens = minify(&program, &MinifyConfig::default(), KeepRules::new()).unwrap();

    let read = method_name(&program, &lens, "Lapi/Reader;", "read", "(I)I");
    assert_eq!(method_name(&program, &lens, "Lapi/Source;", "read", "(I)I"), read);
    assert_eq!(method_name(&program, &lens, "Lapi/FileSource;", "read", "(I)I"), read);
    assert_eq!(
        method_name(&program, &lens, "Lapi/BufferedSource;", "read", "(I)I"),
        read
    );
    assert_ne!(method_name(&program, &lens, "Lapi/FileSource;", "close", "(I)I"), read);
}
