use nova_minify::{
    minify, ClassSpec, FieldSpec, GenericSignature, KeepRules, MethodSpec, Minifier,
    MinifyConfig, SignatureOwner, MALFORMED_SIGNATURE,
};
use pretty_assertions::assert_eq;

use super::support::{builder, class_name, field_name, method_name};

#[test]
fn unrelated_classes_reuse_short_names() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lapp/A;")
                .method(MethodSpec::new("foo", "()V"))
                .field(FieldSpec::new("count", "I")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lapp/B;")
                .method(MethodSpec::new("bar", "()V"))
                .field(FieldSpec::new("size", "I")),
        )
        .unwrap();
    let program = builder.build();
    let lens = minify(&program, &MinifyConfig::default(), KeepRules::new()).unwrap();

    assert_eq!(class_name(&program, &lens, "Lapp/A;"), "La/a;");
    assert_eq!(class_name(&program, &lens, "Lapp/B;"), "La/b;");
    assert_eq!(lens.lookup_package_name("app"), "a");
    assert_eq!(method_name(&program, &lens, "Lapp/A;", "foo", "()V"), "a");
    assert_eq!(method_name(&program, &lens, "Lapp/B;", "bar", "()V"), "a");
    assert_eq!(field_name(&program, &lens, "Lapp/A;", "count", "I"), "a");
    assert_eq!(field_name(&program, &lens, "Lapp/B;", "size", "I"), "a");
    assert!(lens.diagnostics().is_empty());
}

#[test]
fn library_overrides_keep_their_names() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::library("Ljava/lang/Runnable;")
                .interface()
                .method(MethodSpec::abstract_method("run", "()V")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lapp/Task;")
                .implements("Ljava/lang/Runnable;")
                .method(MethodSpec::new("helper", "()V"))
                .method(MethodSpec::new("run", "()V")),
        )
        .unwrap();
    let program = builder.build();
    let lens = minify(&program, &MinifyConfig::default(), KeepRules::new()).unwrap();

    assert_eq!(method_name(&program, &lens, "Lapp/Task;", "run", "()V"), "run");
    assert_eq!(method_name(&program, &lens, "Lapp/Task;", "helper", "()V"), "a");
    assert_eq!(
        class_name(&program, &lens, "Ljava/lang/Runnable;"),
        "Ljava/lang/Runnable;"
    );
}

#[test]
fn overrides_and_inherited_references_share_names() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lapp/Base;")
                .method(MethodSpec::new("work", "()V"))
                .field(FieldSpec::new("state", "I")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lapp/Sub;")
                .extends("Lapp/Base;")
                .method(MethodSpec::new("extra", "()V"))
                .method(MethodSpec::new("work", "()V")),
        )
        .unwrap();
    builder
        .add_class(ClassSpec::program("Lapp/Leaf;").extends("Lapp/Sub;"))
        .unwrap();
    builder
        .add_method_reference("Lapp/Leaf;", "work", "()V")
        .unwrap();
    builder
        .add_field_reference("Lapp/Leaf;", "state", "I")
        .unwrap();
    let program = builder.build();
    let lens = minify(&program, &MinifyConfig::default(), KeepRules::new()).unwrap();

    let work = method_name(&program, &lens, "Lapp/Base;", "work", "()V");
    assert_eq!(method_name(&program, &lens, "Lapp/Sub;", "work", "()V"), work);
    assert_eq!(method_name(&program, &lens, "Lapp/Leaf;", "work", "()V"), work);
    assert_ne!(method_name(&program, &lens, "Lapp/Sub;", "extra", "()V"), work);

    let state = field_name(&program, &lens, "Lapp/Base;", "state", "I");
    assert_eq!(field_name(&program, &lens, "Lapp/Leaf;", "state", "I"), state);
}

#[test]
fn kept_items_pin_names_and_packages() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lapp/Api;")
                .method(MethodSpec::new("call", "()V"))
                .method(MethodSpec::new("helper", "()V"))
                .field(FieldSpec::new("VERSION", "I"))
                .field(FieldSpec::new("cache", "I")),
        )
        .unwrap();
    builder.add_class(ClassSpec::program("Lapp/Impl;")).unwrap();
    let program = builder.build();
    let rules = KeepRules::new()
        .keep_class("Lapp/Api;")
        .keep_method("Lapp/Api;", "call", "()V")
        .keep_field("Lapp/Api;", "VERSION", "I");
    let lens = minify(&program, &MinifyConfig::default(), rules).unwrap();

    assert_eq!(class_name(&program, &lens, "Lapp/Api;"), "Lapp/Api;");
    assert_eq!(class_name(&program, &lens, "Lapp/Impl;"), "Lapp/a;");
    assert_eq!(method_name(&program, &lens, "Lapp/Api;", "call", "()V"), "call");
    assert_eq!(method_name(&program, &lens, "Lapp/Api;", "helper", "()V"), "a");
    assert_eq!(field_name(&program, &lens, "Lapp/Api;", "VERSION", "I"), "VERSION");
    assert_eq!(field_name(&program, &lens, "Lapp/Api;", "cache", "I"), "a");
}

#[test]
fn class_dictionary_comes_first() {
    let mut builder = builder();
    for class in ["LA;", "LB;", "LC;"] {
        builder.add_class(ClassSpec::program(class)).unwrap();
    }
    let program = builder.build();
    let config = MinifyConfig {
        class_dictionary: vec!["x".to_string(), "y".to_string()],
        ..MinifyConfig::default()
    };
    let lens = Minifier::new(&program, &config).run().unwrap();

    assert_eq!(class_name(&program, &lens, "LA;"), "Lx;");
    assert_eq!(class_name(&program, &lens, "LB;"), "Ly;");
    assert_eq!(class_name(&program, &lens, "LC;"), "La;");
}

#[test]
fn disabled_minification_keeps_every_name() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lcom/acme/Widget;")
                .method(MethodSpec::new("draw", "(I)V"))
                .field(FieldSpec::new("width", "I")),
        )
        .unwrap();
    let program = builder.build();
    let config = MinifyConfig {
        minify: false,
        ..MinifyConfig::default()
    };
    let lens = minify(&program, &config, KeepRules::new()).unwrap();

    assert_eq!(class_name(&program, &lens, "Lcom/acme/Widget;"), "Lcom/acme/Widget;");
    assert_eq!(lens.lookup_package_name("com/acme"), "com/acme");
    assert_eq!(method_name(&program, &lens, "Lcom/acme/Widget;", "draw", "(I)V"), "draw");
    assert_eq!(field_name(&program, &lens, "Lcom/acme/Widget;", "width", "I"), "width");
}

#[test]
fn member_descriptors_and_signatures_follow_renamed_classes() {
    let mut builder = builder();
    builder
        .add_class(
            ClassSpec::program("Lapp/Box;")
                .method(MethodSpec::new("get", "()Ljava/lang/Object;").signature("()TT")),
        )
        .unwrap();
    builder
        .add_class(
            ClassSpec::program("Lapp/Holder;")
                .method(MethodSpec::new("wrap", "(Lapp/Box;)[Lapp/Box;"))
                .field(FieldSpec::new("box", "Lapp/Box;").signature("Lapp/Box<Ljava/lang/String;>;")),
        )
        .unwrap();
    let program = builder.build();
    let lens = minify(&program, &MinifyConfig::default(), KeepRules::new()).unwrap();

    let wrap = program
        .lookup_method("Lapp/Holder;", "wrap", "(Lapp/Box;)[Lapp/Box;")
        .unwrap();
    assert_eq!(lens.lookup_proto_descriptor(wrap.proto), "(La/a;)[La/a;");

    let field = program.lookup_field("Lapp/Holder;", "box", "Lapp/Box;").unwrap();
    assert_eq!(
        lens.lookup_generic_signature(SignatureOwner::Field(field)),
        GenericSignature::Rewritten("La/a<Ljava/lang/String;>;")
    );
    let get = program
        .lookup_method("Lapp/Box;", "get", "()Ljava/lang/Object;")
        .unwrap();
    assert_eq!(
        lens.lookup_generic_signature(SignatureOwner::Method(get)),
        GenericSignature::Dropped
    );
    assert_eq!(lens.diagnostics().len(), 1);
    assert_eq!(lens.diagnostics()[0].code, MALFORMED_SIGNATURE);
    assert!(!lens.has_errors());
}
