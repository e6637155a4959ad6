use nova_minify::{ClassSpec, NamingLens, Program, ProgramBuilder, OBJECT_DESCRIPTOR};

pub fn builder() -> ProgramBuilder {
    let mut builder = ProgramBuilder::new();
    builder
        .add_class(ClassSpec::library(OBJECT_DESCRIPTOR))
        .unwrap();
    builder
}

pub fn class_name<'a>(program: &Program, lens: &'a NamingLens, descriptor: &str) -> &'a str {
    lens.lookup_descriptor(program.lookup_type(descriptor).unwrap())
}

pub fn method_name<'a>(
    program: &Program,
    lens: &'a NamingLens,
    holder: &str,
    name: &str,
    descriptor: &str,
) -> &'a str {
    lens.lookup_method_name(program.lookup_method(holder, name, descriptor).unwrap())
}

pub fn field_name<'a>(
    program: &Program,
    lens: &'a NamingLens,
    holder: &str,
    name: &str,
    descriptor: &str,
) -> &'a str {
    lens.lookup_field_name(program.lookup_field(holder, name, descriptor).unwrap())
}
