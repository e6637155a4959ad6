use crate::classes::ClassRenamer;
use crate::config::MinifyConfig;
use crate::error::Result;
use crate::fields::FieldRenamer;
use crate::fixup::fix_non_rebound_references;
use crate::lens::NamingLens;
use crate::methods::MethodRenamer;
use crate::program::Program;
use crate::seed::SeedMapping;
use crate::strategy::{ApplyMappingStrategy, KeepRules, MinificationStrategy, NamingStrategy};

/// One renaming pass over a program.
///
/// ```
/// use nova_minify::{ClassSpec, Minifier, MinifyConfig, ProgramBuilder};
///
/// let mut builder = ProgramBuilder::new();
/// builder.add_class(ClassSpec::library("Ljava/lang/Object;")).unwrap();
/// builder.add_class(ClassSpec::program("Lcom/example/Service;")).unwrap();
/// let program = builder.build();
///
/// let config = MinifyConfig::default();
/// let lens = Minifier::new(&program, &config).run().unwrap();
/// let service = program.lookup_type("Lcom/example/Service;").unwrap();
/// assert_eq!(lens.lookup_descriptor(service), "La/a/a;");
/// ```
pub struct Minifier<'a> {
    program: &'a Program,
    config: &'a MinifyConfig,
    keep_rules: KeepRules,
    seed: Option<&'a SeedMapping>,
}

impl<'a> Minifier<'a> {
    pub fn new(program: &'a Program, config: &'a MinifyConfig) -> Self {
        Self {
            program,
            config,
            keep_rules: KeepRules::new(),
            seed: None,
        }
    }

    pub fn with_keep_rules(mut self, keep_rules: KeepRules) -> Self {
        self.keep_rules = keep_rules;
        self
    }

    /// Replays `seed` before anything else is named.
    pub fn with_seed(mut self, seed: &'a SeedMapping) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn run(self) -> Result<NamingLens> {
        let program = self.program;
        let config = self.config;
        let _span = tracing::debug_span!(
            target: "nova.minify",
            "minify",
            classes = program.classes().len(),
            seeded = self.seed.is_some()
        )
        .entered();
        config.validate()?;

        let seed = self
            .seed
            .map(|seed| seed.resolve(program))
            .transpose()?;
        let minification = MinificationStrategy::new(program, config, &self.keep_rules);
        let strategy: Box<dyn NamingStrategy + '_> = match &seed {
            Some(seed) => Box::new(ApplyMappingStrategy::new(seed, minification)),
            None => Box::new(minification),
        };
        let strategy = strategy.as_ref();

        let mut renamer = ClassRenamer::new(program, config, strategy);
        if let Some(seed) = &seed {
            renamer = renamer.with_seed_packages(seed.packages());
        }
        let mut classes = renamer.run()?;
        let mut methods = MethodRenamer::new(program, config, strategy).run()?;
        let mut fields = FieldRenamer::new(program, config, strategy).run()?;

        let mut diagnostics = seed
            .as_ref()
            .map(|seed| seed.diagnostics().to_vec())
            .unwrap_or_default();
        diagnostics.append(&mut classes.diagnostics);
        diagnostics.extend(fix_non_rebound_references(
            program,
            &mut methods.methods,
            &mut fields,
        ));

        let mut lens = NamingLens::new(program, classes, methods, fields, diagnostics);
        if let Some(seed) = &seed {
            lens.add_method_names(seed.methods().map(|(method, name)| (method, name.clone())));
            lens.add_field_names(seed.fields().map(|(field, name)| (field, name.clone())));
        }
        tracing::debug!(
            target: "nova.minify",
            classes = lens.class_namings().len(),
            diagnostics = lens.diagnostics().len(),
            "renaming finished"
        );
        Ok(lens)
    }
}

/// Renames `program` with the default strategy.
pub fn minify(program: &Program, config: &MinifyConfig, keep_rules: KeepRules) -> Result<NamingLens> {
    Minifier::new(program, config)
        .with_keep_rules(keep_rules)
        .run()
}
