use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::error::{MinifyError, Result};

/// Which part of a method signature partitions the method naming scopes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OverloadKey {
    /// Methods that differ only in their return type share names (safe for every consumer).
    #[default]
    Parameters,
    /// Parameters and return type ("aggressive overloading"); only valid for class-file output.
    FullSignature,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PackageObfuscation {
    /// Rename packages in place, keeping the package tree shape.
    #[default]
    None,
    /// Move every renamed class into `package_prefix`.
    Repackage,
    /// Map every original package to a fresh package directly below `package_prefix`.
    Flatten,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MinifyConfig {
    /// When false every class, package and member keeps its original name.
    #[serde(default = "default_minify")]
    pub minify: bool,
    #[serde(default)]
    pub overload_key: OverloadKey,
    #[serde(default)]
    pub package_obfuscation: PackageObfuscation,
    /// Target package for `repackage`/`flatten`, in `a.b` or `a/b` form. Empty for the default
    /// package.
    #[serde(default)]
    pub package_prefix: String,
    /// Without access modification, packages holding kept classes keep their name so
    /// package-private access keeps working.
    #[serde(default)]
    pub allow_access_modification: bool,
    /// Nested classes are renamed inside the namespace of their (renamed) outer class.
    #[serde(default)]
    pub keep_inner_class_structure: bool,
    /// Package patterns (`com.example` or `com.example.**`) whose classes are renamed in place.
    #[serde(default)]
    pub keep_package_names: Vec<String>,
    #[serde(default)]
    pub class_dictionary: Vec<String>,
    #[serde(default)]
    pub package_dictionary: Vec<String>,
    #[serde(default)]
    pub member_dictionary: Vec<String>,
    /// Allow upper case letters in generated class and package names.
    #[serde(default)]
    pub mixed_case_class_names: bool,
    /// Simple class names never handed out in any namespace.
    #[serde(default = "default_reserved_class_names")]
    pub reserved_class_names: Vec<String>,
    /// Upper bound on candidates drawn for a single item before giving up.
    #[serde(default = "default_max_name_attempts")]
    pub max_name_attempts: u32,
}

fn default_minify() -> bool {
    true
}

fn default_reserved_class_names() -> Vec<String> {
    vec!["R".to_string()]
}

fn default_max_name_attempts() -> u32 {
    1_000_000
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self {
            minify: default_minify(),
            overload_key: OverloadKey::default(),
            package_obfuscation: PackageObfuscation::default(),
            package_prefix: String::new(),
            allow_access_modification: false,
            keep_inner_class_structure: false,
            keep_package_names: Vec::new(),
            class_dictionary: Vec::new(),
            package_dictionary: Vec::new(),
            member_dictionary: Vec::new(),
            mixed_case_class_names: false,
            reserved_class_names: default_reserved_class_names(),
            max_name_attempts: default_max_name_attempts(),
        }
    }
}

impl MinifyConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: MinifyConfig =
            toml::from_str(text).map_err(|err| MinifyError::Config(err.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_name_attempts == 0 {
            return Err(MinifyError::Config(
                "max_name_attempts must be at least 1".to_string(),
            ));
        }
        let dictionaries = [
            ("class_dictionary", &self.class_dictionary),
            ("package_dictionary", &self.package_dictionary),
            ("member_dictionary", &self.member_dictionary),
            ("reserved_class_names", &self.reserved_class_names),
        ];
        for (field, words) in dictionaries {
            if let Some(word) = words.iter().find(|word| !is_valid_simple_name(word)) {
                return Err(MinifyError::Config(format!(
                    "{field} entry {word:?} is not a valid simple name"
                )));
            }
        }
        let prefix = self.package_prefix_binary();
        if !prefix.is_empty() && !prefix.split('/').all(is_valid_simple_name) {
            return Err(MinifyError::Config(format!(
                "package_prefix {:?} is not a valid package name",
                self.package_prefix
            )));
        }
        Ok(())
    }

    /// `package_prefix` in internal (`/`-separated) form.
    pub fn package_prefix_binary(&self) -> String {
        self.package_prefix.replace('.', "/")
    }

    /// Whether `package` (internal form) matches one of `keep_package_names`.
    pub fn keeps_package_name(&self, package: &str) -> bool {
        self.keep_package_names.iter().any(|pattern| {
            let pattern = pattern.replace('.', "/");
            match pattern.strip_suffix("/**") {
                Some(root) => package == root || package.starts_with(&format!("{root}/")),
                None => pattern == "**" || package == pattern,
            }
        })
    }
}

fn is_valid_simple_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '.' | ';' | '[' | '/' | '<' | '>') || c.is_whitespace())
}

/// JSON schema for the `[minify]` configuration table.
#[must_use]
pub fn json_schema() -> RootSchema {
    schema_for!(MinifyConfig)
}
