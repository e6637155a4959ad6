use smol_str::SmolStr;

/// Java keywords and literals that can never be used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while",
];

pub(crate) fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Per-scope generator position.
///
/// Child scopes start from their parent's dictionary and virtual positions, so names a subclass
/// generates never collide with names still to be handed out in the parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NameCounter {
    pub dictionary_index: usize,
    pub virtual_index: u64,
    pub direct_index: u64,
}

impl Default for NameCounter {
    fn default() -> Self {
        Self {
            dictionary_index: 0,
            virtual_index: 1,
            direct_index: 0,
        }
    }
}

impl NameCounter {
    /// A fresh counter for a child scope.
    pub fn inherit(parent: &NameCounter) -> Self {
        Self {
            dictionary_index: parent.dictionary_index,
            virtual_index: parent.virtual_index,
            direct_index: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CounterKind {
    /// Classes, fields and virtual methods.
    Virtual,
    /// Private, static and other directly dispatched methods.
    Direct,
}

/// Produces candidate names: dictionary words first, then `a, b, .., z, aa, ba, ..`.
#[derive(Clone, Debug)]
pub(crate) struct NameGenerator {
    dictionary: Vec<SmolStr>,
    mixed_case: bool,
    max_attempts: u32,
}

impl NameGenerator {
    pub fn new(dictionary: &[String], mixed_case: bool, max_attempts: u32) -> Self {
        Self {
            dictionary: dictionary.iter().map(SmolStr::new).collect(),
            mixed_case,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draws candidates until `is_available` accepts one. Returns `None` once `max_attempts`
    /// candidates were rejected.
    pub fn next_name(
        &self,
        counter: &mut NameCounter,
        kind: CounterKind,
        mut is_available: impl FnMut(&str) -> bool,
    ) -> Option<SmolStr> {
        for _ in 0..self.max_attempts {
            let candidate = match self.dictionary.get(counter.dictionary_index) {
                Some(word) => {
                    counter.dictionary_index += 1;
                    word.clone()
                }
                None => {
                    let index = match kind {
                        CounterKind::Virtual => {
                            counter.virtual_index += 1;
                            counter.virtual_index - 1
                        }
                        CounterKind::Direct => {
                            counter.direct_index += 1;
                            counter.virtual_index + counter.direct_index - 1
                        }
                    };
                    number_to_identifier(index, self.mixed_case)
                }
            };
            if is_reserved_word(&candidate) {
                continue;
            }
            if is_available(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

/// Bijective base-26 (or base-52 with `mixed_case`) numbering, least significant letter first:
/// 1 -> `a`, 26 -> `z`, 27 -> `aa`, 28 -> `ba`.
fn number_to_identifier(index: u64, mixed_case: bool) -> SmolStr {
    let base: u64 = if mixed_case { 52 } else { 26 };
    let mut remaining = index;
    let mut out = String::new();
    while remaining > 0 {
        remaining -= 1;
        let digit = (remaining % base) as u8;
        out.push(if digit < 26 {
            char::from(b'a' + digit)
        } else {
            char::from(b'A' + digit - 26)
        });
        remaining /= base;
    }
    SmolStr::new(out)
}
