use serde::{Deserialize, Serialize};

/// Textual convention of the input. `Old` is llvm-gcc (any version) or
/// clang 2.7; `New` is clang 2.8, which marks unnamed blocks with `<label>`.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Old,
    #[default]
    New,
}

impl Dialect {
    pub fn detect(lines: &[String]) -> Dialect {
        let has = |marker: &str| lines.iter().any(|l| l.contains(marker));
        if !has("<label>") && has("entry:") {
            Dialect::Old
        } else {
            Dialect::New
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Unset means detect from the input.
    #[serde(default)]
    pub dialect: Option<Dialect>,

    #[serde(default)]
    pub fake_x86_fp80: bool,

    /// Off: function bodies are captured as stubs and parsed on demand.
    #[serde(default)]
    pub parse_function_bodies: bool,
}

impl Config {
    pub fn eager() -> Self {
        Config {
            parse_function_bodies: true,
            ..Config::default()
        }
    }

    pub fn resolve_dialect(&self, lines: &[String]) -> Dialect {
        self.dialect.unwrap_or_else(|| Dialect::detect(lines))
    }
}
