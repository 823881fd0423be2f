use std::{fmt, str::FromStr};

use crate::source::SourceKind;

/// How the two branches of UNION/INTERSECT/EXCEPT get their input rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompoundMode {
    /// Both branches run over the rows loaded for the primary query's FROM
    /// table; each branch's own FROM name is not re-resolved.
    #[default]
    SharedBaseRows,
    /// Each branch loads its own FROM table and applies its own joins.
    Independent,
}

impl fmt::Display for CompoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompoundMode::SharedBaseRows => "shared",
            CompoundMode::Independent => "independent",
        })
    }
}

impl FromStr for CompoundMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared" | "shared-base-rows" => Ok(CompoundMode::SharedBaseRows),
            "independent" => Ok(CompoundMode::Independent),
            other => Err(format!(
                "unknown compound mode '{}' (expected 'shared' or 'independent')",
                other
            )),
        }
    }
}

/// Engine-wide execution settings.
///
/// # Examples
///
/// ```
/// use recql::{CompoundMode, EngineOptions, SourceKind};
///
/// let options = EngineOptions::default()
///     .with_compound_mode(CompoundMode::Independent)
///     .with_default_source(SourceKind::Api);
/// assert!(options.cache_sources);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub compound_mode: CompoundMode,
    /// Kind used for table references that do not name one
    pub default_source: SourceKind,
    /// Reuse a loaded source for the rest of one statement's execution
    pub cache_sources: bool,
    /// Answer `column = literal` filters through a hash index instead of a
    /// row-by-row scan. Both paths return the same rows.
    pub equality_index: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            compound_mode: CompoundMode::default(),
            default_source: SourceKind::default(),
            cache_sources: true,
            equality_index: true,
        }
    }
}

impl EngineOptions {
    pub fn with_compound_mode(mut self, mode: CompoundMode) -> Self {
        self.compound_mode = mode;
        self
    }

    pub fn with_default_source(mut self, kind: SourceKind) -> Self {
        self.default_source = kind;
        self
    }

    pub fn with_source_cache(mut self, enabled: bool) -> Self {
        self.cache_sources = enabled;
        self
    }

    pub fn with_equality_index(mut self, enabled: bool) -> Self {
        self.equality_index = enabled;
        self
    }
}
