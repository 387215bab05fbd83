//! Task tags and `--tags` parsing

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GateError, Result};

/// Predefined task tags
pub struct Tags;

impl Tags {
    /// Implicitly selected in every inclusive tag run
    pub const ALWAYS: &'static str = "always";
    /// Code style checks (without build)
    pub const STYLE: &'static str = "style";
    /// Build
    pub const BUILD: &'static str = "build";
    /// Build with the alternative compiler only
    pub const ECJBUILD: &'static str = "ecjbuild";
    /// Full build (including warnings and extra checks)
    pub const FULLBUILD: &'static str = "fullbuild";

    /// Tags every shard of a partial run must include
    pub const SHARD_INVARIANT: [&'static str; 2] = [Self::ALWAYS, Self::BUILD];
}

static TAG_SPEC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<tag>[^:]*)(?::(?P<from>\d+)(?::(?P<to>\d+)?)?)?$").expect("Invalid regex")
});

/// Occurrence window `[from, to)` of a ranged tag. `to == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRange {
    /// First selected occurrence, 0-indexed
    pub from: usize,
    /// First occurrence no longer selected
    pub to: Option<usize>,
}

impl TagRange {
    /// Whether the occurrence `n` falls inside the window
    pub fn contains(&self, n: usize) -> bool {
        n >= self.from && self.to.map_or(true, |to| n < to)
    }
}

/// One entry of a `--tags` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    /// Tag name
    pub name: String,
    /// Optional occurrence window
    pub range: Option<TagRange>,
}

impl TagSpec {
    /// A tag without occurrence window
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: None,
        }
    }

    /// Parse `name`, `name:from`, `name:from:` or `name:from:to`
    pub fn parse(spec: &str, exclude: bool) -> Result<Self> {
        let caps = TAG_SPEC_REGEX
            .captures(spec)
            .ok_or_else(|| GateError::InvalidTagSpec(spec.to_string()))?;
        let name = caps
            .name("tag")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let Some(from) = caps.name("from") else {
            return Ok(Self::plain(name));
        };
        if exclude {
            return Err(GateError::ExcludedTagRange(spec.to_string()));
        }

        let parse = |s: &str| {
            s.parse::<usize>()
                .map_err(|_| GateError::InvalidTagSpec(spec.to_string()))
        };
        let from = parse(from.as_str())?;
        let to = caps.name("to").map(|m| parse(m.as_str())).transpose()?;
        if let Some(to) = to {
            if to <= from {
                return Err(GateError::InvalidTagRange(spec.to_string()));
            }
        }

        Ok(Self {
            name,
            range: Some(TagRange { from, to }),
        })
    }

    /// Parse a comma separated `--tags` argument
    pub fn parse_list(arg: &str, exclude: bool) -> Result<Vec<Self>> {
        arg.split(',').map(|s| Self::parse(s, exclude)).collect()
    }
}

impl fmt::Display for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match self.range {
            Some(TagRange { from, to: Some(to) }) => write!(f, ":{}:{}", from, to),
            Some(TagRange { from, to: None }) => write!(f, ":{}:", from),
            None => Ok(()),
        }
    }
}
