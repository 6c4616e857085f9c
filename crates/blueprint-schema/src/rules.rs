//! `blueprintignore` rules.
//!
//! One rule per line. Lines starting with `#` are comments and a leading `!`
//! re-includes whatever the rule matches. Plain lines are file globs;
//! `:package:<manager>/<name>`, `:service:<manager>/<name>` and
//! `:source:<dir>` exclude other resource kinds. When several rules match,
//! the last one wins.

use crate::SchemaError;
use glob::{MatchOptions, Pattern};
use std::fmt;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Built-in rules applied before any user-supplied ignore file.
pub const DEFAULT_RULES: &str = "\
# Machine identity and runtime state.
/etc/hostname
/etc/mailname
/etc/mtab
/etc/adjtime
/etc/ld.so.cache
/etc/ssh/ssh_host_*
/etc/udev/rules.d/70-persistent-*.rules
/etc/blkid.tab
/etc/passwd-
/etc/group-
/etc/shadow-
/etc/gshadow-

# Package manager leftovers.
*.dpkg-*
*.rpmnew
*.rpmsave
/etc/alternatives

# Version control and editor droppings.
.git
.svn
.hg
*~
*.swp
*.pyc
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    File,
    Package { manager: String },
    Service { manager: String },
    Source,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: RuleKind,
    pub negate: bool,
    pattern: Pattern,
    line: String,
}

impl Rule {
    pub fn parse(line: &str) -> Result<Option<Self>, SchemaError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        let (negate, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        let (kind, pattern) = if let Some(rest) = body.strip_prefix(':') {
            let Some((kind, arg)) = rest.split_once(':') else {
                return Err(invalid(trimmed, "expected ':<type>:<argument>'"));
            };
            match kind {
                "package" => {
                    let (manager, name) = split_managed(trimmed, arg)?;
                    (RuleKind::Package { manager }, name)
                }
                "service" => {
                    let (manager, name) = split_managed(trimmed, arg)?;
                    (RuleKind::Service { manager }, name)
                }
                "source" => {
                    if arg.is_empty() {
                        return Err(invalid(trimmed, "missing source directory"));
                    }
                    (RuleKind::Source, arg.to_owned())
                }
                other => return Err(invalid(trimmed, &format!("unknown rule type '{other}'"))),
            }
        } else {
            (RuleKind::File, body.to_owned())
        };

        let pattern = Pattern::new(&pattern).map_err(|e| invalid(trimmed, &e.to_string()))?;
        Ok(Some(Self {
            kind,
            negate,
            pattern,
            line: trimmed.to_owned(),
        }))
    }

    fn matches_path(&self, path: &str) -> bool {
        if self.pattern.as_str().starts_with('/') {
            return ancestors(path).any(|p| self.pattern.matches_with(p, MATCH_OPTIONS));
        }
        ancestors(path).any(|p| suffixes(p).any(|s| self.pattern.matches_with(s, MATCH_OPTIONS)))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

fn invalid(rule: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidRule {
        rule: rule.to_owned(),
        reason: reason.to_owned(),
    }
}

fn split_managed(rule: &str, arg: &str) -> Result<(String, String), SchemaError> {
    let (manager, name) = arg.split_once('/').unwrap_or((arg, "*"));
    if manager.is_empty() {
        return Err(invalid(rule, "missing manager"));
    }
    let name = if name.is_empty() { "*" } else { name };
    Ok((manager.to_owned(), name.to_owned()))
}

/// `/a/b/c` yields `/a`, `/a/b`, `/a/b/c`.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.char_indices()
        .filter(|&(i, c)| c == '/' && i > 0)
        .map(move |(i, _)| &path[..i])
        .chain(std::iter::once(path))
}

/// `/a/b/c` yields `a/b/c`, `b/c`, `c`.
fn suffixes(path: &str) -> impl Iterator<Item = &str> {
    path.char_indices()
        .filter(|&(_, c)| c == '/')
        .map(move |(i, _)| &path[i + 1..])
        .filter(|s| !s.is_empty())
}

/// Ordered set of ignore rules.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    rules: Vec<Rule>,
}

impl Rules {
    pub fn parse(input: &str) -> Result<Self, SchemaError> {
        let mut rules = Vec::new();
        for line in input.lines() {
            if let Some(rule) = Rule::parse(line)? {
                rules.push(rule);
            }
        }
        Ok(Self { rules })
    }

    pub fn defaults() -> Self {
        Self::parse(DEFAULT_RULES).unwrap_or_default()
    }

    /// Append `other`; its rules take precedence over ours.
    #[must_use]
    pub fn merge(mut self, other: Rules) -> Self {
        self.rules.extend(other.rules);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn ignore_file(&self, pathname: &str) -> bool {
        self.decide(|rule| rule.kind == RuleKind::File && rule.matches_path(pathname))
    }

    pub fn ignore_package(&self, manager: &str, package: &str) -> bool {
        self.decide(|rule| match &rule.kind {
            RuleKind::Package { manager: m } => {
                m == manager && rule.pattern.matches_with(package, MATCH_OPTIONS)
            }
            _ => false,
        })
    }

    pub fn ignore_service(&self, manager: &str, service: &str) -> bool {
        self.decide(|rule| match &rule.kind {
            RuleKind::Service { manager: m } => {
                m == manager && rule.pattern.matches_with(service, MATCH_OPTIONS)
            }
            _ => false,
        })
    }

    pub fn ignore_source(&self, dirname: &str) -> bool {
        self.decide(|rule| rule.kind == RuleKind::Source && rule.matches_path(dirname))
    }

    fn decide(&self, matches: impl Fn(&Rule) -> bool) -> bool {
        let mut ignored = false;
        for rule in self.rules.iter().filter(|r| matches(r)) {
            ignored = !rule.negate;
        }
        ignored
    }
}

impl<'a> IntoIterator for &'a Rules {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl fmt::Display for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}
