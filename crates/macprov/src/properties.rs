//! Property queries used to pick among cipher implementations
//!
//! Grammar (comma separated clauses):
//! ```text
//! name=value    required equality
//! name!=value   required inequality
//! ?name=value   preference; never filters, only ranks
//! name          shorthand for name=yes
//! ```

/// A single `name=value` property advertised by an implementation.
pub type Property = (&'static str, &'static str);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Eq { name: String, value: String, optional: bool },
    Ne { name: String, value: String },
}

impl Clause {
    fn name(&self) -> &str {
        match self {
            Clause::Eq { name, .. } | Clause::Ne { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyQuery {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParseError(pub String);

impl PropertyQuery {
    pub fn parse(query: &str) -> Result<Self, QueryParseError> {
        let mut clauses = Vec::new();
        for raw in query.split(',') {
            let clause = raw.trim();
            if clause.is_empty() {
                continue;
            }
            let (optional, clause) = match clause.strip_prefix('?') {
                Some(rest) => (true, rest.trim()),
                None => (false, clause),
            };

            let parsed = if let Some((name, value)) = clause.split_once("!=") {
                if optional {
                    return Err(QueryParseError(format!(
                        "optional clause cannot use '!=': {raw}"
                    )));
                }
                Clause::Ne {
                    name: normalize_name(name)?,
                    value: normalize_value(value)?,
                }
            } else if let Some((name, value)) = clause.split_once('=') {
                Clause::Eq {
                    name: normalize_name(name)?,
                    value: normalize_value(value)?,
                    optional,
                }
            } else {
                Clause::Eq {
                    name: normalize_name(clause)?,
                    value: "yes".into(),
                    optional,
                }
            };
            clauses.push(parsed);
        }
        Ok(Self { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Layer `self` over `defaults`: a clause in `self` replaces every
    /// default clause with the same name.
    pub fn merged_over(&self, defaults: &PropertyQuery) -> PropertyQuery {
        let mut clauses: Vec<Clause> = defaults
            .clauses
            .iter()
            .filter(|d| !self.clauses.iter().any(|c| c.name() == d.name()))
            .cloned()
            .collect();
        clauses.extend(self.clauses.iter().cloned());
        PropertyQuery { clauses }
    }

    /// True when every required clause holds for `props`.
    pub fn matches(&self, props: &[Property]) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq {
                optional: true, ..
            } => true,
            Clause::Eq { name, value, .. } => lookup(props, name) == Some(value.as_str()),
            Clause::Ne { name, value } => lookup(props, name) != Some(value.as_str()),
        })
    }

    /// Number of optional clauses satisfied by `props`.
    pub fn preference_score(&self, props: &[Property]) -> usize {
        self.clauses
            .iter()
            .filter(|clause| match clause {
                Clause::Eq {
                    name,
                    value,
                    optional: true,
                } => lookup(props, name) == Some(value.as_str()),
                _ => false,
            })
            .count()
    }
}

fn lookup<'a>(props: &'a [Property], name: &str) -> Option<&'a str> {
    props
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| *v)
}

fn normalize_name(name: &str) -> Result<String, QueryParseError> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    if !valid {
        return Err(QueryParseError(format!("invalid property name '{name}'")));
    }
    Ok(name.to_ascii_lowercase())
}

fn normalize_value(value: &str) -> Result<String, QueryParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(QueryParseError("empty property value".into()));
    }
    Ok(value.to_string())
}
