//! Structured and raw query requests.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, Result};

/// Prefix of attribute properties as loaded from the bulk-import headers.
pub const DEFAULT_ATTRIBUTE_PREFIX: &str = "attr_";

/// Fields matched directly rather than as prefixed attributes.
const CORE_FIELDS: [&str; 3] = ["uid", "id", "name"];

/// `field = value` equality constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// `uid`, `id`, `name` or an attribute column name (without prefix).
    pub field: String,
    /// Expected value, compared as text.
    pub value: String,
}

impl Constraint {
    /// Builds a constraint.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the field is one of the core node fields.
    pub fn is_core(&self) -> bool {
        CORE_FIELDS.contains(&self.field.as_str())
    }
}

impl FromStr for Constraint {
    type Err = QueryError;

    /// Parses `field=value`.
    fn from_str(s: &str) -> Result<Self> {
        let (field, value) = s.split_once('=').unwrap_or((s, ""));
        let field = field.trim();
        if field.is_empty() {
            return Err(QueryError::EmptyField {
                constraint: s.to_owned(),
            });
        }
        Ok(Self::new(field, value.trim()))
    }
}

/// Node lookup: optional primary label plus conjunctive constraints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeQuery {
    /// Primary label; any label when `None`.
    pub label: Option<String>,
    /// All must hold.
    pub constraints: Vec<Constraint>,
}

impl NodeQuery {
    /// Matches every node with `label`.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            constraints: Vec::new(),
        }
    }

    /// Adds an equality constraint.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.push(Constraint::new(field, value));
        self
    }

    fn validate(&self) -> Result<()> {
        match self.constraints.iter().find(|c| c.field.trim().is_empty()) {
            Some(c) => Err(QueryError::EmptyField {
                constraint: format!("{}={}", c.field, c.value),
            }),
            None => Ok(()),
        }
    }

    fn pattern(&self, var: &str) -> String {
        match &self.label {
            Some(label) => format!("({var}:{label})"),
            None => format!("({var})"),
        }
    }

    fn predicates(&self, var: &str, prefix: &str, out: &mut Vec<String>) {
        for c in &self.constraints {
            let property = if c.is_core() {
                c.field.clone()
            } else {
                format!("{prefix}{}", c.field)
            };
            let literal = if c.field == "uid" && c.value.parse::<u64>().is_ok() {
                c.value.clone()
            } else {
                quote(&c.value)
            };
            out.push(format!("{var}.{property} = {literal}"));
        }
    }
}

/// Directed paths of 1..=`max_hops` relations between two node sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathQuery {
    /// Start nodes.
    pub from: NodeQuery,
    /// End nodes.
    pub to: NodeQuery,
    /// Longest path considered, in relations.
    pub max_hops: usize,
}

/// Query accepted by a [`GraphDriver`](super::GraphDriver).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Node lookup, returned in column `n`.
    Nodes(NodeQuery),
    /// Shortest paths, returned in column `p`.
    Paths(PathQuery),
    /// Pass-through query text.
    Raw(String),
}

impl Query {
    /// Kind name used in errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Nodes(_) => "node",
            Query::Paths(_) => "path",
            Query::Raw(_) => "raw",
        }
    }

    /// Rejects malformed input before it reaches a driver.
    pub fn validate(&self) -> Result<()> {
        match self {
            Query::Nodes(q) => q.validate(),
            Query::Paths(q) => {
                if q.max_hops == 0 {
                    return Err(QueryError::InvalidHops);
                }
                q.from.validate()?;
                q.to.validate()
            }
            Query::Raw(text) if text.trim().is_empty() => Err(QueryError::EmptyQuery),
            Query::Raw(_) => Ok(()),
        }
    }

    /// Cypher text using the default attribute prefix.
    pub fn to_cypher(&self) -> String {
        self.to_cypher_with_prefix(DEFAULT_ATTRIBUTE_PREFIX)
    }

    /// Cypher text; raw queries are returned unchanged.
    pub fn to_cypher_with_prefix(&self, prefix: &str) -> String {
        let mut out = String::new();
        let mut predicates = Vec::new();
        match self {
            Query::Raw(text) => return text.clone(),
            Query::Nodes(q) => {
                let _ = write!(out, "MATCH {}", q.pattern("n"));
                q.predicates("n", prefix, &mut predicates);
                push_where(&mut out, &predicates);
                out.push_str(" RETURN n");
            }
            Query::Paths(q) => {
                let _ = write!(
                    out,
                    "MATCH p = shortestPath({}-[*1..{}]->{})",
                    q.from.pattern("a"),
                    q.max_hops,
                    q.to.pattern("b")
                );
                q.from.predicates("a", prefix, &mut predicates);
                q.to.predicates("b", prefix, &mut predicates);
                push_where(&mut out, &predicates);
                out.push_str(" RETURN p");
            }
        }
        out
    }
}

fn push_where(out: &mut String, predicates: &[String]) {
    if !predicates.is_empty() {
        out.push_str(" WHERE ");
        out.push_str(&predicates.join(" AND "));
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
