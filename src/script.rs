//! Assignment statements in node scripting expressions.
//!
//! Only the simple form `Namespace.Variable <op> value` is interpreted, with
//! `<op>` one of `=`, `+=`, `-=`, `/=`. Statements are separated by `;` or
//! newlines. Anything else is left to the runtime.

use regex_lite::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Set,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `/=`
    Div,
}

impl AssignOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "=" => Some(Self::Set),
            "+=" => Some(Self::Add),
            "-=" => Some(Self::Sub),
            "/=" => Some(Self::Div),
            _ => None,
        }
    }

    /// Apply to `current`; `None` on division by zero.
    pub fn apply(&self, current: i64, value: i64) -> Option<i64> {
        match self {
            Self::Set => Some(value),
            Self::Add => current.checked_add(value),
            Self::Sub => current.checked_sub(value),
            Self::Div => current.checked_div(value),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Set => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Div => "/=",
        };
        f.write_str(s)
    }
}

/// One parsed assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Variable namespace.
    pub namespace: String,
    /// Variable name.
    pub variable: String,
    /// Operator.
    pub op: AssignOp,
    /// Right-hand side, trimmed.
    pub value: String,
}

impl Assignment {
    /// Right-hand side as an integer literal; booleans map to 0/1.
    pub fn literal(&self) -> Option<i64> {
        match self.value.as_str() {
            "true" => Some(1),
            "false" => Some(0),
            v => v.parse().ok(),
        }
    }
}

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\w+)\.(\w+)\s*(\+=|-=|/=|=)\s*(.+?)\s*$").expect("valid assignment pattern")
    })
}

/// Parse a single statement; `None` if it is not a simple assignment.
pub fn parse_assignment(statement: &str) -> Option<Assignment> {
    let caps = assignment_pattern().captures(statement)?;
    let value = caps.get(4)?.as_str();
    // `a.b == c` is a comparison, not an assignment.
    if value.starts_with('=') {
        return None;
    }
    Some(Assignment {
        namespace: caps.get(1)?.as_str().to_string(),
        variable: caps.get(2)?.as_str().to_string(),
        op: AssignOp::parse(caps.get(3)?.as_str())?,
        value: value.to_string(),
    })
}

fn subject_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(\w+)\.(\w+)\s*(.*)$").expect("valid subject pattern"))
}

/// Variable a statement tries to write, even if the statement is malformed.
///
/// Returns `(namespace, variable)` for anything shaped `Ns.Var <rest>` that is
/// not a comparison (`==`, `!=`, `<=`, `>=`) or a bare read.
pub fn assignment_target(statement: &str) -> Option<(&str, &str)> {
    let caps = subject_pattern().captures(statement)?;
    let rest = caps.get(3)?.as_str();
    let is_read = rest.is_empty()
        || ["==", "!=", "<=", ">="].iter().any(|op| rest.starts_with(op))
        || rest.starts_with(|c: char| matches!(c, '<' | '>' | '&' | '|' | ')'));
    if is_read {
        return None;
    }
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Non-empty statements of an expression.
pub fn statements(expression: &str) -> impl Iterator<Item = &str> {
    expression
        .split(|c| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let a = parse_assignment("Game.GunnClothes += 2").unwrap();
        assert_eq!(a.namespace, "Game");
        assert_eq!(a.variable, "GunnClothes");
        assert_eq!(a.op, AssignOp::Add);
        assert_eq!(a.literal(), Some(2));

        let a = parse_assignment("  World.Location=3 ").unwrap();
        assert_eq!(a.op, AssignOp::Set);
        assert_eq!(a.literal(), Some(3));

        assert_eq!(parse_assignment("Game.Flag = true").unwrap().literal(), Some(1));
        assert_eq!(parse_assignment("Game.X = Game.Y").unwrap().literal(), None);
    }

    #[test]
    fn test_not_assignments() {
        assert!(parse_assignment("Game.X == 3").is_none());
        assert!(parse_assignment("print(x)").is_none());
        assert!(parse_assignment("x = 3").is_none());
    }

    #[test]
    fn test_assignment_target() {
        assert_eq!(assignment_target("Game.Clothes ="), Some(("Game", "Clothes")));
        assert_eq!(assignment_target("Game.Clothes *= 2"), Some(("Game", "Clothes")));
        assert_eq!(assignment_target("Game.Clothes ++"), Some(("Game", "Clothes")));
        assert_eq!(assignment_target("Game.Clothes == 2"), None);
        assert_eq!(assignment_target("Game.Clothes"), None);
        assert_eq!(assignment_target("print(x)"), None);
    }

    #[test]
    fn test_statements_split() {
        let parts: Vec<&str> = statements("A.b = 1;\n A.c += 2 ;;").collect();
        assert_eq!(parts, vec!["A.b = 1", "A.c += 2"]);
    }

    #[test]
    fn test_apply() {
        assert_eq!(AssignOp::Div.apply(4, 2), Some(2));
        assert_eq!(AssignOp::Div.apply(4, 0), None);
        assert_eq!(AssignOp::Sub.apply(1, 3), Some(-2));
    }
}
