use std::fmt;
use std::str::FromStr;

/// Step is one component of a pointer position within a value tree.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Step {
    /// Integer index of a JSON array.
    /// When applied to a JSON object, the stringified index may also serve as
    /// a property name (legacy tuple-as-object compatibility).
    Index(usize),
    /// JSON object property name without escaping.
    Property(String),
}

impl Step {
    pub fn from_str(s: &str) -> Self {
        if s.starts_with('+') || (s.starts_with('0') && s.len() > 1) {
            Step::Property(s.to_string())
        } else if let Ok(ind) = usize::from_str(s) {
            Step::Index(ind)
        } else {
            Step::Property(s.to_string())
        }
    }

    /// The property name form of this step. Index steps stringify.
    pub fn property_name(&self) -> String {
        match self {
            Step::Index(ind) => ind.to_string(),
            Step::Property(p) => p.clone(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Index(ind) => write!(f, "{ind}"),
            Step::Property(prop) => {
                for c in prop.chars() {
                    match c {
                        '~' => write!(f, "~0")?,
                        '/' => write!(f, "~1")?,
                        _ => write!(f, "{c}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Position is an ordered sequence of steps locating a position inside a
/// value tree, mirroring JSON Pointer syntax.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Position(pub Vec<Step>);

impl Position {
    /// An empty Position referencing the document root.
    pub fn root() -> Position {
        Position(Vec::new())
    }

    /// Parse a Position from encoded JSON pointer text.
    ///
    /// ```
    /// use schema::{Position, Step};
    ///
    /// let pos = Position::from_str("/foo/ba~1ar/3");
    /// let expect = vec![
    ///     Step::Property("foo".to_string()),
    ///     Step::Property("ba/ar".to_string()),
    ///     Step::Index(3),
    /// ];
    /// assert_eq!(expect, pos.0);
    /// ```
    pub fn from_str(s: &str) -> Position {
        if s.is_empty() {
            return Position(Vec::new());
        }
        let mut pos = Self::root();

        for step in s
            .split('/')
            .skip(if s.starts_with('/') { 1 } else { 0 })
            .map(|t| t.replace("~1", "/").replace("~0", "~"))
        {
            pos.0.push(Step::from_str(&step));
        }
        pos
    }

    pub fn push(&mut self, step: Step) -> &mut Position {
        self.0.push(step);
        self
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.0.iter()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for fixture in ["", "/a", "/a/2/b", "/esc~0aped/sl~1ash"] {
            assert_eq!(fixture, Position::from_str(fixture).to_string());
        }
    }

    #[test]
    fn integer_like_steps_are_indices() {
        let pos = Position::from_str("/items/0/+1/01");
        assert_eq!(
            vec![
                Step::Property("items".to_string()),
                Step::Index(0),
                Step::Property("+1".to_string()),
                Step::Property("01".to_string()),
            ],
            pos.0
        );
    }
}
