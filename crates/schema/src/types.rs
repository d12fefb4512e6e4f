use serde_json::Value;
use std::fmt;

/// Set is a bit-set of JSON types which a schema node may declare.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct Set(u32);

pub const INVALID: Set = Set(0b0000000);
pub const ARRAY: Set = Set(0b0000001);
pub const BOOLEAN: Set = Set(0b0000010);
pub const FRACTIONAL: Set = Set(0b0000100);
pub const INTEGER: Set = Set(0b0001000);
pub const NULL: Set = Set(0b0010000);
pub const OBJECT: Set = Set(0b0100000);
pub const STRING: Set = Set(0b1000000);
// INT_OR_FRAC is a composite for "number". It's not called NUMBER to avoid
// giving the impression that this is a fundamental type.
pub const INT_OR_FRAC: Set = Set(INTEGER.0 | FRACTIONAL.0);
// ANY is a composite for all possible types.
pub const ANY: Set =
    Set(ARRAY.0 | BOOLEAN.0 | FRACTIONAL.0 | INTEGER.0 | NULL.0 | OBJECT.0 | STRING.0);

impl std::ops::BitOr for Set {
    type Output = Self;

    #[inline]
    fn bitor(self, other: Self) -> Self::Output {
        Set(self.0 | other.0)
    }
}

impl std::ops::BitAnd for Set {
    type Output = Self;

    #[inline]
    fn bitand(self, other: Self) -> Self::Output {
        Set(self.0 & other.0)
    }
}

impl std::ops::Sub for Set {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        Set(self.0 & !other.0)
    }
}

impl Set {
    /// Returns an iterator over the type names of this Set, in sorted order.
    ///
    /// ```
    /// use schema::types::*;
    ///
    /// let ty = ARRAY | OBJECT | NULL;
    /// let names = ty.iter().collect::<Vec<&'static str>>();
    /// assert_eq!(vec!["array", "null", "object"], names);
    /// ```
    pub fn iter(&self) -> Iter {
        Iter {
            types: *self,
            index: 0,
        }
    }

    /// Returns the Set for a single type with the given name, or None if the
    /// name isn't a JSON type.
    pub fn for_type_name(name: &str) -> Option<Set> {
        match name {
            "array" => Some(ARRAY),
            "boolean" => Some(BOOLEAN),
            "integer" => Some(INTEGER),
            "null" => Some(NULL),
            "number" => Some(INT_OR_FRAC),
            "object" => Some(OBJECT),
            "string" => Some(STRING),
            _ => None,
        }
    }

    /// Leniently extract a Set from a raw "type" keyword value, which may be a
    /// single type name or an array of type names. Returns None if the value
    /// has the wrong shape or names an unknown type (the keyword is skipped).
    pub fn from_value(v: &Value) -> Option<Set> {
        match v {
            Value::String(s) => Set::for_type_name(s),
            Value::Array(arr) => {
                let mut set = INVALID;
                for item in arr {
                    match item.as_str().and_then(Set::for_type_name) {
                        Some(t) => set = set | t,
                        None => return None,
                    }
                }
                Some(set)
            }
            _ => None,
        }
    }

    /// The Set matched by a concrete JSON value. Numbers with a zero
    /// fractional part are INTEGER, which is a subset of INT_OR_FRAC.
    pub fn for_value(val: &Value) -> Set {
        match val {
            Value::Array(_) => ARRAY,
            Value::Bool(_) => BOOLEAN,
            Value::Null => NULL,
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() != 0.0 => FRACTIONAL,
                _ => INTEGER,
            },
            Value::Object(_) => OBJECT,
            Value::String(_) => STRING,
        }
    }

    #[inline]
    pub fn overlaps(&self, other: Self) -> bool {
        *self & other != INVALID
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == INVALID
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(String::from).collect()
    }
}

/// Iterator over the type names of a Set, returned by `Set::iter`.
pub struct Iter {
    types: Set,
    index: usize,
}

impl Iterator for Iter {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        const ITER_ORDER: &[Set] = &[
            ARRAY,
            BOOLEAN,
            FRACTIONAL,
            INTEGER,
            NULL,
            INT_OR_FRAC, // "number" sorts after "null".
            OBJECT,
            STRING,
        ];

        loop {
            let ty = ITER_ORDER.get(self.index)?;
            self.index += 1;

            // Is |ty| a subset of |types|?
            if *ty - self.types == INVALID {
                match *ty {
                    ARRAY => return Some("array"),
                    BOOLEAN => return Some("boolean"),
                    FRACTIONAL if !self.types.overlaps(INTEGER) => return Some("fractional"),
                    INTEGER if !self.types.overlaps(FRACTIONAL) => return Some("integer"),
                    FRACTIONAL | INTEGER => (),
                    NULL => return Some("null"),
                    INT_OR_FRAC => return Some("number"),
                    OBJECT => return Some("object"),
                    STRING => return Some("string"),
                    _ => unreachable!(),
                }
            }
        }
    }
}

// Serializes as the sorted list of type names, for hosts that ship
// diagnostics with expected-type payloads over the wire.
impl serde::Serialize for Set {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use itertools::Itertools;
        write!(f, "{}", self.iter().format(", "))
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use itertools::Itertools;
        write!(f, "{}", self.iter().format(", "))
    }
}
