//! String constants for every schema keyword the reader understands.
//! Unrecognized keywords are ignored by the reader (lenient, forward-compatible).

pub const ADDITIONAL_ITEMS: &str = "additionalItems";
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";
pub const ALL_OF: &str = "allOf";
pub const ANY_OF: &str = "anyOf";
pub const CONST: &str = "const";
pub const CONTAINS: &str = "contains";
pub const DEFAULT: &str = "default";
pub const DEFINITIONS: &str = "definitions"; // Alternate of $defs. Same semantics.
pub const DEFS: &str = "$defs";
pub const DEPENDENCIES: &str = "dependencies"; // Draft-04 form, split by value shape.
pub const DEPENDENT_REQUIRED: &str = "dependentRequired";
pub const DEPENDENT_SCHEMAS: &str = "dependentSchemas";
pub const DEPRECATED: &str = "deprecated";
pub const DESCRIPTION: &str = "description";
pub const ELSE: &str = "else";
pub const ENUM: &str = "enum";
pub const EXCLUSIVE_MAXIMUM: &str = "exclusiveMaximum";
pub const EXCLUSIVE_MINIMUM: &str = "exclusiveMinimum";
pub const FORMAT: &str = "format"; // Stored, never validated.
pub const ID: &str = "$id";
pub const ID_LEGACY: &str = "id"; // Draft-04 form of $id.
pub const IF: &str = "if";
pub const ITEMS: &str = "items";
pub const MAXIMUM: &str = "maximum";
pub const MAX_ITEMS: &str = "maxItems";
pub const MAX_LENGTH: &str = "maxLength";
pub const MAX_PROPERTIES: &str = "maxProperties";
pub const MINIMUM: &str = "minimum";
pub const MIN_ITEMS: &str = "minItems";
pub const MIN_LENGTH: &str = "minLength";
pub const MIN_PROPERTIES: &str = "minProperties";
pub const MULTIPLE_OF: &str = "multipleOf";
pub const NOT: &str = "not";
pub const ONE_OF: &str = "oneOf";
pub const PATTERN: &str = "pattern";
pub const PATTERN_PROPERTIES: &str = "patternProperties";
pub const PROPERTIES: &str = "properties";
pub const PROPERTY_NAMES: &str = "propertyNames";
pub const RECURSIVE_REF: &str = "$recursiveRef";
pub const REF: &str = "$ref";
pub const REQUIRED: &str = "required";
pub const SCHEMA: &str = "$schema";
pub const THEN: &str = "then";
pub const TITLE: &str = "title";
pub const TYPE: &str = "type";
pub const UNIQUE_ITEMS: &str = "uniqueItems";
