//! Schema types
//!
//! The widening lattice over [`TypeKind`], nullable column types and the
//! ordered [`Schema`] that the reconciler grows.

use crate::record::FieldValue;
use serde::Serialize;
use std::collections::HashMap;

/// Concrete type tag of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// No non-null value observed yet
    Unresolved,
    Integer,
    Float,
    Boolean,
    String,
    Object,
    Array,
}

impl TypeKind {
    /// Least upper bound of two kinds.
    ///
    /// `Unresolved` is the bottom, `String` the top. Integer and float meet at
    /// float; every other disagreement falls back to string.
    pub fn widen(self, other: TypeKind) -> TypeKind {
        match (self, other) {
            (a, b) if a == b => a,
            (TypeKind::Unresolved, other) | (other, TypeKind::Unresolved) => other,
            (TypeKind::Integer, TypeKind::Float) | (TypeKind::Float, TypeKind::Integer) => {
                TypeKind::Float
            }
            _ => TypeKind::String,
        }
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKind::Unresolved => write!(f, "unresolved"),
            TypeKind::Integer => write!(f, "integer"),
            TypeKind::Float => write!(f, "float"),
            TypeKind::Boolean => write!(f, "boolean"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Object => write!(f, "object"),
            TypeKind::Array => write!(f, "array"),
        }
    }
}

/// A column's inferred type: a kind plus nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnType {
    pub kind: TypeKind,
    pub nullable: bool,
}

impl ColumnType {
    /// A column nothing has been learned about yet
    pub fn unresolved() -> Self {
        Self {
            kind: TypeKind::Unresolved,
            nullable: false,
        }
    }

    /// A non-nullable column of the given kind
    pub fn of(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// A nullable column of the given kind
    pub fn nullable(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    /// Type implied by a single observed value
    pub fn from_value(value: &FieldValue) -> Self {
        match value.kind() {
            Some(kind) => Self::of(kind),
            None => Self::nullable(TypeKind::Unresolved),
        }
    }

    /// Widen in place to accommodate `value`
    pub fn observe(&mut self, value: &FieldValue) {
        match value.kind() {
            Some(kind) => self.kind = self.kind.widen(kind),
            None => self.nullable = true,
        }
    }

    /// Mark as nullable
    pub fn make_nullable(&mut self) {
        self.nullable = true;
    }

    /// Join of two column types
    #[must_use]
    pub fn merge(self, other: ColumnType) -> ColumnType {
        ColumnType {
            kind: self.kind.widen(other.kind),
            nullable: self.nullable || other.nullable,
        }
    }

    /// Coerce a value into this column type.
    ///
    /// Integers coerce to float columns, anything coerces to string columns.
    /// Any other mismatch means the value was never observed by the schema.
    #[allow(clippy::cast_precision_loss)]
    pub fn coerce(&self, column: &str, value: FieldValue) -> crate::Result<FieldValue> {
        match (self.kind, value) {
            (_, FieldValue::Null) if self.nullable => Ok(FieldValue::Null),
            (_, FieldValue::Null) => Err(crate::Error::schema_conflict(
                column,
                format!("null in non-nullable {self} column"),
            )),
            (TypeKind::Integer, v @ FieldValue::Integer(_))
            | (TypeKind::Float, v @ FieldValue::Float(_))
            | (TypeKind::Boolean, v @ FieldValue::Boolean(_))
            | (TypeKind::String, v @ FieldValue::String(_))
            | (TypeKind::Object, v @ FieldValue::Object(_))
            | (TypeKind::Array, v @ FieldValue::Array(_)) => Ok(v),
            (TypeKind::Float, FieldValue::Integer(i)) => Ok(FieldValue::Float(i as f64)),
            (TypeKind::String, other) => {
                Ok(other.to_text().map_or(FieldValue::Null, FieldValue::String))
            }
            (kind, other) => Err(crate::Error::schema_conflict(
                column,
                format!(
                    "value of type {} does not fit {kind} column",
                    other.kind().unwrap_or(TypeKind::Unresolved)
                ),
            )),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nullable {
            write!(f, "nullable-{}", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Ordered mapping from column name to type, in first-seen order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    columns: Vec<Column>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from `(name, type)` pairs. Later duplicates are merged.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let mut schema = Self::new();
        for (name, column_type) in columns {
            let name = name.into();
            match schema.position(&name) {
                Some(i) => {
                    let merged = schema.columns[i].column_type.merge(column_type);
                    schema.columns[i].column_type = merged;
                }
                None => schema.push(name, column_type),
            }
        }
        schema
    }

    /// Append a new column. The caller guarantees the name is new.
    pub(crate) fn push(&mut self, name: String, column_type: ColumnType) {
        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(Column { name, column_type });
    }

    pub(crate) fn column_type_mut(&mut self, position: usize) -> &mut ColumnType {
        &mut self.columns[position].column_type
    }

    /// Position of a column by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    /// Type of a column by name
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.column_type)
    }

    /// All columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Union of two schemas: this schema's columns first, then new ones from
    /// `other`, with shared columns widened.
    #[must_use]
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut merged = self.clone();
        for column in &other.columns {
            match merged.position(&column.name) {
                Some(i) => {
                    let widened = merged.columns[i].column_type.merge(column.column_type);
                    merged.columns[i].column_type = widened;
                }
                None => merged.push(column.name.clone(), column.column_type),
            }
        }
        merged
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", column.name, column.column_type)?;
        }
        write!(f, "]")
    }
}
