//! Schema registry.
//!
//! Maps class names to ordered field tables. Definitions ([`ClassDef`],
//! [`FieldDef`]) are plain serializable data; [`Schema::from_definitions`]
//! validates them once and produces resolved [`FieldDescriptor`]s that the
//! query engine refers to by index from then on.
//!
//! Every descriptor carries the [`ClassId`] of the class that owns it, so a
//! field resolved under one class can never be silently applied to another
//! class's field table.

use crate::error::{Error, Result};
use crate::value::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Position of a class in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Index into the schema's class table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// Declared field, before resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    /// Target class name for `Link` and `LinkList` fields
    pub target: Option<String>,
}

impl FieldDef {
    /// A non-nullable scalar field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            target: None,
        }
    }

    /// A nullable scalar field.
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, field_type)
        }
    }

    /// A single link to an object of `target`. Links are always nullable.
    pub fn link(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Link,
            nullable: true,
            target: Some(target.into()),
        }
    }

    /// A list of links to objects of `target`.
    pub fn link_list(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::LinkList,
            nullable: false,
            target: Some(target.into()),
        }
    }
}

/// Declared class, before resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field definition.
    pub fn with(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a non-nullable scalar field.
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with(FieldDef::new(name, field_type))
    }
}

/// A field resolved against its owning class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    nullable: bool,
    index: usize,
    class: ClassId,
    target: Option<ClassId>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Position in the owning class's field table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The class whose field table this descriptor indexes.
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Linked class, for `Link` and `LinkList` fields.
    pub fn target(&self) -> Option<ClassId> {
        self.target
    }
}

/// Resolved field table of one class
#[derive(Debug, Clone)]
pub struct ClassSchema {
    id: ClassId,
    name: String,
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ClassSchema {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by its exact name.
    ///
    /// Matching is codepoint-exact: no case folding and no Unicode
    /// normalization is applied to identifiers.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.by_name
            .get(name)
            .map(|&idx| &self.fields[idx])
            .ok_or_else(|| Error::InvalidField {
                class: self.name.clone(),
                field: name.to_string(),
            })
    }
}

/// The schema registry: every class known to a store
#[derive(Debug, Clone)]
pub struct Schema {
    classes: Vec<ClassSchema>,
    by_name: HashMap<String, ClassId>,
    definitions: Vec<ClassDef>,
}

impl Schema {
    /// Validates class definitions and resolves their field tables.
    ///
    /// Fails on duplicate class or field names and on link fields whose
    /// target class is missing.
    pub fn from_definitions(definitions: Vec<ClassDef>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(definitions.len());
        for (idx, def) in definitions.iter().enumerate() {
            if def.name.is_empty() {
                return Err(Error::InvalidInput("Class name cannot be empty".into()));
            }
            if by_name
                .insert(def.name.clone(), ClassId(idx as u32))
                .is_some()
            {
                return Err(Error::InvalidInput(format!(
                    "Duplicate class '{}'",
                    def.name
                )));
            }
        }

        let mut classes = Vec::with_capacity(definitions.len());
        for (idx, def) in definitions.iter().enumerate() {
            let id = ClassId(idx as u32);
            let mut fields = Vec::with_capacity(def.fields.len());
            let mut field_names = HashMap::with_capacity(def.fields.len());

            for (field_idx, field) in def.fields.iter().enumerate() {
                if field.name.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "Empty field name in class '{}'",
                        def.name
                    )));
                }
                if field.name.contains('.') {
                    return Err(Error::InvalidInput(format!(
                        "Field name '{}' in class '{}' cannot contain '.'",
                        field.name, def.name
                    )));
                }
                if field_names.insert(field.name.clone(), field_idx).is_some() {
                    return Err(Error::InvalidInput(format!(
                        "Duplicate field '{}' in class '{}'",
                        field.name, def.name
                    )));
                }

                let target = match (field.field_type.is_link(), &field.target) {
                    (true, Some(target)) => Some(
                        *by_name
                            .get(target)
                            .ok_or_else(|| Error::UnknownClass(target.clone()))?,
                    ),
                    (true, None) => {
                        return Err(Error::InvalidInput(format!(
                            "Link field '{}' in class '{}' has no target class",
                            field.name, def.name
                        )))
                    }
                    (false, _) => None,
                };

                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    field_type: field.field_type,
                    nullable: field.nullable || field.field_type == FieldType::Link,
                    index: field_idx,
                    class: id,
                    target,
                });
            }

            classes.push(ClassSchema {
                id,
                name: def.name.clone(),
                fields,
                by_name: field_names,
            });
        }

        Ok(Schema {
            classes,
            by_name,
            definitions,
        })
    }

    /// Resolves a class by name.
    pub fn class_by_name(&self, name: &str) -> Result<&ClassSchema> {
        self.by_name
            .get(name)
            .map(|id| &self.classes[id.index()])
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    /// Class by id. Ids are only handed out by this schema, so this cannot miss
    /// for ids obtained from it.
    pub fn class(&self, id: ClassId) -> Result<&ClassSchema> {
        self.classes
            .get(id.index())
            .ok_or_else(|| Error::UnknownClass(id.to_string()))
    }

    /// Resolves `field` in the table of `class`.
    pub fn field_descriptor(&self, class: &str, field: &str) -> Result<&FieldDescriptor> {
        self.class_by_name(class)?.field(field)
    }

    pub fn classes(&self) -> &[ClassSchema] {
        &self.classes
    }

    /// The definitions this schema was built from.
    pub fn definitions(&self) -> &[ClassDef] {
        &self.definitions
    }
}
