//! Read-only lookups over a schema's type graph
//!
//! [`TypeRegistry`] indexes the types of a [`Schema`] by name and answers the
//! questions the validator and code generators need: what a reference
//! resolves to, what base type it ultimately derives from, and which fields
//! or enum elements a type has once inheritance is taken into account.
//!
//! Base-type keywords resolve to static entries in any letter case. Names
//! that are unknown yield `None` or an empty list; supertype chains that
//! loop (possible only in a leniently built schema) are cut off rather than
//! followed forever.

use std::collections::HashMap;

use crate::model::{BaseType, EnumElementDef, Resource, Schema, StructFieldDef, Type};

static BASE_TYPES: [Type; 18] = [
    Type::BaseType(BaseType::Bool),
    Type::BaseType(BaseType::Int8),
    Type::BaseType(BaseType::Int16),
    Type::BaseType(BaseType::Int32),
    Type::BaseType(BaseType::Int64),
    Type::BaseType(BaseType::Float32),
    Type::BaseType(BaseType::Float64),
    Type::BaseType(BaseType::Bytes),
    Type::BaseType(BaseType::String),
    Type::BaseType(BaseType::Timestamp),
    Type::BaseType(BaseType::Symbol),
    Type::BaseType(BaseType::Uuid),
    Type::BaseType(BaseType::Array),
    Type::BaseType(BaseType::Map),
    Type::BaseType(BaseType::Struct),
    Type::BaseType(BaseType::Enum),
    Type::BaseType(BaseType::Union),
    Type::BaseType(BaseType::Any),
];

/// Returns the static type entry for a base type.
pub fn base_type_entry(base: BaseType) -> &'static Type {
    &BASE_TYPES[base as usize]
}

#[derive(Debug, Clone)]
pub struct TypeRegistry<'a> {
    schema: &'a Schema,
    index: HashMap<&'a str, &'a Type>,
}

impl<'a> TypeRegistry<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        let index = schema.types.iter().map(|t| (t.name(), t)).collect();
        Self { schema, index }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn types(&self) -> &'a [Type] {
        &self.schema.types
    }

    pub fn resources(&self) -> &'a [Resource] {
        &self.schema.resources
    }

    /// Looks up a type by name; base keywords match in any letter case.
    pub fn find_type(&self, name: &str) -> Option<&'a Type> {
        match BaseType::from_keyword(name) {
            Some(base) => Some(base_type_entry(base)),
            None => self.index.get(name).copied(),
        }
    }

    /// The base type a reference ultimately derives from.
    pub fn find_base_type(&self, name: &str) -> Option<BaseType> {
        self.find_type(name).and_then(|t| self.base_type(t))
    }

    pub fn base_type(&self, t: &Type) -> Option<BaseType> {
        match self.ancestry(t).last() {
            Some(Type::BaseType(b)) => Some(*b),
            Some(other) => BaseType::from_keyword(other.supertype()),
            None => None,
        }
    }

    /// The supertype chain of `t`, starting at `t` itself.
    ///
    /// The chain ends at a base type, or early at an unresolvable or
    /// cyclic reference.
    pub fn ancestry(&self, t: &'a Type) -> Vec<&'a Type> {
        let mut chain = vec![t];
        let mut cur = t;
        while let Some(def) = cur.def() {
            if chain.len() > self.schema.types.len() + 1 {
                break;
            }
            match self.find_type(&def.supertype) {
                Some(next) if !chain.iter().any(|c| std::ptr::eq(*c, next)) => {
                    chain.push(next);
                    cur = next;
                }
                _ => break,
            }
        }
        chain
    }

    /// All fields of a struct type, supertype fields first.
    pub fn flattened_fields(&self, t: &'a Type) -> Vec<&'a StructFieldDef> {
        let mut chain = self.ancestry(t);
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|t| match t {
                Type::Struct(st) => Some(st.fields.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// All elements of an enum type, supertype elements first.
    pub fn enum_elements(&self, t: &'a Type) -> Vec<&'a EnumElementDef> {
        let mut chain = self.ancestry(t);
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|t| match t {
                Type::Enum(et) => Some(et.elements.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
