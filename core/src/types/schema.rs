use std::sync::Arc;

use hashbrown::HashMap;

use super::{EnumDef, TableDef, UnionDef};
use crate::errors::{Error, Result};

/// What a name in a [`Schema`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Table,
    Enum,
    Union,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Table(usize),
    Enum(usize),
    Union(usize),
}

/// A registry of table, enum and union definitions.
///
/// Names may be namespace-qualified (`a.b.Name`); lookups resolve by the last
/// component, the way the schema language does.
///
/// # Example
///
/// ```
/// use flatrecord_core::types::{ScalarKind, Schema, TableDef, TypeDesc};
///
/// let schema = Schema::new().with_table(
///     TableDef::new("Common1")
///         .field("id", TypeDesc::String)
///         .field("count", ScalarKind::U8),
/// );
/// assert!(schema.table("Common1").is_some());
/// assert!(schema.table("my.namespace.Common1").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    namespace: Option<String>,
    root_type: Option<String>,
    tables: Vec<Arc<TableDef>>,
    enums: Vec<Arc<EnumDef>>,
    unions: Vec<Arc<UnionDef>>,
    index: HashMap<String, Slot>,
}

fn local_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a table definition.
    pub fn with_table(mut self, def: TableDef) -> Self {
        self.put_table(def);
        self
    }

    /// Add or replace an enum definition.
    pub fn with_enum(mut self, def: EnumDef) -> Self {
        self.put_enum(def);
        self
    }

    /// Add or replace a union definition.
    pub fn with_union(mut self, def: UnionDef) -> Self {
        self.put_union(def);
        self
    }

    pub fn with_root_type(mut self, name: impl Into<String>) -> Self {
        self.root_type = Some(name.into());
        self
    }

    /// Add a table, rejecting a name that is already defined.
    pub fn add_table(&mut self, def: TableDef) -> Result<()> {
        self.check_unused(&def.name)?;
        self.put_table(def);
        Ok(())
    }

    pub fn add_enum(&mut self, def: EnumDef) -> Result<()> {
        self.check_unused(&def.name)?;
        self.put_enum(def);
        Ok(())
    }

    pub fn add_union(&mut self, def: UnionDef) -> Result<()> {
        self.check_unused(&def.name)?;
        self.put_union(def);
        Ok(())
    }

    /// Move every definition of `other` into `self`.
    ///
    /// Fails on the first name defined by both. The root type and namespace
    /// of `self` win when both are set.
    pub fn merge(&mut self, other: Schema) -> Result<()> {
        for def in other.tables {
            self.add_table(Arc::unwrap_or_clone(def))?;
        }
        for def in other.enums {
            self.add_enum(Arc::unwrap_or_clone(def))?;
        }
        for def in other.unions {
            self.add_union(Arc::unwrap_or_clone(def))?;
        }
        if self.root_type.is_none() {
            self.root_type = other.root_type;
        }
        if self.namespace.is_none() {
            self.namespace = other.namespace;
        }
        Ok(())
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = Some(namespace.into());
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn set_root_type(&mut self, name: impl Into<String>) {
        self.root_type = Some(name.into());
    }

    pub fn root_type(&self) -> Option<&str> {
        self.root_type.as_deref()
    }

    pub fn table(&self, name: &str) -> Option<&Arc<TableDef>> {
        match self.index.get(local_name(name))? {
            Slot::Table(i) => self.tables.get(*i),
            _ => None,
        }
    }

    pub fn enum_def(&self, name: &str) -> Option<&Arc<EnumDef>> {
        match self.index.get(local_name(name))? {
            Slot::Enum(i) => self.enums.get(*i),
            _ => None,
        }
    }

    pub fn union_def(&self, name: &str) -> Option<&Arc<UnionDef>> {
        match self.index.get(local_name(name))? {
            Slot::Union(i) => self.unions.get(*i),
            _ => None,
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<DefinitionKind> {
        self.index.get(local_name(name)).map(|slot| match slot {
            Slot::Table(_) => DefinitionKind::Table,
            Slot::Enum(_) => DefinitionKind::Enum,
            Slot::Union(_) => DefinitionKind::Union,
        })
    }

    /// Tables in definition order.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableDef>> {
        self.tables.iter()
    }

    pub fn enums(&self) -> impl Iterator<Item = &Arc<EnumDef>> {
        self.enums.iter()
    }

    pub fn unions(&self) -> impl Iterator<Item = &Arc<UnionDef>> {
        self.unions.iter()
    }

    fn check_unused(&self, name: &str) -> Result<()> {
        if self.index.contains_key(local_name(name)) {
            return Err(Error::mismatch(name, "defined more than once"));
        }
        Ok(())
    }

    fn put_table(&mut self, def: TableDef) {
        let key = local_name(&def.name).to_string();
        match self.index.get(&key) {
            Some(Slot::Table(i)) => self.tables[*i] = Arc::new(def),
            _ => {
                self.index.insert(key, Slot::Table(self.tables.len()));
                self.tables.push(Arc::new(def));
            }
        }
    }

    fn put_enum(&mut self, def: EnumDef) {
        let key = local_name(&def.name).to_string();
        match self.index.get(&key) {
            Some(Slot::Enum(i)) => self.enums[*i] = Arc::new(def),
            _ => {
                self.index.insert(key, Slot::Enum(self.enums.len()));
                self.enums.push(Arc::new(def));
            }
        }
    }

    fn put_union(&mut self, def: UnionDef) {
        let key = local_name(&def.name).to_string();
        match self.index.get(&key) {
            Some(Slot::Union(i)) => self.unions[*i] = Arc::new(def),
            _ => {
                self.index.insert(key, Slot::Union(self.unions.len()));
                self.unions.push(Arc::new(def));
            }
        }
    }
}
