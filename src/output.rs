//! Human-readable rendering for the `list` and `schema` commands.

use std::collections::BTreeMap;

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::provider::{DebugProvider, full_type_name};
use crate::schema::{Attribute, Mode, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct CatalogRow {
    #[tabled(rename = "TYPE")]
    pub name: String,
    #[tabled(rename = "KIND")]
    pub kind: &'static str,
    #[tabled(rename = "DESCRIPTION")]
    pub description: &'static str,
}

pub fn catalog(provider: &DebugProvider) -> Vec<CatalogRow> {
    let resources = provider.resources().into_iter().map(|r| CatalogRow {
        name: full_type_name(r.type_name()),
        kind: "resource",
        description: r.schema().description,
    });
    let data_sources = provider.data_sources().into_iter().map(|d| CatalogRow {
        name: full_type_name(d.type_name()),
        kind: "data source",
        description: d.schema().description,
    });
    resources.chain(data_sources).collect()
}

pub fn catalog_table(rows: &[CatalogRow]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSchemas {
    pub resource_schemas: BTreeMap<String, Schema>,
    pub data_source_schemas: BTreeMap<String, Schema>,
}

impl ProviderSchemas {
    /// Collects schemas, optionally restricted to one full type name.
    ///
    /// A name may match both a resource and a data source.
    pub fn collect(provider: &DebugProvider, filter: Option<&str>) -> Self {
        let keep = |name: &str| filter.is_none_or(|f| f == name);

        let resource_schemas = provider
            .resources()
            .into_iter()
            .map(|r| (full_type_name(r.type_name()), r.schema()))
            .filter(|(name, _)| keep(name))
            .collect();
        let data_source_schemas = provider
            .data_sources()
            .into_iter()
            .map(|d| (full_type_name(d.type_name()), d.schema()))
            .filter(|(name, _)| keep(name))
            .collect();

        Self {
            resource_schemas,
            data_source_schemas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resource_schemas.is_empty() && self.data_source_schemas.is_empty()
    }

    pub fn trees(&self) -> Vec<Tree<String>> {
        let resources = self
            .resource_schemas
            .iter()
            .map(|(name, schema)| schema_tree(&format!("resource {}", name), schema));
        let data_sources = self
            .data_source_schemas
            .iter()
            .map(|(name, schema)| schema_tree(&format!("data {}", name), schema));
        resources.chain(data_sources).collect()
    }
}

pub fn schema_tree(name: &str, schema: &Schema) -> Tree<String> {
    Tree::new(name.to_string()).with_leaves(schema.attributes.iter().map(attribute_tree))
}

fn attribute_tree(attr: &Attribute) -> Tree<String> {
    let mode = match attr.mode {
        Mode::Required => "required",
        Mode::Optional => "optional",
        Mode::Computed => "computed",
        Mode::OptionalComputed => "optional, computed",
    };

    let mut label = format!("{} ({:?}, {})", attr.name, attr.kind, mode);
    if let Some(default) = &attr.default {
        label.push_str(&format!(" = {}", default));
    }
    if attr.requires_replace {
        label.push_str(" [forces replacement]");
    }

    Tree::new(label).with_leaves(attr.attributes.iter().map(attribute_tree))
}
