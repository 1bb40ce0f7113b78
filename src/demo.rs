//! Demo resources served by the binary: `parents` referencing `children`.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::crud::{Crud, ResourceDefinition, ResourceOptions};
use crate::database::{DocumentStore, FieldDef, Schema, SchemaRegistry};
use crate::projection::ConfigurationError;

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .register(
            Schema::new("Parent")
                .field(FieldDef::reference("child", "Child"))
                .field(FieldDef::string("editable"))
                .field(FieldDef::string("readonly"))
                .field(FieldDef::string("complex.subdoc")),
        )
        .register(
            Schema::new("Child")
                .field(FieldDef::string("subeditable"))
                .field(FieldDef::string("subreadonly")),
        )
}

/// `(url name, handle)` pairs for every demo resource
pub fn resources(store: Arc<dyn DocumentStore>, api: &ApiConfig) -> Result<Vec<(String, Crud)>, ConfigurationError> {
    let parents = ResourceOptions::new(["editable", "complex.subdoc", "child", "child.subeditable"])
        .populate(["child"])
        .page_sizes(api.page_sizes.clone(), api.default_page_size);
    let children = ResourceOptions::new(["subeditable"]).page_sizes(api.page_sizes.clone(), api.default_page_size);

    Ok(vec![
        ("parents".to_string(), Crud::new(ResourceDefinition::new("Parent", store.clone(), parents)?)),
        ("children".to_string(), Crud::new(ResourceDefinition::new("Child", store, children)?)),
    ])
}
