// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Useful JSON Schema definitions

use schemars::{
    JsonSchema,
    r#gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
};

/// A network hostname
pub struct Hostname;

impl JsonSchema for Hostname {
    fn schema_name() -> String {
        "Hostname".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        string_with_format("hostname")
    }
}

/// A regular expression, as understood by the `regex` crate
pub struct Pattern;

impl JsonSchema for Pattern {
    fn schema_name() -> String {
        "Pattern".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        string_with_format("regex")
    }
}

fn string_with_format(format: &str) -> Schema {
    Schema::Object(SchemaObject {
        instance_type: Some(InstanceType::String.into()),
        format: Some(format.to_owned()),
        ..SchemaObject::default()
    })
}
