// elastic-health - Node inventory report for Elasticsearch clusters
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Per-node records pulled out of a `GET /_nodes?human` response.
//!
//! The nodes API returns a loosely typed tree; every field of a report row is
//! read through a checked key path so that a partial node surfaces as an
//! [`ExtractError`] naming the missing path instead of a silently short row.

use serde::Serialize;
use serde_json::Value;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("response has no `nodes` object")]
    MissingNodes,
    #[error("node {node}: missing key `{path}`")]
    MissingKey { node: String, path: String },
    #[error("node {node}: key `{path}` is not {expected}")]
    WrongType {
        node: String,
        path: String,
        expected: &'static str,
    },
}

/// One report column, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Cluster,
    Name,
    Address,
    Version,
    Roles,
    Site,
    Host,
    Cpus,
    MemLocked,
    CompressedOops,
    JvmName,
    JvmVersion,
    HeapMin,
    HeapMax,
}

impl Column {
    /// Every column, in the field order of [`NodeRecord`].
    pub const ALL: [Column; 14] = [
        Column::Cluster,
        Column::Name,
        Column::Address,
        Column::Version,
        Column::Roles,
        Column::Site,
        Column::Host,
        Column::Cpus,
        Column::MemLocked,
        Column::CompressedOops,
        Column::JvmName,
        Column::JvmVersion,
        Column::HeapMin,
        Column::HeapMax,
    ];

    /// Columns shown without `--verbose`.
    pub const REDUCED: [Column; 10] = [
        Column::Name,
        Column::Address,
        Column::Version,
        Column::Roles,
        Column::Cpus,
        Column::MemLocked,
        Column::CompressedOops,
        Column::JvmVersion,
        Column::HeapMin,
        Column::HeapMax,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Cluster => "Cluster",
            Column::Name => "Name",
            Column::Address => "Address",
            Column::Version => "Version",
            Column::Roles => "Roles",
            Column::Site => "Site",
            Column::Host => "Host",
            Column::Cpus => "CPUs",
            Column::MemLocked => "MemLocked",
            Column::CompressedOops => "Comp. OOPs",
            Column::JvmName => "JVM Name",
            Column::JvmVersion => "JVM Version",
            Column::HeapMin => "Heap Min",
            Column::HeapMax => "Heap Max",
        }
    }
}

/// A single report row. Field order matches [`Column::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    #[serde(rename = "Cluster")]
    pub cluster: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Roles")]
    pub roles: Vec<String>,
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "CPUs")]
    pub cpus: u64,
    #[serde(rename = "MemLocked")]
    pub mem_locked: bool,
    #[serde(rename = "Comp. OOPs")]
    pub compressed_oops: bool,
    #[serde(rename = "JVM Name")]
    pub jvm_name: String,
    #[serde(rename = "JVM Version")]
    pub jvm_version: String,
    #[serde(rename = "Heap Min")]
    pub heap_min: String,
    #[serde(rename = "Heap Max")]
    pub heap_max: String,
}

impl NodeRecord {
    /// Text shown in the table cell for `column`.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Cluster => self.cluster.clone(),
            Column::Name => self.name.clone(),
            Column::Address => self.address.clone(),
            Column::Version => self.version.clone(),
            Column::Roles => format!("[{}]", self.roles.join(", ")),
            Column::Site => self.site.clone(),
            Column::Host => self.host.clone(),
            Column::Cpus => self.cpus.to_string(),
            Column::MemLocked => self.mem_locked.to_string(),
            Column::CompressedOops => self.compressed_oops.to_string(),
            Column::JvmName => self.jvm_name.clone(),
            Column::JvmVersion => self.jvm_version.clone(),
            Column::HeapMin => self.heap_min.clone(),
            Column::HeapMax => self.heap_max.clone(),
        }
    }
}

/// Everything after the first `.` of the queried server name, dot included.
///
/// IP addresses and bare host names have no shared suffix.
pub fn domain_suffix(server: &str) -> &str {
    if server.parse::<IpAddr>().is_ok() {
        return "";
    }
    server.find('.').map_or("", |idx| &server[idx..])
}

/// Drops one trailing occurrence of `suffix` from `value`.
pub fn strip_domain_suffix(value: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return value.to_string();
    }
    value.strip_suffix(suffix).unwrap_or(value).to_string()
}

/// Reads the raw (unstripped) node name used for pattern filtering.
pub fn raw_name<'a>(node: &'a Value, node_id: &str) -> Result<&'a str, ExtractError> {
    NodeView::new(node, node_id).string(&["name"])
}

/// Builds the report row for one entry of the `nodes` object.
pub fn extract(node: &Value, node_id: &str, suffix: &str) -> Result<NodeRecord, ExtractError> {
    let view = NodeView::new(node, node_id);

    Ok(NodeRecord {
        cluster: view.string(&["settings", "cluster", "name"])?.to_string(),
        name: strip_domain_suffix(view.string(&["name"])?, suffix),
        address: view.string(&["transport_address"])?.to_string(),
        version: view.string(&["version"])?.to_string(),
        roles: view.strings(&["roles"])?,
        site: view
            .optional_string(&["attributes", "site"])?
            .unwrap_or_default()
            .to_string(),
        host: strip_domain_suffix(view.string(&["attributes", "host"])?, suffix),
        cpus: view.unsigned(&["os", "allocated_processors"])?,
        mem_locked: view.flag(&["process", "mlockall"])?,
        compressed_oops: view.flag(&["jvm", "using_compressed_ordinary_object_pointers"])?,
        jvm_name: view.string(&["jvm", "vm_name"])?.to_string(),
        jvm_version: view.string(&["jvm", "vm_version"])?.to_string(),
        heap_min: view.string(&["jvm", "mem", "heap_init"])?.to_string(),
        heap_max: view.string(&["jvm", "mem", "heap_max"])?.to_string(),
    })
}

/// Checked accessors over one node's subtree.
struct NodeView<'a, 'id> {
    root: &'a Value,
    node_id: &'id str,
}

impl<'a, 'id> NodeView<'a, 'id> {
    fn new(root: &'a Value, node_id: &'id str) -> Self {
        Self { root, node_id }
    }

    fn lookup(&self, path: &[&str]) -> Result<Option<&'a Value>, ExtractError> {
        let mut current = self.root;
        for key in path {
            match current {
                Value::Object(map) => match map.get(*key) {
                    Some(next) => current = next,
                    None => return Ok(None),
                },
                _ => return Err(self.wrong_type(path, "an object")),
            }
        }
        Ok(Some(current))
    }

    fn require(&self, path: &[&str]) -> Result<&'a Value, ExtractError> {
        self.lookup(path)?
            .ok_or_else(|| ExtractError::MissingKey {
                node: self.node_id.to_string(),
                path: path.join("."),
            })
    }

    fn string(&self, path: &[&str]) -> Result<&'a str, ExtractError> {
        self.require(path)?
            .as_str()
            .ok_or_else(|| self.wrong_type(path, "a string"))
    }

    fn optional_string(&self, path: &[&str]) -> Result<Option<&'a str>, ExtractError> {
        match self.lookup(path)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.wrong_type(path, "a string")),
        }
    }

    fn strings(&self, path: &[&str]) -> Result<Vec<String>, ExtractError> {
        let items = self
            .require(path)?
            .as_array()
            .ok_or_else(|| self.wrong_type(path, "a list of strings"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.wrong_type(path, "a list of strings"))
            })
            .collect()
    }

    fn unsigned(&self, path: &[&str]) -> Result<u64, ExtractError> {
        self.require(path)?
            .as_u64()
            .ok_or_else(|| self.wrong_type(path, "a non-negative integer"))
    }

    // The nodes API reports some JVM flags as "true"/"false" strings.
    fn flag(&self, path: &[&str]) -> Result<bool, ExtractError> {
        match self.require(path)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(self.wrong_type(path, "a boolean")),
        }
    }

    fn wrong_type(&self, path: &[&str], expected: &'static str) -> ExtractError {
        ExtractError::WrongType {
            node: self.node_id.to_string(),
            path: path.join("."),
            expected,
        }
    }
}
