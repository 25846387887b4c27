//! Output representations. Handlers build a format-neutral [`Resource`]
//! holding only the fields the active groups allow, then render it as
//! JSON-LD, plain JSON or CSV depending on the `Accept` header.

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::{json, Map, Value};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    One(Resource),
    Many(Vec<Resource>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: i64,
    pub iri: String,
    pub kind: &'static str,
    pub fields: Vec<(&'static str, Field)>,
}

impl Resource {
    pub fn new(id: i64, iri: String, kind: &'static str) -> Self {
        Self {
            id,
            iri,
            kind,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &'static str, field: Field) {
        self.fields.push((name, field));
    }

    pub fn value(&mut self, name: &'static str, value: impl Into<Value>) {
        self.push(name, Field::Value(value.into()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    JsonLd,
    Json,
    Csv,
}

impl Format {
    /// First supported media type in `Accept` wins; JSON-LD otherwise.
    /// CSV is only offered where `csv_allowed` is set.
    pub fn negotiate(headers: &HeaderMap, csv_allowed: bool) -> Self {
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        for media in accept.split(',') {
            let media = media.split(';').next().unwrap_or("").trim();
            match media {
                "application/ld+json" => return Format::JsonLd,
                "application/json" => return Format::Json,
                "text/csv" if csv_allowed => return Format::Csv,
                _ => {}
            }
        }
        Format::JsonLd
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::JsonLd => "application/ld+json; charset=utf-8",
            Format::Json => "application/json; charset=utf-8",
            Format::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// A rendered body with its content type.
#[derive(Debug)]
pub struct Rendered {
    pub format: Format,
    pub body: String,
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, HeaderValue::from_static(self.format.content_type()))],
            self.body,
        )
            .into_response()
    }
}

fn context_iri(kind: &str) -> String {
    format!("/api/contexts/{kind}")
}

fn to_value(resource: &Resource, linked: bool) -> Value {
    let mut map = Map::new();
    if linked {
        map.insert("@id".into(), json!(resource.iri));
        map.insert("@type".into(), json!(resource.kind));
    } else {
        map.insert("id".into(), json!(resource.id));
    }
    for (name, field) in &resource.fields {
        let v = match field {
            Field::Value(v) => v.clone(),
            Field::One(r) => to_value(r, linked),
            Field::Many(rs) => Value::Array(rs.iter().map(|r| to_value(r, linked)).collect()),
        };
        map.insert((*name).to_string(), v);
    }
    Value::Object(map)
}

/// JSON value of a single item, as embedded in other documents.
pub fn item_value(format: Format, resource: &Resource) -> Value {
    let mut value = to_value(resource, format == Format::JsonLd);
    if format == Format::JsonLd {
        if let Value::Object(map) = &mut value {
            map.insert("@context".into(), json!(context_iri(resource.kind)));
        }
    }
    value
}

pub fn render_item(format: Format, resource: &Resource) -> Result<Rendered, ApiError> {
    let body = match format {
        Format::Csv => to_csv(std::slice::from_ref(resource))?,
        _ => serde_json::to_string(&item_value(format, resource)).map_err(anyhow::Error::from)?,
    };
    Ok(Rendered { format, body })
}

pub fn render_collection(
    format: Format,
    collection_iri: &str,
    kind: &str,
    items: &[Resource],
    total: i64,
) -> Result<Rendered, ApiError> {
    let body = match format {
        Format::Csv => to_csv(items)?,
        Format::Json => {
            let list: Vec<Value> = items.iter().map(|r| to_value(r, false)).collect();
            serde_json::to_string(&list).map_err(anyhow::Error::from)?
        }
        Format::JsonLd => {
            let doc = json!({
                "@context": context_iri(kind),
                "@id": collection_iri,
                "@type": "hydra:Collection",
                "hydra:member": items.iter().map(|r| to_value(r, true)).collect::<Vec<_>>(),
                "hydra:totalItems": total,
            });
            serde_json::to_string(&doc).map_err(anyhow::Error::from)?
        }
    };
    Ok(Rendered { format, body })
}

fn cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Embedded resources become dotted columns, lists of them a comma
/// separated IRI list.
fn flatten(resource: &Resource, prefix: &str, out: &mut Vec<(String, String)>) {
    out.push((format!("{prefix}id"), resource.id.to_string()));
    for (name, field) in &resource.fields {
        match field {
            Field::Value(v) => out.push((format!("{prefix}{name}"), cell(v))),
            Field::One(r) => flatten(r, &format!("{prefix}{name}."), out),
            Field::Many(rs) => {
                let iris: Vec<&str> = rs.iter().map(|r| r.iri.as_str()).collect();
                out.push((format!("{prefix}{name}"), iris.join(",")));
            }
        }
    }
}

fn to_csv(items: &[Resource]) -> Result<String, ApiError> {
    let rows: Vec<Vec<(String, String)>> = items
        .iter()
        .map(|r| {
            let mut row = Vec::new();
            flatten(r, "", &mut row);
            row
        })
        .collect();

    let mut columns: Vec<&str> = Vec::new();
    for (name, _) in rows.iter().flatten() {
        if !columns.contains(&name.as_str()) {
            columns.push(name);
        }
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    if !columns.is_empty() {
        wtr.write_record(&columns).map_err(anyhow::Error::from)?;
    }
    for row in &rows {
        let record = columns.iter().map(|c| {
            row.iter()
                .find(|(name, _)| name == c)
                .map_or("", |(_, v)| v.as_str())
        });
        wtr.write_record(record).map_err(anyhow::Error::from)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(String::from_utf8(bytes).map_err(anyhow::Error::from)?)
}
