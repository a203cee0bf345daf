//! Read commands: dump, find, many, all, query.

use std::sync::Arc;

use anyhow::{Context, bail};
use keystash_core::{Criterion, EmbeddingSerializer, FindOptions, LocalAdapter, Payload, Query};
use regex::Regex;
use serde_json::Value;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Output {
    /// Payloads as stored, with an `_embedded` envelope.
    Payload,
    /// Normalized `{data, included}` documents.
    Extracted,
}

impl Output {
    pub(crate) fn from_flag(extract: bool) -> Self {
        if extract {
            Self::Extracted
        } else {
            Self::Payload
        }
    }
}

fn extractor(adapter: &LocalAdapter) -> EmbeddingSerializer {
    EmbeddingSerializer::with_host(
        Arc::clone(adapter.schema()),
        Arc::clone(adapter.serializer()),
    )
}

fn find_options(flat: bool) -> FindOptions {
    if flat {
        FindOptions::flat()
    } else {
        FindOptions::default()
    }
}

fn render_one(
    adapter: &LocalAdapter,
    model: &str,
    payload: Payload,
    output: Output,
) -> anyhow::Result<Value> {
    match output {
        Output::Payload => Ok(payload.to_json()),
        Output::Extracted => Ok(serde_json::to_value(
            extractor(adapter).extract(model, payload)?,
        )?),
    }
}

fn render_many(
    adapter: &LocalAdapter,
    model: &str,
    payloads: Vec<Payload>,
    output: Output,
) -> anyhow::Result<Value> {
    match output {
        Output::Payload => Ok(Value::Array(payloads.iter().map(Payload::to_json).collect())),
        Output::Extracted => Ok(serde_json::to_value(
            extractor(adapter).extract_many(model, payloads)?,
        )?),
    }
}

/// Print the whole root document.
pub(crate) async fn dump(adapter: &LocalAdapter) -> anyhow::Result<Value> {
    Ok(Value::Object(adapter.load_data().await?))
}

/// Fetch one record.
pub(crate) async fn find(
    adapter: &LocalAdapter,
    model: &str,
    id: &str,
    flat: bool,
    output: Output,
) -> anyhow::Result<Value> {
    let options = find_options(flat);
    let payload = adapter.find_record(model, id, options).await?;
    render_one(adapter, model, payload, output)
}

/// Fetch several records by id.
pub(crate) async fn many(
    adapter: &LocalAdapter,
    model: &str,
    ids: &[String],
    flat: bool,
    output: Output,
) -> anyhow::Result<Value> {
    let options = find_options(flat);
    let payloads = adapter.find_many(model, ids, options).await?;
    render_many(adapter, model, payloads, output)
}

/// Every record of a model, without embedding.
pub(crate) async fn all(
    adapter: &LocalAdapter,
    model: &str,
    output: Output,
) -> anyhow::Result<Value> {
    let payloads = adapter
        .find_all(model)
        .await?
        .into_iter()
        .map(Payload::new)
        .collect();
    render_many(adapter, model, payloads, output)
}

/// Records matching every term.
pub(crate) async fn query(
    adapter: &LocalAdapter,
    model: &str,
    terms: &[String],
    output: Output,
) -> anyhow::Result<Value> {
    let query = parse_query(terms)?;
    let payloads = adapter.query(model, &query).await?;
    render_many(adapter, model, payloads, output)
}

/// Build a query from `<field>=<json>` and `<field>~<regex>` terms.
pub(crate) fn parse_query(terms: &[String]) -> anyhow::Result<Query> {
    terms.iter().try_fold(Query::new(), |query, term| {
        let (field, criterion) = parse_term(term)?;
        Ok(query.with(field, criterion))
    })
}

/// Parse one query term. The first `=` or `~` separates the field from the
/// value.
///
/// An `=` value is read as JSON when it parses and as a plain string
/// otherwise, so `views=10` matches the number and `title=Hello` the string.
pub(crate) fn parse_term(term: &str) -> anyhow::Result<(String, Criterion)> {
    let Some(sep) = term.chars().find(|c| matches!(c, '=' | '~')) else {
        bail!("query term '{term}' must be <field>=<value> or <field>~<regex>");
    };
    let Some((field, raw)) = term.split_once(sep) else {
        bail!("query term '{term}' has no value");
    };
    if field.is_empty() {
        bail!("query term '{term}' names no field");
    }

    let criterion = if sep == '~' {
        let pattern =
            Regex::new(raw).with_context(|| format!("invalid pattern in query term '{term}'"))?;
        Criterion::Matches(pattern)
    } else {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
        Criterion::Equals(value)
    };
    Ok((field.to_owned(), criterion))
}
