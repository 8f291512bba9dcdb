//! Job-name → variant registry.
//!
//! The registry is a TSV table with a header row (see
//! `templates/variants.tsv`). Lookups are by exact job name.
use crate::templates;
use crate::types::{Dimension, Variant};
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;

const VERSION_COLUMN: &str = "version";
const JOB_COLUMN: &str = "job";
const VARIANT_COLUMN: &str = "variant";
const ANY_VERSION: &str = "*";

#[derive(Debug, Default)]
pub struct Registry {
    variants: HashMap<String, Variant>,
}

impl Registry {
    pub fn lookup(&self, job_name: &str) -> Option<&Variant> {
        self.variants.get(job_name)
    }

    pub fn job_count(&self) -> usize {
        self.variants.len()
    }

    #[cfg(test)]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Variant)>,
    {
        Self {
            variants: pairs.into_iter().collect(),
        }
    }
}

/// Load the registry from `path`, or the built-in table when `path` is None.
pub fn load(path: Option<&Path>, release: Option<&str>) -> Result<Registry> {
    let (source, text) = match path {
        Some(path) => (
            path.display().to_string(),
            std::fs::read_to_string(path)
                .with_context(|| format!("read variant registry {}", path.display()))?,
        ),
        None => ("<built-in>".to_string(), templates::DEFAULT_VARIANTS_TSV.to_string()),
    };
    let registry =
        parse_tsv(&text, release).with_context(|| format!("parse variant registry {source}"))?;
    tracing::debug!(
        source = %source,
        release,
        jobs = registry.job_count(),
        "variant registry loaded"
    );
    Ok(registry)
}

/// Parse a registry table, keeping the rows that apply to `release`.
pub fn parse_tsv(text: &str, release: Option<&str>) -> Result<Registry> {
    let mut rows = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'));

    let (_, header) = rows.next().ok_or_else(|| anyhow!("missing header row"))?;
    let columns = Columns::from_header(header)?;

    let mut variants: HashMap<String, Variant> = HashMap::new();
    for (line_no, line) in rows {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let version = columns.field(&fields, columns.version);
        if let Some(release) = release {
            if version != release && version != ANY_VERSION {
                continue;
            }
        }

        let job = columns.field(&fields, columns.job);
        let name = columns.field(&fields, columns.variant);
        if job.is_empty() || name.is_empty() {
            return Err(anyhow!("line {line_no}: job and variant must be non-empty"));
        }
        let mut variant = Variant {
            name: name.to_string(),
            ..Variant::default()
        };
        for (dimension, column) in &columns.dimensions {
            let raw = columns.field(&fields, *column);
            let enabled = parse_flag(raw)
                .ok_or_else(|| anyhow!("line {line_no}: invalid {dimension} flag {raw:?}"))?;
            variant.set(*dimension, enabled);
        }

        if variants.insert(job.to_string(), variant).is_some() {
            return Err(anyhow!(
                "line {line_no}: job {job:?} is listed more than once for this release"
            ));
        }
    }
    Ok(Registry { variants })
}

struct Columns {
    version: usize,
    job: usize,
    variant: usize,
    dimensions: Vec<(Dimension, usize)>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<String> = header
            .split('\t')
            .map(|name| name.trim().to_ascii_lowercase())
            .collect();
        let position = |wanted: &str| {
            names
                .iter()
                .position(|name| name == wanted)
                .ok_or_else(|| anyhow!("header is missing column {wanted:?}"))
        };
        let mut dimensions = Vec::new();
        for dimension in Dimension::ALL {
            dimensions.push((dimension, position(dimension.as_str())?));
        }
        Ok(Self {
            version: position(VERSION_COLUMN)?,
            job: position(JOB_COLUMN)?,
            variant: position(VARIANT_COLUMN)?,
            dimensions,
        })
    }

    fn field<'a>(&self, fields: &[&'a str], column: usize) -> &'a str {
        fields.get(column).copied().unwrap_or("")
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "x" => Some(true),
        "false" | "no" | "0" | "-" | "" => Some(false),
        _ => None,
    }
}
