// src/render.rs
//! Snapshot → HTML, and writing the output directory.
//!
//! The page itself is static markup plus an embedded JSON snapshot; the
//! template only needs a handful of `{{name}}` substitutions.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};
use walkdir::WalkDir;

use crate::snapshot::Snapshot;

/// Template compiled into the binary, used when the configured one is absent.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/dashboard.html");

pub trait Renderer {
    fn render(&self, snapshot: &Snapshot) -> Result<String>;
}

pub struct TemplateRenderer {
    template: String,
}

impl TemplateRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Read the template at `path`, or use the built-in one if it is missing.
    pub fn from_path_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "template not found, using built-in");
            return Ok(Self::new(DEFAULT_TEMPLATE));
        }
        let template = fs::read_to_string(path)
            .with_context(|| format!("reading template {}", path.display()))?;
        Ok(Self::new(template))
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, snapshot: &Snapshot) -> Result<String> {
        let json = snapshot.to_json().context("serializing snapshot")?;
        Ok(fill_placeholders(&self.template, |name| match name {
            "title" => Some(html_escape::encode_text(&snapshot.config.title).into_owned()),
            "last_updated" => Some(snapshot.display.last_updated.clone()),
            "date_display" => Some(html_escape::encode_text(&snapshot.display.date_display).into_owned()),
            "refresh_interval" => Some(snapshot.config.refresh_interval.to_string()),
            "snapshot_json" => Some(script_safe(&json)),
            _ => None,
        }))
    }
}

/// Replace every `{{name}}` in one scan of the template. Substituted text is
/// never scanned again; unknown names are left as they are.
fn fill_placeholders(template: &str, value: impl Fn(&str) -> Option<String>) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"\{\{([a-z_]+)\}\}").expect("placeholder regex"));
    re.replace_all(template, |caps: &Captures| {
        value(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// JSON inside a `<script>` block must not contain `</`.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Write `index.html` into `output_dir` (temp file + rename) and mirror
/// `static_dir` to `output_dir/static`. Returns the page path.
pub fn write_output(output_dir: &Path, static_dir: &Path, html: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output dir {}", output_dir.display()))?;

    let page = output_dir.join("index.html");
    let tmp = output_dir.join("index.html.tmp");
    fs::write(&tmp, html).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &page).with_context(|| format!("replacing {}", page.display()))?;

    if static_dir.is_dir() {
        let copied = mirror_dir(static_dir, &output_dir.join("static"))?;
        tracing::debug!(files = copied, from = %static_dir.display(), "static assets mirrored");
    } else {
        tracing::debug!(path = %static_dir.display(), "no static assets");
    }
    Ok(page)
}

fn mirror_dir(src: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src) {
        let entry = entry.context("walking static assets")?;
        let rel = entry.path().strip_prefix(src)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copying {}", entry.path().display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_safe_breaks_closing_tags() {
        assert_eq!(script_safe(r#"{"a":"</script>"}"#), r#"{"a":"<\/script>"}"#);
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = fill_placeholders("<h1>{{title}}</h1>{{other}}<script>{{snapshot_json}}</script>", |name| {
            match name {
                "title" => Some("{{snapshot_json}}".to_string()),
                "snapshot_json" => Some("{}".to_string()),
                _ => None,
            }
        });
        assert_eq!(out, "<h1>{{snapshot_json}}</h1>{{other}}<script>{}</script>");
    }

    #[test]
    fn write_output_mirrors_static_tree() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        fs::create_dir_all(static_dir.join("icons")).unwrap();
        fs::write(static_dir.join("styles.css"), "body{}").unwrap();
        fs::write(static_dir.join("icons/sun.svg"), "<svg/>").unwrap();

        let out = dir.path().join("out");
        let page = write_output(&out, &static_dir, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(page).unwrap(), "<html></html>");
        assert!(out.join("static/styles.css").exists());
        assert!(out.join("static/icons/sun.svg").exists());
        assert!(!out.join("index.html.tmp").exists());
    }

    #[test]
    fn missing_static_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        write_output(&out, &dir.path().join("nope"), "x").unwrap();
        assert!(!out.join("static").exists());
    }
}
