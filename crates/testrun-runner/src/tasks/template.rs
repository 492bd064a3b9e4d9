//! Template rendering task.

use std::path::PathBuf;

use handlebars::Handlebars;
use serde_json::Value;
use tracing::info;

use crate::error::TaskError;
use crate::task::TaskDescriptor;

/// Render the Handlebars template at `template` with `data` and write the
/// result to `out`, creating parent directories.
///
/// Missing fields render as empty strings and values are HTML escaped.
pub fn process_template_file(
    template: impl Into<PathBuf>,
    data: Value,
    out: impl Into<PathBuf>,
) -> TaskDescriptor {
    let (template, out) = (template.into(), out.into());
    TaskDescriptor::named(
        "processTemplateFile",
        move |_, _| {
            let (template, data, out) = (template.clone(), data.clone(), out.clone());
            async move { render_to_file(template, data, out).await }
        },
        Vec::new(),
    )
}

async fn render_to_file(template: PathBuf, data: Value, out: PathBuf) -> Result<(), TaskError> {
    info!(template = %template.display(), out = %out.display(), "Rendering template");

    let source = tokio::fs::read_to_string(&template)
        .await
        .map_err(|source| TaskError::Io {
            path: template.clone(),
            source,
        })?;

    let rendered = Handlebars::new()
        .render_template(&source, &data)
        .map_err(|e| TaskError::Template {
            path: template.clone(),
            message: e.to_string(),
        })?;

    if let Some(parent) = out.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| TaskError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(&out, rendered)
        .await
        .map_err(|source| TaskError::Io { path: out, source })
}
