//! `hotcache graph`: dump the dependency graph

use super::{CommandResult, Session};
use clap::ValueEnum;
use hotcache::ArtifactInfo;
use std::io::Write;

/// Output format for the graph dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// One entry per line, dependencies indented below
    Text,
    /// Pretty-printed JSON array of entries
    Json,
}

/// Request `keys` (every buildable key if empty) and dump what the cache
/// learned, dependencies before dependents.
///
/// Failing keys are logged and skipped so the rest of the graph still shows.
pub fn run(
    session: &Session,
    keys: &[String],
    format: GraphFormat,
    out: &mut dyn Write,
) -> CommandResult {
    let keys: Vec<String> = if keys.is_empty() {
        session
            .provider
            .keys()
            .into_iter()
            .map(|key| key.to_string())
            .collect()
    } else {
        keys.to_vec()
    };

    for key in &keys {
        if let Err(e) = session.cache.get_artifact(key) {
            tracing::warn!("{}", e);
        }
    }

    let snapshot = session.cache.snapshot();
    match format {
        GraphFormat::Text => write_text(&snapshot, out)?,
        GraphFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &snapshot)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_text(snapshot: &[ArtifactInfo], out: &mut dyn Write) -> std::io::Result<()> {
    for info in snapshot {
        if info.found {
            writeln!(out, "{} ({})", info.key, info.resource)?;
        } else {
            writeln!(out, "{} (not found)", info.key)?;
        }
        for dependency in &info.dependencies {
            writeln!(out, "  -> {dependency}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{output, workspace};

    fn site() -> Vec<(&'static str, &'static str)> {
        vec![
            ("web/Index.txt", "@include lib.Footer\n@include lib.Missing"),
            ("web/About.txt", "@include lib.Footer"),
            ("lib/Footer.txt", "footer"),
        ]
    }

    #[test]
    fn test_text_graph_for_requested_key() {
        let (_dir, session) = workspace(&site());
        let mut out = Vec::new();

        run(&session, &["web.About".to_string()], GraphFormat::Text, &mut out).unwrap();
        assert_eq!(
            output(out),
            "lib.Footer (lib/Footer.txt)\nweb.About (web/About.txt)\n  -> lib.Footer\n"
        );
    }

    #[test]
    fn test_failures_do_not_hide_the_graph() {
        let (_dir, session) = workspace(&site());
        let mut out = Vec::new();

        run(&session, &[], GraphFormat::Text, &mut out).unwrap();
        let text = output(out);
        assert!(text.contains("lib.Missing (not found)"));
        assert!(text.contains("web.About (web/About.txt)"));
        assert!(!text.contains("web.Index"));
    }

    #[test]
    fn test_json_graph() {
        let (_dir, session) = workspace(&site());
        let mut out = Vec::new();

        run(&session, &["web.About".to_string()], GraphFormat::Json, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output(out)).unwrap();
        assert_eq!(json[1]["key"], "web.About");
        assert_eq!(json[1]["dependencies"][0], "lib.Footer");
    }
}
