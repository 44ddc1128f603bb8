//! Text templates built by the CLI
//!
//! A template is plain text with two directives, each on its own line:
//!
//! - `@include <key>` splices in the artifact for `<key>`, which makes it a
//!   dependency of the template being built
//! - `@emit <suffix>` starts a section published as the extra artifact
//!   `<key>$<suffix>`; the section runs until the next `@emit`
//!
//! Everything else is copied through line by line.

use hotcache::{BoxError, BuildContext, Key, SourceUnit};
use std::sync::Arc;

/// Artifact payload: the rendered text
pub type Text = Arc<str>;

const INCLUDE: &str = "@include ";
const EMIT: &str = "@emit ";

/// Render one template unit and every section it emits.
pub fn build_template(
    unit: &SourceUnit<'_>,
    cx: &mut BuildContext<'_, Text>,
) -> Result<Vec<(Key, Text)>, BoxError> {
    let mut sections = vec![(unit.key.clone(), String::new())];

    for line in unit.text()?.lines() {
        if let Some(suffix) = line.strip_prefix(EMIT) {
            let suffix = suffix.trim();
            if suffix.is_empty() {
                return Err(format!("{}: @emit needs a suffix", unit.name).into());
            }
            sections.push((Key::new(format!("{}${}", unit.key, suffix)), String::new()));
            continue;
        }

        let Some((_, text)) = sections.last_mut() else {
            continue;
        };
        match line.strip_prefix(INCLUDE) {
            Some(key) => text.push_str(&cx.get_artifact(key.trim())?),
            None => {
                text.push_str(line);
                text.push('\n');
            }
        }
    }

    Ok(sections
        .into_iter()
        .map(|(key, text)| (key, Text::from(text)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotcache::{ArtifactCache, MemoryProvider, Provider, Timestamp};

    fn cache_with(files: &[(&str, &str)]) -> ArtifactCache<Text> {
        let provider = Arc::new(MemoryProvider::<Text>::new("txt", build_template));
        for (path, contents) in files {
            provider.write(path, contents, Timestamp::EPOCH);
        }
        ArtifactCache::<Text>::builder()
            .provider(provider as Arc<dyn Provider<Text>>)
            .build()
    }

    #[test]
    fn test_plain_text_is_copied() {
        let cache = cache_with(&[("doc/Readme.txt", "line one\nline two")]);
        assert_eq!(
            &*cache.get_artifact("doc.Readme").unwrap(),
            "line one\nline two\n"
        );
    }

    #[test]
    fn test_include_records_dependency() {
        let cache = cache_with(&[
            ("doc/Page.txt", "header\n@include doc.Footer"),
            ("doc/Footer.txt", "footer"),
        ]);

        assert_eq!(&*cache.get_artifact("doc.Page").unwrap(), "header\nfooter\n");
        assert_eq!(
            cache.artifact("doc.Page").unwrap().dependencies,
            vec![Key::from("doc.Footer")]
        );
    }

    #[test]
    fn test_emit_publishes_sections() {
        let cache = cache_with(&[("doc/Page.txt", "body\n@emit toc\n- intro\n@emit meta\nv1")]);

        assert_eq!(&*cache.get_artifact("doc.Page").unwrap(), "body\n");
        assert_eq!(&*cache.get_artifact("doc.Page$toc").unwrap(), "- intro\n");
        assert_eq!(&*cache.get_artifact("doc.Page$meta").unwrap(), "v1\n");
    }

    #[test]
    fn test_missing_include_fails_the_build() {
        let cache = cache_with(&[("doc/Page.txt", "@include doc.Nowhere")]);

        let err = cache.get_artifact("doc.Page").unwrap_err();
        assert!(err.to_string().contains("doc.Nowhere"));
    }

    #[test]
    fn test_emit_without_suffix_is_rejected() {
        let cache = cache_with(&[("doc/Page.txt", "@emit ")]);
        assert!(cache.get_artifact("doc.Page").is_err());
    }
}
