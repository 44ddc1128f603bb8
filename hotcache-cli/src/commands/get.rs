//! `hotcache get`: print artifacts

use super::{CommandResult, Session};
use std::io::Write;

/// Print each artifact in turn; stops at the first failure.
pub fn run(session: &Session, keys: &[String], out: &mut dyn Write) -> CommandResult {
    for key in keys {
        let artifact = session.cache.get_artifact(key)?;
        if keys.len() > 1 {
            writeln!(out, "==> {key} <==")?;
        }
        write!(out, "{artifact}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{output, workspace};

    #[test]
    fn test_prints_single_artifact() {
        let (_dir, session) = workspace(&[("a/Page.txt", "hello")]);
        let mut out = Vec::new();

        run(&session, &["a.Page".to_string()], &mut out).unwrap();
        assert_eq!(output(out), "hello\n");
    }

    #[test]
    fn test_prints_headers_for_several_keys() {
        let (_dir, session) = workspace(&[("One.txt", "1"), ("Two.txt", "2")]);
        let mut out = Vec::new();

        run(&session, &["One".to_string(), "Two".to_string()], &mut out).unwrap();
        assert_eq!(output(out), "==> One <==\n1\n==> Two <==\n2\n");
    }

    #[test]
    fn test_missing_key_fails() {
        let (_dir, session) = workspace(&[]);
        let mut out = Vec::new();

        let err = run(&session, &["Nope".to_string()], &mut out).unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }
}
