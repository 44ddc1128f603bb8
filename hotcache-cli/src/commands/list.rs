//! `hotcache list`: buildable keys under the root

use super::{CommandResult, Session};
use std::io::Write;

/// Print every buildable key, one per line.
pub fn run(session: &Session, out: &mut dyn Write) -> CommandResult {
    for key in session.provider.keys() {
        writeln!(out, "{key}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{output, workspace};

    #[test]
    fn test_lists_sorted_keys() {
        let (_dir, session) = workspace(&[
            ("web/Index.txt", ""),
            ("lib/Footer.txt", ""),
            ("notes.md", ""),
        ]);
        let mut out = Vec::new();

        run(&session, &mut out).unwrap();
        assert_eq!(output(out), "lib.Footer\nweb.Index\n");
    }
}
