//! `hotcache watch`: re-request an artifact and print it when it changes

use super::{CommandResult, Session};
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Poll `key` every `interval`, `count` times or forever.
///
/// The artifact is printed on the first poll and whenever it changes;
/// build errors are reported once per distinct message and polling goes on.
pub fn run(
    session: &Session,
    key: &str,
    interval: Duration,
    count: Option<usize>,
    out: &mut dyn Write,
) -> CommandResult {
    let mut last: Option<Result<String, String>> = None;
    let mut polls = 0usize;

    loop {
        let current = session
            .cache
            .get_artifact(key)
            .map(|artifact| artifact.to_string())
            .map_err(|e| e.to_string());

        if last.as_ref() != Some(&current) {
            match &current {
                Ok(text) => {
                    writeln!(out, "--- {key} (poll {polls})")?;
                    write!(out, "{text}")?;
                }
                Err(message) => writeln!(out, "!!! {message}")?,
            }
            out.flush()?;
            last = Some(current);
        }

        polls += 1;
        if count.is_some_and(|count| polls >= count) {
            return Ok(());
        }
        thread::sleep(interval);
    }
}
