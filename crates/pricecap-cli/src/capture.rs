//! Batch capture: one sentence per line, submitted as one session.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use pricecap_archive::JsonlArchive;
use pricecap_core::{AddOutcome, CaptureCatalog, CaptureDesk, SubmissionLog};

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct LineReport {
    pub(crate) added: usize,
    /// 1-based numbers of lines that did not parse.
    pub(crate) unmatched: Vec<usize>,
}

/// Feeds every non-blank line of `input` into `desk`.
///
/// # Errors
///
/// Returns an error if the desk refuses text, which only happens while a
/// recording is pending.
pub(crate) fn capture_lines(desk: &mut CaptureDesk, input: &str) -> anyhow::Result<LineReport> {
    let mut report = LineReport::default();
    for (idx, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match desk.add_from_text(line)? {
            AddOutcome::Added(_) => report.added += 1,
            AddOutcome::NoMatch => {
                tracing::warn!(line = idx + 1, text = line, "line did not parse; skipped");
                report.unmatched.push(idx + 1);
            }
        }
    }
    Ok(report)
}

fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Parses the input, submits it under `location` and appends the session to
/// the archive.
///
/// The archive is replayed first so the new session continues its sequence.
///
/// # Errors
///
/// Returns an error if the location is not a catalog site, no line parses,
/// the archive cannot be read or written, or the archived history is
/// inconsistent.
pub(crate) async fn run_capture(
    catalog: &CaptureCatalog,
    location: &str,
    input: Option<&Path>,
    archive_path: &Path,
) -> anyhow::Result<()> {
    let site = catalog.site(location).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown capture site '{location}'; expected one of: {}",
            catalog.sites.join(", ")
        )
    })?;

    let mut desk = CaptureDesk::new(Arc::new(catalog.parser()));
    desk.set_location(site);

    let text = read_input(input)?;
    let report = capture_lines(&mut desk, &text)?;
    if report.added == 0 {
        anyhow::bail!("no line parsed; nothing submitted");
    }
    if !report.unmatched.is_empty() {
        eprintln!(
            "skipped {} unparsed line(s): {:?}",
            report.unmatched.len(),
            report.unmatched
        );
    }

    let archive = JsonlArchive::new(archive_path);
    let mut log = SubmissionLog::restore(archive.load().await?)?;
    let session = desk.submit(&mut log)?;
    archive.append(&session).await?;

    tracing::info!(
        session_id = %session.id(),
        sequence = session.sequence(),
        items = session.items().len(),
        "session submitted"
    );
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}
