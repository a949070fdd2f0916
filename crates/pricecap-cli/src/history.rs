use std::path::Path;

use pricecap_archive::JsonlArchive;
use pricecap_core::{CaptureSession, SubmissionLog};

/// Renders sessions as a table, one header row per session followed by its
/// items.
pub(crate) fn format_sessions<'a>(sessions: impl IntoIterator<Item = &'a CaptureSession>) -> String {
    let mut out = format!("{:<6}{:<18}{:<7}LOCATION\n", "SEQ", "SUBMITTED", "ITEMS");
    for session in sessions {
        out.push_str(&format!(
            "{:<6}{:<18}{:<7}{}\n",
            session.sequence(),
            session.submitted_at().format("%Y-%m-%d %H:%M"),
            session.items().len(),
            session.location()
        ));
        for item in session.items() {
            out.push_str(&format!(
                "      {} {} {} {}\n",
                item.brand(),
                item.product_name(),
                item.specifications(),
                item.display_price()
            ));
        }
    }
    out
}

/// Prints the most recent `limit` archived sessions, newest first.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or holds duplicate
/// session ids.
pub(crate) async fn run_history(archive_path: &Path, limit: usize) -> anyhow::Result<()> {
    let archive = JsonlArchive::new(archive_path);
    let log = SubmissionLog::restore(archive.load().await?)?;

    if log.is_empty() {
        println!("no sessions archived in {}", archive_path.display());
        return Ok(());
    }

    print!("{}", format_sessions(log.history().take(limit)));
    Ok(())
}
