//! One capture session: a draft, the selected site and the capture phase.
//!
//! ```text
//! Idle ──begin_recording──▶ Recording ──finish(Text)──▶ Recognized ──add──▶ Drafting
//!   ▲                          │ cancel / failure                            │  ▲ add, edit
//!   └──────────────────────────┴──────────────── submit ◀────────────────────┘──┘
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::draft::{AddOutcome, DraftAccumulator, DraftId};
use crate::error::CaptureError;
use crate::item::{CaptureItem, ItemIdentity, ItemPatch, Location};
use crate::parser::SentenceParser;
use crate::recognition::RecognitionOutcome;
use crate::submissions::{CaptureSession, SubmissionLog};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name", content = "text", rename_all = "snake_case")]
pub enum CapturePhase {
    Idle,
    Recording,
    /// Recognition produced text that has not been added yet.
    Recognized(String),
    Drafting,
}

#[derive(Debug)]
pub struct CaptureDesk {
    parser: Arc<SentenceParser>,
    draft: DraftAccumulator,
    location: Option<Location>,
    raw_text: Option<String>,
    phase: CapturePhase,
}

impl CaptureDesk {
    #[must_use]
    pub fn new(parser: Arc<SentenceParser>) -> Self {
        Self {
            parser,
            draft: DraftAccumulator::new(),
            location: None,
            raw_text: None,
            phase: CapturePhase::Idle,
        }
    }

    #[must_use]
    pub fn phase(&self) -> &CapturePhase {
        &self.phase
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    #[must_use]
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    #[must_use]
    pub fn draft(&self) -> &DraftAccumulator {
        &self.draft
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.phase == CapturePhase::Recording
    }

    /// Selects the capture site. The selection survives submits.
    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    /// # Errors
    ///
    /// Returns [`CaptureError::RecordingInProgress`] if a recording is
    /// already pending on this desk.
    pub fn begin_recording(&mut self) -> Result<(), CaptureError> {
        if self.is_recording() {
            return Err(CaptureError::RecordingInProgress);
        }
        self.phase = CapturePhase::Recording;
        Ok(())
    }

    /// Stops a pending recording without producing text.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotRecording`] if nothing is pending.
    pub fn cancel_recording(&mut self) -> Result<(), CaptureError> {
        if !self.is_recording() {
            return Err(CaptureError::NotRecording);
        }
        self.settle();
        Ok(())
    }

    /// Applies the result of a recognition attempt and returns the text to
    /// parse, if any. The draft is never touched here.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotRecording`] if nothing is pending.
    pub fn finish_recording(
        &mut self,
        outcome: RecognitionOutcome,
    ) -> Result<Option<String>, CaptureError> {
        if !self.is_recording() {
            return Err(CaptureError::NotRecording);
        }

        match outcome {
            RecognitionOutcome::Text(text) if !text.trim().is_empty() => {
                self.raw_text = Some(text.clone());
                self.phase = CapturePhase::Recognized(text.clone());
                Ok(Some(text))
            }
            other => {
                tracing::info!(outcome = ?other, "recognition produced no text");
                self.settle();
                Ok(None)
            }
        }
    }

    /// Parses `text` into the draft.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::RecordingInProgress`] while recording.
    pub fn add_from_text(&mut self, text: &str) -> Result<AddOutcome, CaptureError> {
        self.ensure_not_recording()?;
        let outcome = self.draft.add_from_text(&self.parser, text);
        if matches!(outcome, AddOutcome::Added(_)) {
            self.raw_text = Some(text.to_owned());
        }
        self.settle();
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns [`CaptureError::RecordingInProgress`] while recording.
    pub fn add_recognized(&mut self, item: CaptureItem) -> Result<DraftId, CaptureError> {
        self.ensure_not_recording()?;
        let id = self.draft.add_recognized(item);
        self.settle();
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`CaptureError::Edit`] when the entry is missing or the patch
    /// is invalid.
    pub fn edit(&mut self, id: DraftId, patch: &ItemPatch) -> Result<(), CaptureError> {
        self.draft.edit(id, patch)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CaptureError::Edit`] when no entry matches or the patch is
    /// invalid.
    pub fn edit_by_identity(
        &mut self,
        identity: &ItemIdentity,
        patch: &ItemPatch,
    ) -> Result<DraftId, CaptureError> {
        Ok(self.draft.edit_by_identity(identity, patch)?)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<CaptureItem> {
        self.draft.snapshot()
    }

    /// Submits the draft into `log` and resets the desk to `Idle`.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::RecordingInProgress`] while recording.
    /// - [`CaptureError::MissingLocation`] if no site was selected.
    /// - [`CaptureError::Log`] if the log rejects the session; the draft is
    ///   kept so the submit can be retried.
    pub fn submit(&mut self, log: &mut SubmissionLog) -> Result<CaptureSession, CaptureError> {
        self.ensure_not_recording()?;
        let location = self
            .location
            .clone()
            .ok_or(CaptureError::MissingLocation)?;

        let session = log.submit(&self.draft.snapshot(), location, self.raw_text.clone())?;

        self.draft.clear();
        self.raw_text = None;
        self.phase = CapturePhase::Idle;
        Ok(session)
    }

    fn ensure_not_recording(&self) -> Result<(), CaptureError> {
        if self.is_recording() {
            Err(CaptureError::RecordingInProgress)
        } else {
            Ok(())
        }
    }

    fn settle(&mut self) {
        self.phase = if self.draft.is_empty() {
            CapturePhase::Idle
        } else {
            CapturePhase::Drafting
        };
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::error::{EditError, LogError};

    const HAM: &str = "喜旺手掰肉老火腿340g — 19.90";

    fn desk() -> CaptureDesk {
        CaptureDesk::new(Arc::new(SentenceParser::default()))
    }

    fn qingdao() -> Location {
        Location::new("青岛办事处").unwrap()
    }

    #[test]
    fn two_lines_then_submit_records_one_session() {
        let mut desk = desk();
        let mut log = SubmissionLog::new();
        desk.set_location(qingdao());

        desk.add_from_text(HAM).unwrap();
        desk.add_from_text(HAM).unwrap();
        let session = desk.submit(&mut log).unwrap();

        assert_eq!(session.items().len(), 2);
        let latest = log.history().next().unwrap();
        assert_eq!(latest.items().len(), 2);
        assert_eq!(latest.location().as_str(), "青岛办事处");
        assert!(desk.snapshot().is_empty());
        assert_eq!(desk.phase(), &CapturePhase::Idle);
        assert_eq!(desk.location(), Some(&qingdao()));
    }

    #[test]
    fn submitted_items_equal_pre_submit_snapshot() {
        let mut desk = desk();
        let mut log = SubmissionLog::new();
        desk.set_location(qingdao());
        desk.add_from_text(HAM).unwrap();
        desk.add_from_text("双汇玉米肠300g — 11.00").unwrap();

        let before = desk.snapshot();
        desk.submit(&mut log).unwrap();
        assert_eq!(log.history().next().unwrap().items(), before.as_slice());
    }

    #[test]
    fn unmatched_line_is_absorbed() {
        let mut desk = desk();
        assert_eq!(desk.add_from_text("not a valid line").unwrap(), AddOutcome::NoMatch);
        assert!(desk.snapshot().is_empty());
        assert_eq!(desk.phase(), &CapturePhase::Idle);
        assert!(desk.raw_text().is_none());
    }

    #[test]
    fn recognized_text_flows_into_draft() {
        let mut desk = desk();
        desk.begin_recording().unwrap();
        assert_eq!(desk.phase(), &CapturePhase::Recording);

        let text = desk
            .finish_recording(RecognitionOutcome::Text(HAM.to_owned()))
            .unwrap()
            .unwrap();
        assert_eq!(desk.phase(), &CapturePhase::Recognized(HAM.to_owned()));

        desk.add_from_text(&text).unwrap();
        assert_eq!(desk.phase(), &CapturePhase::Drafting);
        assert_eq!(desk.raw_text(), Some(HAM));
    }

    #[test]
    fn second_recording_is_rejected() {
        let mut desk = desk();
        desk.begin_recording().unwrap();
        assert!(matches!(
            desk.begin_recording(),
            Err(CaptureError::RecordingInProgress)
        ));
    }

    #[test]
    fn cancel_returns_to_previous_resting_phase() {
        let mut desk = desk();
        desk.begin_recording().unwrap();
        desk.cancel_recording().unwrap();
        assert_eq!(desk.phase(), &CapturePhase::Idle);

        desk.add_from_text(HAM).unwrap();
        desk.begin_recording().unwrap();
        desk.cancel_recording().unwrap();
        assert_eq!(desk.phase(), &CapturePhase::Drafting);
        assert_eq!(desk.snapshot().len(), 1);
    }

    #[test]
    fn failed_or_cancelled_recognition_leaves_draft_untouched() {
        let mut desk = desk();
        desk.add_from_text(HAM).unwrap();
        let before = desk.snapshot();

        for outcome in [
            RecognitionOutcome::Cancelled,
            RecognitionOutcome::Failed("timeout".to_owned()),
            RecognitionOutcome::Text("   ".to_owned()),
        ] {
            desk.begin_recording().unwrap();
            assert_eq!(desk.finish_recording(outcome).unwrap(), None);
            assert_eq!(desk.snapshot(), before);
            assert_eq!(desk.phase(), &CapturePhase::Drafting);
        }
    }

    #[test]
    fn finish_without_recording_is_rejected() {
        let mut desk = desk();
        assert!(matches!(
            desk.finish_recording(RecognitionOutcome::Cancelled),
            Err(CaptureError::NotRecording)
        ));
        assert!(matches!(desk.cancel_recording(), Err(CaptureError::NotRecording)));
    }

    #[test]
    fn adding_while_recording_is_rejected() {
        let mut desk = desk();
        desk.begin_recording().unwrap();
        assert!(matches!(
            desk.add_from_text(HAM),
            Err(CaptureError::RecordingInProgress)
        ));
        assert!(desk.snapshot().is_empty());
    }

    #[test]
    fn submit_requires_location() {
        let mut desk = desk();
        let mut log = SubmissionLog::new();
        desk.add_from_text(HAM).unwrap();
        assert!(matches!(
            desk.submit(&mut log),
            Err(CaptureError::MissingLocation)
        ));
        assert_eq!(desk.snapshot().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn rejected_submit_keeps_draft() {
        let fixed = Uuid::from_u128(1);
        let mut log = SubmissionLog::with_id_source(move || fixed);
        let mut first = desk();
        first.set_location(qingdao());
        first.submit(&mut log).unwrap();

        let mut second = desk();
        second.set_location(qingdao());
        second.add_from_text(HAM).unwrap();
        assert!(matches!(
            second.submit(&mut log),
            Err(CaptureError::Log(LogError::IdCollision(_)))
        ));
        assert_eq!(second.snapshot().len(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn edits_after_submit_do_not_reach_history() {
        let mut desk = desk();
        let mut log = SubmissionLog::new();
        desk.set_location(qingdao());
        desk.add_from_text(HAM).unwrap();
        desk.submit(&mut log).unwrap();

        let AddOutcome::Added(id) = desk.add_from_text(HAM).unwrap() else {
            panic!("expected match");
        };
        let patch = ItemPatch {
            price: Some("1.00".to_owned()),
            ..ItemPatch::default()
        };
        desk.edit(id, &patch).unwrap();

        let stored = log.latest().unwrap();
        assert_eq!(stored.items()[0].price(), Decimal::new(1990, 2));
    }

    #[test]
    fn edit_by_identity_reports_not_found() {
        let mut desk = desk();
        let err = desk
            .edit_by_identity(&ItemIdentity::new("火腿", "1g"), &ItemPatch::default())
            .unwrap_err();
        assert!(matches!(err, CaptureError::Edit(EditError::NotFound)));
    }
}
