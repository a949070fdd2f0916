//! The in-progress list of parsed items for one capture desk.

use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::item::{CaptureItem, ItemIdentity, ItemPatch};
use crate::parser::{ParseOutcome, SentenceParser};

/// Desk-local handle for a draft entry. Assigned on append and never reused
/// by the same accumulator, even after [`DraftAccumulator::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(u64);

impl DraftId {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftEntry {
    pub id: DraftId,
    pub item: CaptureItem,
}

/// Outcome of [`DraftAccumulator::add_from_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added(DraftId),
    NoMatch,
}

/// Ordered, editable list of items awaiting submission.
#[derive(Debug, Default)]
pub struct DraftAccumulator {
    entries: Vec<DraftEntry>,
    /// 64-bit so the counter cannot wrap back onto a live id.
    next_id: u64,
}

impl DraftAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` and appends the item on a match. The list is left
    /// unchanged when the text does not parse.
    pub fn add_from_text(&mut self, parser: &SentenceParser, text: &str) -> AddOutcome {
        match parser.parse(text) {
            ParseOutcome::Matched(item) => AddOutcome::Added(self.add_recognized(item)),
            ParseOutcome::Unmatched => {
                tracing::debug!(text, "draft: text did not match a price sentence");
                AddOutcome::NoMatch
            }
        }
    }

    /// Appends an already structured item.
    pub fn add_recognized(&mut self, item: CaptureItem) -> DraftId {
        let id = DraftId(self.next_id);
        self.next_id += 1;
        tracing::debug!(
            draft_id = id.get(),
            brand = item.brand(),
            product = item.product_name(),
            "draft: item appended"
        );
        self.entries.push(DraftEntry { id, item });
        id
    }

    /// Applies the provided fields of `patch` to the entry with `id`.
    ///
    /// # Errors
    ///
    /// - [`EditError::NotFound`] if no entry has this id.
    /// - [`EditError::Invalid`] if the patched item fails validation; the
    ///   stored item is left as it was.
    pub fn edit(&mut self, id: DraftId, patch: &ItemPatch) -> Result<(), EditError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(EditError::NotFound)?;
        entry.item = entry.item.patched(patch)?;
        Ok(())
    }

    /// Edits the first entry (lowest index) whose product name and
    /// specifications equal `identity`.
    ///
    /// # Errors
    ///
    /// Same as [`DraftAccumulator::edit`].
    pub fn edit_by_identity(
        &mut self,
        identity: &ItemIdentity,
        patch: &ItemPatch,
    ) -> Result<DraftId, EditError> {
        let id = self
            .find_by_identity(identity)
            .ok_or(EditError::NotFound)?;
        self.edit(id, patch)?;
        Ok(id)
    }

    #[must_use]
    pub fn find_by_identity(&self, identity: &ItemIdentity) -> Option<DraftId> {
        self.entries
            .iter()
            .find(|entry| entry.item.matches(identity))
            .map(|entry| entry.id)
    }

    #[must_use]
    pub fn get(&self, id: DraftId) -> Option<&CaptureItem> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.item)
    }

    /// Copy of the current items in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CaptureItem> {
        self.entries.iter().map(|entry| entry.item.clone()).collect()
    }

    #[must_use]
    pub fn entries(&self) -> &[DraftEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::ValidationError;

    const HAM: &str = "喜旺手掰肉老火腿340g — 19.90";
    const SAUSAGE: &str = "双汇玉米肠300g — 11.00";

    fn price_patch(price: &str) -> ItemPatch {
        ItemPatch {
            price: Some(price.to_owned()),
            ..ItemPatch::default()
        }
    }

    #[test]
    fn add_from_text_appends_in_call_order() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        assert!(matches!(draft.add_from_text(&parser, HAM), AddOutcome::Added(_)));
        assert!(matches!(draft.add_from_text(&parser, SAUSAGE), AddOutcome::Added(_)));

        let items = draft.snapshot();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].brand(), "喜旺");
        assert_eq!(items[1].brand(), "双汇");
    }

    #[test]
    fn add_from_text_leaves_list_unchanged_on_no_match() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        draft.add_from_text(&parser, HAM);
        assert_eq!(draft.add_from_text(&parser, "not a valid line"), AddOutcome::NoMatch);
        assert_eq!(draft.len(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        let AddOutcome::Added(first) = draft.add_from_text(&parser, HAM) else {
            panic!("expected match");
        };
        draft.clear();
        let AddOutcome::Added(second) = draft.add_from_text(&parser, HAM) else {
            panic!("expected match");
        };
        assert_ne!(first, second);
        assert!(draft.get(first).is_none());
    }

    #[test]
    fn ids_keep_counting_past_u32_range() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator {
            entries: Vec::new(),
            next_id: u64::from(u32::MAX),
        };
        let AddOutcome::Added(last_small) = draft.add_from_text(&parser, HAM) else {
            panic!("expected match");
        };
        let AddOutcome::Added(next) = draft.add_from_text(&parser, SAUSAGE) else {
            panic!("expected match");
        };

        assert_eq!(last_small.get(), u64::from(u32::MAX));
        assert_eq!(next.get(), u64::from(u32::MAX) + 1);
        assert_ne!(next.get(), 0);
        assert_eq!(draft.get(next).unwrap().brand(), "双汇");
    }

    #[test]
    fn edit_changes_only_given_fields() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        let AddOutcome::Added(id) = draft.add_from_text(&parser, HAM) else {
            panic!("expected match");
        };

        draft.edit(id, &price_patch("18.80")).unwrap();

        let item = draft.get(id).unwrap();
        assert_eq!(item.price(), Decimal::new(1880, 2));
        assert_eq!(item.brand(), "喜旺");
        assert_eq!(item.product_name(), "手掰肉老火腿");
        assert_eq!(item.specifications(), "340g");
    }

    #[test]
    fn edit_unknown_id_is_not_found_and_leaves_draft_unchanged() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        draft.add_from_text(&parser, HAM);
        let before = draft.entries().to_vec();

        assert_eq!(
            draft.edit(DraftId::new(99), &price_patch("1.00")),
            Err(EditError::NotFound)
        );
        assert_eq!(draft.entries(), before.as_slice());
    }

    #[test]
    fn invalid_patch_preserves_original_item() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        let AddOutcome::Added(id) = draft.add_from_text(&parser, HAM) else {
            panic!("expected match");
        };

        let err = draft.edit(id, &price_patch("十九块")).unwrap_err();
        assert_eq!(
            err,
            EditError::Invalid(ValidationError::InvalidPrice("十九块".to_owned()))
        );
        assert_eq!(draft.get(id).unwrap().price(), Decimal::new(1990, 2));
    }

    #[test]
    fn edit_by_identity_updates_first_duplicate_only() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        draft.add_from_text(&parser, HAM);
        draft.add_from_text(&parser, HAM);

        let identity = ItemIdentity::new("手掰肉老火腿", "340g");
        let id = draft.edit_by_identity(&identity, &price_patch("17.00")).unwrap();

        assert_eq!(id, draft.entries()[0].id);
        let items = draft.snapshot();
        assert_eq!(items[0].price(), Decimal::new(1700, 2));
        assert_eq!(items[1].price(), Decimal::new(1990, 2));
    }

    #[test]
    fn edit_by_identity_reports_not_found() {
        let mut draft = DraftAccumulator::new();
        let identity = ItemIdentity::new("火腿", "1g");
        assert_eq!(
            draft.edit_by_identity(&identity, &ItemPatch::default()),
            Err(EditError::NotFound)
        );
    }

    #[test]
    fn snapshot_is_independent_of_later_edits() {
        let parser = SentenceParser::default();
        let mut draft = DraftAccumulator::new();
        let AddOutcome::Added(id) = draft.add_from_text(&parser, HAM) else {
            panic!("expected match");
        };
        let snapshot = draft.snapshot();
        draft.edit(id, &price_patch("1.00")).unwrap();
        assert_eq!(snapshot[0].price(), Decimal::new(1990, 2));
    }
}
