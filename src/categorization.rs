//! Categorization questions: the author names categories and options, then
//! drags options into categories and saves the result in one request.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::alert::Alert;
use crate::assignment::{AppendAssignments, Assignments, DragPayload, accept_transfer, begin_transfer};
use crate::backend::{CategorizationPayload, CategoryRecord, QuestionStore, StoreError};

pub const SAVED_MESSAGE: &str = "Data saved successfully!";
pub const FAILED_MESSAGE: &str = "Failed to save data.";

/// Millisecond timestamp, bumped when two options are created within the same
/// millisecond.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(i64);

impl OptionId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub id: OptionId,
    pub name: String,
}

/// A named drop target. The options assigned to it live in the builder's
/// assignment map, see [`CategorizationBuilder::category_items`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategorizationPhase {
    Authoring,
    Categorizing,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub category_name: String,
    pub option_name: String,
}

#[derive(Debug, Default)]
struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    fn next(&mut self) -> OptionId {
        let now = chrono::Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        OptionId(self.last)
    }
}

#[derive(Debug)]
pub struct CategorizationBuilder {
    phase: CategorizationPhase,
    categories: Vec<Category>,
    options: Vec<OptionItem>,
    assignments: AppendAssignments<String, OptionItem>,
    pub form: CategoryForm,
    ids: IdGenerator,
    alert: Option<Alert>,
}

impl CategorizationBuilder {
    pub fn new() -> Self {
        Self {
            phase: CategorizationPhase::Authoring,
            categories: Vec::new(),
            options: Vec::new(),
            assignments: AppendAssignments::new(),
            form: CategoryForm::default(),
            ids: IdGenerator::default(),
            alert: None,
        }
    }

    pub fn phase(&self) -> CategorizationPhase {
        self.phase
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn options(&self) -> &[OptionItem] {
        &self.options
    }

    pub fn assignments(&self) -> &AppendAssignments<String, OptionItem> {
        &self.assignments
    }

    pub fn category_items(&self, name: &str) -> &[OptionItem] {
        self.assignments.get(&name.to_string()).unwrap_or_default()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn add_category(&mut self, name: &str) -> bool {
        if name.is_empty() || self.phase != CategorizationPhase::Authoring {
            return false;
        }
        self.categories.push(Category {
            name: name.to_string(),
        });
        self.assignments.seed(name.to_string());
        debug!(category = name, "category added");
        true
    }

    pub fn add_option(&mut self, name: &str) -> bool {
        if name.is_empty() || self.phase != CategorizationPhase::Authoring {
            return false;
        }
        let id = self.ids.next();
        self.options.push(OptionItem {
            id,
            name: name.to_string(),
        });
        debug!(option = name, id = id.get(), "option added");
        true
    }

    /// Adds the category typed into the form and clears the field.
    pub fn add_category_from_form(&mut self) -> bool {
        let name = self.form.category_name.clone();
        let added = self.add_category(&name);
        if added {
            self.form.category_name.clear();
        }
        added
    }

    pub fn add_option_from_form(&mut self) -> bool {
        let name = self.form.option_name.clone();
        let added = self.add_option(&name);
        if added {
            self.form.option_name.clear();
        }
        added
    }

    /// No check that categories or options exist; an empty board is allowed.
    pub fn start_categorization(&mut self) {
        self.phase = CategorizationPhase::Categorizing;
        debug!(
            categories = self.categories.len(),
            options = self.options.len(),
            "categorization started"
        );
    }

    /// Packs the option at `index` for dragging.
    pub fn begin_drag(&self, index: usize) -> Option<DragPayload> {
        if self.phase != CategorizationPhase::Categorizing {
            return None;
        }
        self.options.get(index).and_then(begin_transfer)
    }

    /// Appends the dragged option to `category`. The option stays in the pool,
    /// so it can be dropped again, here or elsewhere.
    pub fn drop_option(&mut self, category: &str, payload: &DragPayload) -> bool {
        if self.phase != CategorizationPhase::Categorizing {
            return false;
        }
        let Some(option) = accept_transfer::<OptionItem>(payload) else {
            debug!(category, "rejected malformed drag payload");
            return false;
        };
        self.assignments.assign(category.to_string(), option)
    }

    pub fn payload(&self) -> CategorizationPayload {
        CategorizationPayload {
            categories: self
                .categories
                .iter()
                .map(|category| CategoryRecord {
                    name: category.name.clone(),
                    options: self.category_items(&category.name).to_vec(),
                })
                .collect(),
        }
    }

    /// Saves the board. On success everything returns to its initial state; on
    /// failure the board is kept so the author can retry.
    pub async fn save<S: QuestionStore>(&mut self, store: &S) -> bool {
        let result = store.save_categorization(&self.payload()).await;
        self.apply_save(result)
    }

    /// Applies the outcome of a save request, which may have been sent from
    /// another task while the author kept editing.
    pub fn apply_save(&mut self, result: Result<(), StoreError>) -> bool {
        match result {
            Ok(()) => {
                info!(categories = self.categories.len(), "categorization saved");
                self.reset();
                self.alert = Some(Alert::success(SAVED_MESSAGE));
                true
            }
            Err(err) => {
                error!(error = %err, "failed to save categorization");
                self.alert = Some(Alert::failure(format!(
                    "{} {}",
                    FAILED_MESSAGE,
                    err.user_message()
                )));
                false
            }
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    fn reset(&mut self) {
        self.phase = CategorizationPhase::Authoring;
        self.categories.clear();
        self.options.clear();
        self.assignments.clear();
        self.form = CategoryForm::default();
    }
}

impl Default for CategorizationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::backend::fake::FakeStore;

    fn option_payload(id: i64, name: &str) -> DragPayload {
        begin_transfer(&OptionItem {
            id: OptionId::new(id),
            name: name.into(),
        })
        .unwrap()
    }

    fn board(categories: &[&str], options: &[&str]) -> CategorizationBuilder {
        let mut builder = CategorizationBuilder::new();
        for name in categories {
            builder.add_category(name);
        }
        for name in options {
            builder.add_option(name);
        }
        builder.start_categorization();
        builder
    }

    #[test]
    fn empty_names_do_not_mutate_anything() {
        let mut builder = CategorizationBuilder::new();
        assert!(!builder.add_category(""));
        assert!(!builder.add_option(""));
        assert!(builder.categories().is_empty());
        assert!(builder.options().is_empty());
        assert!(!builder.assignments().contains(&String::new()));
    }

    #[test]
    fn form_fields_are_cleared_only_after_an_add() {
        let mut builder = CategorizationBuilder::new();
        builder.form.category_name = "Animals".into();
        assert!(builder.add_category_from_form());
        assert_eq!(builder.form.category_name, "");

        assert!(!builder.add_option_from_form());
        builder.form.option_name = "Cat".into();
        assert!(builder.add_option_from_form());
        assert_eq!(builder.form.option_name, "");
        assert_eq!(builder.options()[0].name, "Cat");
    }

    #[test]
    fn option_ids_are_unique_even_when_created_together() {
        let builder = board(&[], &["a", "b", "c", "d"]);
        let ids: Vec<i64> = builder.options().iter().map(|o| o.id.get()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn drops_append_without_dedup() {
        let mut builder = board(&["Animals"], &[]);
        let payload = option_payload(1, "Cat");

        assert!(builder.drop_option("Animals", &payload));
        assert_eq!(
            builder.category_items("Animals"),
            &[OptionItem {
                id: OptionId::new(1),
                name: "Cat".into()
            }]
        );

        assert!(builder.drop_option("Animals", &payload));
        assert_eq!(builder.category_items("Animals").len(), 2);
    }

    #[test]
    fn same_option_may_land_in_several_categories() {
        let mut builder = board(&["Pets", "Mammals"], &["Cat"]);
        let payload = builder.begin_drag(0).unwrap();
        assert!(builder.drop_option("Pets", &payload));
        assert!(builder.drop_option("Mammals", &payload));
        assert_eq!(builder.options().len(), 1);
        assert_eq!(builder.category_items("Pets")[0].name, "Cat");
        assert_eq!(builder.category_items("Mammals")[0].name, "Cat");
    }

    #[test]
    fn bad_drops_are_ignored() {
        let mut builder = board(&["Animals"], &["Cat"]);
        assert!(!builder.drop_option("Animals", &DragPayload::from_raw("not json")));
        assert!(!builder.drop_option("Plants", &option_payload(1, "Cat")));
        assert!(builder.category_items("Animals").is_empty());
        assert!(builder.begin_drag(5).is_none());
    }

    #[test]
    fn authoring_is_closed_once_categorizing() {
        let mut builder = board(&["Animals"], &["Cat"]);
        assert_eq!(builder.phase(), CategorizationPhase::Categorizing);
        assert!(!builder.add_category("Plants"));
        assert!(!builder.add_option("Fern"));

        let mut authoring = CategorizationBuilder::new();
        authoring.add_category("Animals");
        assert!(!authoring.drop_option("Animals", &option_payload(1, "Cat")));
        assert!(authoring.begin_drag(0).is_none());
    }

    #[test]
    fn payload_follows_category_order() {
        let mut builder = board(&["B", "A"], &["x"]);
        let payload = builder.begin_drag(0).unwrap();
        builder.drop_option("A", &payload);

        let records = builder.payload().categories;
        assert_eq!(records[0].name, "B");
        assert!(records[0].options.is_empty());
        assert_eq!(records[1].name, "A");
        assert_eq!(records[1].options[0].name, "x");
    }

    #[tokio::test]
    async fn successful_save_resets_everything() {
        let store = FakeStore::ok();
        let mut builder = board(&["Animals"], &["Cat"]);
        builder.form.option_name = "half typed".into();
        let payload = builder.begin_drag(0).unwrap();
        builder.drop_option("Animals", &payload);

        assert!(builder.save(&store).await);

        assert_eq!(store.request_count(), 1);
        let body = store.last_body().unwrap();
        assert_eq!(body["categories"][0]["name"], "Animals");
        assert_eq!(body["categories"][0]["options"][0]["name"], "Cat");

        assert!(builder.categories().is_empty());
        assert!(builder.options().is_empty());
        assert!(!builder.assignments().contains(&"Animals".to_string()));
        assert_eq!(builder.form, CategoryForm::default());
        assert_eq!(builder.phase(), CategorizationPhase::Authoring);
        assert_eq!(builder.alert().unwrap().message, SAVED_MESSAGE);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_board_and_alerts() {
        let store = FakeStore::failing(500, r#"{"error":"database unavailable"}"#);
        let mut builder = board(&["Animals"], &["Cat"]);
        let payload = builder.begin_drag(0).unwrap();
        builder.drop_option("Animals", &payload);

        assert!(!builder.save(&store).await);

        assert_eq!(builder.phase(), CategorizationPhase::Categorizing);
        assert_eq!(builder.category_items("Animals").len(), 1);
        let alert = builder.alert().unwrap();
        assert!(alert.is_failure());
        assert!(alert.message.starts_with(FAILED_MESSAGE));
        assert!(alert.message.contains("database unavailable"));

        builder.dismiss_alert();
        assert!(builder.alert().is_none());
    }

    #[test]
    fn late_success_resets_edits_made_while_waiting() {
        let mut builder = board(&["Animals"], &["Cat"]);
        let payload = builder.begin_drag(0).unwrap();
        builder.drop_option("Animals", &payload);
        builder.drop_option("Animals", &payload);

        assert!(builder.apply_save(Ok(())));
        assert!(builder.category_items("Animals").is_empty());
        assert_eq!(builder.phase(), CategorizationPhase::Authoring);
    }

    proptest! {
        #[test]
        fn non_empty_names_are_kept_in_call_order(
            calls in proptest::collection::vec((any::<bool>(), "[a-z]{0,4}"), 0..24)
        ) {
            let mut builder = CategorizationBuilder::new();
            for (is_category, name) in &calls {
                if *is_category {
                    builder.add_category(name);
                } else {
                    builder.add_option(name);
                }
            }

            let expected_categories: Vec<&str> = calls
                .iter()
                .filter(|(is_category, name)| *is_category && !name.is_empty())
                .map(|(_, name)| name.as_str())
                .collect();
            let expected_options: Vec<&str> = calls
                .iter()
                .filter(|(is_category, name)| !*is_category && !name.is_empty())
                .map(|(_, name)| name.as_str())
                .collect();

            let categories: Vec<&str> = builder.categories().iter().map(|c| c.name.as_str()).collect();
            let options: Vec<&str> = builder.options().iter().map(|o| o.name.as_str()).collect();
            prop_assert_eq!(categories, expected_categories.clone());
            prop_assert_eq!(options, expected_options);
            for name in expected_categories {
                prop_assert!(builder.assignments().contains(&name.to_string()));
                prop_assert!(builder.category_items(name).is_empty());
            }
        }
    }
}
