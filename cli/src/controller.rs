use ledger_core::chips::{self, ChipKey, FilterChip};
use ledger_core::error::{FilterError, ValidationError};
use ledger_core::events::{EventCreatePayload, EventItem};
use ledger_core::filters::{FILTERS_STORAGE_KEY, FilterKey, FilterState, SEARCH_STORAGE_KEY};
use ledger_core::form::EventForm;
use ledger_core::query::{self, EventQuery, QueryState};
use ledger_core::reference::ReferenceData;
use ledger_core::toast::{ToastAction, ToastKind, ToastQueue};
use ledger_core::undo::{DeleteFlow, DeletePhase, UNDO_STORAGE_KEY};
use ledger_core::view::ViewSettings;

use crate::api::LedgerApi;
use crate::store::{self, KeyValueStore};

/// State and actions of the events view for one session.
///
/// Every mutation goes through `&mut self`, so callbacks never interleave.
/// Filter changes persist immediately and reload the list when the changed
/// field is a reload trigger.
pub struct EventsController<A, S> {
    api: A,
    store: S,
    filters: FilterState,
    search: String,
    refs: ReferenceData,
    results: QueryState,
    toasts: ToastQueue,
    deletes: DeleteFlow,
    /// Toast carrying the Undo action for the current undo payload.
    undo_toast: Option<i64>,
    view: ViewSettings,
}

impl<A: LedgerApi, S: KeyValueStore> EventsController<A, S> {
    pub fn new(api: A, store: S) -> Self {
        let (filters, search) = store::load_view_state(&store);
        let deletes = DeleteFlow::with_undo(store::load_undo(&store));
        Self {
            api,
            store,
            filters,
            search,
            refs: ReferenceData::default(),
            results: QueryState::default(),
            toasts: ToastQueue::default(),
            deletes,
            undo_toast: None,
            view: ViewSettings::default(),
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn refs(&self) -> &ReferenceData {
        &self.refs
    }

    pub fn events(&self) -> &[EventItem] {
        self.results.events()
    }

    #[cfg(test)]
    pub fn loading(&self) -> bool {
        self.results.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.results.error()
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn view(&self) -> &ViewSettings {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewSettings {
        &mut self.view
    }

    #[cfg(test)]
    pub fn delete_phase(&self) -> &DeletePhase {
        self.deletes.phase()
    }

    pub fn undo_payload(&self) -> Option<&EventCreatePayload> {
        self.deletes.undo_payload()
    }

    pub fn has_prev(&self) -> bool {
        query::has_prev(&self.filters)
    }

    pub fn has_next(&self) -> bool {
        query::has_next(&self.filters, self.results.events().len())
    }

    pub fn chips(&self) -> Vec<FilterChip> {
        chips::active_filters(&self.search, &self.filters, &self.refs)
    }

    /// Reference data, then the first page.
    pub async fn mount(&mut self) {
        self.load_reference().await;
        self.load().await;
    }

    /// Fetch agents, tools and tags concurrently. A failed collection stays
    /// empty; nothing here blocks the view.
    pub async fn load_reference(&mut self) {
        let (agents, tools, tags) = tokio::join!(
            self.api.list_agents(),
            self.api.list_tools(),
            self.api.list_tags()
        );
        match agents {
            Ok(agents) => self.refs.set_agents(agents),
            Err(e) => tracing::warn!(error = %e, "failed to load agents"),
        }
        match tools {
            Ok(tools) => self.refs.set_tools(tools),
            Err(e) => tracing::warn!(error = %e, "failed to load tools"),
        }
        match tags {
            Ok(tags) => self.refs.set_tags(tags),
            Err(e) => tracing::warn!(error = %e, "failed to load tags"),
        }
    }

    pub async fn load(&mut self) {
        let ticket = self.results.begin();
        let query = EventQuery::build(&self.filters, &self.search);
        let result = self.api.list_events(&query).await;
        self.results.complete(ticket, result);
    }

    fn persist_filters(&mut self) {
        let raw = self.filters.to_persisted();
        store::persist(&mut self.store, FILTERS_STORAGE_KEY, Some(&raw));
    }

    fn persist_search(&mut self) {
        store::persist(&mut self.store, SEARCH_STORAGE_KEY, Some(&self.search));
    }

    fn persist_undo(&mut self) {
        let raw = self
            .deletes
            .undo_payload()
            .and_then(|p| serde_json::to_string(p).ok());
        store::persist(&mut self.store, UNDO_STORAGE_KEY, raw.as_deref());
    }

    /// Replace filters and search in one step without reloading. Used to
    /// apply command-line flags before the first load.
    pub fn replace_state(&mut self, filters: FilterState, search: String) {
        self.filters = filters;
        self.search = search;
        self.persist_filters();
        self.persist_search();
    }

    /// Set one filter field. The page goes back to 0, which itself reloads
    /// the list even when the field is not a reload trigger.
    pub async fn set_filter(&mut self, key: FilterKey, value: impl Into<String>) {
        let page_before = self.filters.page;
        let changed = self.filters.set(key, value);
        let page_changed = page_before != self.filters.page;
        if !changed && !page_changed {
            return;
        }
        self.persist_filters();
        if (changed && key.triggers_reload()) || page_changed {
            self.load().await;
        }
    }

    pub async fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if search == self.search {
            return;
        }
        self.search = search;
        self.persist_search();
        self.load().await;
    }

    pub async fn set_page(&mut self, page: u32) {
        if self.filters.set_page(page) {
            self.persist_filters();
            self.load().await;
        }
    }

    pub async fn set_limit(&mut self, limit: u32) -> Result<(), FilterError> {
        if self.filters.set_limit(limit)? {
            self.persist_filters();
            self.load().await;
        }
        Ok(())
    }

    /// Returns `false` when there is no next page.
    pub async fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.set_page(self.filters.page.saturating_add(1)).await;
        true
    }

    pub async fn prev_page(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.set_page(self.filters.page - 1).await;
        true
    }

    /// Remove one active filter chip.
    pub async fn remove_chip(&mut self, key: ChipKey) {
        match key {
            ChipKey::Search => self.set_search(String::new()).await,
            ChipKey::Filter(field) => self.set_filter(field, String::new()).await,
        }
    }

    pub async fn clear_filters(&mut self) {
        if !self.filters.has_active_filters() && self.search.is_empty() && self.filters.page == 0 {
            return;
        }
        self.filters.clear_all();
        self.search.clear();
        self.persist_filters();
        self.persist_search();
        self.load().await;
    }

    /// Ask to delete event `id`. The record is taken from the current page,
    /// or fetched when it is not on screen. Returns the record awaiting
    /// confirmation.
    pub async fn request_delete(&mut self, id: i64) -> Option<&EventItem> {
        let item = match self.results.find(id) {
            Some(item) => item.clone(),
            None => match self.api.get_event(id).await {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(id, error = %e, "cannot delete unknown event");
                    self.toasts.error(format!("Event #{id} could not be loaded"));
                    return None;
                }
            },
        };
        if let Err(e) = self.deletes.request(item) {
            tracing::warn!(id, error = %e, "delete request ignored");
            return None;
        }
        match self.deletes.phase() {
            DeletePhase::ConfirmPending(item) => Some(item),
            _ => None,
        }
    }

    pub fn decline_delete(&mut self) {
        if let Err(e) = self.deletes.decline() {
            tracing::debug!(error = %e, "nothing to decline");
        }
    }

    /// Delete the confirmed event. On success the snapshot becomes the undo
    /// payload and an info toast with an Undo action is queued.
    pub async fn confirm_delete(&mut self) -> bool {
        let id = match self.deletes.confirm() {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(error = %e, "confirm without pending delete");
                return false;
            }
        };
        match self.api.delete_event(id).await {
            Ok(()) => {
                if let Err(e) = self.deletes.succeeded() {
                    tracing::debug!(error = %e, "delete finished outside deleting phase");
                }
                self.results.remove(id);
                self.persist_undo();
                tracing::info!(id, "event deleted");
                // Last delete wins: the previous toast can no longer undo.
                if let Some(previous) = self.undo_toast.take() {
                    self.toasts.strip_action(previous);
                }
                let toast = self
                    .toasts
                    .add("Event deleted", ToastKind::Info, Some(ToastAction::undo()));
                self.undo_toast = Some(toast);
                self.load().await;
                true
            }
            Err(e) => {
                if let Err(flow) = self.deletes.failed() {
                    tracing::debug!(error = %flow, "delete failed outside deleting phase");
                }
                tracing::warn!(id, error = %e, "delete failed");
                self.toasts.error("Failed to delete event");
                false
            }
        }
    }

    /// Recreate the most recently deleted event. `toast_id` is the toast
    /// whose Undo action was used; it and the toast bound to the payload
    /// are dismissed before the request, whatever the outcome. Returns
    /// `false` when there is nothing to undo.
    pub async fn undo(&mut self, toast_id: Option<i64>) -> bool {
        for id in toast_id.into_iter().chain(self.undo_toast.take()) {
            self.toasts.remove(id);
        }
        let Some(payload) = self.deletes.take_undo() else {
            return false;
        };
        self.persist_undo();
        match self.api.create_event(&payload).await {
            Ok(created) => {
                tracing::info!(id = created.id, "event restored");
                self.toasts.success("Event restored");
            }
            Err(e) => {
                tracing::warn!(error = %e, "undo failed");
                self.toasts.error("Failed to restore event");
            }
        }
        self.load().await;
        true
    }

    /// Run the action attached to a toast. An Undo action only acts on the
    /// payload it was created for; a stale one is stripped instead.
    pub async fn invoke_toast_action(&mut self, toast_id: i64) -> bool {
        let action = self
            .toasts
            .find(toast_id)
            .and_then(|t| t.action.clone());
        match action {
            Some(ToastAction::Undo { .. }) if self.undo_toast == Some(toast_id) => {
                self.undo(Some(toast_id)).await
            }
            Some(ToastAction::Undo { .. }) => {
                tracing::debug!(toast_id, "undo toast no longer bound to a payload");
                self.toasts.strip_action(toast_id);
                false
            }
            None => false,
        }
    }

    pub fn dismiss_toast(&mut self, toast_id: i64) -> bool {
        self.toasts.remove(toast_id).is_some()
    }

    /// Validate and submit the create form. Validation errors come back
    /// before any request; request failures become an error toast.
    pub async fn create(&mut self, form: &EventForm) -> Result<Option<EventItem>, ValidationError> {
        let payload = form.to_payload()?;
        match self.api.create_event(&payload).await {
            Ok(created) => {
                tracing::info!(id = created.id, "event created");
                self.toasts.success("Event created");
                self.load().await;
                Ok(Some(created))
            }
            Err(e) => {
                tracing::warn!(error = %e, "create failed");
                self.toasts.error("Failed to create event");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::FakeApi;
    use ledger_core::query::LOAD_ERROR_MESSAGE;

    async fn mounted(api: FakeApi) -> EventsController<FakeApi, MemoryStore> {
        let mut controller = EventsController::new(api, MemoryStore::default());
        controller.mount().await;
        controller
    }

    #[tokio::test]
    async fn filter_change_resets_page_and_reloads() {
        let api = FakeApi::with_events(45);
        let mut controller = mounted(api.clone()).await;
        assert!(controller.next_page().await);
        assert_eq!(controller.filters().page, 1);
        let loads = api.queries().len();

        controller.set_filter(FilterKey::Severity, "critical").await;
        assert_eq!(controller.filters().page, 0);
        let last = api.queries().last().cloned().unwrap();
        assert_eq!(api.queries().len(), loads + 1);
        assert_eq!(
            last.to_pairs(),
            vec![
                ("severity", "critical".to_string()),
                ("skip", "0".to_string()),
                ("limit", "20".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn tag_filter_alone_does_not_reload_on_first_page() {
        let api = FakeApi::with_events(3);
        let mut controller = mounted(api.clone()).await;
        let loads = api.queries().len();

        controller.set_filter(FilterKey::TagId, "3").await;
        assert_eq!(api.queries().len(), loads);
        assert_eq!(controller.filters().tag_id, "3");

        controller.load().await;
        assert_eq!(api.queries().last().unwrap().tag_id.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn pagination_stops_on_short_page() {
        let api = FakeApi::with_events(25);
        let mut controller = mounted(api).await;
        assert!(!controller.has_prev());
        assert!(controller.has_next());
        assert!(controller.next_page().await);
        assert_eq!(controller.events().len(), 5);
        assert!(!controller.has_next());
        assert!(!controller.next_page().await);
        assert!(controller.prev_page().await);
        assert!(!controller.prev_page().await);
    }

    #[tokio::test]
    async fn delete_then_undo_recreates_same_content() {
        let api = FakeApi::with_events(3);
        let mut controller = mounted(api.clone()).await;
        let original = controller.events()[1].clone();

        assert!(controller.request_delete(original.id).await.is_some());
        assert!(controller.confirm_delete().await);
        assert!(controller.events().iter().all(|e| e.id != original.id));

        let toast = controller.toasts().iter().last().cloned().unwrap();
        assert_eq!(toast.kind, ToastKind::Info);
        assert_eq!(toast.action, Some(ToastAction::undo()));

        assert!(controller.invoke_toast_action(toast.id).await);
        assert!(controller.toasts().find(toast.id).is_none());
        assert!(controller.undo_payload().is_none());

        let restored = controller
            .events()
            .iter()
            .find(|e| e.title == original.title)
            .cloned()
            .unwrap();
        assert_ne!(restored.id, original.id);
        assert_eq!(EventCreatePayload::from(&restored), EventCreatePayload::from(&original));
        assert_eq!(controller.toasts().iter().last().map(|t| t.message.as_str()), Some("Event restored"));
    }

    #[tokio::test]
    async fn undo_after_two_deletes_restores_the_second() {
        let api = FakeApi::with_events(4);
        let mut controller = mounted(api.clone()).await;
        let first = controller.events()[0].clone();
        let second = controller.events()[1].clone();

        for id in [first.id, second.id] {
            controller.request_delete(id).await.unwrap();
            assert!(controller.confirm_delete().await);
        }
        assert!(controller.undo(None).await);
        assert!(!controller.undo(None).await);

        let titles: Vec<String> = api.events().into_iter().map(|e| e.title).collect();
        assert!(titles.contains(&second.title));
        assert!(!titles.contains(&first.title));
    }

    #[tokio::test]
    async fn clear_filters_reloads_only_when_something_is_set() {
        let api = FakeApi::with_events(3);
        let mut controller = mounted(api.clone()).await;
        let loads = api.queries().len();

        controller.clear_filters().await;
        assert_eq!(api.queries().len(), loads);

        controller.set_limit(50).await.unwrap();
        controller.set_filter(FilterKey::Severity, "critical").await;
        controller.set_search("Event").await;
        let loads = api.queries().len();
        controller.clear_filters().await;
        assert_eq!(api.queries().len(), loads + 1);
        assert_eq!(controller.filters(), &FilterState { limit: 50, ..FilterState::default() });
        assert_eq!(controller.search(), "");
        assert!(controller.chips().is_empty());
    }

    #[tokio::test]
    async fn superseded_undo_toast_loses_its_action() {
        let api = FakeApi::with_events(4);
        let mut controller = mounted(api.clone()).await;
        let first = controller.events()[0].clone();
        let second = controller.events()[1].clone();

        let mut toasts = Vec::new();
        for id in [first.id, second.id] {
            controller.request_delete(id).await.unwrap();
            assert!(controller.confirm_delete().await);
            toasts.push(controller.toasts().iter().last().unwrap().id);
        }
        let (first_toast, second_toast) = (toasts[0], toasts[1]);
        assert_eq!(controller.toasts().find(first_toast).unwrap().action, None);

        assert!(!controller.invoke_toast_action(first_toast).await);
        assert_eq!(api.events().len(), 2);
        assert!(controller.undo_payload().is_some());

        assert!(controller.invoke_toast_action(second_toast).await);
        assert!(controller.toasts().find(second_toast).is_none());
        let titles: Vec<String> = api.events().into_iter().map(|e| e.title).collect();
        assert!(titles.contains(&second.title));
        assert!(!titles.contains(&first.title));
    }

    #[tokio::test]
    async fn undo_command_dismisses_the_bound_toast() {
        let api = FakeApi::with_events(2);
        let mut controller = mounted(api.clone()).await;
        let id = controller.events()[0].id;
        controller.request_delete(id).await.unwrap();
        controller.confirm_delete().await;
        let undo_toast = controller.toasts().iter().last().unwrap().id;

        assert!(controller.undo(None).await);
        assert!(controller.toasts().find(undo_toast).is_none());
        assert!(!controller.invoke_toast_action(undo_toast).await);
    }

    #[tokio::test]
    async fn persisted_max_page_navigates_without_overflow() {
        let mut store = MemoryStore::default();
        let filters = FilterState { page: u32::MAX, limit: 1, ..FilterState::default() };
        store.set(FILTERS_STORAGE_KEY, &filters.to_persisted()).unwrap();
        let api = FakeApi::with_events(0);
        let mut controller = EventsController::new(api, store);
        controller.mount().await;
        assert_eq!(controller.filters().page, u32::MAX);
        assert!(!controller.next_page().await);
        assert!(controller.prev_page().await);
        assert_eq!(controller.filters().page, u32::MAX - 1);
    }

    #[tokio::test]
    async fn declined_delete_changes_nothing() {
        let api = FakeApi::with_events(2);
        let mut controller = mounted(api.clone()).await;
        let id = controller.events()[0].id;
        controller.request_delete(id).await.unwrap();
        controller.decline_delete();
        assert_eq!(controller.delete_phase(), &DeletePhase::Idle);
        assert!(!controller.confirm_delete().await);
        assert_eq!(api.events().len(), 2);
        assert!(controller.toasts().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_surfaces_toast_and_keeps_list() {
        let api = FakeApi::with_events(2);
        let mut controller = mounted(api.clone()).await;
        let id = controller.events()[0].id;
        api.fail_mutations(true);

        controller.request_delete(id).await.unwrap();
        assert!(!controller.confirm_delete().await);
        assert_eq!(controller.events().len(), 2);
        assert!(controller.undo_payload().is_none());
        let toast = controller.toasts().iter().last().unwrap();
        assert_eq!((toast.kind, toast.message.as_str()), (ToastKind::Error, "Failed to delete event"));
    }

    #[tokio::test]
    async fn undo_toast_is_dismissed_even_when_recreate_fails() {
        let api = FakeApi::with_events(2);
        let mut controller = mounted(api.clone()).await;
        let id = controller.events()[0].id;
        controller.request_delete(id).await.unwrap();
        controller.confirm_delete().await;
        let undo_toast = controller.toasts().iter().last().unwrap().id;

        api.fail_mutations(true);
        assert!(controller.invoke_toast_action(undo_toast).await);
        assert!(controller.toasts().find(undo_toast).is_none());
        assert_eq!(
            controller.toasts().iter().last().map(|t| t.message.as_str()),
            Some("Failed to restore event")
        );
        assert!(controller.undo_payload().is_none());
    }

    #[tokio::test]
    async fn failed_load_sets_banner_and_stays_usable() {
        let api = FakeApi::with_events(0);
        api.fail_reads(true);
        let mut controller = mounted(api.clone()).await;
        assert!(controller.events().is_empty());
        assert_eq!(controller.error(), Some(LOAD_ERROR_MESSAGE));
        assert!(!controller.loading());
        assert!(controller.refs().agents.is_empty());

        api.fail_reads(false);
        controller.load().await;
        assert_eq!(controller.error(), None);
    }

    #[tokio::test]
    async fn search_chip_shows_before_reference_data() {
        let mut store = MemoryStore::default();
        store.set(SEARCH_STORAGE_KEY, "jenkins").unwrap();
        let controller = EventsController::new(FakeApi::with_events(0), store);
        let chips = controller.chips();
        assert_eq!(chips.len(), 1);
        assert_eq!(chips[0].label, "Search: jenkins");
    }

    #[tokio::test]
    async fn removing_chips_and_persisting() {
        let api = FakeApi::with_events(1);
        let mut controller = mounted(api).await;
        controller.set_search("node").await;
        controller.set_filter(FilterKey::AgentId, "1").await;
        controller.set_filter(FilterKey::Source, "webhook").await;
        assert_eq!(controller.chips()[1].label, "Agent: agent-1");

        controller.remove_chip(ChipKey::Filter(FilterKey::AgentId)).await;
        assert_eq!(controller.filters().agent_id, "");
        assert_eq!(controller.filters().source, "webhook");
        assert_eq!(controller.search(), "node");

        controller.remove_chip(ChipKey::Search).await;
        assert_eq!(controller.search(), "");

        let persisted = FilterState::from_persisted(&controller.store.get(FILTERS_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(persisted.source, "webhook");
        assert_eq!(controller.store.get(SEARCH_STORAGE_KEY).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn create_validates_before_sending() {
        let api = FakeApi::with_events(0);
        let mut controller = mounted(api.clone()).await;
        let err = controller.create(&EventForm::default()).await.unwrap_err();
        assert_eq!(err.field, "title");
        assert!(api.events().is_empty());

        let form = EventForm {
            title: "Rollout runner image".to_string(),
            event_type: "rollout".to_string(),
            tag_ids: vec!["3".to_string(), "5".to_string()],
            ..EventForm::default()
        };
        let created = controller.create(&form).await.unwrap().unwrap();
        assert_eq!(api.created_payloads().last().unwrap().tag_ids, vec![3, 5]);
        assert_eq!(controller.events()[0].id, created.id);
    }

    #[tokio::test]
    async fn undo_survives_a_new_session() {
        let api = FakeApi::with_events(2);
        let mut controller = mounted(api.clone()).await;
        let victim = controller.events()[0].clone();
        controller.request_delete(victim.id).await.unwrap();
        controller.confirm_delete().await;

        let store = std::mem::take(&mut controller.store);
        let mut next = EventsController::new(api.clone(), store);
        assert_eq!(next.undo_payload().map(|p| p.title.as_str()), Some(victim.title.as_str()));
        assert!(next.undo(None).await);
        assert!(next.store.get(UNDO_STORAGE_KEY).is_none());
    }
}
