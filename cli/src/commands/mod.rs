pub mod event;
pub mod inventory;
pub mod shell;

use crate::api::HttpApi;
use crate::controller::EventsController;
use crate::store::FileStore;
use crate::util::state_path;

pub type Controller = EventsController<HttpApi, FileStore>;

/// Controller over the HTTP API with the persisted view state.
pub fn open_controller(api_url: &str, token: Option<&str>) -> Controller {
    let store = FileStore::open(state_path());
    tracing::debug!(path = %store.path().display(), "opened view state");
    EventsController::new(HttpApi::new(api_url, token.map(str::to_string)), store)
}
