pub mod chips;
pub mod error;
pub mod events;
pub mod filters;
pub mod form;
pub mod query;
pub mod reference;
pub mod time;
pub mod toast;
pub mod undo;
pub mod view;
