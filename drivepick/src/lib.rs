pub mod config;
pub mod controller;
pub mod debounce;
pub mod notice;
pub mod session;
pub mod storage;
pub mod store;
pub mod view;

#[cfg(test)]
mod test_support;

pub use config::PickerConfig;
pub use controller::{Controller, SkipReason, SyncOutcome};
pub use notice::{Notice, NoticeLevel};
pub use session::{Authenticator, Session};
pub use store::{PickerStore, SortKey, ViewMode};
pub use view::PickerView;
