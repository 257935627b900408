pub mod category_list;
pub mod error;
pub mod models;
pub mod reminders;
pub mod storage;
pub mod task_edit;
pub mod task_list;
pub mod theme;
pub mod ui;
pub mod validation;
