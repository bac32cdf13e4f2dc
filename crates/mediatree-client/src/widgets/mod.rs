pub mod pane_chrome;
pub mod progress_bar;
pub mod scrollable_list;
pub mod search_input;
pub mod status_bar;
