pub mod browser;
pub mod help_overlay;
pub mod image_viewer;
pub mod item_info;
pub mod log_panel;
pub mod menu;
pub mod nav_popup;
pub mod player_panel;
pub mod settings;
