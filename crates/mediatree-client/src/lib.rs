//! Terminal client for a media server's object tree and a renderer's play
//! queue.  `mediatree_proto` carries the wire model; this crate holds the
//! sync engine, navigation, the in-process player and the ratatui front end.

pub mod action;
pub mod app;
pub mod app_state;
pub mod component;
pub mod components;
pub mod connection;
pub mod dispatch;
pub mod event_hub;
pub mod history;
pub mod idle;
pub mod local_player;
pub mod logging;
pub mod nav;
pub mod outbox;
pub mod player_state;
pub mod playqueue;
pub mod render;
pub mod sync;
pub mod terminal;
pub mod theme;
pub mod token;
pub mod widgets;
