//! Restorable navigation token.
//!
//! `#cntid=<id>[;selid=<id>][;imageid=<id>]` with each id form-urlencoded.
//! Decoding is lenient: unknown keys are skipped, a missing container means
//! the root, and the widget is the image viewer when an image is named,
//! otherwise the browser.

use url::form_urlencoded;

use crate::history::{NavState, Widget};

const CONTAINER_KEY: &str = "cntid";
const SELECTION_KEY: &str = "selid";
const IMAGE_KEY: &str = "imageid";

pub fn encode(state: &NavState) -> String {
    let mut out = format!("#{}={}", CONTAINER_KEY, escape(&state.container_id));
    if let Some(sel) = &state.selection_id {
        out.push_str(&format!(";{}={}", SELECTION_KEY, escape(sel)));
    }
    if state.widget == Widget::ImageViewer {
        if let Some(img) = &state.image_id {
            out.push_str(&format!(";{}={}", IMAGE_KEY, escape(img)));
        }
    }
    out
}

pub fn decode(token: &str) -> NavState {
    let mut state = NavState::default();
    let body = token.trim().trim_start_matches('#');
    for part in body.split(';') {
        for (key, value) in form_urlencoded::parse(part.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                CONTAINER_KEY => state.container_id = value.into_owned(),
                SELECTION_KEY => state.selection_id = Some(value.into_owned()),
                IMAGE_KEY => {
                    state.image_id = Some(value.into_owned());
                    state.widget = Widget::ImageViewer;
                }
                _ => {}
            }
        }
    }
    state
}

fn escape(id: &str) -> String {
    form_urlencoded::byte_serialize(id.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_browser_state() {
        let state = NavState::browse("/music/a b").with_selection(Some("/music/a b/1;2"));
        let token = encode(&state);
        assert_eq!(token, "#cntid=%2Fmusic%2Fa+b;selid=%2Fmusic%2Fa+b%2F1%3B2");
        assert_eq!(decode(&token), state);
    }

    #[test]
    fn test_decode_defaults() {
        let state = decode("");
        assert_eq!(state.widget, Widget::Browser);
        assert_eq!(state.container_id, "/");
        assert!(state.selection_id.is_none());
        assert_eq!(decode("#bogus=1;cntid=").container_id, "/");
    }

    #[test]
    fn test_image_round_trip() {
        let mut state = NavState::browse("/photos");
        state.widget = Widget::ImageViewer;
        state.image_id = Some("/photos/1".to_string());
        let back = decode(&encode(&state));
        assert_eq!(back, state);
    }

    #[test]
    fn test_other_widgets_encode_as_browser() {
        let mut state = NavState::browse("/a");
        state.widget = Widget::Help;
        state.image_id = Some("/a/x".to_string());
        assert_eq!(decode(&encode(&state)), NavState::browse("/a"));
    }
}
