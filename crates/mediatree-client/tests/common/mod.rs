//! Fixtures shared by the client integration tests: tree objects and the
//! server's side of the browse conversation.

#![allow(dead_code)]

use mediatree_proto::tree::meta;
use mediatree_proto::{Dict, Message, MessageKind, Payload, Splice};

pub fn obj(id: &str, class: &str) -> Dict {
    wrap(metadata(id, class))
}

pub fn container(id: &str, num_children: i64) -> Dict {
    let mut md = metadata(id, "container.directory");
    md.set(meta::NUM_CHILDREN, num_children);
    wrap(md)
}

fn metadata(id: &str, class: &str) -> Dict {
    let mut md = Dict::new();
    md.set(meta::ID, id);
    md.set(meta::LABEL, id.rsplit('/').next().unwrap_or(id));
    md.set(meta::CLASS, class);
    md
}

fn wrap(md: Dict) -> Dict {
    let mut d = Dict::new();
    d.set(meta::METADATA, md);
    d
}

/// Audio track with a source and a duration in microseconds.
pub fn track(id: &str, duration_us: i64) -> Dict {
    let mut md = metadata(id, "item.audio.song");
    md.set(meta::SRC, format!("http://media.local{}.flac", id));
    md.set(meta::APPROX_DURATION, duration_us);
    wrap(md)
}

pub fn object_response(ctx: &str, o: Option<Dict>) -> Message {
    Payload::BrowseObjectResponse(o).to_message().with_context(ctx)
}

pub fn children_response(ctx: &str, items: Vec<Dict>, last: bool) -> Message {
    let mut m = Payload::BrowseChildrenResponse(Splice::new(0, 0, items))
        .to_message()
        .with_context(ctx);
    m.set_last(last);
    m
}

pub fn splice_notification(ctx: &str, index: i64, delete: i64) -> Message {
    Payload::SpliceChildren(Splice::new(index, delete, Vec::new()))
        .to_message()
        .with_context(ctx)
}

/// Contexts of the requests of `kind` in `out`, in order.
pub fn requests(out: &[Message], kind: MessageKind) -> Vec<String> {
    out.iter()
        .filter(|m| m.kind() == Some(kind))
        .map(|m| m.context_id().unwrap_or_default().to_string())
        .collect()
}
