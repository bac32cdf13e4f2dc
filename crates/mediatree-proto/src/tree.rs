//! Media object tree.
//!
//! Ids are path-like (`/music/albums/42`); the parent of an id is the id with
//! its last segment removed and the root is `/`.  Only one level of children
//! is materialised at a time; deeper objects are reached by browsing.

use crate::error::TreeError;
use crate::value::{Dict, Value};

pub const ROOT_ID: &str = "/";

/// Reserved id of the playback queue.
pub const PLAYQUEUE_ID: &str = "/playqueue";

/// Server container that collects copied items.
pub const FAVORITES_ID: &str = "/favorites";

/// Metadata and node dictionary keys.
pub mod meta {
    pub const METADATA: &str = "metadata";
    pub const CHILDREN: &str = "children";

    pub const ID: &str = "ID";
    pub const LABEL: &str = "Label";
    pub const TITLE: &str = "Title";
    pub const SEARCH_TITLE: &str = "SearchTitle";
    pub const CLASS: &str = "Class";
    pub const HASH: &str = "Hash";
    pub const NUM_CHILDREN: &str = "NumChildren";
    pub const NUM_ITEM_CHILDREN: &str = "NumItemChildren";
    pub const NUM_CONTAINER_CHILDREN: &str = "NumContainerChildren";
    pub const LOCKED: &str = "Locked";
    pub const NEXT_ID: &str = "NextID";
    pub const PREVIOUS_ID: &str = "PreviousID";
    pub const APPROX_DURATION: &str = "ApproxDuration";
    pub const SRC: &str = "Src";
    pub const URI: &str = "URI";
    pub const MIMETYPE: &str = "MimeType";
    pub const ARTIST: &str = "Artist";
    pub const ALBUM: &str = "Album";
}

/// Parent of `id`; `None` for the root and for ids without a slash.
pub fn parent_id(id: &str) -> Option<&str> {
    if id == ROOT_ID {
        return None;
    }
    match id.rfind('/')? {
        0 => Some(ROOT_ID),
        pos => Some(&id[..pos]),
    }
}

/// True iff `id` is a strict path-extension of `ancestor`.
pub fn is_ancestor(ancestor: &str, id: &str) -> bool {
    if id == ancestor || !id.starts_with(ancestor) {
        return false;
    }
    ancestor.ends_with('/') || id.as_bytes()[ancestor.len()] == b'/'
}

/// Queue id for a track: the playqueue id plus the track's content hash.
pub fn playqueue_track_id(metadata: &Dict) -> String {
    let hash = metadata
        .get_str(meta::HASH)
        .or_else(|| metadata.get_str(meta::ID))
        .unwrap_or_default()
        .replace('/', "_");
    format!("{PLAYQUEUE_ID}/{hash}")
}

// ── Media class ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    Container,
    Root,
    Playlist,
    MusicAlbum,
    PhotoAlbum,
    TvShow,
    TvSeason,
    Directory,
    Item,
    Audio,
    Song,
    Video,
    Movie,
    Image,
    Location,
    Unknown,
}

const KNOWN_CLASSES: &[(&str, MediaClass)] = &[
    ("container", MediaClass::Container),
    ("container.root", MediaClass::Root),
    ("container.playlist", MediaClass::Playlist),
    ("container.musicalbum", MediaClass::MusicAlbum),
    ("container.photoalbum", MediaClass::PhotoAlbum),
    ("container.tvshow", MediaClass::TvShow),
    ("container.tvseason", MediaClass::TvSeason),
    ("container.directory", MediaClass::Directory),
    ("item", MediaClass::Item),
    ("item.audio", MediaClass::Audio),
    ("item.audio.song", MediaClass::Song),
    ("item.video", MediaClass::Video),
    ("item.video.movie", MediaClass::Movie),
    ("item.image", MediaClass::Image),
    ("item.location", MediaClass::Location),
];

impl MediaClass {
    /// Resolve a dotted class name, falling back to the longest known prefix.
    pub fn parse(name: &str) -> Self {
        let mut candidate = name;
        loop {
            if let Some((_, class)) = KNOWN_CLASSES.iter().find(|(n, _)| *n == candidate) {
                return *class;
            }
            match candidate.rfind('.') {
                Some(pos) => candidate = &candidate[..pos],
                None => return MediaClass::Unknown,
            }
        }
    }

    pub fn is_container(self) -> bool {
        matches!(
            self,
            MediaClass::Container
                | MediaClass::Root
                | MediaClass::Playlist
                | MediaClass::MusicAlbum
                | MediaClass::PhotoAlbum
                | MediaClass::TvShow
                | MediaClass::TvSeason
                | MediaClass::Directory
        )
    }

    pub fn is_item(self) -> bool {
        !self.is_container() && self != MediaClass::Unknown
    }

    pub fn is_image(self) -> bool {
        self == MediaClass::Image
    }
}

// ── ObjectNode ────────────────────────────────────────────────────────────────

/// Normalised result of a splice: absolute index and actual counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceRange {
    pub index: usize,
    pub deleted: usize,
    pub inserted: usize,
}

/// A media object.  `children` is `None` until the object has been browsed,
/// which is different from an empty child list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectNode {
    pub metadata: Dict,
    pub children: Option<Vec<ObjectNode>>,
}

impl ObjectNode {
    pub fn new(id: &str) -> Self {
        let mut metadata = Dict::new();
        metadata.set(meta::ID, id);
        Self {
            metadata,
            children: None,
        }
    }

    /// Build from the wire form `{metadata: {...}, children: [...]}`.
    pub fn from_dict(dict: &Dict) -> Self {
        let metadata = dict.get_dict(meta::METADATA).cloned().unwrap_or_default();
        let children = dict.get_array(meta::CHILDREN).map(|arr| {
            arr.iter()
                .filter_map(Value::as_dict)
                .map(ObjectNode::from_dict)
                .collect()
        });
        Self { metadata, children }
    }

    pub fn to_dict(&self, with_children: bool) -> Dict {
        let mut dict = Dict::new();
        dict.set(meta::METADATA, self.metadata.clone());
        if with_children {
            if let Some(children) = &self.children {
                let arr: Vec<Value> = children
                    .iter()
                    .map(|c| Value::Dictionary(c.to_dict(true)))
                    .collect();
                dict.set(meta::CHILDREN, arr);
            }
        }
        dict
    }

    pub fn id(&self) -> Option<&str> {
        self.metadata.get_str(meta::ID)
    }

    pub fn set_id(&mut self, id: &str) {
        self.metadata.set(meta::ID, id);
    }

    pub fn label(&self) -> Option<&str> {
        self.metadata
            .get_str(meta::LABEL)
            .or_else(|| self.metadata.get_str(meta::TITLE))
    }

    pub fn class(&self) -> MediaClass {
        self.metadata
            .get_str(meta::CLASS)
            .map_or(MediaClass::Unknown, MediaClass::parse)
    }

    pub fn is_locked(&self) -> bool {
        self.metadata.get_int(meta::LOCKED).is_some_and(|v| v != 0)
    }

    pub fn num_children(&self) -> Option<i64> {
        self.metadata.get_int(meta::NUM_CHILDREN)
    }

    pub fn next_sibling_id(&self) -> Option<&str> {
        self.metadata.get_str(meta::NEXT_ID)
    }

    pub fn prev_sibling_id(&self) -> Option<&str> {
        self.metadata.get_str(meta::PREVIOUS_ID)
    }

    /// Loaded children, empty when not browsed yet.
    pub fn children(&self) -> &[ObjectNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn child_by_id(&self, id: &str) -> Option<&ObjectNode> {
        self.children().iter().find(|c| c.id() == Some(id))
    }

    pub fn child_by_id_mut(&mut self, id: &str) -> Option<&mut ObjectNode> {
        self.children
            .as_mut()?
            .iter_mut()
            .find(|c| c.id() == Some(id))
    }

    pub fn child_index(&self, id: &str) -> Option<usize> {
        self.children().iter().position(|c| c.id() == Some(id))
    }

    /// Array-splice on the child list.  A negative `index` appends and a
    /// negative `delete` removes through the end.  Deleting past the end
    /// clamps; an index past the end is rejected without mutating.
    pub fn splice(
        &mut self,
        index: i64,
        delete: i64,
        items: Vec<ObjectNode>,
    ) -> Result<SpliceRange, TreeError> {
        let len = self.children().len();
        let index = if index < 0 { len } else { index as usize };
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        let available = len - index;
        let deleted = if delete < 0 {
            available
        } else {
            (delete as usize).min(available)
        };
        let inserted = items.len();
        self.children
            .get_or_insert_with(Vec::new)
            .splice(index..index + deleted, items);
        Ok(SpliceRange {
            index,
            deleted,
            inserted,
        })
    }

    /// Merge an "object changed" update (`{metadata: {...}}`) into this node.
    pub fn merge(&mut self, update: &Dict) {
        if let Some(m) = update.get_dict(meta::METADATA) {
            self.metadata.merge(m);
        }
    }
}

/// Look up `id` among `root` and its loaded children.
pub fn get_by_id<'a>(root: &'a ObjectNode, id: &str) -> Option<&'a ObjectNode> {
    if root.id() == Some(id) {
        return Some(root);
    }
    root.child_by_id(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn node(id: &str) -> ObjectNode {
        ObjectNode::new(id)
    }

    fn ids(n: &ObjectNode) -> Vec<&str> {
        n.children().iter().filter_map(ObjectNode::id).collect()
    }

    fn container_with(ids: &[&str]) -> ObjectNode {
        let mut c = node("/c");
        c.children = Some(ids.iter().map(|i| node(i)).collect());
        c
    }

    #[test]
    fn test_parent_id() {
        assert_eq!(parent_id("/"), None);
        assert_eq!(parent_id("nope"), None);
        assert_eq!(parent_id("/a"), Some("/"));
        assert_eq!(parent_id("/a/b/c"), Some("/a/b"));
        assert_eq!(parent_id("/playqueue/abc"), Some(PLAYQUEUE_ID));
    }

    #[test]
    fn test_is_ancestor() {
        assert!(is_ancestor("/", "/a"));
        assert!(is_ancestor("/a", "/a/b/c"));
        assert!(!is_ancestor("/a", "/a"));
        assert!(!is_ancestor("/a", "/ab"));
        assert!(!is_ancestor("/a/b", "/a"));
    }

    #[test]
    fn test_splice_append_and_delete_to_end() {
        let mut c = container_with(&["/c/1", "/c/2", "/c/3"]);
        let r = c.splice(-1, 0, vec![node("/c/4")]).unwrap();
        assert_eq!(r, SpliceRange { index: 3, deleted: 0, inserted: 1 });
        assert_eq!(ids(&c), ["/c/1", "/c/2", "/c/3", "/c/4"]);

        let r = c.splice(1, -1, Vec::new()).unwrap();
        assert_eq!(r.deleted, 3);
        assert_eq!(ids(&c), ["/c/1"]);
    }

    #[test]
    fn test_splice_out_of_range_is_rejected() {
        let mut c = container_with(&["/c/1"]);
        assert_eq!(
            c.splice(5, 0, vec![node("/c/9")]),
            Err(TreeError::IndexOutOfRange { index: 5, len: 1 })
        );
        assert_eq!(ids(&c), ["/c/1"]);
    }

    #[test]
    fn test_splice_creates_child_list() {
        let mut c = node("/c");
        assert!(c.children.is_none());
        c.splice(0, 0, Vec::new()).unwrap();
        assert_eq!(c.children, Some(Vec::new()));
    }

    #[test]
    fn test_noop_splice_keeps_children() {
        let mut c = container_with(&["/c/1", "/c/2"]);
        let before = c.clone();
        c.splice(1, 0, Vec::new()).unwrap();
        assert_eq!(c, before);
    }

    #[test]
    fn test_class_falls_back_to_prefix() {
        assert_eq!(MediaClass::parse("item.audio.song"), MediaClass::Song);
        assert_eq!(MediaClass::parse("item.audio.podcast.episode"), MediaClass::Audio);
        assert_eq!(MediaClass::parse("container.weird"), MediaClass::Container);
        assert_eq!(MediaClass::parse("gadget"), MediaClass::Unknown);
        assert!(MediaClass::parse("container.musicalbum.x").is_container());
        assert!(MediaClass::parse("item.image.photo").is_image());
    }

    #[test]
    fn test_dict_round_trip_preserves_absent_children() {
        let mut n = node("/a");
        n.metadata.set(meta::LABEL, "A");
        let back = ObjectNode::from_dict(&n.to_dict(true));
        assert_eq!(back, n);
        assert!(back.children.is_none());

        n.children = Some(Vec::new());
        let back = ObjectNode::from_dict(&n.to_dict(true));
        assert_eq!(back.children, Some(Vec::new()));
    }

    #[test]
    fn test_merge_updates_metadata() {
        let mut n = node("/a");
        n.metadata.set(meta::LABEL, "Old");
        let mut m = Dict::new();
        m.set(meta::LABEL, "New");
        let mut update = Dict::new();
        update.set(meta::METADATA, m);
        n.merge(&update);
        assert_eq!(n.label(), Some("New"));
        assert_eq!(n.id(), Some("/a"));
    }

    #[test]
    fn test_playqueue_track_id_uses_hash() {
        let mut m = Dict::new();
        m.set(meta::ID, "/a/b");
        m.set(meta::HASH, "f00d");
        assert_eq!(playqueue_track_id(&m), "/playqueue/f00d");
    }

    #[test]
    fn test_get_by_id_finds_self_and_loaded_children() {
        let c = container_with(&["/c/1", "/c/2"]);
        assert_eq!(get_by_id(&c, "/c").and_then(ObjectNode::id), Some("/c"));
        assert_eq!(get_by_id(&c, "/c/2").and_then(ObjectNode::id), Some("/c/2"));
        assert!(get_by_id(&c, "/c/3").is_none());
        assert!(get_by_id(&node("/d"), "/d/1").is_none());
    }

    #[test]
    fn test_sibling_ids() {
        let mut n = node("/a/2");
        n.metadata.set(meta::NEXT_ID, "/a/3");
        assert_eq!(n.next_sibling_id(), Some("/a/3"));
        assert_eq!(n.prev_sibling_id(), None);
    }

    proptest! {
        #[test]
        fn prop_splice_matches_vec_splice(
            len in 0usize..20,
            index in -1i64..25,
            delete in -1i64..25,
            insert in 0usize..5,
        ) {
            let names: Vec<String> = (0..len).map(|i| format!("/c/{i}")).collect();
            let mut c = node("/c");
            c.children = Some(names.iter().map(|n| node(n)).collect());
            let new: Vec<String> = (0..insert).map(|i| format!("/c/new{i}")).collect();

            let result = c.splice(index, delete, new.iter().map(|n| node(n)).collect());

            let start = if index < 0 { len } else { index as usize };
            if start > len {
                prop_assert!(result.is_err());
                prop_assert_eq!(c.children().len(), len);
            } else {
                let end = if delete < 0 { len } else { (start + delete as usize).min(len) };
                let mut model = names.clone();
                model.splice(start..end, new.clone());
                let got: Vec<String> = ids(&c).iter().map(|s| s.to_string()).collect();
                prop_assert_eq!(got, model);
            }
        }

        #[test]
        fn prop_parent_chain_reaches_root(segments in proptest::collection::vec("[a-z0-9]{1,6}", 1..6)) {
            let id = format!("/{}", segments.join("/"));
            let mut current = id.as_str();
            let mut steps = 0;
            while let Some(parent) = parent_id(current) {
                prop_assert!(is_ancestor(parent, current));
                prop_assert!(is_ancestor(parent, &id));
                current = parent;
                steps += 1;
            }
            prop_assert_eq!(current, ROOT_ID);
            prop_assert_eq!(steps, segments.len());
        }
    }
}
