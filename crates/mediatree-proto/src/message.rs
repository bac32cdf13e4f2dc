//! Message envelope and wire framing.
//!
//! A message is `{namespace, id, header, args}`.  Routing metadata lives in
//! the header (`contextId`, `clientId`, `functionTag`, `notLast`); the
//! positional arguments are a fixed bank of [`MAX_ARGS`] slots shared with the
//! server implementation, so writes past the last slot are dropped rather
//! than grown.
//!
//! Frames are a 4-byte big-endian length followed by the JSON encoding of
//! the message.
//!
//! ```text
//!  Message::new(id, ns)  ──set_arg/set_context_id──►  encode()  ──►  socket
//!  socket  ──►  frame_len()/decode()  ──►  Message  ──payload()──►  Payload
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ProtoError;
use crate::value::{Dict, Value};

/// Number of positional argument slots.
pub const MAX_ARGS: usize = 8;

/// Frames larger than this are treated as corruption.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

pub mod header {
    pub const ID: &str = "id";
    pub const NS: &str = "ns";
    pub const CONTEXT_ID: &str = "contextId";
    pub const CLIENT_ID: &str = "clientId";
    pub const FUNCTION_TAG: &str = "functionTag";
    pub const NOT_LAST: &str = "notLast";
}

pub mod ns {
    pub const GUI: i32 = 7;
    pub const PLAYER: i32 = 102;
    pub const STATE: i32 = 112;
    pub const DB: i32 = 114;
}

pub mod db {
    pub const CMD_SPLICE_CHILDREN: i32 = 1;
    pub const MSG_SPLICE_CHILDREN: i32 = 100;
    pub const MSG_OBJECT_CHANGED: i32 = 101;
    pub const MSG_RESCAN_DONE: i32 = 102;
    pub const FUNC_BROWSE_OBJECT: i32 = 200;
    pub const FUNC_BROWSE_CHILDREN: i32 = 201;
    pub const RESP_BROWSE_OBJECT: i32 = 300;
    pub const RESP_BROWSE_CHILDREN: i32 = 301;
}

pub mod player {
    pub const CMD_STOP: i32 = 1;
    pub const CMD_NEXT: i32 = 5;
    pub const CMD_PREV: i32 = 6;
    pub const CMD_PAUSE: i32 = 8;
    pub const CMD_PLAY: i32 = 26;
    pub const CMD_SET_CURRENT_TRACK: i32 = 40;
    pub const CMD_PLAY_BY_ID: i32 = 43;
    pub const CMD_NEXT_VISUALIZATION: i32 = 44;
}

pub mod state {
    pub const MSG_STATE_CHANGED: i32 = 1;
    pub const CMD_SET_STATE: i32 = 100;
    pub const CMD_SET_STATE_REL: i32 = 101;
}

pub mod gui {
    pub const MSG_SWIPE: i32 = 1;
}

// ── Message ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireMessage", try_from = "WireMessage")]
pub struct Message {
    ns: i32,
    id: i32,
    pub header: Dict,
    args: Vec<Option<Value>>,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    #[serde(default)]
    header: Dict,
    #[serde(default)]
    args: Vec<Option<Value>>,
}

impl From<Message> for WireMessage {
    fn from(msg: Message) -> Self {
        let mut header = msg.header;
        header.set(header::ID, msg.id);
        header.set(header::NS, msg.ns);
        WireMessage {
            header,
            args: msg.args,
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = ProtoError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let id = wire
            .header
            .get_int(header::ID)
            .ok_or(ProtoError::MissingHeader(header::ID))?;
        let ns = wire
            .header
            .get_int(header::NS)
            .ok_or(ProtoError::MissingHeader(header::NS))?;
        let mut args = wire.args;
        if args.len() > MAX_ARGS {
            trace!("dropping {} surplus arguments", args.len() - MAX_ARGS);
            args.truncate(MAX_ARGS);
        }
        let ns = i32::try_from(ns).map_err(|_| ProtoError::HeaderOutOfRange {
            key: header::NS,
            value: ns,
        })?;
        let id = i32::try_from(id).map_err(|_| ProtoError::HeaderOutOfRange {
            key: header::ID,
            value: id,
        })?;
        Ok(Message {
            ns,
            id,
            header: wire.header,
            args,
        })
    }
}

impl Message {
    /// New message with the header pre-populated with `id` and `ns`.
    pub fn new(id: i32, ns: i32) -> Self {
        let mut header = Dict::new();
        header.set(header::ID, id);
        header.set(header::NS, ns);
        Self {
            ns,
            id,
            header,
            args: Vec::new(),
        }
    }

    pub fn ns(&self) -> i32 {
        self.ns
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn context_id(&self) -> Option<&str> {
        self.header.get_str(header::CONTEXT_ID)
    }

    pub fn set_context_id(&mut self, ctx: &str) {
        self.header.set(header::CONTEXT_ID, ctx);
    }

    pub fn with_context(mut self, ctx: &str) -> Self {
        self.set_context_id(ctx);
        self
    }

    pub fn client_id(&self) -> Option<&str> {
        self.header.get_str(header::CLIENT_ID)
    }

    pub fn set_client_id(&mut self, client: &str) {
        self.header.set(header::CLIENT_ID, client);
    }

    /// True unless the `notLast` flag is present and non-zero.
    pub fn is_last(&self) -> bool {
        !self
            .header
            .get_int(header::NOT_LAST)
            .is_some_and(|v| v != 0)
    }

    pub fn set_last(&mut self, last: bool) {
        if last {
            self.header.remove(header::NOT_LAST);
        } else {
            self.header.set(header::NOT_LAST, 1);
        }
    }

    /// Copy client id and function tag from a request so the answer can be
    /// correlated by the caller.
    pub fn copy_routing_from(&mut self, request: &Message) {
        for key in [header::CLIENT_ID, header::FUNCTION_TAG] {
            if let Some(v) = request.header.get(key) {
                self.header.set(key, v.clone());
            }
        }
    }

    /// Store `value` in slot `index`.  Indices at or past [`MAX_ARGS`] are
    /// silently dropped.
    pub fn set_arg(&mut self, index: usize, value: impl Into<Value>) {
        if index >= MAX_ARGS {
            trace!("dropping argument {} of message {}/{}", index, self.ns, self.id);
            return;
        }
        if self.args.len() <= index {
            self.args.resize(index + 1, None);
        }
        self.args[index] = Some(value.into());
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index).and_then(Option::as_ref)
    }

    pub fn arg_int(&self, index: usize) -> Option<i64> {
        self.arg(index).and_then(Value::as_i64)
    }

    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(Value::as_str)
    }

    pub fn arg_dict(&self, index: usize) -> Option<&Dict> {
        self.arg(index).and_then(Value::as_dict)
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::classify(self.ns, self.id)
    }

    /// Typed view of the arguments.
    pub fn payload(&self) -> Result<Payload, ProtoError> {
        Payload::from_message(self)
    }

    // ── Framing ───────────────────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<Vec<u8>, ProtoError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, ProtoError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        let json = self.to_json()?;
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    /// Decode one frame from the front of `data`, returning the message and
    /// the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), ProtoError> {
        let total = frame_len(data)?.ok_or(ProtoError::Incomplete)?;
        let msg = Self::from_json(&data[4..total])?;
        Ok((msg, total))
    }
}

/// Total length (header included) of the frame at the front of `data`, or
/// `None` if more bytes are needed.
pub fn frame_len(data: &[u8]) -> Result<Option<usize>, ProtoError> {
    if data.len() < 4 {
        return Ok(None);
    }
    let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtoError::FrameTooLarge(len));
    }
    if data.len() < 4 + len {
        return Ok(None);
    }
    Ok(Some(4 + len))
}

// ── Kinds ─────────────────────────────────────────────────────────────────────

/// Every `(namespace, id)` pair this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    BrowseObject,
    BrowseChildren,
    BrowseObjectResponse,
    BrowseChildrenResponse,
    SpliceChildren,
    SpliceChildrenCommand,
    ObjectChanged,
    RescanDone,
    Play,
    Stop,
    Pause,
    Next,
    Prev,
    SetCurrentTrack,
    PlayById,
    NextVisualization,
    StateChanged,
    SetState,
    SetStateRel,
    Swipe,
}

impl MessageKind {
    pub const ALL: [MessageKind; 20] = [
        MessageKind::BrowseObject,
        MessageKind::BrowseChildren,
        MessageKind::BrowseObjectResponse,
        MessageKind::BrowseChildrenResponse,
        MessageKind::SpliceChildren,
        MessageKind::SpliceChildrenCommand,
        MessageKind::ObjectChanged,
        MessageKind::RescanDone,
        MessageKind::Play,
        MessageKind::Stop,
        MessageKind::Pause,
        MessageKind::Next,
        MessageKind::Prev,
        MessageKind::SetCurrentTrack,
        MessageKind::PlayById,
        MessageKind::NextVisualization,
        MessageKind::StateChanged,
        MessageKind::SetState,
        MessageKind::SetStateRel,
        MessageKind::Swipe,
    ];

    pub fn ns_id(self) -> (i32, i32) {
        match self {
            MessageKind::BrowseObject => (ns::DB, db::FUNC_BROWSE_OBJECT),
            MessageKind::BrowseChildren => (ns::DB, db::FUNC_BROWSE_CHILDREN),
            MessageKind::BrowseObjectResponse => (ns::DB, db::RESP_BROWSE_OBJECT),
            MessageKind::BrowseChildrenResponse => (ns::DB, db::RESP_BROWSE_CHILDREN),
            MessageKind::SpliceChildren => (ns::DB, db::MSG_SPLICE_CHILDREN),
            MessageKind::SpliceChildrenCommand => (ns::DB, db::CMD_SPLICE_CHILDREN),
            MessageKind::ObjectChanged => (ns::DB, db::MSG_OBJECT_CHANGED),
            MessageKind::RescanDone => (ns::DB, db::MSG_RESCAN_DONE),
            MessageKind::Play => (ns::PLAYER, player::CMD_PLAY),
            MessageKind::Stop => (ns::PLAYER, player::CMD_STOP),
            MessageKind::Pause => (ns::PLAYER, player::CMD_PAUSE),
            MessageKind::Next => (ns::PLAYER, player::CMD_NEXT),
            MessageKind::Prev => (ns::PLAYER, player::CMD_PREV),
            MessageKind::SetCurrentTrack => (ns::PLAYER, player::CMD_SET_CURRENT_TRACK),
            MessageKind::PlayById => (ns::PLAYER, player::CMD_PLAY_BY_ID),
            MessageKind::NextVisualization => (ns::PLAYER, player::CMD_NEXT_VISUALIZATION),
            MessageKind::StateChanged => (ns::STATE, state::MSG_STATE_CHANGED),
            MessageKind::SetState => (ns::STATE, state::CMD_SET_STATE),
            MessageKind::SetStateRel => (ns::STATE, state::CMD_SET_STATE_REL),
            MessageKind::Swipe => (ns::GUI, gui::MSG_SWIPE),
        }
    }

    pub fn classify(ns: i32, id: i32) -> Option<Self> {
        let kind = match (ns, id) {
            (ns::DB, db::FUNC_BROWSE_OBJECT) => MessageKind::BrowseObject,
            (ns::DB, db::FUNC_BROWSE_CHILDREN) => MessageKind::BrowseChildren,
            (ns::DB, db::RESP_BROWSE_OBJECT) => MessageKind::BrowseObjectResponse,
            (ns::DB, db::RESP_BROWSE_CHILDREN) => MessageKind::BrowseChildrenResponse,
            (ns::DB, db::MSG_SPLICE_CHILDREN) => MessageKind::SpliceChildren,
            (ns::DB, db::CMD_SPLICE_CHILDREN) => MessageKind::SpliceChildrenCommand,
            (ns::DB, db::MSG_OBJECT_CHANGED) => MessageKind::ObjectChanged,
            (ns::DB, db::MSG_RESCAN_DONE) => MessageKind::RescanDone,
            (ns::PLAYER, player::CMD_PLAY) => MessageKind::Play,
            (ns::PLAYER, player::CMD_STOP) => MessageKind::Stop,
            (ns::PLAYER, player::CMD_PAUSE) => MessageKind::Pause,
            (ns::PLAYER, player::CMD_NEXT) => MessageKind::Next,
            (ns::PLAYER, player::CMD_PREV) => MessageKind::Prev,
            (ns::PLAYER, player::CMD_SET_CURRENT_TRACK) => MessageKind::SetCurrentTrack,
            (ns::PLAYER, player::CMD_PLAY_BY_ID) => MessageKind::PlayById,
            (ns::PLAYER, player::CMD_NEXT_VISUALIZATION) => MessageKind::NextVisualization,
            (ns::STATE, state::MSG_STATE_CHANGED) => MessageKind::StateChanged,
            (ns::STATE, state::CMD_SET_STATE) => MessageKind::SetState,
            (ns::STATE, state::CMD_SET_STATE_REL) => MessageKind::SetStateRel,
            (ns::GUI, gui::MSG_SWIPE) => MessageKind::Swipe,
            _ => return None,
        };
        Some(kind)
    }

    pub fn message(self) -> Message {
        let (ns, id) = self.ns_id();
        Message::new(id, ns)
    }
}

// ── Payloads ──────────────────────────────────────────────────────────────────

/// Positional child-list delta: `(index, deleteCount, items)`.
/// `index < 0` appends, `delete < 0` deletes to the end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Splice {
    pub index: i64,
    pub delete: i64,
    pub items: Vec<Dict>,
}

impl Splice {
    pub fn new(index: i64, delete: i64, items: Vec<Dict>) -> Self {
        Self {
            index,
            delete,
            items,
        }
    }

    fn from_args(msg: &Message) -> Result<Self, ProtoError> {
        let index = msg.arg_int(0).ok_or_else(|| bad_arg(msg, 0))?;
        let delete = msg.arg_int(1).unwrap_or(0);
        let items = msg
            .arg(2)
            .map(|v| v.dicts().into_iter().cloned().collect())
            .unwrap_or_default();
        Ok(Self {
            index,
            delete,
            items,
        })
    }

    fn write_args(&self, msg: &mut Message) {
        msg.set_arg(0, self.index);
        msg.set_arg(1, self.delete);
        if !self.items.is_empty() {
            let items: Vec<Value> = self.items.iter().cloned().map(Value::Dictionary).collect();
            msg.set_arg(2, items);
        }
    }
}

/// `(last, context, variable, value)` carried by the state namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVar {
    pub last: bool,
    pub ctx: String,
    pub name: String,
    pub value: Value,
}

impl StateVar {
    pub fn new(ctx: &str, name: &str, value: impl Into<Value>) -> Self {
        Self {
            last: true,
            ctx: ctx.to_string(),
            name: name.to_string(),
            value: value.into(),
        }
    }

    fn from_args(msg: &Message) -> Result<Self, ProtoError> {
        Ok(Self {
            last: msg.arg_int(0).map_or(true, |v| v != 0),
            ctx: msg.arg_str(1).ok_or_else(|| bad_arg(msg, 1))?.to_string(),
            name: msg.arg_str(2).ok_or_else(|| bad_arg(msg, 2))?.to_string(),
            value: msg.arg(3).cloned().ok_or_else(|| bad_arg(msg, 3))?,
        })
    }

    fn write_args(&self, msg: &mut Message) {
        msg.set_arg(0, i32::from(self.last));
        msg.set_arg(1, self.ctx.as_str());
        msg.set_arg(2, self.name.as_str());
        msg.set_arg(3, self.value.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SwipeDirection {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Up),
            3 => Some(Self::Down),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Up => 2,
            Self::Down => 3,
        }
    }
}

/// Decoded arguments of a recognised message.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    BrowseObject,
    /// `count <= 0` asks for everything from `start`.
    BrowseChildren { start: i64, count: i64 },
    /// `None` when the server could not resolve the id.
    BrowseObjectResponse(Option<Dict>),
    BrowseChildrenResponse(Splice),
    SpliceChildren(Splice),
    SpliceChildrenCommand(Splice),
    ObjectChanged(Dict),
    RescanDone,
    Play,
    Stop,
    Pause,
    Next,
    Prev,
    SetCurrentTrack(String),
    PlayById(String),
    NextVisualization,
    StateChanged(StateVar),
    SetState(StateVar),
    SetStateRel(StateVar),
    Swipe(SwipeDirection),
}

fn bad_arg(msg: &Message, index: usize) -> ProtoError {
    ProtoError::BadArgument {
        ns: msg.ns,
        id: msg.id,
        index,
    }
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::BrowseObject => MessageKind::BrowseObject,
            Payload::BrowseChildren { .. } => MessageKind::BrowseChildren,
            Payload::BrowseObjectResponse(_) => MessageKind::BrowseObjectResponse,
            Payload::BrowseChildrenResponse(_) => MessageKind::BrowseChildrenResponse,
            Payload::SpliceChildren(_) => MessageKind::SpliceChildren,
            Payload::SpliceChildrenCommand(_) => MessageKind::SpliceChildrenCommand,
            Payload::ObjectChanged(_) => MessageKind::ObjectChanged,
            Payload::RescanDone => MessageKind::RescanDone,
            Payload::Play => MessageKind::Play,
            Payload::Stop => MessageKind::Stop,
            Payload::Pause => MessageKind::Pause,
            Payload::Next => MessageKind::Next,
            Payload::Prev => MessageKind::Prev,
            Payload::SetCurrentTrack(_) => MessageKind::SetCurrentTrack,
            Payload::PlayById(_) => MessageKind::PlayById,
            Payload::NextVisualization => MessageKind::NextVisualization,
            Payload::StateChanged(_) => MessageKind::StateChanged,
            Payload::SetState(_) => MessageKind::SetState,
            Payload::SetStateRel(_) => MessageKind::SetStateRel,
            Payload::Swipe(_) => MessageKind::Swipe,
        }
    }

    pub fn from_message(msg: &Message) -> Result<Self, ProtoError> {
        let kind = msg.kind().ok_or(ProtoError::UnknownKind {
            ns: msg.ns,
            id: msg.id,
        })?;
        let payload = match kind {
            MessageKind::BrowseObject => Payload::BrowseObject,
            MessageKind::BrowseChildren => Payload::BrowseChildren {
                start: msg.arg_int(0).unwrap_or(0),
                count: msg.arg_int(1).unwrap_or(0),
            },
            MessageKind::BrowseObjectResponse => {
                Payload::BrowseObjectResponse(msg.arg_dict(0).filter(|d| !d.is_empty()).cloned())
            }
            MessageKind::BrowseChildrenResponse => {
                Payload::BrowseChildrenResponse(Splice::from_args(msg)?)
            }
            MessageKind::SpliceChildren => Payload::SpliceChildren(Splice::from_args(msg)?),
            MessageKind::SpliceChildrenCommand => {
                Payload::SpliceChildrenCommand(Splice::from_args(msg)?)
            }
            MessageKind::ObjectChanged => {
                Payload::ObjectChanged(msg.arg_dict(0).cloned().ok_or_else(|| bad_arg(msg, 0))?)
            }
            MessageKind::RescanDone => Payload::RescanDone,
            MessageKind::Play => Payload::Play,
            MessageKind::Stop => Payload::Stop,
            MessageKind::Pause => Payload::Pause,
            MessageKind::Next => Payload::Next,
            MessageKind::Prev => Payload::Prev,
            MessageKind::SetCurrentTrack => Payload::SetCurrentTrack(
                msg.arg_str(0).ok_or_else(|| bad_arg(msg, 0))?.to_string(),
            ),
            MessageKind::PlayById => {
                Payload::PlayById(msg.arg_str(0).ok_or_else(|| bad_arg(msg, 0))?.to_string())
            }
            MessageKind::NextVisualization => Payload::NextVisualization,
            MessageKind::StateChanged => Payload::StateChanged(StateVar::from_args(msg)?),
            MessageKind::SetState => Payload::SetState(StateVar::from_args(msg)?),
            MessageKind::SetStateRel => Payload::SetStateRel(StateVar::from_args(msg)?),
            MessageKind::Swipe => Payload::Swipe(
                msg.arg_int(0)
                    .and_then(SwipeDirection::from_i64)
                    .ok_or_else(|| bad_arg(msg, 0))?,
            ),
        };
        Ok(payload)
    }

    /// Message carrying this payload.  The caller sets the context id.
    pub fn to_message(&self) -> Message {
        let mut msg = self.kind().message();
        match self {
            Payload::BrowseChildren { start, count } => {
                msg.set_arg(0, *start);
                msg.set_arg(1, *count);
            }
            Payload::BrowseObjectResponse(obj) => {
                msg.set_arg(0, obj.clone().unwrap_or_default());
            }
            Payload::BrowseChildrenResponse(s)
            | Payload::SpliceChildren(s)
            | Payload::SpliceChildrenCommand(s) => s.write_args(&mut msg),
            Payload::ObjectChanged(obj) => msg.set_arg(0, obj.clone()),
            Payload::SetCurrentTrack(id) | Payload::PlayById(id) => msg.set_arg(0, id.as_str()),
            Payload::StateChanged(v) | Payload::SetState(v) | Payload::SetStateRel(v) => {
                v.write_args(&mut msg)
            }
            Payload::Swipe(dir) => msg.set_arg(0, dir.as_i32()),
            Payload::BrowseObject
            | Payload::RescanDone
            | Payload::Play
            | Payload::Stop
            | Payload::Pause
            | Payload::Next
            | Payload::Prev
            | Payload::NextVisualization => {}
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_carries_id_and_ns_in_header() {
        let msg = Message::new(db::FUNC_BROWSE_OBJECT, ns::DB);
        assert_eq!(msg.header.get_int(header::ID), Some(200));
        assert_eq!(msg.header.get_int(header::NS), Some(114));
        assert_eq!(msg.kind(), Some(MessageKind::BrowseObject));
    }

    #[test]
    fn test_set_arg_drops_out_of_range_slots() {
        let mut msg = Message::new(1, ns::DB);
        msg.set_arg(7, 1);
        msg.set_arg(8, 2);
        msg.set_arg(100, 3);
        assert_eq!(msg.num_args(), MAX_ARGS);
        assert_eq!(msg.arg_int(7), Some(1));
        assert!(msg.arg(8).is_none());
    }

    #[test]
    fn test_sparse_args_leave_gaps() {
        let mut msg = Message::new(1, ns::DB);
        msg.set_arg(2, "x");
        assert!(msg.arg(0).is_none());
        assert_eq!(msg.arg_str(2), Some("x"));
    }

    #[test]
    fn test_last_chunk_flag() {
        let mut msg = Message::new(db::RESP_BROWSE_CHILDREN, ns::DB);
        assert!(msg.is_last());
        msg.set_last(false);
        assert!(!msg.is_last());
        msg.header.set(header::NOT_LAST, 0);
        assert!(msg.is_last());
        msg.set_last(true);
        assert!(!msg.header.contains(header::NOT_LAST));
    }

    #[test]
    fn test_message_encode_decode() {
        let mut msg = Payload::BrowseChildren { start: 10, count: 5 }.to_message();
        msg.set_context_id("/albums");
        msg.set_client_id("client-1");
        let encoded = msg.encode().unwrap();
        let (decoded, len) = Message::decode(&encoded).unwrap();
        assert_eq!(len, encoded.len());
        assert_eq!(decoded, msg);
        match decoded.payload().unwrap() {
            Payload::BrowseChildren { start, count } => {
                assert_eq!(start, 10);
                assert_eq!(count, 5);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_decode_needs_whole_frame() {
        let encoded = Message::new(1, ns::PLAYER).encode().unwrap();
        assert!(matches!(
            Message::decode(&encoded[..encoded.len() - 1]),
            Err(ProtoError::Incomplete)
        ));
        assert_eq!(frame_len(&encoded[..3]).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_out_of_range_header() {
        let json = br#"{"header":{"id":{"t":"i","v":1},"ns":{"t":"i","v":4294967298}},"args":[]}"#;
        let err = Message::from_json(json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_answer_copies_routing_headers() {
        let mut request = Message::new(db::FUNC_BROWSE_OBJECT, ns::DB);
        request.set_client_id("client-1");
        request.header.set(header::FUNCTION_TAG, "tag-7");
        request.set_context_id("/albums");
        let mut answer = Message::new(db::RESP_BROWSE_OBJECT, ns::DB);
        answer.copy_routing_from(&request);
        assert_eq!(answer.client_id(), Some("client-1"));
        assert_eq!(answer.header.get_str(header::FUNCTION_TAG), Some("tag-7"));
        assert_eq!(answer.context_id(), None);
    }

    #[test]
    fn test_decode_rejects_header_without_id() {
        let json = br#"{"header":{"ns":{"t":"i","v":114}},"args":[]}"#;
        let err = Message::from_json(json).unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_splice_items_accept_single_dictionary() {
        let mut item = Dict::new();
        item.set("metadata", Dict::new());
        let mut msg = Message::new(db::MSG_SPLICE_CHILDREN, ns::DB);
        msg.set_arg(0, -1);
        msg.set_arg(1, 0);
        msg.set_arg(2, item.clone());
        match msg.payload().unwrap() {
            Payload::SpliceChildren(s) => {
                assert_eq!(s.index, -1);
                assert_eq!(s.items, vec![item]);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_pure_deletion_has_no_items() {
        let msg = Payload::SpliceChildren(Splice::new(3, 2, Vec::new())).to_message();
        assert!(msg.arg(2).is_none());
        match msg.payload().unwrap() {
            Payload::SpliceChildren(s) => assert!(s.items.is_empty()),
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_kind_table_is_consistent() {
        for kind in MessageKind::ALL {
            let (ns, id) = kind.ns_id();
            assert_eq!(MessageKind::classify(ns, id), Some(kind));
        }
        assert_eq!(MessageKind::classify(ns::DB, 9999), None);
    }

    #[test]
    fn test_state_changed_payload() {
        let var = StateVar::new("player", "volume", 0.75);
        let msg = Payload::StateChanged(var.clone()).to_message();
        assert_eq!(msg.payload().unwrap(), Payload::StateChanged(var));
    }

    #[test]
    fn test_unknown_message_is_an_error() {
        let msg = Message::new(77, 77);
        assert!(matches!(
            msg.payload(),
            Err(ProtoError::UnknownKind { ns: 77, id: 77 })
        ));
    }

    #[test]
    fn test_empty_browse_object_response_means_unresolved() {
        let msg = Payload::BrowseObjectResponse(None).to_message();
        assert_eq!(msg.payload().unwrap(), Payload::BrowseObjectResponse(None));
    }
}
