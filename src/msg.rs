use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
/// A message sent after a modification to an event's brackets. Viewers
/// subscribed to the event forward the payload to their clients.
pub struct Msg {
    pub event_id: String,
    pub inner: MsgContents,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum MsgContents {
    /// Every bracket document of the event, already serialized as JSON.
    BracketsUpdated(String),
}
