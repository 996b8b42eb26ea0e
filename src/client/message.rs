// src/client/message.rs

//! [`Message`] (owning) and [`MessageView`] (borrowed from a
//! [`Response`](crate::client::Response)), and the read operations both
//! share through [`Attributes`].

use std::collections::HashSet;
use std::fmt;

use ::si_trace_print::{defn, defx, defñ};

use crate::backends::Backend;
use crate::common::{to_cstring, AslError, AttrMap, Errno, Result};
use crate::data::options::MessageKind;
use crate::data::query::QueryOp;

/// Read access to the attributes of a backend message handle.
pub trait Attributes<B: Backend> {
    fn backend(&self) -> &B;

    /// The backend handle. It stays owned by `self`.
    fn raw(&self) -> B::Msg;

    /// Value of `key`; `NotFound` if absent.
    fn get(
        &self,
        key: &str,
    ) -> Result<String> {
        let key_c = to_cstring("key", key)?;
        match self.backend().msg_get(self.raw(), &key_c) {
            Some(value) => Ok(value),
            None => Err(AslError::NotFound(key.to_string())),
        }
    }

    /// Attribute names in the order the backend enumerates them. The order
    /// is not stable across calls.
    fn key_list(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let mut index: u32 = 0;
        while let Some(key) = self.backend().msg_key(self.raw(), index) {
            keys.push(key);
            index += 1;
        }

        keys
    }

    /// The set of attribute names present.
    fn keys(&self) -> HashSet<String> {
        self.key_list().into_iter().collect()
    }

    /// Every attribute as `(key, value)`, in enumeration order.
    ///
    /// A key whose value cannot be read back is an `Os` error, never
    /// skipped.
    fn pairs(&self) -> Result<Vec<(String, String)>> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for key in self.key_list().into_iter() {
            let key_c = to_cstring("key", &key)?;
            match self.backend().msg_get(self.raw(), &key_c) {
                Some(value) => pairs.push((key, value)),
                None => return Err(AslError::os("asl_get", Errno::EIO)),
            }
        }

        Ok(pairs)
    }

    /// Snapshot of every attribute. The keys equal [`Attributes::keys`].
    fn to_map(&self) -> Result<AttrMap> {
        Ok(self.pairs()?.into_iter().collect())
    }
}

/// An owned message object, record or query.
pub struct Message<B: Backend> {
    backend: B,
    handle: B::Msg,
    kind: MessageKind,
}

impl<B: Backend> Message<B> {
    pub fn new(
        backend: &B,
        kind: MessageKind,
    ) -> Result<Message<B>> {
        let handle = backend.msg_new(kind)?;
        defñ!("({:?}) {:?}", kind, handle);

        Ok(Message {
            backend: backend.clone(),
            handle,
            kind,
        })
    }

    /// Like [`Message::new`] with the platform's numeric message type;
    /// `InvalidArgument` for anything but record or query.
    pub fn from_type(
        backend: &B,
        kind: u32,
    ) -> Result<Message<B>> {
        Message::new(backend, MessageKind::try_from(kind)?)
    }

    pub fn record(backend: &B) -> Result<Message<B>> {
        Message::new(backend, MessageKind::Record)
    }

    pub fn query(backend: &B) -> Result<Message<B>> {
        Message::new(backend, MessageKind::Query)
    }

    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let key_c = to_cstring("key", key)?;
        let value_c = to_cstring("value", value)?;

        self.backend.msg_set(self.handle, &key_c, &value_c)
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub fn unset(
        &mut self,
        key: &str,
    ) -> Result<()> {
        let key_c = to_cstring("key", key)?;

        self.backend.msg_unset(self.handle, &key_c)
    }

    /// Match records whose `key` compares to `value` per `op`. Only
    /// meaningful on a query-kind message.
    pub fn set_query_predicate(
        &mut self,
        key: &str,
        value: &str,
        op: QueryOp,
    ) -> Result<()> {
        let key_c = to_cstring("key", key)?;
        let value_c = to_cstring("value", value)?;

        self.backend.msg_set_query(self.handle, &key_c, &value_c, op)
    }

    /// Match records that have `key` at all.
    pub fn set_query_exists(
        &mut self,
        key: &str,
    ) -> Result<()> {
        self.set_query_predicate(key, "", QueryOp::TRUE)
    }
}

impl<B: Backend> Attributes<B> for Message<B> {
    fn backend(&self) -> &B {
        &self.backend
    }

    fn raw(&self) -> B::Msg {
        self.handle
    }
}

impl<B: Backend> fmt::Debug for Message<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<B: Backend> Drop for Message<B> {
    fn drop(&mut self) {
        defñ!("{:?}", self.handle);
        self.backend.msg_free(self.handle);
    }
}

/// A record yielded by a [`Response`](crate::client::Response). Read-only;
/// the handle is released with the response.
pub struct MessageView<'r, B: Backend> {
    backend: &'r B,
    handle: B::Msg,
}

impl<'r, B: Backend> MessageView<'r, B> {
    pub(crate) fn new(
        backend: &'r B,
        handle: B::Msg,
    ) -> MessageView<'r, B> {
        MessageView { backend, handle }
    }

    /// Copy into an owned record that may outlive the response.
    pub fn to_message(&self) -> Result<Message<B>> {
        defn!("{:?}", self.handle);
        let mut msg = Message::new(self.backend, MessageKind::Record)?;
        for (key, value) in self.pairs()?.iter() {
            msg.set(key, value)?;
        }
        defx!("{:?}", msg);

        Ok(msg)
    }
}

impl<B: Backend> Attributes<B> for MessageView<'_, B> {
    fn backend(&self) -> &B {
        self.backend
    }

    fn raw(&self) -> B::Msg {
        self.handle
    }
}

impl<B: Backend> fmt::Debug for MessageView<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageView")
            .field("handle", &self.handle)
            .finish()
    }
}
