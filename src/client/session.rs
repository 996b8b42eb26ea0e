// src/client/session.rs

//! [`Client`], one open session to the logging sink.

use std::fmt;

use ::si_trace_print::{
    def1n,
    def1x,
    defn,
    defo,
    defx,
    defñ,
};

use crate::backends::{Backend, Capabilities};
use crate::client::message::{Attributes, Message};
use crate::client::response::Response;
use crate::common::{to_cstring, AslError, Fd, Result};
use crate::data::level::{FilterMask, Level};
use crate::data::options::{ClientOptions, DescriptorKind, MessageKind};

/// A session with the logging sink.
///
/// `Open` from a successful [`Client::open`] or
/// [`Client::open_from_descriptor`] until [`Client::close`]; after that
/// every operation fails with [`AslError::Closed`]. Dropping a `Client`
/// closes it.
///
/// A `Client` is not meant to be shared between threads without external
/// synchronization; operations that change the session take `&mut self`.
pub struct Client<B: Backend> {
    backend: B,
    handle: Option<B::Client>,
    ident: Option<String>,
    facility: String,
}

impl<B: Backend> Client<B> {
    /// Open a session. `ident` of `None` lets the sink use the process
    /// name. `options` bits are forwarded unchanged.
    pub fn open(
        backend: &B,
        ident: Option<&str>,
        facility: &str,
        options: ClientOptions,
    ) -> Result<Client<B>> {
        defn!("({:?}, {:?}, {:?})", ident, facility, options);
        let ident_c = match ident {
            Some(ident) => Some(to_cstring("ident", ident)?),
            None => None,
        };
        let facility_c = to_cstring("facility", facility)?;
        let handle = backend.open(ident_c.as_deref(), &facility_c, options)?;
        defx!("{:?}", handle);

        Ok(Client {
            backend: backend.clone(),
            handle: Some(handle),
            ident: ident.map(String::from),
            facility: facility.to_string(),
        })
    }

    /// Open a session that writes to `fd`, an open descriptor owned by the
    /// caller, instead of the sink.
    pub fn open_from_descriptor(
        backend: &B,
        fd: Fd,
        ident: Option<&str>,
        facility: &str,
    ) -> Result<Client<B>> {
        defn!("({}, {:?}, {:?})", fd, ident, facility);
        if !backend.capabilities().open_from_descriptor {
            defx!("unsupported");
            return Err(AslError::Unsupported("asl_open_from_file"));
        }
        let ident_c = match ident {
            Some(ident) => Some(to_cstring("ident", ident)?),
            None => None,
        };
        let facility_c = to_cstring("facility", facility)?;
        let handle = backend.open_from_descriptor(fd, ident_c.as_deref(), &facility_c)?;
        defx!("{:?}", handle);

        Ok(Client {
            backend: backend.clone(),
            handle: Some(handle),
            ident: ident.map(String::from),
            facility: facility.to_string(),
        })
    }

    /// Open a client, run `f` with it, and close it on every exit path.
    /// The result of `f`, error or not, is returned unchanged.
    pub fn scoped<T, F>(
        backend: &B,
        ident: Option<&str>,
        facility: &str,
        options: ClientOptions,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut Client<B>) -> Result<T>,
    {
        let mut client = Client::open(backend, ident, facility, options)?;
        let result = f(&mut client);
        client.close();

        result
    }

    fn handle(&self) -> Result<B::Client> {
        self.handle.ok_or(AslError::Closed)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    pub fn facility(&self) -> &str {
        &self.facility
    }

    pub const fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Also write records to `fd`. The descriptor stays owned by the
    /// caller and must stay open until removed or the client is closed.
    pub fn add_log_file(
        &mut self,
        fd: Fd,
    ) -> Result<()> {
        let handle = self.handle()?;
        defñ!("({})", fd);

        self.backend.add_log_file(handle, fd)
    }

    pub fn remove_log_file(
        &mut self,
        fd: Fd,
    ) -> Result<()> {
        let handle = self.handle()?;
        defñ!("({})", fd);

        self.backend.remove_log_file(handle, fd)
    }

    /// Set the levels passed to the sink; returns the previous mask so the
    /// caller can restore it.
    pub fn set_filter(
        &mut self,
        filter: FilterMask,
    ) -> Result<FilterMask> {
        let handle = self.handle()?;
        let prev = self.backend.set_filter(handle, filter);
        defñ!("({}) return {}", filter, prev);

        Ok(prev)
    }

    /// Deliver `msg` to the sink and every output target whose mask passes
    /// its level. May block while the sink applies backpressure.
    pub fn send<M: Attributes<B>>(
        &mut self,
        msg: &M,
    ) -> Result<()> {
        let handle = self.handle()?;
        def1n!("({:?})", msg.raw());
        let result = self.backend.send(handle, msg.raw());
        def1x!("return {:?}", result);

        result
    }

    /// Send `text` at `level`, merged into a copy of `msg` if given.
    /// `msg` itself is not modified.
    pub fn log(
        &mut self,
        msg: Option<&Message<B>>,
        level: Level,
        text: &str,
    ) -> Result<()> {
        let handle = self.handle()?;
        def1n!("({:?}, {:?}, {:?})", msg, level, text);
        let text_c = to_cstring("text", text)?;
        let result = self.backend.log(handle, msg.map(|msg| msg.raw()), level, &text_c);
        def1x!("return {:?}", result);

        result
    }

    /// Log lines passing through `fd`.
    ///
    /// With [`DescriptorKind::Read`] the lines are read from `fd` in the
    /// background until end-of-file; the call returns at once. With
    /// [`DescriptorKind::Write`] `fd` is redirected so every line the caller
    /// writes to it is logged.
    pub fn log_to_descriptor(
        &mut self,
        msg: Option<&Message<B>>,
        level: Level,
        fd: Fd,
        kind: DescriptorKind,
    ) -> Result<()> {
        let handle = self.handle()?;
        def1n!("({:?}, {:?}, {}, {:?})", msg, level, fd, kind);
        if !self.capabilities().log_descriptor {
            def1x!("unsupported");
            return Err(AslError::Unsupported("asl_log_descriptor"));
        }
        let result = self
            .backend
            .log_descriptor(handle, msg.map(|msg| msg.raw()), level, fd, kind);
        def1x!("return {:?}", result);

        result
    }

    /// [`Client::log_to_descriptor`] with the platform's numeric descriptor
    /// kind; `InvalidArgument` for anything but read or write.
    pub fn log_to_descriptor_type(
        &mut self,
        msg: Option<&Message<B>>,
        level: Level,
        fd: Fd,
        kind: u32,
    ) -> Result<()> {
        self.handle()?;
        let kind = DescriptorKind::try_from(kind)?;

        self.log_to_descriptor(msg, level, fd, kind)
    }

    /// Records matching every predicate of `query`.
    ///
    /// A query that matches nothing and a query the sink rejects both give
    /// an empty [`Response`]; the two cannot be told apart.
    pub fn search(
        &self,
        query: &Message<B>,
    ) -> Result<Response<B>> {
        let handle = self.handle()?;
        def1n!("({:?})", query);
        if query.kind() != MessageKind::Query {
            def1x!("not a query");
            return Err(AslError::InvalidArgument(String::from(
                "search requires a query-kind message",
            )));
        }
        let response = Response::new(&self.backend, self.backend.search(handle, query.raw()));
        def1x!("return {:?}", response);

        Ok(response)
    }

    /// Release the session. Calling `close` again does nothing.
    pub fn close(&mut self) {
        match self.handle.take() {
            Some(handle) => {
                defñ!("{:?}", handle);
                self.backend.close(handle);
            }
            None => {
                defo!("already closed");
            }
        }
    }
}

impl<B: Backend> fmt::Debug for Client<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("handle", &self.handle)
            .field("ident", &self.ident)
            .field("facility", &self.facility)
            .finish()
    }
}

impl<B: Backend> Drop for Client<B> {
    fn drop(&mut self) {
        self.close();
    }
}
