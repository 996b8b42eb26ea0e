// src/client/response.rs

//! [`Response`], the result set of [`Client::search`].
//!
//! [`Client::search`]: crate::client::Client::search

use std::cell::Cell;
use std::fmt;

use ::si_trace_print::{defo, defñ};

use crate::backends::Backend;
use crate::client::message::MessageView;

/// A lazy, forward-only, single-pass sequence of records.
///
/// Yielded [`MessageView`]s borrow the `Response`; dropping it releases
/// every record, drained or not. A response of a search that matched
/// nothing, or whose query was rejected, is empty.
pub struct Response<B: Backend> {
    backend: B,
    handle: Option<B::Response>,
    done: Cell<bool>,
}

impl<B: Backend> Response<B> {
    pub(crate) fn new(
        backend: &B,
        handle: Option<B::Response>,
    ) -> Response<B> {
        defñ!("{:?}", handle);
        Response {
            backend: backend.clone(),
            done: Cell::new(handle.is_none()),
            handle,
        }
    }

    /// The next record, or `None` at the end. After the first `None` every
    /// call returns `None`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<MessageView<'_, B>> {
        if self.done.get() {
            return None;
        }
        let handle = self.handle?;
        match self.backend.response_next(handle) {
            Some(msg) => Some(MessageView::new(&self.backend, msg)),
            None => {
                defo!("{:?} exhausted", handle);
                self.done.set(true);
                None
            }
        }
    }

    /// Has `next` returned `None`?
    pub fn is_exhausted(&self) -> bool {
        self.done.get()
    }

    pub fn iter(&self) -> ResponseIter<'_, B> {
        ResponseIter { response: self }
    }
}

impl<B: Backend> fmt::Debug for Response<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("handle", &self.handle)
            .field("done", &self.done.get())
            .finish()
    }
}

impl<B: Backend> Drop for Response<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            defñ!("{:?}", handle);
            self.backend.response_free(handle);
        }
    }
}

/// Iterator over the remaining records of a [`Response`].
pub struct ResponseIter<'r, B: Backend> {
    response: &'r Response<B>,
}

impl<'r, B: Backend> Iterator for ResponseIter<'r, B> {
    type Item = MessageView<'r, B>;

    fn next(&mut self) -> Option<MessageView<'r, B>> {
        self.response.next()
    }
}

impl<'r, B: Backend> IntoIterator for &'r Response<B> {
    type Item = MessageView<'r, B>;
    type IntoIter = ResponseIter<'r, B>;

    fn into_iter(self) -> ResponseIter<'r, B> {
        self.iter()
    }
}
