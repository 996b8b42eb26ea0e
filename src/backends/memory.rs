// src/backends/memory.rs

//! [`MemoryBackend`], an in-process [`Backend`].
//!
//! Records sent through a client are stamped, passed through the client's
//! [`FilterMask`] and kept in memory where queries can find them. Auxiliary
//! output targets receive one formatted line per record their own mask
//! passes. All optional operations are implemented; which of them are
//! advertised is set by [`MemorySettings::capabilities`].
//!
//! All state is behind one `Mutex`. Lines to output targets are written
//! after the lock is released, so a blocked descriptor stalls only the
//! sending thread.

use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::os::fd::{BorrowedFd, FromRawFd};
use std::os::unix::io::AsRawFd;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use ::chrono::Utc;
use ::si_trace_print::{
    def1n,
    def1o,
    def1x,
    defn,
    defo,
    defx,
    defñ,
};
use ::tempfile::NamedTempFile;

use crate::backends::{Backend, Capabilities};
use crate::common::{AslError, Count, Errno, Fd, Result};
use crate::data::format::{format_message, MsgFormat};
use crate::data::keys::{
    ASL_KEY_AUX_DATA,
    ASL_KEY_AUX_TITLE,
    ASL_KEY_AUX_URL,
    ASL_KEY_AUX_UTI,
    ASL_KEY_FACILITY,
    ASL_KEY_HOST,
    ASL_KEY_LEVEL,
    ASL_KEY_MSG,
    ASL_KEY_MSG_ID,
    ASL_KEY_PID,
    ASL_KEY_SENDER,
    ASL_KEY_TIME,
    ASL_KEY_TIME_NSEC,
    FACILITY_USER,
};
use crate::data::level::{FilterMask, Level};
use crate::data::options::{ClientOptions, DescriptorKind, MessageKind};
use crate::data::query::{QueryOp, QueryPredicate};
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::attrs_to_String_noraw;
use crate::{de_err, de_wrn};

/// Attribute list of one record, in insertion order.
pub type Attrs = Vec<(String, String)>;

/// Level given to records without a readable `Level` attribute.
pub const LEVEL_DEFAULT: Level = Level::Notice;

/// Filter of a newly opened client.
pub const FILTER_DEFAULT: FilterMask = FilterMask::upto(Level::Notice);

/// Filter of a newly added output target.
pub const FILTER_OUTPUT_DEFAULT: FilterMask = FilterMask::upto(Level::Debug);

/// Prefix of the temporary files behind auxiliary files.
const AUX_FILE_PREFIX: &str = "asl-aux-";

/// Configuration of a [`MemoryBackend`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemorySettings {
    /// Value stamped into `Host`.
    pub host: String,
    /// Value stamped into `Sender` when the client has no identifier.
    pub default_sender: String,
    /// Optional operations to advertise and allow.
    pub capabilities: Capabilities,
}

impl Default for MemorySettings {
    fn default() -> MemorySettings {
        let default_sender: String = std::env::current_exe()
            .ok()
            .and_then(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| String::from("unknown"));

        MemorySettings {
            host: String::from("localhost"),
            default_sender,
            capabilities: Capabilities::ALL,
        }
    }
}

/// Handle of a client, message or response of a [`MemoryBackend`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MemHandle(u64);

#[derive(Debug)]
struct MemAttr {
    key: String,
    value: String,
    op: QueryOp,
}

#[derive(Debug)]
struct MemMessage {
    kind: MessageKind,
    attrs: Vec<MemAttr>,
}

impl MemMessage {
    fn from_attrs(attrs: Attrs) -> MemMessage {
        MemMessage {
            kind: MessageKind::Record,
            attrs: attrs
                .into_iter()
                .map(|(key, value)| MemAttr { key, value, op: QueryOp::EQUAL })
                .collect(),
        }
    }

    fn to_attrs(&self) -> Attrs {
        self.attrs
            .iter()
            .map(|attr| (attr.key.clone(), attr.value.clone()))
            .collect()
    }

    fn put(
        &mut self,
        key: &str,
        value: &str,
        op: QueryOp,
    ) {
        match self.attrs.iter_mut().find(|attr| attr.key == key) {
            Some(attr) => {
                attr.value = value.to_string();
                attr.op = op;
            }
            None => self.attrs.push(MemAttr {
                key: key.to_string(),
                value: value.to_string(),
                op,
            }),
        }
    }
}

/// An auxiliary output target.
#[derive(Clone, Debug)]
struct Output {
    fd: Fd,
    filter: FilterMask,
    format: MsgFormat,
}

#[derive(Clone, Debug)]
struct MemClient {
    ident: Option<String>,
    facility: String,
    filter: FilterMask,
    outputs: Vec<Output>,
    /// Set for clients attached to a caller's descriptor; records are
    /// written there instead of being stored.
    descriptor: Option<Fd>,
}

#[derive(Debug, Default)]
struct MemResponse {
    pending: VecDeque<MemHandle>,
    produced: Vec<MemHandle>,
}

#[derive(Debug)]
struct AuxFile {
    file: NamedTempFile,
    attrs: Attrs,
}

#[derive(Debug, Default)]
struct Store {
    next_handle: u64,
    next_message_id: u64,
    messages: HashMap<MemHandle, MemMessage>,
    clients: HashMap<MemHandle, MemClient>,
    responses: HashMap<MemHandle, MemResponse>,
    records: Vec<Attrs>,
    aux_files: HashMap<Fd, AuxFile>,
}

impl Store {
    fn alloc(&mut self) -> MemHandle {
        self.next_handle += 1;

        MemHandle(self.next_handle)
    }

    fn message(
        &self,
        msg: MemHandle,
        func: &'static str,
    ) -> Result<&MemMessage> {
        self.messages
            .get(&msg)
            .ok_or(AslError::os(func, Errno::EINVAL))
    }

    fn client(
        &self,
        client: MemHandle,
        func: &'static str,
    ) -> Result<&MemClient> {
        self.clients
            .get(&client)
            .ok_or(AslError::os(func, Errno::EINVAL))
    }
}

/// A pending write of one line to an output target.
type Line = (Fd, String);

struct Inner {
    settings: MemorySettings,
    store: Mutex<Store>,
    readers: Mutex<Vec<JoinHandle<()>>>,
}

/// In-process sink. Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store();
        f.debug_struct("MemoryBackend")
            .field("settings", &self.inner.settings)
            .field("records", &store.records.len())
            .field("clients", &store.clients.len())
            .field("messages", &store.messages.len())
            .field("responses", &store.responses.len())
            .finish()
    }
}

impl Default for MemoryBackend {
    fn default() -> MemoryBackend {
        MemoryBackend::new()
    }
}

fn attr<'a>(
    attrs: &'a Attrs,
    key: &str,
) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn set_attr(
    attrs: &mut Attrs,
    key: &str,
    value: String,
) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value,
        None => attrs.push((key.to_string(), value)),
    }
}

fn set_attr_default(
    attrs: &mut Attrs,
    key: &str,
    value: String,
) {
    if attr(attrs, key).is_none() {
        attrs.push((key.to_string(), value));
    }
}

/// Level of a record, [`LEVEL_DEFAULT`] if it has none.
pub fn record_level(attrs: &Attrs) -> Level {
    match attr(attrs, ASL_KEY_LEVEL) {
        Some(value) => Level::from_attribute(value).unwrap_or(LEVEL_DEFAULT),
        None => LEVEL_DEFAULT,
    }
}

fn cstr_to_string(s: &CStr) -> String {
    s.to_string_lossy().into_owned()
}

fn io_err_to_errno(err: &std::io::Error) -> Errno {
    match err.raw_os_error() {
        Some(code) => Errno::from_raw(code),
        None => Errno::EIO,
    }
}

/// Is `fd` an open descriptor?
fn check_fd(
    func: &'static str,
    fd: Fd,
) -> Result<()> {
    if fd < 0 {
        return Err(AslError::os(func, Errno::EBADF));
    }
    // SAFETY: `F_GETFD` only inspects the descriptor table
    let r = unsafe { ::libc::fcntl(fd, ::libc::F_GETFD) };
    if r == -1 {
        return Err(AslError::last_os(func));
    }

    Ok(())
}

/// A `File` for a duplicate of `fd`; the caller's descriptor is untouched.
fn dup_fd(
    func: &'static str,
    fd: Fd,
) -> Result<File> {
    check_fd(func, fd)?;
    // SAFETY: `fd` was just checked to be open and is only borrowed for the
    // duration of the duplication
    let borrowed: BorrowedFd<'_> = unsafe { BorrowedFd::borrow_raw(fd) };
    match borrowed.try_clone_to_owned() {
        Ok(owned) => Ok(File::from(owned)),
        Err(err) => Err(AslError::os(func, io_err_to_errno(&err))),
    }
}

/// Write each line, newline-terminated. All lines are attempted; the first
/// failure is returned.
fn write_lines(lines: Vec<Line>) -> Result<()> {
    let mut result: Result<()> = Ok(());
    for (fd, line) in lines.into_iter() {
        let written = dup_fd("write", fd).and_then(|mut file| {
            file.write_all(line.as_bytes())
                .and_then(|_| file.write_all(b"\n"))
                .map_err(|err| AslError::os("write", io_err_to_errno(&err)))
        });
        if let Err(err) = written {
            de_wrn!("write to fd {} failed: {}", fd, err);
            if result.is_ok() {
                result = Err(err);
            }
        }
    }

    result
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::with_settings(MemorySettings::default())
    }

    pub fn with_settings(settings: MemorySettings) -> MemoryBackend {
        defñ!("{:?}", settings);
        MemoryBackend {
            inner: Arc::new(Inner {
                settings,
                store: Mutex::new(Store::default()),
                readers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Backend advertising only `capabilities`.
    pub fn with_capabilities(capabilities: Capabilities) -> MemoryBackend {
        MemoryBackend::with_settings(MemorySettings {
            capabilities,
            ..MemorySettings::default()
        })
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.inner.settings
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.inner
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of every stored record, oldest first.
    pub fn records(&self) -> Vec<Attrs> {
        self.store().records.clone()
    }

    /// Number of stored records.
    pub fn count_records(&self) -> Count {
        self.store().records.len() as Count
    }

    /// Number of live message objects, including those held by responses.
    pub fn count_messages(&self) -> Count {
        self.store().messages.len() as Count
    }

    /// Number of open clients.
    pub fn count_clients(&self) -> Count {
        self.store().clients.len() as Count
    }

    /// Number of live responses.
    pub fn count_responses(&self) -> Count {
        self.store().responses.len() as Count
    }

    /// Number of descriptor reader threads not yet joined. Finished threads
    /// are pruned whenever a new one starts.
    pub fn count_readers(&self) -> Count {
        match self.inner.readers.lock() {
            Ok(guard) => guard.len() as Count,
            Err(poisoned) => poisoned.into_inner().len() as Count,
        }
    }

    /// Block until every descriptor given to `log_descriptor` has reached
    /// end-of-file.
    pub fn wait_descriptors(&self) {
        defn!();
        let readers: Vec<JoinHandle<()>> = match self.inner.readers.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for reader in readers.into_iter() {
            if reader.join().is_err() {
                de_err!("descriptor reader thread panicked");
            }
        }
        defx!();
    }

    fn require(
        &self,
        available: bool,
        name: &'static str,
    ) -> Result<()> {
        if available {
            Ok(())
        } else {
            Err(AslError::Unsupported(name))
        }
    }

    /// Fill in the attributes the sink sets on every record.
    fn stamp(
        &self,
        store: &mut Store,
        sender: Option<&str>,
        facility: &str,
        attrs: &mut Attrs,
    ) {
        let now = Utc::now();
        set_attr_default(attrs, ASL_KEY_TIME, now.timestamp().to_string());
        set_attr_default(attrs, ASL_KEY_TIME_NSEC, now.timestamp_subsec_nanos().to_string());
        set_attr_default(attrs, ASL_KEY_HOST, self.inner.settings.host.clone());
        let sender: String = match sender {
            Some(sender) => sender.to_string(),
            None => self.inner.settings.default_sender.clone(),
        };
        set_attr_default(attrs, ASL_KEY_SENDER, sender);
        set_attr_default(attrs, ASL_KEY_FACILITY, facility.to_string());
        set_attr_default(attrs, ASL_KEY_PID, std::process::id().to_string());
        set_attr_default(attrs, ASL_KEY_LEVEL, LEVEL_DEFAULT.as_i32().to_string());
        store.next_message_id += 1;
        set_attr(attrs, ASL_KEY_MSG_ID, store.next_message_id.to_string());
    }

    /// Stamp and route one record of `client`; return the lines to write.
    fn route(
        &self,
        store: &mut Store,
        client: &MemClient,
        mut attrs: Attrs,
    ) -> Vec<Line> {
        self.stamp(store, client.ident.as_deref(), &client.facility, &mut attrs);
        let level: Level = record_level(&attrs);
        def1o!("level {:?}, filter {}, {}", level, client.filter, attrs_to_String_noraw(&attrs));

        let mut lines: Vec<Line> = Vec::new();
        if client.filter.contains(level) {
            match client.descriptor {
                Some(fd) => lines.push((fd, format_message(&attrs, MsgFormat::Raw))),
                None => store.records.push(attrs.clone()),
            }
        }
        for output in client.outputs.iter() {
            if output.filter.contains(level) {
                lines.push((output.fd, format_message(&attrs, output.format)));
            }
        }

        lines
    }

    /// Attributes of `msg`, or an empty record for `None`.
    fn template(
        store: &Store,
        msg: Option<MemHandle>,
        func: &'static str,
    ) -> Result<Attrs> {
        match msg {
            Some(msg) => Ok(store.message(msg, func)?.to_attrs()),
            None => Ok(Attrs::new()),
        }
    }

    fn templated(
        mut attrs: Attrs,
        level: Level,
        text: String,
    ) -> Attrs {
        set_attr(&mut attrs, ASL_KEY_LEVEL, level.as_i32().to_string());
        set_attr(&mut attrs, ASL_KEY_MSG, text);

        attrs
    }

    /// Route one record and write its lines, for a client snapshot.
    fn deliver(
        &self,
        client: &MemClient,
        attrs: Attrs,
    ) -> Result<()> {
        let lines: Vec<Line> = {
            let mut store = self.store();
            self.route(&mut store, client, attrs)
        };

        write_lines(lines)
    }

    /// Log each line read from `file` until end-of-file.
    fn deliver_lines(
        &self,
        client: &MemClient,
        template: &Attrs,
        level: Level,
        file: File,
    ) -> Result<()> {
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line: String = match line {
                Ok(line) => line,
                Err(err) => return Err(AslError::os("read", io_err_to_errno(&err))),
            };
            if line.is_empty() {
                continue;
            }
            self.deliver(client, Self::templated(template.clone(), level, line))?;
        }

        Ok(())
    }

    /// Replace `fd` by the write end of a pipe and log every line written
    /// to it from a reader thread.
    fn spawn_descriptor_reader(
        &self,
        client: MemClient,
        template: Attrs,
        level: Level,
        fd: Fd,
    ) -> Result<()> {
        def1n!("({})", fd);
        check_fd("asl_log_descriptor", fd)?;
        let mut fds: [::libc::c_int; 2] = [-1; 2];
        // SAFETY: `fds` has room for two descriptors
        if unsafe { ::libc::pipe(fds.as_mut_ptr()) } != 0 {
            let err = AslError::last_os("pipe");
            def1x!("return {:?}", err);
            return Err(err);
        }
        let (read_end, write_end) = (fds[0], fds[1]);
        // SAFETY: `read_end` is open; keep it out of child processes
        unsafe { ::libc::fcntl(read_end, ::libc::F_SETFD, ::libc::FD_CLOEXEC) };
        // SAFETY: `read_end` is a fresh descriptor owned from here on
        let reader_file: File = unsafe { File::from_raw_fd(read_end) };
        // SAFETY: both descriptors are open; `write_end` is closed right
        // after so `fd` holds the only write end
        let r = unsafe { ::libc::dup2(write_end, fd) };
        let err_dup2 = if r == -1 { Some(AslError::last_os("dup2")) } else { None };
        // SAFETY: `write_end` is owned here and not used again
        unsafe { ::libc::close(write_end) };
        if let Some(err) = err_dup2 {
            def1x!("return {:?}", err);
            return Err(err);
        }

        self.spawn_lines_reader(client, template, level, reader_file);
        def1x!();

        Ok(())
    }

    /// Log every line of `file` from a new reader thread. `file` is closed
    /// when the thread reaches end-of-file.
    fn spawn_lines_reader(
        &self,
        client: MemClient,
        template: Attrs,
        level: Level,
        file: File,
    ) {
        let backend = self.clone();
        let reader = std::thread::spawn(move || {
            if let Err(err) = backend.deliver_lines(&client, &template, level, file) {
                de_err!("descriptor reader failed: {}", err);
            }
        });
        let mut readers = match self.inner.readers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        readers.retain(|reader| !reader.is_finished());
        readers.push(reader);
    }

    fn new_client(
        &self,
        ident: Option<&CStr>,
        facility: &CStr,
        options: ClientOptions,
        descriptor: Option<Fd>,
    ) -> MemHandle {
        let mut outputs: Vec<Output> = Vec::new();
        if options.contains(ClientOptions::STDERR) {
            outputs.push(Output {
                fd: ::libc::STDERR_FILENO,
                filter: FILTER_OUTPUT_DEFAULT,
                format: MsgFormat::Std,
            });
        }
        let filter: FilterMask = match descriptor {
            Some(_) => FILTER_OUTPUT_DEFAULT,
            None => FILTER_DEFAULT,
        };
        let client = MemClient {
            ident: ident.map(cstr_to_string),
            facility: cstr_to_string(facility),
            filter,
            outputs,
            descriptor,
        };
        let mut store = self.store();
        let handle = store.alloc();
        defo!("{:?} {:?}", handle, client);
        store.clients.insert(handle, client);

        handle
    }
}

impl Backend for MemoryBackend {
    type Client = MemHandle;
    type Msg = MemHandle;
    type Response = MemHandle;

    fn capabilities(&self) -> Capabilities {
        self.inner.settings.capabilities
    }

    fn open(
        &self,
        ident: Option<&CStr>,
        facility: &CStr,
        options: ClientOptions,
    ) -> Result<MemHandle> {
        def1n!("({:?}, {:?}, {:?})", ident, facility, options);
        let handle = self.new_client(ident, facility, options, None);
        def1x!("return {:?}", handle);

        Ok(handle)
    }

    fn open_from_descriptor(
        &self,
        fd: Fd,
        ident: Option<&CStr>,
        facility: &CStr,
    ) -> Result<MemHandle> {
        def1n!("({}, {:?}, {:?})", fd, ident, facility);
        self.require(self.capabilities().open_from_descriptor, "asl_open_from_file")?;
        check_fd("asl_open_from_file", fd)?;
        let handle = self.new_client(ident, facility, ClientOptions::NONE, Some(fd));
        def1x!("return {:?}", handle);

        Ok(handle)
    }

    fn close(
        &self,
        client: MemHandle,
    ) {
        defñ!("({:?})", client);
        if self.store().clients.remove(&client).is_none() {
            de_wrn!("close of unknown client {:?}", client);
        }
    }

    fn add_log_file(
        &self,
        client: MemHandle,
        fd: Fd,
    ) -> Result<()> {
        defñ!("({:?}, {})", client, fd);
        check_fd("asl_add_log_file", fd)?;
        let mut store = self.store();
        let client = store
            .clients
            .get_mut(&client)
            .ok_or(AslError::os("asl_add_log_file", Errno::EINVAL))?;
        client.outputs.retain(|output| output.fd != fd);
        client.outputs.push(Output {
            fd,
            filter: FILTER_OUTPUT_DEFAULT,
            format: MsgFormat::Std,
        });

        Ok(())
    }

    fn remove_log_file(
        &self,
        client: MemHandle,
        fd: Fd,
    ) -> Result<()> {
        defñ!("({:?}, {})", client, fd);
        if fd < 0 {
            return Err(AslError::os("asl_remove_log_file", Errno::EBADF));
        }
        let mut store = self.store();
        let client = store
            .clients
            .get_mut(&client)
            .ok_or(AslError::os("asl_remove_log_file", Errno::EINVAL))?;
        let before = client.outputs.len();
        client.outputs.retain(|output| output.fd != fd);
        if client.outputs.len() == before {
            return Err(AslError::os("asl_remove_log_file", Errno::EINVAL));
        }

        Ok(())
    }

    fn set_filter(
        &self,
        client: MemHandle,
        filter: FilterMask,
    ) -> FilterMask {
        let mut store = self.store();
        match store.clients.get_mut(&client) {
            Some(client) => {
                let prev = client.filter;
                client.filter = filter;
                defñ!("({}) previous {}", filter, prev);
                prev
            }
            None => {
                de_wrn!("set_filter of unknown client {:?}", client);
                FilterMask::default()
            }
        }
    }

    fn send(
        &self,
        client: MemHandle,
        msg: MemHandle,
    ) -> Result<()> {
        def1n!("({:?}, {:?})", client, msg);
        let lines: Vec<Line> = {
            let mut store = self.store();
            let client: MemClient = store.client(client, "asl_send")?.clone();
            let attrs: Attrs = store.message(msg, "asl_send")?.to_attrs();
            self.route(&mut store, &client, attrs)
        };
        let result = write_lines(lines);
        def1x!("return {:?}", result);

        result
    }

    fn log(
        &self,
        client: MemHandle,
        msg: Option<MemHandle>,
        level: Level,
        text: &CStr,
    ) -> Result<()> {
        def1n!("({:?}, {:?}, {:?}, {:?})", client, msg, level, text);
        let lines: Vec<Line> = {
            let mut store = self.store();
            let client: MemClient = store.client(client, "asl_log")?.clone();
            let template: Attrs = Self::template(&store, msg, "asl_log")?;
            let attrs = Self::templated(template, level, cstr_to_string(text));
            self.route(&mut store, &client, attrs)
        };
        let result = write_lines(lines);
        def1x!("return {:?}", result);

        result
    }

    fn log_descriptor(
        &self,
        client: MemHandle,
        msg: Option<MemHandle>,
        level: Level,
        fd: Fd,
        kind: DescriptorKind,
    ) -> Result<()> {
        def1n!("({:?}, {:?}, {:?}, {}, {:?})", client, msg, level, fd, kind);
        self.require(self.capabilities().log_descriptor, "asl_log_descriptor")?;
        let (client, template): (MemClient, Attrs) = {
            let store = self.store();
            (
                store.client(client, "asl_log_descriptor")?.clone(),
                Self::template(&store, msg, "asl_log_descriptor")?,
            )
        };
        let result = match kind {
            DescriptorKind::Read => match dup_fd("asl_log_descriptor", fd) {
                Ok(file) => {
                    self.spawn_lines_reader(client, template, level, file);
                    Ok(())
                }
                Err(err) => Err(err),
            },
            DescriptorKind::Write => self.spawn_descriptor_reader(client, template, level, fd),
        };
        def1x!("return {:?}", result);

        result
    }

    fn search(
        &self,
        client: MemHandle,
        query: MemHandle,
    ) -> Option<MemHandle> {
        def1n!("({:?}, {:?})", client, query);
        let mut store = self.store();
        if !store.clients.contains_key(&client) {
            def1x!("unknown client; return None");
            return None;
        }
        let predicates: Vec<QueryPredicate> = match store.messages.get(&query) {
            Some(msg) if msg.kind == MessageKind::Query => {
                let mut predicates = Vec::with_capacity(msg.attrs.len());
                for attr in msg.attrs.iter() {
                    match QueryPredicate::new(&attr.key, &attr.value, attr.op) {
                        Ok(predicate) => predicates.push(predicate),
                        Err(_err) => {
                            def1x!("bad predicate {:?}: {}; return None", attr.key, _err);
                            return None;
                        }
                    }
                }
                predicates
            }
            _ => {
                def1x!("not a query; return None");
                return None;
            }
        };

        let matched: Vec<Attrs> = store
            .records
            .iter()
            .filter(|record| {
                predicates
                    .iter()
                    .all(|predicate| predicate.matches(attr(record, predicate.key())))
            })
            .cloned()
            .collect();
        def1o!("matched {} of {} records", matched.len(), store.records.len());
        if matched.is_empty() {
            def1x!("return None");
            return None;
        }

        let mut response = MemResponse::default();
        for attrs in matched.into_iter() {
            let handle = store.alloc();
            store.messages.insert(handle, MemMessage::from_attrs(attrs));
            response.pending.push_back(handle);
        }
        let handle = store.alloc();
        store.responses.insert(handle, response);
        def1x!("return {:?}", handle);

        Some(handle)
    }

    fn response_next(
        &self,
        response: MemHandle,
    ) -> Option<MemHandle> {
        let mut store = self.store();
        let response = store.responses.get_mut(&response)?;
        let msg = response.pending.pop_front()?;
        response.produced.push(msg);

        Some(msg)
    }

    fn response_free(
        &self,
        response: MemHandle,
    ) {
        defñ!("({:?})", response);
        let mut store = self.store();
        match store.responses.remove(&response) {
            Some(response) => {
                for msg in response.produced.iter().chain(response.pending.iter()) {
                    store.messages.remove(msg);
                }
            }
            None => de_wrn!("free of unknown response {:?}", response),
        }
    }

    fn msg_new(
        &self,
        kind: MessageKind,
    ) -> Result<MemHandle> {
        let mut store = self.store();
        let handle = store.alloc();
        store.messages.insert(handle, MemMessage { kind, attrs: Vec::new() });
        defñ!("({:?}) return {:?}", kind, handle);

        Ok(handle)
    }

    fn msg_free(
        &self,
        msg: MemHandle,
    ) {
        defñ!("({:?})", msg);
        if self.store().messages.remove(&msg).is_none() {
            de_wrn!("free of unknown message {:?}", msg);
        }
    }

    fn msg_key(
        &self,
        msg: MemHandle,
        index: u32,
    ) -> Option<String> {
        let store = self.store();
        let msg = store.messages.get(&msg)?;

        msg.attrs.get(index as usize).map(|attr| attr.key.clone())
    }

    fn msg_get(
        &self,
        msg: MemHandle,
        key: &CStr,
    ) -> Option<String> {
        let key = cstr_to_string(key);
        let store = self.store();
        let msg = store.messages.get(&msg)?;

        msg.attrs
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.clone())
    }

    fn msg_set(
        &self,
        msg: MemHandle,
        key: &CStr,
        value: &CStr,
    ) -> Result<()> {
        let mut store = self.store();
        let msg = store
            .messages
            .get_mut(&msg)
            .ok_or(AslError::os("asl_set", Errno::EINVAL))?;
        msg.put(&cstr_to_string(key), &cstr_to_string(value), QueryOp::EQUAL);

        Ok(())
    }

    fn msg_unset(
        &self,
        msg: MemHandle,
        key: &CStr,
    ) -> Result<()> {
        let key = cstr_to_string(key);
        let mut store = self.store();
        let msg = store
            .messages
            .get_mut(&msg)
            .ok_or(AslError::os("asl_unset", Errno::EINVAL))?;
        msg.attrs.retain(|attr| attr.key != key);

        Ok(())
    }

    fn msg_set_query(
        &self,
        msg: MemHandle,
        key: &CStr,
        value: &CStr,
        op: QueryOp,
    ) -> Result<()> {
        if QueryOp::from_bits(op.bits()).is_err() {
            return Err(AslError::os("asl_set_query", Errno::EINVAL));
        }
        let mut store = self.store();
        let msg = store
            .messages
            .get_mut(&msg)
            .ok_or(AslError::os("asl_set_query", Errno::EINVAL))?;
        msg.put(&cstr_to_string(key), &cstr_to_string(value), op);

        Ok(())
    }

    fn log_auxiliary_location(
        &self,
        msg: MemHandle,
        title: &CStr,
        uti: Option<&CStr>,
        url: &CStr,
    ) -> Result<()> {
        def1n!("({:?}, {:?}, {:?}, {:?})", msg, title, uti, url);
        self.require(self.capabilities().auxiliary_location, "asl_log_auxiliary_location")?;
        let mut store = self.store();
        let mut attrs: Attrs = store.message(msg, "asl_log_auxiliary_location")?.to_attrs();
        set_attr(&mut attrs, ASL_KEY_AUX_TITLE, cstr_to_string(title));
        if let Some(uti) = uti {
            set_attr(&mut attrs, ASL_KEY_AUX_UTI, cstr_to_string(uti));
        }
        set_attr(&mut attrs, ASL_KEY_AUX_URL, cstr_to_string(url));
        self.stamp(&mut store, None, FACILITY_USER, &mut attrs);
        store.records.push(attrs);
        def1x!();

        Ok(())
    }

    fn create_auxiliary_file(
        &self,
        msg: MemHandle,
        title: &CStr,
        uti: Option<&CStr>,
    ) -> Result<Fd> {
        def1n!("({:?}, {:?}, {:?})", msg, title, uti);
        self.require(self.capabilities().auxiliary_file, "asl_create_auxiliary_file")?;
        let mut store = self.store();
        let mut attrs: Attrs = store.message(msg, "asl_create_auxiliary_file")?.to_attrs();
        set_attr(&mut attrs, ASL_KEY_AUX_TITLE, cstr_to_string(title));
        if let Some(uti) = uti {
            set_attr(&mut attrs, ASL_KEY_AUX_UTI, cstr_to_string(uti));
        }
        let file: NamedTempFile = match ::tempfile::Builder::new()
            .prefix(AUX_FILE_PREFIX)
            .tempfile()
        {
            Ok(file) => file,
            Err(err) => {
                let err = AslError::os("asl_create_auxiliary_file", io_err_to_errno(&err));
                def1x!("return {:?}", err);
                return Err(err);
            }
        };
        let fd: Fd = file.as_file().as_raw_fd();
        store.aux_files.insert(fd, AuxFile { file, attrs });
        def1x!("return {}", fd);

        Ok(fd)
    }

    fn close_auxiliary_file(
        &self,
        fd: Fd,
    ) -> Result<()> {
        def1n!("({})", fd);
        self.require(self.capabilities().auxiliary_file, "asl_close_auxiliary_file")?;
        let mut store = self.store();
        let aux: AuxFile = store
            .aux_files
            .remove(&fd)
            .ok_or(AslError::os("asl_close_auxiliary_file", Errno::EBADF))?;
        let data: Vec<u8> = match std::fs::read(aux.file.path()) {
            Ok(data) => data,
            Err(err) => {
                let err = AslError::os("asl_close_auxiliary_file", io_err_to_errno(&err));
                def1x!("return {:?}", err);
                return Err(err);
            }
        };
        let mut attrs: Attrs = aux.attrs;
        set_attr(&mut attrs, ASL_KEY_AUX_DATA, String::from_utf8_lossy(&data).into_owned());
        self.stamp(&mut store, None, FACILITY_USER, &mut attrs);
        store.records.push(attrs);
        def1x!();

        Ok(())
    }
}
