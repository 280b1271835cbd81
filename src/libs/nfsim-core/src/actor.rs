//! NF Actor Runtime
//!
//! Every network function context implements [`NetworkFunction`]. A context can
//! be driven synchronously by its owner, or moved onto its own thread with
//! [`ActorHandle::spawn`]. Once spawned, the thread owns the context exclusively
//! and the only way to reach it is through the mailbox.

use crate::message::{Envelope, Message};
use crate::queue::Mailbox;
use crate::types::{new_nf_instance_id, NfType};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Result of dispatching a message to an NF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The NF acted on the message
    Handled,
    /// The NF has no handler for this message kind
    Unhandled,
}

/// Actor runtime errors
#[derive(Error, Debug)]
pub enum ActorError {
    #[error("Failed to spawn actor {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Actor {0} is not running")]
    Disconnected(String),
    #[error("Actor {0} panicked")]
    Panicked(String),
}

/// Error returned by [`ActorHandle::request`]
#[derive(Error, Debug)]
pub enum DispatchError<E: std::error::Error + 'static> {
    /// The NF rejected the message
    #[error(transparent)]
    Nf(E),
    /// The message never reached the NF
    #[error(transparent)]
    Actor(#[from] ActorError),
}

/// Identity and run state shared by every NF
#[derive(Debug, Clone)]
pub struct NfInstance {
    nf_type: NfType,
    name: String,
    instance_id: String,
    running: bool,
}

impl NfInstance {
    /// Create an NF instance with a fresh instance id
    pub fn new(nf_type: NfType, name: impl Into<String>) -> Self {
        Self {
            nf_type,
            name: name.into(),
            instance_id: new_nf_instance_id(),
            running: false,
        }
    }

    pub fn nf_type(&self) -> NfType {
        self.nf_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        log::info!("[{}] Network Function started", self.name);
    }

    pub fn stop(&mut self) {
        self.running = false;
        log::info!("[{}] Network Function stopped", self.name);
    }
}

/// A network function that owns its state and reacts to typed messages
pub trait NetworkFunction: Send + 'static {
    type Error: std::error::Error + Send + 'static;

    fn instance(&self) -> &NfInstance;

    fn instance_mut(&mut self) -> &mut NfInstance;

    /// Handle one message, mutating only this NF's own state
    fn dispatch(&mut self, envelope: &Envelope) -> Result<Dispatch, Self::Error>;

    fn nf_type(&self) -> NfType {
        self.instance().nf_type()
    }

    fn name(&self) -> &str {
        self.instance().name()
    }

    fn instance_id(&self) -> &str {
        self.instance().instance_id()
    }

    fn is_running(&self) -> bool {
        self.instance().is_running()
    }

    fn start(&mut self) {
        self.instance_mut().start();
    }

    fn stop(&mut self) {
        self.instance_mut().stop();
    }

    /// One-line status
    fn status(&self) -> String {
        format!(
            "{} ({})",
            self.name(),
            if self.is_running() { "Running" } else { "Stopped" }
        )
    }
}

type CallFn<N> = Box<dyn FnOnce(&mut N) + Send>;

enum Command<N: NetworkFunction> {
    Deliver {
        envelope: Envelope,
        reply: Option<mpsc::Sender<Result<Dispatch, N::Error>>>,
    },
    Call(CallFn<N>),
    Stop,
}

/// Terminates the mailbox when the actor thread exits, including by panic
struct TerminateOnExit<N: NetworkFunction>(Arc<Mailbox<Command<N>>>);

impl<N: NetworkFunction> Drop for TerminateOnExit<N> {
    fn drop(&mut self) {
        self.0.terminate();
    }
}

/// Handle to an NF running on its own thread
pub struct ActorHandle<N: NetworkFunction> {
    name: String,
    nf_type: NfType,
    instance_id: String,
    mailbox: Arc<Mailbox<Command<N>>>,
    next_message_id: AtomicU32,
    thread: Option<JoinHandle<N>>,
}

impl<N: NetworkFunction> ActorHandle<N> {
    /// Start the NF and move it onto a dedicated thread draining its mailbox
    pub fn spawn(mut nf: N) -> Result<Self, ActorError> {
        let name = nf.name().to_string();
        let nf_type = nf.nf_type();
        let instance_id = nf.instance_id().to_string();
        let mailbox: Arc<Mailbox<Command<N>>> = Arc::new(Mailbox::new());

        let thread_mailbox = Arc::clone(&mailbox);
        let thread_name = name.clone();
        let thread = thread::Builder::new()
            .name(format!("nf-{}", name.to_lowercase()))
            .spawn(move || {
                let _guard = TerminateOnExit(Arc::clone(&thread_mailbox));
                nf.start();

                while let Some(command) = thread_mailbox.pop() {
                    match command {
                        Command::Deliver { envelope, reply } => {
                            log::debug!("[{}] Handling message: {}", thread_name, envelope);
                            let result = nf.dispatch(&envelope);
                            if let Err(e) = &result {
                                log::warn!("[{}] {} rejected: {}", thread_name, envelope, e);
                            }
                            if let Some(reply) = reply {
                                let _ = reply.send(result);
                            }
                        }
                        Command::Call(f) => f(&mut nf),
                        Command::Stop => break,
                    }
                }

                nf.stop();
                nf
            })
            .map_err(|source| ActorError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            nf_type,
            instance_id,
            mailbox,
            next_message_id: AtomicU32::new(0),
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nf_type(&self) -> NfType {
        self.nf_type
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Number of commands waiting in the mailbox
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    fn envelope(&self, source: u32, dest: u32, message: Message) -> Envelope {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        Envelope::new(message_id, source, dest, message)
    }

    fn push(&self, command: Command<N>) -> Result<(), ActorError> {
        self.mailbox
            .push(command)
            .map_err(|_| ActorError::Disconnected(self.name.clone()))
    }

    /// Enqueue a message without waiting for it to be handled.
    ///
    /// Returns the message id stamped on the envelope.
    pub fn post(&self, source: u32, dest: u32, message: Message) -> Result<u32, ActorError> {
        let envelope = self.envelope(source, dest, message);
        let message_id = envelope.message_id;
        self.push(Command::Deliver {
            envelope,
            reply: None,
        })?;
        Ok(message_id)
    }

    /// Enqueue a message and wait for the dispatch result
    pub fn request(
        &self,
        source: u32,
        dest: u32,
        message: Message,
    ) -> Result<Dispatch, DispatchError<N::Error>> {
        let (tx, rx) = mpsc::channel();
        let envelope = self.envelope(source, dest, message);
        self.push(Command::Deliver {
            envelope,
            reply: Some(tx),
        })?;

        match rx.recv() {
            Ok(result) => result.map_err(DispatchError::Nf),
            Err(_) => Err(ActorError::Disconnected(self.name.clone()).into()),
        }
    }

    /// Run a closure against the NF on its own thread and return the result
    pub fn call<R, F>(&self, f: F) -> Result<R, ActorError>
    where
        R: Send + 'static,
        F: FnOnce(&mut N) -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.push(Command::Call(Box::new(move |nf: &mut N| {
            let _ = tx.send(f(nf));
        })))?;

        rx.recv()
            .map_err(|_| ActorError::Disconnected(self.name.clone()))
    }

    /// Stop the NF and take its state back
    pub fn shutdown(mut self) -> Result<N, ActorError> {
        let Some(thread) = self.thread.take() else {
            return Err(ActorError::Disconnected(self.name.clone()));
        };

        // A terminated mailbox means the thread is already gone; join reports how
        let _ = self.mailbox.push(Command::Stop);
        thread
            .join()
            .map_err(|_| ActorError::Panicked(self.name.clone()))
    }
}

impl<N: NetworkFunction> Drop for ActorHandle<N> {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.mailbox.push(Command::Stop);
            if thread.join().is_err() {
                log::error!("[{}] Actor thread panicked", self.name);
            }
        }
    }
}
