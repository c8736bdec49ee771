// ABOUTME: Library root for the assessment console
// ABOUTME: Question distribution, workflow polling, workflow actions, and the backend client

pub mod actions;
pub mod config;
pub mod distribution;
pub mod error;
pub mod form;
pub mod poller;
pub mod remote;
pub mod steps;

pub use actions::{available_actions, WorkflowAction, WorkflowActions};
pub use config::ConsoleConfig;
pub use distribution::allocate;
pub use error::{ConsoleError, Result};
pub use poller::{DetailPollPolicy, DetailPoller, ListPoller, Phase, ViewState};
pub use remote::{RemoteClient, WorkflowApi};
