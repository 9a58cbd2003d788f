#![deny(missing_docs)]
//! Standardized initialization shared by the feedback entrypoint crates.
//! Provides consistent tracing configuration across binaries

mod environment;

pub use environment::{ENVIRONMENT_VAR, Environment, EnvironmentErr, UnknownValue};
use tracing_subscriber::EnvFilter;

/// Defines how a binary is initialized
#[derive(Debug)]
pub struct FeedbackEntrypoint {
    env: Environment,
}

impl Default for FeedbackEntrypoint {
    fn default() -> Self {
        FeedbackEntrypoint {
            env: Environment::new_or_prod(),
        }
    }
}

/// sentinel struct which guarantees that we called [FeedbackEntrypoint::init]
#[derive(Debug)]
pub struct InitializedEntrypoint {
    env: Environment,
}

impl InitializedEntrypoint {
    /// the environment the binary was initialized for
    pub fn environment(&self) -> Environment {
        self.env
    }
}

impl FeedbackEntrypoint {
    /// create a new instance of [Self] from an input [Environment]
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// consume self, initialize this binary, and return a proof that it was initialized [InitializedEntrypoint]
    pub fn init(self) -> InitializedEntrypoint {
        dotenv::dotenv().ok();
        std::panic::set_hook(Box::new(tracing_panic::panic_hook));

        match self.env {
            Environment::Local => {
                tracing_subscriber::fmt()
                    .with_ansi(true)
                    .with_env_filter(EnvFilter::from_default_env())
                    .with_file(true)
                    .with_line_number(true)
                    .pretty()
                    .init();
            }
            Environment::Production | Environment::Develop => {
                // lambda already prefixes every line with a timestamp
                tracing_subscriber::fmt()
                    .with_ansi(false)
                    .with_env_filter(EnvFilter::from_default_env())
                    .with_file(true)
                    .with_line_number(true)
                    .without_time()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(true)
                    .init();
            }
        }

        InitializedEntrypoint { env: self.env }
    }
}
