use thiserror::Error;

/// Fatal construction-time failures.
///
/// Everything here means the engine cannot exist at all; nothing in this
/// enum is ever produced after construction succeeds.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The engine's own base root could not be derived from the given
    /// origin, and no explicit base was supplied.
    #[error("cannot determine own base location from `{0}`")]
    SelfLocation(String),
    /// A required builder piece was never supplied.
    #[error("engine builder is missing a {0}")]
    Missing(&'static str),
}

/// Failure surface of the host's bytes-to-unit definition step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefineError {
    /// A unit of this name already exists in the definer. Loading recovers
    /// from this by adopting the existing unit; it only escapes when no
    /// existing unit can be located.
    #[error("unit `{0}` is already defined")]
    AlreadyDefined(String),
    /// The definer refused the bytes outright. Never recovered.
    #[error("definition of unit `{0}` rejected: {1}")]
    Rejected(String, String),
}

/// Unit-loading failures.
#[derive(Error, Debug)]
pub enum LoadError {
    /// No byte source anywhere in the chain. The only expected failure;
    /// read-time I/O errors degrade to it rather than surfacing.
    #[error("no loadable unit named `{0}`")]
    NotFound(String),
    /// A definition failure that survived the recovery path, meaning a
    /// genuinely conflicting or corrupt redefinition rather than a race.
    #[error(transparent)]
    Definition(#[from] DefineError),
}

impl LoadError {
    /// The unit name the failure is about.
    pub fn unit_name(&self) -> &str {
        match self {
            LoadError::NotFound(name) => name,
            LoadError::Definition(DefineError::AlreadyDefined(name)) => name,
            LoadError::Definition(DefineError::Rejected(name, _)) => name,
        }
    }
}
