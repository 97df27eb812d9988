//! Mapper configuration.

/// How an entity with more than one `#[orm(pk)]` field is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimaryKeyPolicy {
    /// Fail with `OrmError::AmbiguousPrimaryKey`.
    #[default]
    Reject,
    /// Use the last tagged field, matching older mappers that silently
    /// overwrote the key while scanning fields.
    LastWins,
}

/// Configuration for [`Mapper`](crate::Mapper).
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Primary-key resolution policy used when describing entities.
    pub primary_key_policy: PrimaryKeyPolicy,
    /// Whether to emit `tracing` events for executed statements.
    pub logging_enabled: bool,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            primary_key_policy: PrimaryKeyPolicy::Reject,
            logging_enabled: true,
            max_sql_length: Some(200),
        }
    }
}

impl MapperConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary-key resolution policy.
    pub fn primary_key_policy(mut self, policy: PrimaryKeyPolicy) -> Self {
        self.primary_key_policy = policy;
        self
    }

    /// Resolve ambiguous primary keys by taking the last tagged field.
    pub fn legacy_primary_keys(mut self) -> Self {
        self.primary_key_policy = PrimaryKeyPolicy::LastWins;
        self
    }

    /// Enable statement logging.
    pub fn with_logging(mut self) -> Self {
        self.logging_enabled = true;
        self
    }

    /// Disable statement logging.
    pub fn no_logging(mut self) -> Self {
        self.logging_enabled = false;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while !sql.is_char_boundary(end) {
                    end -= 1;
                }
                std::borrow::Cow::Owned(format!("{}...", &sql[..end]))
            }
            _ => std::borrow::Cow::Borrowed(sql),
        }
    }
}
