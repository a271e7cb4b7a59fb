use std::fmt::{Display, Formatter};

use batchline_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Stable identifier of one logical recurring job, used as its lease key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobName(NonEmptyString);

impl JobName {
    /// Creates a validated job name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value)?;

        if let Some(invalid) = value
            .as_str()
            .chars()
            .find(|character| !is_allowed_character(*character))
        {
            return Err(AppError::Validation(format!(
                "job name '{}' contains unsupported character '{invalid}'",
                value.as_str()
            )));
        }

        Ok(Self(value))
    }

    /// Derives a job name from a type-like name such as `Ci::ExpireArtifactsWorker`.
    ///
    /// Namespace separators become `/` and camel case becomes snake case, so the
    /// example above yields `ci/expire_artifacts_worker`.
    pub fn from_type_name(type_name: &str) -> AppResult<Self> {
        let segments = type_name
            .split("::")
            .map(|segment| snake_case(segment.trim()))
            .collect::<Vec<_>>();

        if segments.iter().any(String::is_empty) {
            return Err(AppError::Validation(format!(
                "type name '{type_name}' has an empty namespace segment"
            )));
        }

        Self::new(segments.join("/"))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for JobName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn is_allowed_character(character: char) -> bool {
    character.is_ascii_alphanumeric() || matches!(character, '_' | ':' | '-' | '.' | '/')
}

fn snake_case(value: &str) -> String {
    let characters: Vec<char> = value.chars().collect();
    let mut output = String::with_capacity(value.len() + 4);

    for (index, character) in characters.iter().copied().enumerate() {
        if character.is_ascii_uppercase() {
            let previous = index.checked_sub(1).and_then(|at| characters.get(at));
            let next = characters.get(index + 1);
            let starts_word = previous.is_some_and(|previous| {
                previous.is_ascii_lowercase()
                    || previous.is_ascii_digit()
                    || (previous.is_ascii_uppercase() && next.is_some_and(char::is_ascii_lowercase))
            });

            if starts_word {
                output.push('_');
            }
            output.push(character.to_ascii_lowercase());
        } else {
            output.push(character);
        }
    }

    output
}
