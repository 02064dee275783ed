use std::fmt;

use crate::game::outcome::{GameOutcome, OutcomeClass};

/// Outcomes of all the library files grouped by class
///
/// Items are identified as `{game name}: {filename}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySummary {
    pub success: Vec<String>,
    pub skipped: Vec<String>,

    /// Files which couldn't be downloaded, see `errors.txt`
    pub errors: Vec<String>,

    /// Files which failed verification
    pub failures: Vec<String>,

    /// Files or games failed with unexpected errors
    pub exceptions: Vec<String>
}

impl LibrarySummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a GameOutcome>) -> Self {
        let mut summary = Self::default();

        for game in outcomes {
            for file in &game.files {
                summary.add(format!("{}: {}", game.name, file.filename), file.outcome.class());
            }
        }

        summary
    }

    pub fn add(&mut self, identifier: String, class: OutcomeClass) {
        match class {
            OutcomeClass::Success => self.success.push(identifier),
            OutcomeClass::Skipped => self.skipped.push(identifier),
            OutcomeClass::RecoverableError => self.errors.push(identifier),
            OutcomeClass::IntegrityFailure => self.failures.push(identifier),
            OutcomeClass::Exception => self.exceptions.push(identifier)
        }
    }

    #[inline]
    pub fn failed_count(&self) -> usize {
        self.errors.len() + self.failures.len() + self.exceptions.len()
    }

    /// Identifiers of all the failed items
    pub fn failed(&self) -> impl Iterator<Item = &String> {
        self.errors.iter()
            .chain(self.failures.iter())
            .chain(self.exceptions.iter())
    }

    /// Whether the whole library was downloaded without failures
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn log(&self) {
        for item in self.failed() {
            tracing::debug!("Failed: {item}");
        }

        if !self.errors.is_empty() {
            tracing::warn!("See `errors.txt` for more information");
        }

        if self.is_success() {
            tracing::info!("{self}");
        } else {
            tracing::warn!("{self}");
        }
    }
}

impl fmt::Display for LibrarySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File download summary: Downloaded({}) Skipped({}) Failed({})",
            self.success.len(),
            self.skipped.len(),
            self.failed_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::game::outcome::{DownloadOutcome, FileOutcome};

    fn game(name: &str, outcomes: Vec<DownloadOutcome>) -> GameOutcome {
        GameOutcome {
            name: name.to_string(),
            files: outcomes.into_iter()
                .enumerate()
                .map(|(i, outcome)| FileOutcome::new(format!("file-{i}"), outcome))
                .collect()
        }
    }

    #[test]
    fn failed_library() {
        let outcomes = [
            game("A", vec![
                DownloadOutcome::Success { verified: true },
                DownloadOutcome::SkippedExisting,
                DownloadOutcome::HttpError { status: Some(503), reason: String::from("Service Unavailable") }
            ]),
            game("B", vec![DownloadOutcome::Success { verified: false }])
        ];

        let summary = LibrarySummary::from_outcomes(&outcomes);

        assert!(!summary.is_success());
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.success.len(), 2);
        assert_eq!(summary.skipped, vec![String::from("A: file-1")]);
        assert_eq!(summary.failed().collect::<Vec<_>>(), vec!["A: file-2"]);
        assert_eq!(summary.to_string(), "File download summary: Downloaded(2) Skipped(1) Failed(1)");
    }

    #[test]
    fn successful_library() {
        let outcomes = [
            game("A", vec![DownloadOutcome::Success { verified: true }, DownloadOutcome::SkippedExisting]),
            game("B", vec![DownloadOutcome::SkippedExisting]),
            game("C", vec![])
        ];

        let summary = LibrarySummary::from_outcomes(&outcomes);

        assert!(summary.is_success());
        assert_eq!(summary.failed_count(), 0);
    }

    #[test]
    fn count_every_failure_class() {
        let outcomes = [game("A", vec![
            DownloadOutcome::NoDownloadAvailable,
            DownloadOutcome::HashMismatch { expected: String::from("a"), got: String::from("b") },
            DownloadOutcome::InvalidResponseData(String::from("no uuid")),
            DownloadOutcome::Unexpected(anyhow::anyhow!("boom"))
        ])];

        let summary = LibrarySummary::from_outcomes(&outcomes);

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.exceptions.len(), 1);
        assert_eq!(summary.failed_count(), 4);
        assert!(!summary.is_success());
    }
}
