use anyhow::Context;
use config::RosterConfig;
use domain::models::{unique_connect_codes, ConnectCode};
use domain::repositories::{RosterError, RosterRepository};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CsvSource {
    Url(String),
    File(String),
}

impl CsvSource {
    fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_owned())
        } else {
            Self::File(location.to_owned())
        }
    }
}

/// Reads the roster from a CSV export of the roster spreadsheet.
#[derive(Debug, Clone)]
pub struct CsvRosterRepository {
    client: reqwest::Client,
    source: CsvSource,
    code_column: usize,
    skipped_rows: usize,
}

impl CsvRosterRepository {
    pub fn try_new(config: &RosterConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            source: CsvSource::parse(&config.csv_location),
            code_column: config.code_column,
            skipped_rows: config.skipped_rows,
        })
    }

    async fn read_csv(&self) -> anyhow::Result<String> {
        match &self.source {
            CsvSource::Url(url) => Ok(self
                .client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?),
            CsvSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read roster file {path}")),
        }
    }

    fn extract_codes(&self, csv_text: &str) -> anyhow::Result<Vec<ConnectCode>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_text.as_bytes());

        let cells = reader
            .records()
            .skip(self.skipped_rows)
            .map(|record| Ok(record?.get(self.code_column).map(ToOwned::to_owned)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(unique_connect_codes(cells.into_iter().flatten()))
    }
}

#[async_trait::async_trait]
impl RosterRepository for CsvRosterRepository {
    #[tracing::instrument(skip(self))]
    async fn list_players(&self) -> Result<Vec<ConnectCode>, RosterError> {
        let csv_text = self
            .read_csv()
            .await
            .map_err(RosterError::SourceUnavailable)?;

        self.extract_codes(&csv_text)
            .map_err(RosterError::SourceUnavailable)
    }
}
