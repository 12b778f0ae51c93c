use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use parla_lib::recall::{RecallScheduler, SystemClock};
use parla_lib::{FileStore, Settings};

/// Shared application state for CLI commands
pub struct App {
    pub data_dir: PathBuf,
    pub settings: Settings,
    pub scheduler: Arc<RecallScheduler>,
}

impl App {
    /// Initialize from the default data directory
    ///
    /// `sheet` overrides the sheet selected in settings for this run only.
    pub fn new(sheet: Option<&str>) -> Result<Self> {
        let data_dir = FileStore::default_data_dir().context("Failed to get data directory")?;

        let settings = Settings::load(&data_dir).context("Failed to load settings")?;
        let ladder = settings.ladder().context("Invalid stop ladder in settings")?;

        let store =
            FileStore::open(data_dir.clone()).context("Failed to initialize recall storage")?;

        let sheet = sheet.unwrap_or(&settings.current_sheet).to_string();
        let scheduler = RecallScheduler::new(
            Arc::new(store),
            Arc::new(ladder),
            Arc::new(SystemClock),
            &sheet,
        );

        Ok(Self {
            data_dir,
            settings,
            scheduler: Arc::new(scheduler),
        })
    }

    /// Make `sheet` the default for future runs
    pub fn use_sheet(&mut self, sheet: &str) -> Result<()> {
        self.settings.current_sheet = sheet.to_string();
        self.settings.save(&self.data_dir).context("Failed to save settings")?;
        Ok(())
    }

    /// Sheets that have stored recall progress
    pub fn list_sheets(&self) -> Result<Vec<String>> {
        let store =
            FileStore::open(self.data_dir.clone()).context("Failed to open recall storage")?;
        let keys = store.keys().context("Failed to list recall storage")?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix("recall_items_").map(str::to_string))
            .collect())
    }
}
