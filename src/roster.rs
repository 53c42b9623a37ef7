//! File-backed widget owner used by the CLI harness.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::BotRecord;
use crate::widget::WidgetOwner;

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RosterFile {
    #[serde(default)]
    bots: Vec<BotRecord>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

/// Widget owner persisted as a JSON roster file, the CLI's stand-in for a
/// page's widget manager. `silent` suppresses the render printout so JSON
/// output stays clean.
#[derive(Debug)]
pub struct RosterOwner {
    path: PathBuf,
    bots: RwLock<Vec<BotRecord>>,
    silent: bool,
}

impl RosterOwner {
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".botdock-roster.json"))
    }

    /// Load the roster at `path`. A missing file is an empty roster, not an
    /// error; a present-but-unreadable one is.
    pub fn load(path: PathBuf, silent: bool) -> Result<Self> {
        let bots = if path.exists() {
            let mut raw = fs::read(&path).context("Failed to read roster file")?;
            let file: RosterFile =
                simd_json::from_slice(&mut raw).context("Failed to parse roster file")?;
            file.bots
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            bots: RwLock::new(bots),
            silent,
        })
    }

    /// Write a fresh empty roster at `path`, replacing whatever was there.
    pub fn create(path: PathBuf, silent: bool) -> Result<Self> {
        let owner = Self {
            path,
            bots: RwLock::new(Vec::new()),
            silent,
        };
        owner.write_file()?;
        Ok(owner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self) -> Result<()> {
        let file = RosterFile {
            bots: self.bots.read().clone(),
            saved_at: Some(Utc::now()),
        };
        let content = simd_json::to_string_pretty(&file).context("Failed to serialize roster")?;

        fs::write(&self.path, content).context("Failed to write roster file")?;

        Ok(())
    }
}

#[async_trait]
impl WidgetOwner for RosterOwner {
    fn bots(&self) -> Vec<BotRecord> {
        self.bots.read().clone()
    }

    fn replace_bots(&self, bots: Vec<BotRecord>) {
        *self.bots.write() = bots;
    }

    async fn save_bots(&self) -> Result<()> {
        self.write_file()
    }

    fn render_experts(&self) {
        if self.silent {
            return;
        }

        let bots = self.bots.read();
        if bots.is_empty() {
            println!("🤖 No experts configured");
            return;
        }

        println!("🤖 Experts ({}):", bots.len());
        for bot in bots.iter() {
            let name = bot.name.as_deref().unwrap_or(&bot.id);
            let marker = if bot.is_default == Some(true) {
                " (default)"
            } else {
                ""
            };
            println!("   • {} [{}]{}", name, bot.chatbase_id, marker);
        }
    }
}
