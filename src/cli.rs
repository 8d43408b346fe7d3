use anyhow::{Context as _, Result, anyhow};
use chrono::Utc;
use itertools::Itertools;
use rusqlite::Connection;

use crate::badges::BadgeCatalog;
use crate::config::Config;
use crate::models::{BadgeCategory, PlayerStats};
use crate::swagent::{http::Request, reminder, runtime::AgentHandle};
use crate::xwdb;

const MAX_CMD_LENGTH: usize = 12;

/// What every command gets to work with.
pub struct Context {
    pub config: Config,
    pub db: Connection,
    pub agent: AgentHandle,
}

struct CommandInstance<'a> {
    ctx: &'a mut Context,
    parameters: &'a [String],
}

pub struct Commands;
impl Commands {
    /// Runs `args` (command first, then its parameters) and returns what to print.
    pub async fn run_command(ctx: &mut Context, args: &[String]) -> Result<String> {
        let Some((command, parameters)) = args.split_first() else {
            return Ok(Self::get_help());
        };

        let mut cmd = CommandInstance { ctx, parameters };

        let result: String = match command.as_str() {
              "badges" => cmd.badges()?,
            "evaluate" => cmd.evaluate()?,
              "earned" => cmd.earned()?,
             "install" => cmd.install().await?,
            "activate" => cmd.activate().await?,
               "fetch" => cmd.fetch().await?,
                "push" => cmd.push().await?,
              "remind" => cmd.remind().await?,
                "help" => Self::get_help(),
            _ => {
                if Commands::is_valid_cmd(command) {
                    log::info!("User submitted unknown command: {}", command);
                    return Err(anyhow!("No such command found: {}, see `help` for commands.", command));
                } else {
                    log::info!("User submitted invalid command: {}", command);
                    return Err(anyhow!("Invalid command syntax."));
                }
            }
        };

        Ok(result)
    }

    /// Ensures that the string slice conforms to C-like identifier regex
    fn is_valid_cmd(s: &str) -> bool {
        s.len() <= MAX_CMD_LENGTH
            && regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").is_ok_and(|re| re.is_match(s))
    }

    /// Gets a help string. Should be updated after a new command is added
    pub fn get_help() -> String {
        String::from(
r#"
**Command List:**
`badges [category]`:  List badge definitions, optionally for one category.
`evaluate <player> <stats.json>`:  Award any badges a stats snapshot newly qualifies for.
`earned <player>`:  List the badges a player holds.
`install`:  Precache the crossword shell for the current cache version.
`activate`:  Drop caches from older versions and start serving requests.
`fetch <url>`:  Serve a request through the offline agent.
`push [json]`:  Show a push notification, with an optional JSON payload.
`remind`:  Send the daily reminder pushes on schedule. Runs until stopped.
`help`:  Get information on supported commands
"#)
    }
}

impl CommandInstance<'_> {
    fn parameter(&self, index: usize, what: &str) -> Result<&str> {
        self.parameters
            .get(index)
            .map(String::as_str)
            .with_context(|| format!("Expected {what}, got none."))
    }

    fn badges(&self) -> Result<String> {
        let catalog = BadgeCatalog::standard();
        let categories = match self.parameters.first() {
            Some(category) => vec![category.parse::<BadgeCategory>()?],
            None => BadgeCategory::ALL.to_vec(),
        };

        Ok(categories
            .into_iter()
            .map(|category| {
                format!(
                    "**{category}**\n{}",
                    catalog.by_category(category).iter().map(|badge| badge.to_string()).join("\n")
                )
            })
            .join("\n\n"))
    }

    fn evaluate(&mut self) -> Result<String> {
        let player = self.parameter(0, "player name for evaluate")?.to_string();
        let path = self.parameter(1, "path to a stats JSON file")?;

        let raw = std::fs::read_to_string(path).with_context(|| format!("No such file or directory: {path}"))?;
        let stats = PlayerStats::from_json(&raw)?;

        let catalog = BadgeCatalog::standard();
        let recorded = xwdb::record_new_badges(&mut self.ctx.db, catalog, &player, &stats, Utc::now())?;
        if recorded.is_empty() {
            return Ok(format!("No new badges for {player}."));
        }

        Ok(format!(
            "**New badges for {player}:**\n{}",
            catalog.hydrate(&recorded).iter().map(|badge| badge.to_string()).join("\n")
        ))
    }

    fn earned(&self) -> Result<String> {
        let player = self.parameter(0, "player name for earned")?;
        let earned = xwdb::query_earned(&self.ctx.db, player)?;
        let hydrated = BadgeCatalog::standard().hydrate(&earned);
        if hydrated.is_empty() {
            return Ok(format!("{player} has no badges yet."));
        }

        Ok(format!(
            "**{player}'s badges ({}):**\n{}",
            hydrated.len(),
            hydrated.iter().map(|badge| badge.to_string()).join("\n")
        ))
    }

    async fn install(&self) -> Result<String> {
        self.ctx.agent.install().await?;
        Ok(format!(
            "Installed {} shell assets into {}.",
            self.ctx.config.shell_assets.len(),
            self.ctx.config.cache_name()
        ))
    }

    async fn activate(&self) -> Result<String> {
        let purged = self.ctx.agent.activate().await?;
        let mut output = format!("{} is active.", self.ctx.config.cache_name());
        if !purged.is_empty() {
            output += &format!("\nDeleted old caches: {}", purged.join(", "));
        }
        Ok(output)
    }

    async fn fetch(&self) -> Result<String> {
        let url = self.parameter(0, "URL for fetch")?;
        let request = Request::parse(url)?;

        Ok(match self.ctx.agent.fetch(request).await? {
            Some(response) => response.to_string(),
            None => format!("Not intercepted; {url} goes straight to the network."),
        })
    }

    async fn push(&self) -> Result<String> {
        let raw = self.parameters.join(" ");
        let payload = (!raw.is_empty()).then(|| raw.into_bytes());
        let notification = self.ctx.agent.push(payload).await?;
        Ok(notification.to_string())
    }

    async fn remind(&self) -> Result<String> {
        reminder::run_reminders(
            self.ctx.agent.clone(),
            self.ctx.config.reminder_hour,
            self.ctx.config.streak_warning_hour,
        )
        .await?;
        Ok(String::new())
    }
}
