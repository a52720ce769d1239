use crate::clipboard::copy_to_clipboard;
use crate::interrupt::InterruptRouter;
use crate::wiring::Services;
use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};
use domain::models::{Answer, FailureKind};
use domain::session::Session;
use infrastructure::config::Config;
use serde_json::{json, Value};
use application::ingest_service::IngestReport;
use shared::confirmation::confirm_recreate;
use shared::types::Result;
use std::path::PathBuf;

const WELCOME: &str =
    "Hello! I'm the technical-support assistant. Ask me anything about our procedures.";

#[derive(Parser)]
#[command(name = "helpdesk", version)]
#[command(about = "Technical-support assistant that answers from your knowledge base")]
pub struct Cli {
    /// Log filter, e.g. `info` or `application=debug`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Ask a single question
    Ask {
        /// Copy the answer to the clipboard
        #[arg(long)]
        copy: bool,

        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Interactive chat with follow-up questions
    Chat,
    /// Index a file or directory of documents, or the Azure DevOps Wiki
    Ingest {
        #[arg(required_unless_present = "wiki")]
        path: Option<PathBuf>,

        /// Read pages from the configured Azure DevOps Wiki instead of files
        #[arg(long, conflicts_with = "path")]
        wiki: bool,

        /// Drop and rebuild the index first
        #[arg(long)]
        recreate: bool,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Call a tool on the MCP server
    Tool {
        name: String,

        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
    },
    /// List the tools the MCP server offers
    Tools,
}

pub struct CliApp {
    services: Services,
    interrupts: InterruptRouter,
}

impl CliApp {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            services: Services::from_config(config)?,
            interrupts: InterruptRouter::default(),
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        let watcher = self.interrupts.spawn_watcher();
        let result = match command {
            Command::Ask { question, copy } => self.handle_ask(&question.join(" "), copy).await,
            Command::Chat => self.handle_chat().await,
            Command::Ingest {
                path,
                wiki,
                recreate,
                yes,
            } => self.handle_ingest(path, wiki, recreate, yes).await,
            Command::Tool { name, args } => self.handle_tool(&name, args.as_deref()).await,
            Command::Tools => self.handle_tools().await,
        };
        watcher.abort();
        self.services.shutdown().await;
        result
    }

    async fn handle_ask(&self, question: &str, copy: bool) -> Result<()> {
        let answer = self.ask_once(question).await;
        print_answer(&answer);
        if copy {
            if let Err(err) = copy_to_clipboard(&answer.text) {
                eprintln!("{} {}", "Clipboard copy failed:".red(), err);
            }
        }
        Ok(())
    }

    async fn handle_chat(&self) -> Result<()> {
        println!("{}", WELCOME.green());
        println!("Type 'exit' to quit.");
        let mut session = Session::new(format!("chat-{}", std::process::id()));
        loop {
            let input: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("You")
                .interact_text()?;
            let input = input.trim();
            if input.eq_ignore_ascii_case("exit") {
                break;
            }

            let resolved = session.resolve(input);
            if let Some(topic) = &resolved.follow_up_topic {
                println!("{}", format!("Continuing on '{topic}'...").cyan());
            }
            session.add_message("user", input);
            let answer = self.ask_once(&resolved.text).await;
            let found_documents = answer.failure() != Some(FailureKind::NoRelevantDocuments);
            session.record_turn(input, &resolved, found_documents);
            session.add_message("assistant", &answer.text);
            print_answer(&answer);
        }
        Ok(())
    }

    async fn handle_ingest(
        &self,
        path: Option<PathBuf>,
        wiki: bool,
        recreate: bool,
        yes: bool,
    ) -> Result<()> {
        // Fail on missing wiki settings before anything is dropped.
        let wiki_source = if wiki {
            Some(self.services.wiki_source()?)
        } else {
            None
        };
        if recreate && !confirm_recreate(&self.services.index_label, yes)? {
            println!("{}", "Ingest cancelled.".yellow());
            return Ok(());
        }
        let report = match (wiki_source, path) {
            (Some(source), _) => {
                eprintln!("{}", "Indexing the wiki...".cyan());
                self.services.ingest.ingest_wiki(&source, recreate).await?
            }
            (None, Some(path)) => {
                eprintln!("{}", format!("Indexing {}...", path.display()).cyan());
                self.services.ingest.ingest(path, recreate).await?
            }
            (None, None) => anyhow::bail!("pass a path or --wiki"),
        };
        print_report(&report);
        Ok(())
    }

    async fn handle_tool(&self, name: &str, args: Option<&str>) -> Result<()> {
        let args = parse_tool_args(args)?;
        let output = self.services.tools.run(name, args).await;
        println!("{output}");
        Ok(())
    }

    async fn handle_tools(&self) -> Result<()> {
        if !self.services.tools.check().await {
            println!("{}", "The tool service is offline.".yellow());
            return Ok(());
        }
        let tools = self.services.tools.list().await;
        if tools.is_empty() {
            println!("{}", "No tools available.".yellow());
            return Ok(());
        }
        for tool in tools {
            println!("{} {}", tool.name.green().bold(), tool.description);
        }
        Ok(())
    }

    /// Answer one question; Ctrl-C cancels the outstanding backend call.
    async fn ask_once(&self, question: &str) -> Answer {
        let cancel = self.interrupts.begin();
        let answer = self
            .services
            .orchestrator
            .answer_with_cancel(question, &cancel)
            .await;
        self.interrupts.finish();
        answer
    }
}

fn print_answer(answer: &Answer) {
    if answer.is_generated() {
        println!("{}", answer.text);
    } else {
        println!("{}", answer.text.yellow());
    }
}

fn print_report(report: &IngestReport) {
    println!(
        "{} {} sources scanned, {} unchanged, {} skipped, {} chunks indexed",
        "Done:".green().bold(),
        report.sources_scanned,
        report.sources_unchanged,
        report.sources_skipped,
        report.chunks_indexed
    );
}

fn parse_tool_args(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(json!({}));
    };
    let args: Value = serde_json::from_str(raw).context("--args must be valid JSON")?;
    anyhow::ensure!(args.is_object(), "--args must be a JSON object");
    Ok(args)
}
