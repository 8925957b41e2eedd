use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use composer_core::email::{AttachmentSource, BasicEmail, SmtpSender, StaticTemplateProvider};
use composer_core::{
    telemetry, CancellationSource, Config, Culture, EmailComposer, TemplateProvider,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "composer-core")]
#[command(about = "Compose templated emails and deliver them over SMTP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a template for one recipient and send it
    Send {
        /// Recipient address, `user@example.com` or `Name <user@example.com>`
        #[arg(long)]
        to: String,

        /// Template identifier from the catalogue
        #[arg(long)]
        template: String,

        /// Culture tag such as `fr-FR`; defaults to COMPOSER_DEFAULT_CULTURE
        #[arg(long)]
        culture: Option<Culture>,

        /// Template variable as `key=value`; values that parse as JSON are kept typed
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, Value)>,

        /// File to attach as `path` or `path:type/subtype`
        #[arg(long = "attach")]
        attachments: Vec<AttachmentSource>,
    },
}

fn parse_var(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))?;
    if key.is_empty() {
        return Err("variable name is empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments before touching the environment so `--help` always works
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let prometheus = telemetry::init(&config.telemetry)?;

    let result = match cli.command {
        Command::Send {
            to,
            template,
            culture,
            vars,
            attachments,
        } => send(&config, to, template, culture, vars, attachments).await,
    };

    if let Some(handle) = prometheus {
        print!("{}", handle.render());
    }

    result
}

async fn send(
    config: &Config,
    to: String,
    template: String,
    culture: Option<Culture>,
    vars: Vec<(String, Value)>,
    attachments: Vec<AttachmentSource>,
) -> Result<()> {
    let templates_path = config
        .templates_path
        .as_ref()
        .context("COMPOSER_TEMPLATES_PATH is not set")?;
    let provider: Arc<dyn TemplateProvider<Id = String>> =
        Arc::new(StaticTemplateProvider::load(templates_path).await?);
    let sender = SmtpSender::from_config(&config.smtp).context("Invalid SMTP configuration")?;

    let composer = EmailComposer::new(provider, Arc::new(sender))
        .with_default_culture(config.default_culture.clone());

    let mut email = BasicEmail::new(template);
    if !vars.is_empty() {
        email = email.with_data(Value::Object(vars.into_iter().collect::<Map<_, _>>()));
    }
    for source in attachments {
        email = email.with_attachment(source);
    }

    let source = CancellationSource::new();
    let cancel = source.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            source.cancel();
        }
    });

    info!(to = %to, "Sending email");
    composer
        .compose_to(&to, &email, culture.as_ref(), &cancel)
        .await?;
    info!("Done");

    Ok(())
}
