use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChosenInlineResult, InlineQuery};
use tgmedia_bot::bot::handlers::{self, Command};
use tgmedia_bot::config::Settings;
use tgmedia_bot::pipeline::deliver::Coordinator;
use tgmedia_bot::pipeline::fetch::YtDlp;
use tgmedia_bot::pipeline::format;
use tgmedia_bot::prefs::PrefStore;
use tgmedia_bot::runner::JobRunner;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting bot tokens from log output
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting tgmedia bot...");

    let settings = init_settings();

    // Probed once; tool availability only changes across process restarts
    let can_mux = format::muxing_available();
    if can_mux {
        info!("ffmpeg found, separate video+audio streams will be merged");
    } else {
        warn!("ffmpeg not found, falling back to single-file formats");
    }

    let bot = Bot::new(settings.bot_token.clone());
    let coordinator = Arc::new(Coordinator::new(Arc::new(YtDlp), settings, can_mux));
    let prefs = Arc::new(PrefStore::new());
    let runner = JobRunner::new();

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![coordinator, prefs, runner])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some())
                .endpoint(handle_text),
        )
        .branch(Update::filter_inline_query().endpoint(handle_inline_query))
        .branch(Update::filter_chosen_inline_result().endpoint(handle_chosen))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    prefs: Arc<PrefStore>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(&bot, &msg).await,
        Command::Settings => handlers::settings_cmd(&bot, &msg, &prefs).await,
    };
    if let Err(e) = res {
        error!("Command error: {:#}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    prefs: Arc<PrefStore>,
    runner: JobRunner,
    coordinator: Arc<Coordinator>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(&bot, &msg, &prefs, runner, coordinator).await {
        error!("Text handler error: {:#}", e);
    }
    respond(())
}

async fn handle_inline_query(
    bot: Bot,
    query: InlineQuery,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_inline_query(&bot, &query).await {
        error!("Inline query handler error: {:#}", e);
    }
    respond(())
}

async fn handle_chosen(
    bot: Bot,
    chosen: ChosenInlineResult,
    prefs: Arc<PrefStore>,
    runner: JobRunner,
    coordinator: Arc<Coordinator>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_chosen(&chosen, &bot, &prefs, runner, coordinator).await {
        error!("Chosen inline result handler error: {:#}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    query: CallbackQuery,
    prefs: Arc<PrefStore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_callback(&bot, &query, &prefs).await {
        error!("Callback handler error: {:#}", e);
    }
    respond(())
}
