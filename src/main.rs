use std::net::SocketAddr;
use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

use kritika::chatbot::{
    ConversationHandler, GeminiClient, GoogleTts, IncomingDoubt, Intake, ReplyGenerator, TelegramClient,
    VoiceSynthesizer, parse_intake,
};
use kritika::config::Config;
use kritika::liveness;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "kritika.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("kritika.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting Kritika...");
    info!("Loaded config from {config_path}");
    info!("Admin chat: {}, intake: {:?}", config.admin_chat_id, config.intake_mode);

    let bot = Bot::new(&config.telegram_bot_token);
    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => warn!("Failed to get bot info: {e}"),
    }

    let handler = Arc::new(build_handler(&config, &bot));

    let schema = Update::filter_message().endpoint(handle_message);
    let mut dispatcher = Dispatcher::builder(bot.clone(), schema)
        .dependencies(dptree::deps![handler])
        .enable_ctrlc_handler()
        .build();

    match config.webhook_url.clone() {
        Some(url) => {
            info!("Delivery: webhook at {url}");
            let options = webhooks::Options::new(config.listen_addr, url);
            let (listener, stop_flag, router) = match webhooks::axum_to_router(bot, options).await {
                Ok(parts) => parts,
                Err(e) => {
                    error!("Failed to register webhook: {e}");
                    std::process::exit(1);
                }
            };
            let app = router.merge(liveness::router());
            serve(config.listen_addr, app, stop_flag).await;

            dispatcher
                .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("Webhook listener error"))
                .await;
        }
        None => {
            info!("Delivery: long polling");
            serve(config.listen_addr, liveness::router(), std::future::pending()).await;
            dispatcher.dispatch().await;
        }
    }
}

fn build_handler(config: &Config, bot: &Bot) -> ConversationHandler {
    let model = Arc::new(GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone()));
    let speech = Arc::new(GoogleTts::new(config.tts_endpoint.clone()));

    ConversationHandler::new(
        config.handler_config(),
        Arc::new(TelegramClient::new(bot.clone())),
        ReplyGenerator::new(model, config.generation_timeout),
        VoiceSynthesizer::new(speech, config.voice_dir(), config.synthesis_timeout),
    )
}

/// Serve `app` on `addr` in the background until `shutdown` resolves.
async fn serve<F>(addr: SocketAddr, app: axum::Router, shutdown: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!("HTTP server error: {e}");
        }
    });
}

async fn handle_message(msg: Message, handler: Arc<ConversationHandler>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t,
        None => return Ok(()),
    };

    match parse_intake(text, handler.config().intake_mode) {
        Intake::Doubt(doubt) => {
            let handled = handler.handle(IncomingDoubt::from_telegram(&msg, doubt)).await;
            debug!("Chat {}: {:?}", msg.chat.id, handled);
        }
        Intake::Start => handler.handle_start(msg.chat.id.0).await,
        Intake::Skip => {}
    }

    Ok(())
}
