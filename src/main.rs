//! asif-bot - a small demonstration bot built on the asif framework.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use asif::{Client, ClientConfig, Context, Event};
use regex::Regex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "bot.toml".to_string());

    let config = ClientConfig::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        host = %config.host,
        port = config.port,
        nick = %config.nick,
        tls = config.tls,
        "Starting asif-bot"
    );

    let mut client = Client::new(config)?;
    register_handlers(&mut client)?;

    client.run().await.map_err(|e| {
        error!(error = %e, code = e.error_code(), "Bot stopped");
        e
    })?;

    info!("Bot exited cleanly");
    Ok(())
}

fn register_handlers(client: &mut Client) -> anyhow::Result<()> {
    // Minutes since registration, advanced by a background ticker.
    let minutes = Arc::new(AtomicU64::new(0));

    let ticks = Arc::clone(&minutes);
    client.on_connected(move |ctx: Context| {
        let ticks = Arc::clone(&ticks);
        async move {
            ticks.store(0, Ordering::Relaxed);
            let handle = ctx.handle().clone();
            ctx.spawn("uptime-ticker", async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                interval.tick().await;
                while handle.is_connected() {
                    interval.tick().await;
                    ticks.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            });
            Ok(())
        }
    });

    client.on_message(Regex::new(r"^!ping\b")?, |ctx: Context| async move {
        ctx.reply("pong").await?;
        Ok(())
    });

    client.on_message(Regex::new(r"^!join (?P<channel>\S+)")?, |ctx: Context| async move {
        if let Some(channel) = ctx.capture("channel") {
            ctx.handle().join(channel).await?;
        }
        Ok(())
    });

    let uptime = Arc::clone(&minutes);
    client.on_message(Regex::new(r"^!uptime\b")?, move |ctx: Context| {
        let uptime = Arc::clone(&uptime);
        async move {
            let minutes = uptime.load(Ordering::Relaxed);
            ctx.reply(&format!("up {} minute{}", minutes, if minutes == 1 { "" } else { "s" }))
                .await?;
            Ok(())
        }
    });

    client.on_join(None, |ctx: Context| async move {
        if let Some(channel) = ctx.channel() {
            let users = ctx.handle().users(channel).map_or(0, |users| users.len());
            info!(channel = %channel, users, "In channel");
        }
        Ok(())
    });

    client.on_message(Regex::new(r"^!quit\b")?, |ctx: Context| async move {
        info!(by = ctx.sender().unwrap_or("?"), "Quit requested");
        ctx.handle().quit(Some("bye")).await?;
        Ok(())
    });

    client.on_disconnected(|ctx: Context| async move {
        if let Event::Disconnected { reason: Some(reason) } = ctx.event() {
            info!(reason = %reason, "Disconnected");
        }
        Ok(())
    });

    Ok(())
}
