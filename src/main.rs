use std::collections::HashSet;
use std::error::Error;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use rust_room_chat::config;
use rust_room_chat::network::PlatformContext;
use rust_room_chat::room::{
    MessageFeed, MessageSide, RoomClient, RoomState, RoomView, Screen, SessionState,
};
use rust_room_chat::ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "rust_room_chat",
    version,
    about = "Real-time chat room client"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// SQLite file for the local platform
    #[arg(long, value_name = "FILE")]
    database: Option<String>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, PartialEq, Eq)]
enum Mode {
    /// Print the room to the terminal as it updates (no UI)
    Tail,
    /// Post a single message and exit
    Send { text: String },
    /// Write the effective configuration to the config path
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    app_config.apply_env_overrides();
    if let Some(path) = cli.database.clone() {
        app_config.database_path = path;
    }

    if cli.mode == Some(Mode::InitConfig) {
        config::save_config(&cli.config, &app_config)?;
        log::info!("Wrote configuration to {}", cli.config);
        return Ok(());
    }

    let platform = PlatformContext::connect(&app_config)?;
    let result = match cli.mode {
        Some(Mode::Tail) => run_tail(&platform).await,
        Some(Mode::Send { text }) => run_send(&platform, &text).await,
        _ => run_desktop(&platform).await,
    };
    platform.shutdown();
    result
}

fn mount_room(platform: &PlatformContext) -> RoomView {
    let session = SessionState::new(platform.identity());
    let feed = MessageFeed::new(platform.store());
    RoomView::mount(session, feed)
}

async fn run_desktop(platform: &PlatformContext) -> Result<(), Box<dyn Error>> {
    // UI -> Room
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Room -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    let room = tokio::spawn(RoomClient::new(mount_room(platform), event_tx, cmd_rx).run());

    log::info!("Starting desktop client on the {} platform", platform.name());
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Room Chat",
        options,
        Box::new(move |cc| Ok(Box::new(ChatApp::new(cc, cmd_tx, event_rx)))),
    )?;

    // The window owned the command sender; the room loop ends once it is gone.
    if let Err(err) = room.await {
        log::warn!("Room task ended abnormally: {err}");
    }
    Ok(())
}

async fn run_tail(platform: &PlatformContext) -> Result<(), Box<dyn Error>> {
    let mut view = mount_room(platform);
    if view.state() == RoomState::Unauthenticated {
        view.sign_in().await?;
    }

    let mut printed = HashSet::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            updated = view.next_update() => {
                if !updated {
                    eprintln!("Live feed dropped");
                    break;
                }
                print_new_messages(&view, &mut printed);
            }
        }
    }

    view.unmount();
    Ok(())
}

fn print_new_messages(view: &RoomView, printed: &mut HashSet<String>) {
    let Screen::Chat { messages, .. } = view.render() else {
        return;
    };

    for (message, rendered) in view.window().messages().iter().zip(&messages) {
        if !printed.insert(message.id.clone()) {
            continue;
        }

        let time = message
            .created_at
            .map(|at| at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
            .unwrap_or_default();
        let marker = match rendered.side {
            MessageSide::Sent => ">",
            MessageSide::Received => "<",
        };
        let author: String = message.uid.chars().take(8).collect();

        println!("[{time}] {marker} {author}");
        for line in &rendered.lines {
            println!("    {line}");
        }
    }
}

async fn run_send(platform: &PlatformContext, text: &str) -> Result<(), Box<dyn Error>> {
    let mut view = mount_room(platform);
    if !view.session().is_signed_in() {
        view.sign_in().await?;
    }

    let id = view.append(text).await?;
    println!("{id}");

    view.unmount();
    Ok(())
}
