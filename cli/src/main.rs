use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use sketchroom::client::{Canvas, SyncAgent};
use sketchroom::event::{DrawKind, Point, Shape};
use sketchroom::frame::{ClientMessage, FrameError, ServerMessage};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

type Stream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("message codec failed: {0}")]
    Codec(#[from] FrameError),
    #[error("timed out waiting for server")]
    Timeout,
    #[error("server rejected {event}: {code}: {message}")]
    ServerError { event: &'static str, code: String, message: String },
}

#[derive(Parser, Debug)]
#[command(name = "sketch-cli", about = "Shared sketch room websocket CLI")]
struct Cli {
    #[arg(long, env = "SKETCH_URL", default_value = "ws://127.0.0.1:5000/api/ws")]
    url: String,

    /// Participant id. A random one is generated when omitted.
    #[arg(long, env = "SKETCH_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join a room and print every event as it arrives.
    Watch { room: String },
    /// Send one draw event.
    Draw(DrawArgs),
    /// Clear a room for everyone.
    Clear { room: String },
}

#[derive(Args, Debug)]
struct DrawArgs {
    room: String,

    #[arg(long, default_value = "freeDrawing", value_parser = parse_tool)]
    tool: DrawKind,

    #[arg(long, value_parser = parse_point)]
    from: Point,

    #[arg(long, value_parser = parse_point)]
    to: Point,

    #[arg(long, default_value = "#000000")]
    color: String,

    #[arg(long, default_value_t = 5.0)]
    size: f64,
}

/// Canvas that narrates instead of painting.
struct PrintCanvas;

impl Canvas for PrintCanvas {
    fn clear(&mut self) {
        println!("clear");
    }

    fn stroke(&mut self, shape: Shape, color: &str, size: f64) {
        match shape {
            Shape::Segment { from, to } => {
                println!("segment ({}, {}) -> ({}, {}) {color} {size}", from.x, from.y, to.x, to.y);
            }
            Shape::Rect { x, y, width, height } => {
                println!("rect ({x}, {y}) {width}x{height} {color} {size}");
            }
            Shape::Circle { center, radius } => {
                println!("circle ({}, {}) r={radius} {color} {size}", center.x, center.y);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Watch { room } => run_watch(&cli.url, agent(room, cli.user)).await,
        Command::Draw(args) => run_draw(&cli.url, args, cli.user).await,
        Command::Clear { room } => run_clear(&cli.url, agent(room, cli.user)).await,
    }
}

fn agent(room: String, user: Option<String>) -> SyncAgent<PrintCanvas> {
    match user {
        Some(user) => SyncAgent::with_user(PrintCanvas, room, user),
        None => SyncAgent::new(PrintCanvas, room),
    }
}

async fn run_watch(url: &str, mut agent: SyncAgent<PrintCanvas>) -> Result<(), CliError> {
    let mut stream = join(url, &mut agent).await?;
    eprintln!("watching {} as {}", agent.room_id(), agent.user_id());

    loop {
        tokio::select! {
            message = recv_next(&mut stream, None) => {
                let message = message?;
                if let ServerMessage::ToolChange { user_id, tool, value } = &message {
                    println!("tool {user_id} {tool}={value}");
                }
                agent.handle(message);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    send(&mut stream, &ClientMessage::LeaveRoom).await
}

async fn run_draw(url: &str, args: DrawArgs, user: Option<String>) -> Result<(), CliError> {
    let mut agent = agent(args.room, user);
    let mut stream = join(url, &mut agent).await?;

    let mut outgoing = vec![
        agent.set_tool(args.tool),
        agent.set_color(args.color),
        agent.set_size(args.size),
    ];
    agent.begin(args.from);
    outgoing.extend(agent.extend(args.to));
    outgoing.extend(agent.finish());

    for message in &outgoing {
        send(&mut stream, message).await?;
    }
    expect_quiet(&mut stream, "draw").await?;
    send(&mut stream, &ClientMessage::LeaveRoom).await
}

async fn run_clear(url: &str, mut agent: SyncAgent<PrintCanvas>) -> Result<(), CliError> {
    let mut stream = join(url, &mut agent).await?;
    let clear = agent.clear();
    send(&mut stream, &clear).await?;

    // The server echoes clears to the sender.
    loop {
        match recv_next(&mut stream, Some(Duration::from_secs(5))).await? {
            ServerMessage::ClearCanvas { .. } => break,
            ServerMessage::Error(body) => {
                return Err(CliError::ServerError { event: "clearCanvas", code: body.code, message: body.message });
            }
            other => agent.handle(other),
        }
    }
    send(&mut stream, &ClientMessage::LeaveRoom).await
}

/// Connect, join, and apply the replay batch.
async fn join(url: &str, agent: &mut SyncAgent<PrintCanvas>) -> Result<Stream, CliError> {
    let (mut stream, _) = connect_async(url)
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;

    let join = agent.join();
    send(&mut stream, &join).await?;

    loop {
        let message = recv_next(&mut stream, Some(Duration::from_secs(5))).await?;
        match message {
            ServerMessage::InitialData(_) => {
                agent.handle(message);
                return Ok(stream);
            }
            ServerMessage::Error(body) => {
                return Err(CliError::ServerError { event: "joinRoom", code: body.code, message: body.message });
            }
            other => agent.handle(other),
        }
    }
}

/// Successful writes get no reply, so a short quiet period means accepted.
async fn expect_quiet(stream: &mut Stream, event: &'static str) -> Result<(), CliError> {
    match recv_next(stream, Some(Duration::from_millis(300))).await {
        Ok(ServerMessage::Error(body)) => Err(CliError::ServerError { event, code: body.code, message: body.message }),
        Ok(_) | Err(CliError::Timeout) => Ok(()),
        Err(error) => Err(error),
    }
}

async fn send(stream: &mut Stream, message: &ClientMessage) -> Result<(), CliError> {
    let text = message.encode()?;
    stream
        .send(Message::Text(text.into()))
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))
}

async fn recv_next(stream: &mut Stream, timeout: Option<Duration>) -> Result<ServerMessage, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                Message::Text(text) => return ServerMessage::decode(text.as_str()).map_err(CliError::from),
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| CliError::Timeout)?,
        None => fut.await,
    }
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw.split_once(',').ok_or_else(|| format!("expected x,y but got {raw:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x in {raw:?}: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y in {raw:?}: {e}"))?;
    Ok(Point::new(x, y))
}

fn parse_tool(raw: &str) -> Result<DrawKind, String> {
    DrawKind::from_tool_name(raw).ok_or_else(|| format!("unknown tool {raw:?}; use freeDrawing, rectangle or circle"))
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
