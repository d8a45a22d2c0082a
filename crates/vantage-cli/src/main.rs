use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mavlink::common::{MavCmd, MavMessage, COMMAND_LONG_DATA};
use mavlink::{MavConnection, MavHeader};
use tracing::{info, warn};

use vantage_gimbal::controller::GimbalController;
use vantage_gimbal::runtime;
use vantage_gimbal::settings::GimbalControllerSettings;
use vantage_gimbal::vehicle::{LinkHandle, VehicleConnection};

#[derive(Debug, Parser)]
#[command(name = "vantage", version, about = "Gimbal Protocol v2 manager client")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration without opening the link.
    Doctor,
    /// Connect to the vehicle and run gimbal discovery.
    Run,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    link: LinkCfg,
    #[serde(default)]
    gimbal: GimbalControllerSettings,
}

#[derive(Debug, serde::Deserialize)]
struct LinkCfg {
    /// MAVLink connection URL, e.g. "udpin:0.0.0.0:14550" or
    /// "serial:/dev/ttyUSB0:57600".
    url: String,

    /// Our station's MAVLink ids. 255/190 is the common GCS identity.
    system_id: u8,
    component_id: u8,

    /// The vehicle carrying the gimbals.
    target_system: u8,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg),
        Command::Run => run(cfg).await,
    }
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    anyhow::ensure!(!cfg.link.url.is_empty(), "link.url missing");
    anyhow::ensure!(cfg.link.system_id != 0, "link.system_id must be nonzero");
    anyhow::ensure!(cfg.link.component_id != 0, "link.component_id must be nonzero");

    let g = &cfg.gimbal;
    anyhow::ensure!(
        (0.0..1.0).contains(&g.joystick_gimbal_deadband),
        "joystick_gimbal_deadband out of [0, 1)"
    );
    anyhow::ensure!(
        (0.0..=1.0).contains(&g.joystick_gimbal_expo),
        "joystick_gimbal_expo out of [0, 1]"
    );
    anyhow::ensure!(
        g.joystick_gimbal_smoothing > 0.0 && g.joystick_gimbal_smoothing <= 1.0,
        "joystick_gimbal_smoothing out of (0, 1]"
    );
    if g.joystick_gimbal_send_rate_hz <= 0 {
        warn!("joystick_gimbal_send_rate_hz non-positive, sender will run at 50 Hz");
    }

    info!("doctor: OK");
    Ok(())
}

/// Live MAVLink connection behind the controller's vehicle trait.
struct MavVehicle {
    conn: Box<dyn MavConnection<MavMessage> + Sync + Send>,
    header: Mutex<MavHeader>,
    system_id: u8,
    component_id: u8,
    target_system: u8,
    heading_deg: Mutex<f32>,
    seen_vehicle_heartbeat: AtomicBool,
}

impl MavVehicle {
    fn open(cfg: &LinkCfg) -> Result<Self> {
        let conn = mavlink::connect::<MavMessage>(&cfg.url)
            .with_context(|| format!("mavlink connect {}", cfg.url))?;
        Ok(Self {
            conn,
            header: Mutex::new(MavHeader {
                system_id: cfg.system_id,
                component_id: cfg.component_id,
                sequence: 0,
            }),
            system_id: cfg.system_id,
            component_id: cfg.component_id,
            target_system: cfg.target_system,
            heading_deg: Mutex::new(0.0),
            seen_vehicle_heartbeat: AtomicBool::new(false),
        })
    }

    fn send(&self, message: &MavMessage) -> Result<()> {
        let header = {
            let mut header = self.header.lock().unwrap();
            header.sequence = header.sequence.wrapping_add(1);
            *header
        };
        self.conn.send(&header, message).context("mavlink send")?;
        Ok(())
    }

    /// Track vehicle heading and readiness from inbound traffic.
    fn note_inbound(&self, header: &MavHeader, message: &MavMessage) {
        if header.system_id != self.target_system {
            return;
        }
        match message {
            MavMessage::HEARTBEAT(_) => {
                // Good enough as a readiness gate for a standalone shell; a
                // full station would consult its parameter subsystem here.
                self.seen_vehicle_heartbeat.store(true, Ordering::Relaxed);
            }
            MavMessage::VFR_HUD(hud) => {
                *self.heading_deg.lock().unwrap() = hud.heading as f32;
            }
            _ => {}
        }
    }
}

impl VehicleConnection for MavVehicle {
    fn parameters_ready(&self) -> bool {
        self.seen_vehicle_heartbeat.load(Ordering::Relaxed)
    }

    fn heading_deg(&self) -> f32 {
        *self.heading_deg.lock().unwrap()
    }

    fn our_system_id(&self) -> u8 {
        self.system_id
    }

    fn our_component_id(&self) -> u8 {
        self.component_id
    }

    fn vehicle_id(&self) -> u8 {
        self.target_system
    }

    fn primary_link(&self) -> Option<LinkHandle> {
        Some(LinkHandle { channel: 0 })
    }

    fn send_command(&self, target_compid: u8, command: MavCmd, _show_error: bool, params: [f32; 7]) {
        let cmd = COMMAND_LONG_DATA {
            target_system: self.target_system,
            target_component: target_compid,
            command,
            confirmation: 0,
            param1: params[0],
            param2: params[1],
            param3: params[2],
            param4: params[3],
            param5: params[4],
            param6: params[5],
            param7: params[6],
        };
        if let Err(e) = self.send(&MavMessage::COMMAND_LONG(cmd)) {
            warn!("command send failed: {e:#}");
        }
    }

    fn send_message_on_link(&self, _link: LinkHandle, message: MavMessage) -> Result<()> {
        self.send(&message)
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!("run: connecting {}", cfg.link.url);
    let vehicle = Arc::new(MavVehicle::open(&cfg.link)?);
    let settings = cfg.gimbal.shared();

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let controller = GimbalController::new(
        vehicle.clone() as Arc<dyn VehicleConnection>,
        settings,
        event_tx,
    );
    let (handle, inputs) = runtime::controller_channel();
    tokio::spawn(runtime::run(controller, inputs));

    // The mavlink receiver blocks, so it lives on a blocking thread and
    // feeds the controller inbox in arrival order.
    let reader_vehicle = vehicle.clone();
    let reader_handle = handle.clone();
    tokio::task::spawn_blocking(move || loop {
        match reader_vehicle.conn.recv() {
            Ok((header, message)) => {
                reader_vehicle.note_inbound(&header, &message);
                reader_handle.handle_mavlink_message(header.component_id, message);
            }
            Err(e) => {
                warn!("mavlink recv: {e:#}");
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
        }
    });

    while let Some(event) = event_rx.recv().await {
        info!(?event, "gimbal event");
    }
    Ok(())
}
