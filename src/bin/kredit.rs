//! Check a prepaid SIM's balance from the terminal.
//!
//! Usage: kredit [--device /dev/ttyUSB0] [--number 950] <usage|data|init|list|raw>
//!
//! The data connection is handed back to NetworkManager on exit, whatever
//! happened in between.

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr, eyre};
use serialport::SerialPort;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use kredit::config::{DEFAULT_CONNECTION, DEFAULT_DEVICE, DEFAULT_SERVICE_NUMBER};
use kredit::status::wrap;
use kredit::{
    Check, Command, Config, Modem, NetworkControl, Nmcli, PhoneNumber, Query, Request, StatusSink, SystemClock,
    Worker, initializer, session,
};

/// Width of the status line the messages were written for.
const STATUS_WIDTH: usize = 32;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'd', long, env = "KREDIT_DEVICE", default_value = DEFAULT_DEVICE, help = "Modem AT command port")]
    device: String,

    #[arg(
        short = 'n',
        long,
        env = "KREDIT_NUMBER",
        default_value_t = DEFAULT_SERVICE_NUMBER,
        help = "Balance service number"
    )]
    number: PhoneNumber,

    #[arg(
        short = 'c',
        long,
        env = "KREDIT_CONNECTION",
        default_value = DEFAULT_CONNECTION,
        help = "NetworkManager connection restored on exit"
    )]
    connection: String,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Ask for remaining credit and usage.
    Usage,
    /// Ask for remaining data allowance.
    Data,
    /// Only bring the modem onto the cellular network.
    Init,
    /// Print the messages stored on the SIM.
    List {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    /// Send one AT command and print the reply.
    Raw { command: String },
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default();
        config.serial.device = self.device.clone();
        config.service_number = self.number;
        config.connection_name = self.connection.clone();
        config
    }
}

// ---------------------------------------------------------------------------
// Front-end
// ---------------------------------------------------------------------------

/// Status lines on stdout.
struct TerminalStatus;

impl StatusSink for TerminalStatus {
    fn display(&mut self, text: &str) {
        println!("{}", wrap(text, STATUS_WIDTH));
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        debug!(enabled, "input");
    }
}

/// Everything the worker thread owns.
struct Station {
    config: Config,
    net: Nmcli,
    modem: Option<Modem<Box<dyn SerialPort>>>,
    status: TerminalStatus,
}

impl Station {
    fn modem(&mut self) -> Result<&mut Modem<Box<dyn SerialPort>>> {
        self.modem.as_mut().ok_or_else(|| eyre!("modem is not open"))
    }

    /// Release the port and open it without touching the network.
    fn open_only(&mut self) -> Result<()> {
        self.net.release_port().wrap_err("releasing network connection")?;
        self.modem = Some(Modem::open(&self.config.serial, self.config.init)?);
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        let Self { config, net, status, .. } = &mut *self;
        let modem = initializer::initialize(net, || Modem::open(&config.serial, config.init), status);
        self.modem = Some(modem.ok_or_else(|| eyre!("modem initialization failed"))?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_logging() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let stderr_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(stderr_log).try_init()?;
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let config = cli.config();

    let station = Station {
        net: Nmcli::new(config.connection_name.clone(), config.net),
        config: config.clone(),
        modem: None,
        status: TerminalStatus,
    };
    let worker = Worker::spawn("modem", station).wrap_err("starting modem worker")?;
    let outcome = run(&worker, cli.command);

    // The port has to be closed before NetworkManager can take it back.
    let mut net = match worker.shutdown() {
        Some(Station { net, modem, .. }) => {
            drop(modem);
            net
        }
        None => Nmcli::new(config.connection_name.clone(), config.net),
    };
    if let Err(e) = net.restore() {
        warn!(error = %e, "network connection not restored");
    }
    outcome
}

fn run(worker: &Worker<Station>, action: Action) -> Result<()> {
    match action {
        Action::Usage => query(worker, Query::Usage),
        Action::Data => query(worker, Query::Data),
        Action::Init => worker.submit(Station::initialize)?.recv()?,
        Action::List { json } => {
            let records = worker
                .submit(|s| -> Result<_> {
                    s.open_only()?;
                    let modem = s.modem()?;
                    for check in [Check::SetTextMode, Check::SetStorageSim] {
                        if !modem.check(check) {
                            return Err(eyre!("{check} failed"));
                        }
                    }
                    Ok(modem.read_sms()?)
                })?
                .recv()??;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No stored messages.");
            } else {
                for record in records {
                    println!("{}  {}\n{}\n", record.timestamp, record.sender, record.body);
                }
            }
            Ok(())
        }
        Action::Raw { command } => {
            let reply = worker
                .submit(move |s| -> Result<_> {
                    s.open_only()?;
                    Ok(s.modem()?.chat(&Command::Raw(command)))
                })?
                .recv()??;
            for line in reply.lines() {
                println!("{}", String::from_utf8_lossy(line));
            }
            Ok(())
        }
    }
}

fn query(worker: &Worker<Station>, query: Query) -> Result<()> {
    worker.submit(Station::initialize)?.recv()??;
    let reply = worker
        .submit(move |s| {
            let request = Request::query(&s.config, query);
            let Station { config, modem, status, .. } = s;
            let modem = modem.as_mut()?;
            session::check_balance(modem, &SystemClock, status, config, &request)
        })?
        .recv()?;
    match reply {
        Some(_) => {
            info!(?query, "balance received");
            Ok(())
        }
        None => Err(eyre!("no balance reply")),
    }
}
