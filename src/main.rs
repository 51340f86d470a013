#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use structopt::StructOpt;
use tokio::runtime::Builder;

use ledctrl::{
    color,
    config::Settings,
    endpoint::Endpoint,
    scanner::LanScanner,
    session::{SelectionRange, Session, BLINK_MS, BLINK_TIMES},
    store::{self, FileStore},
    transport::{HttpTransport, Transport},
};

#[derive(Debug, StructOpt)]
struct Opts {
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,
    #[structopt(short, long = "config")]
    config_path: Option<PathBuf>,
    #[structopt(long)]
    dump_config: bool,
    /// Controller address, defaults to the last one used
    #[structopt(short, long)]
    address: Option<String>,
    #[structopt(subcommand)]
    command: Option<Cmd>,
}

/// LEDs a command applies to, defaults to the range selected on the device
#[derive(Debug, StructOpt)]
struct RangeOpts {
    #[structopt(long)]
    start: Option<usize>,
    #[structopt(long)]
    end: Option<usize>,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Look for controllers on the local network
    Scan,
    /// Remember a controller address
    Use { address: String },
    /// Show the controller state
    State,
    /// Select a range of LEDs
    Select {
        start: usize,
        end: usize,
        #[structopt(long)]
        blink: bool,
    },
    /// Preview a color on a range
    Color {
        hex: String,
        #[structopt(flatten)]
        range: RangeOpts,
        #[structopt(long)]
        lbright: Option<i32>,
    },
    /// Preview a color wheel position on a range
    Wheel {
        hue: f32,
        saturation: f32,
        #[structopt(flatten)]
        range: RangeOpts,
    },
    /// Set the brightness of a range
    LocalBrightness {
        value: i32,
        #[structopt(flatten)]
        range: RangeOpts,
    },
    /// Set the brightness of the whole strip
    Brightness { value: i32 },
    /// Persist the current colors
    Save,
    /// Revert unsaved changes
    Cancel,
    /// Reload the saved colors
    Load,
    /// Flash a range of LEDs
    Blink {
        start: usize,
        end: usize,
        #[structopt(long)]
        times: Option<u32>,
        #[structopt(long)]
        ms: Option<u32>,
    },
    /// Restart the controller
    Reboot,
}

/// Point the working range at the requested LEDs
///
/// Without bounds, the range selected on the device is reused, else the whole strip.
fn use_range<T: Transport + 'static>(session: &mut Session<T>, range: &RangeOpts) {
    let reported = session
        .state()
        .and_then(|state| state.selection)
        .filter(|selection| selection.active);
    let last = session.num_leds().unwrap_or(1).saturating_sub(1);

    let start = range
        .start
        .or_else(|| reported.and_then(|selection| selection.start))
        .unwrap_or(0);
    let end = range
        .end
        .or_else(|| reported.and_then(|selection| selection.end))
        .unwrap_or(last);

    session.set_bounds(start, end);
}

async fn run_command(
    session: &mut Session<HttpTransport>,
    command: Cmd,
) -> color_eyre::eyre::Result<()> {
    match command {
        // No session needed
        Cmd::Scan | Cmd::Use { .. } => {}
        Cmd::State => {
            let state = session.refresh().await?;
            println!("num_leds: {}", state.num_leds);
            println!("brightness: {}", state.global_brightness);

            match state.selection.filter(|selection| selection.active) {
                Some(selection) => println!(
                    "selection: {}..={}{}",
                    selection.start.unwrap_or(0),
                    selection.end.unwrap_or(0),
                    if selection.dirty { " (unsaved)" } else { "" }
                ),
                None => println!("selection: none"),
            }
        }
        Cmd::Select { start, end, blink } => {
            session.refresh().await?;
            let range = session.select(SelectionRange::new(start, end), blink).await?;
            println!("selected {} ({} leds)", range, range.led_count());
        }
        Cmd::Color {
            hex,
            range,
            lbright,
        } => {
            // Validate locally, the device only answers with a bare 400
            let color = color::parse_hex(&hex)?;

            session.refresh().await?;
            use_range(session, &range);
            session.preview_hex(&color::to_hex(color), lbright).await?;
        }
        Cmd::Wheel {
            hue,
            saturation,
            range,
        } => {
            session.refresh().await?;
            use_range(session, &range);
            session
                .preview_color(color::from_hue_saturation(hue, saturation))
                .await?;
        }
        Cmd::LocalBrightness { value, range } => {
            session.refresh().await?;
            use_range(session, &range);
            let draft = session.draft();
            session.select(draft, false).await?;
            session.set_local_brightness(value)?;
        }
        Cmd::Brightness { value } => {
            session.refresh().await?;
            session.set_global_brightness(value);
        }
        Cmd::Save => session.save().await?,
        Cmd::Cancel => session.cancel().await?,
        Cmd::Load => {
            let state = session.load().await?;
            println!("loaded, brightness: {}", state.global_brightness);
        }
        Cmd::Blink {
            start,
            end,
            times,
            ms,
        } => {
            session.refresh().await?;
            session
                .blink(
                    SelectionRange::new(start, end),
                    times.unwrap_or(BLINK_TIMES),
                    ms.unwrap_or(BLINK_MS),
                )
                .await?;
        }
        Cmd::Reboot => session.reboot().await?,
    }

    if !session.is_settled() {
        debug!("waiting for debounced commands");
    }

    for completion in session.flush().await {
        completion.result?;
    }

    Ok(())
}

async fn run(opts: Opts) -> color_eyre::eyre::Result<()> {
    // Load configuration
    let settings = Settings::load(opts.config_path.as_deref()).await?;

    // Dump configuration if this was asked
    if opts.dump_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    let command = match opts.command {
        Some(command) => command,
        None => {
            Opts::clap().print_help()?;
            println!();
            return Ok(());
        }
    };

    let transport = Arc::new(HttpTransport::new(&settings.transport)?);

    // Trace every request as it is issued and answered
    tokio::spawn({
        let mut requests = transport.monitor().subscribe();

        async move {
            while requests.changed().await.is_ok() {
                let request = requests.borrow().clone();
                if let Some(request) = request {
                    trace!(request = %request, "request");
                }
            }
        }
    });
    let mut store = FileStore::open_default()?;

    match command {
        Cmd::Scan => {
            let scanner = LanScanner::new(transport, settings.scan.clone());
            let hosts = scanner.scan().await?;

            if hosts.is_empty() {
                println!("no controller found");
            }

            for host in hosts {
                println!("{}", host);
            }

            return Ok(());
        }
        Cmd::Use { address } => {
            let endpoint = Endpoint::resolve(&address)?;
            store::remember_endpoint(&mut store, &endpoint)?;
            println!("using {}", endpoint);
            return Ok(());
        }
        command => {
            let endpoint = match opts.address.as_deref() {
                Some(address) => Endpoint::resolve(address)?,
                None => store::recall_endpoint(&store)?,
            };

            let mut session = Session::new(endpoint, transport, settings.debounce.clone());
            let result = run_command(&mut session, command).await;

            if let Some(request) = session.last_request() {
                debug!(request = %request, "last request");
            }

            result.wrap_err_with(|| format!("controller at {}", session.endpoint()))?;
        }
    }

    Ok(())
}

fn install_tracing(opts: &Opts) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fmt_layer = fmt::layer().with_writer(std::io::stderr);

    let filter_layer = EnvFilter::try_from_env("LEDCTRL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match opts.verbose {
            0 => "ledctrl=warn",
            1 => "ledctrl=info",
            2 => "ledctrl=debug",
            _ => "ledctrl=trace",
        })
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
}

#[paw::main]
fn main(opts: Opts) -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    install_tracing(&opts)?;

    // Create tokio runtime
    let thd_count = match num_cpus::get() {
        1 => 2,
        other => other.min(4),
    };

    let rt = Builder::new_multi_thread()
        .worker_threads(thd_count)
        .enable_all()
        .build()?;
    rt.block_on(run(opts))
}
