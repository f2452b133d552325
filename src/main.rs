//! # labelprint CLI
//!
//! Command-line interface for printing PDFs on thermal receipt and label
//! printers.
//!
//! ## Usage
//!
//! ```bash
//! # Print a PDF on a 58 mm ESC/POS printer over /dev/rfcomm0
//! labelprint print label.pdf
//!
//! # TSPL label printer, 58x40 mm labels, over Bluetooth
//! labelprint --bluetooth DD:0D:30:02:63:42 print --tspl --paper-height 40 label.pdf
//!
//! # Through the Wi-Fi bridge
//! labelprint --bridge http://192.168.1.50 print label.pdf
//!
//! # Write the command stream to a file instead of printing
//! labelprint --dry-run commands.bin print label.pdf
//!
//! # Save a preview of the first page
//! labelprint print --png preview.png label.pdf
//!
//! # Alignment and tuning labels
//! labelprint calibrate --paper-size 58 --paper-height 40
//! labelprint density-test --paper-height 30 --levels 4,8,12
//! labelprint dpi-test --paper-height 20 --dpi 203
//!
//! # Printer checks
//! labelprint test
//! labelprint query --read
//!
//! # HTTP print service
//! labelprint --device /dev/rfcomm0 serve --listen 0.0.0.0:8080
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use labelprint::{
    LabelprintError,
    diagnostics::{self, CalibrationParams},
    pdf::{self, ImageFile, PageSource, Pdftoppm},
    pipeline,
    preview,
    printer::{CommandSet, PrintOptions},
    server::{self, ServerConfig},
    transport::{HttpBridge, Target, Transport, bluetooth, serial},
};

/// labelprint - PDF to thermal printer utility
#[derive(Parser, Debug)]
#[command(name = "labelprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    /// Enable debug logging, including a hex dump of each job
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where commands are sent. `--dry-run` wins over `--bridge`, which wins
/// over `--bluetooth`, which wins over `--device`.
#[derive(Args, Debug)]
struct Connection {
    /// Serial device path
    #[arg(long, global = true, default_value = serial::DEFAULT_DEVICE)]
    device: PathBuf,

    /// Baud rate for serial devices
    #[arg(long, global = true, default_value_t = serial::DEFAULT_BAUD)]
    baud: u32,

    /// Bluetooth MAC address; an RFCOMM device is bound on demand
    #[arg(long, global = true, value_name = "MAC")]
    bluetooth: Option<String>,

    /// Remote RFCOMM channel of the printer's serial port service
    #[arg(long, global = true, default_value_t = bluetooth::DEFAULT_CHANNEL)]
    channel: u8,

    /// Base URL of the Wi-Fi bridge
    #[arg(long, global = true, value_name = "URL")]
    bridge: Option<String>,

    /// Write commands to FILE instead of sending them
    #[arg(long, global = true, value_name = "FILE")]
    dry_run: Option<PathBuf>,
}

impl Connection {
    fn target(&self) -> Target {
        if let Some(path) = &self.dry_run {
            Target::File { path: path.clone() }
        } else if let Some(url) = &self.bridge {
            Target::Bridge { url: url.clone() }
        } else if let Some(mac) = &self.bluetooth {
            Target::Bluetooth {
                mac: mac.clone(),
                channel: self.channel,
                baud: self.baud,
            }
        } else {
            Target::Serial {
                device: self.device.clone(),
                baud: self.baud,
            }
        }
    }
}

/// Label geometry and TSPL settings.
#[derive(Args, Debug)]
struct PaperArgs {
    /// Paper width in mm (58, 80, 100, ...)
    #[arg(long, default_value_t = 58)]
    paper_size: u32,

    /// Paper height in mm; 0 derives it from the page (TSPL)
    #[arg(long, default_value_t = 0)]
    paper_height: u32,

    /// Print speed (TSPL)
    #[arg(long, default_value_t = 4)]
    speed: u32,

    /// Print density 0-15 (TSPL)
    #[arg(long, default_value_t = 8)]
    density: u32,

    /// Left margin in dots
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    margin_x: i32,

    /// Top margin in dots
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    margin_y: i32,
}

impl PaperArgs {
    fn calibration_params(&self) -> CalibrationParams {
        CalibrationParams {
            width_mm: self.paper_size,
            height_mm: self.paper_height,
            speed: self.speed,
            density: self.density,
            margin_x: self.margin_x,
            margin_y: self.margin_y,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a PDF (or a PNG/JPEG image)
    Print {
        /// Document to print
        file: PathBuf,

        #[command(flatten)]
        paper: PaperArgs,

        /// Printer DPI, used for rendering and the width fallback
        #[arg(long, default_value_t = 203)]
        dpi: u32,

        /// Raster width in dots, overriding the paper size table
        #[arg(long)]
        width_dots: Option<u32>,

        /// ESC/POS mode (0=normal, 1=double width, 2=double height, 3=both)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        mode: u8,

        /// Use the TSPL command set instead of ESC/POS
        #[arg(long)]
        tspl: bool,

        /// Rotate pages 90° clockwise
        #[arg(long)]
        rotate: bool,

        /// Swap dark and light when thresholding
        #[arg(long)]
        invert: bool,

        /// Send canonical bits unflipped (printers that burn 1 bits)
        #[arg(long)]
        printer_invert: bool,

        /// Send the printer-detect query before an ESC/POS job
        #[arg(long)]
        probe: bool,

        /// Save a PNG preview of the first page instead of printing
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },

    /// Print the TSPL calibration grid (needs --paper-height)
    Calibrate {
        #[command(flatten)]
        paper: PaperArgs,
    },

    /// Print one TSPL label per density level
    DensityTest {
        #[command(flatten)]
        paper: PaperArgs,

        /// Density levels to print (default: all 0-15)
        #[arg(long, value_delimiter = ',')]
        levels: Vec<u32>,
    },

    /// Print a TSPL millimetre ruler at the given DPI
    DpiTest {
        #[command(flatten)]
        paper: PaperArgs,

        #[arg(long, default_value_t = 203)]
        dpi: u32,
    },

    /// Ask the printer to print its self-test page (ESC/POS)
    SelfTest,

    /// Sound the buzzer (ESC/POS)
    Beep,

    /// Send the printer-detect query (DLE EOT STX)
    Query {
        /// Wait for a reply
        #[arg(long)]
        read: bool,

        /// Reply timeout in milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },

    /// Connection test: initialize and feed one line
    Test,

    /// Show the Wi-Fi bridge status (needs --bridge)
    BridgeStatus {
        /// Ask the bridge to connect to its printer first
        #[arg(long, conflicts_with = "disconnect")]
        connect: bool,

        /// Ask the bridge to drop its printer connection first
        #[arg(long)]
        disconnect: bool,
    },

    /// Run the HTTP print service
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), LabelprintError> {
    let target = cli.connection.target();

    match cli.command {
        Commands::Print {
            file,
            paper,
            dpi,
            width_dots,
            mode,
            tspl,
            rotate,
            invert,
            printer_invert,
            probe,
            png,
        } => {
            let options = PrintOptions {
                paper_width_mm: paper.paper_size,
                paper_height_mm: paper.paper_height,
                dpi,
                width_dots,
                margin_x: paper.margin_x,
                margin_y: paper.margin_y,
                mode,
                speed: paper.speed,
                density: paper.density,
                invert,
                printer_invert,
                rotate,
                command_set: if tspl {
                    CommandSet::Tspl
                } else {
                    CommandSet::EscPos
                },
                probe,
            };
            let source = page_source(&file, dpi);

            if let Some(png_path) = png {
                return save_preview(source.as_ref(), &file, &options, &png_path);
            }

            let job = pipeline::build_job(source.as_ref(), &file, &options)?;
            send(&target, &job.commands)?;
            info!("Printed {} page(s)", job.pages.len());
        }

        Commands::Calibrate { paper } => {
            info!(
                "Printing calibration pattern for {}x{} mm",
                paper.paper_size, paper.paper_height
            );
            send(&target, &diagnostics::calibration(&paper.calibration_params())?)?;
        }

        Commands::DensityTest { paper, levels } => {
            let levels = if levels.is_empty() {
                diagnostics::all_density_levels()
            } else {
                levels
            };
            info!("Printing density levels {:?}", levels);
            send(
                &target,
                &diagnostics::density_sweep(&paper.calibration_params(), &levels)?,
            )?;
        }

        Commands::DpiTest { paper, dpi } => {
            info!("Printing {} mm ruler at {} DPI", paper.paper_size, dpi);
            send(&target, &diagnostics::dpi_ruler(&paper.calibration_params(), dpi)?)?;
        }

        Commands::SelfTest => {
            send(&target, &diagnostics::self_test())?;
            info!("Self-test sent. The printer may beep or print a test page.");
        }

        Commands::Beep => {
            send(&target, &diagnostics::beep())?;
        }

        Commands::Query { read, timeout_ms } => {
            let mut transport = target.open()?;
            transport.write_all(&diagnostics::query())?;
            info!("Query sent");
            if read {
                match transport.read_response(Duration::from_millis(timeout_ms))? {
                    Some(reply) => println!(
                        "Received {} bytes: {}",
                        reply.len(),
                        pipeline::hex_preview(&reply, reply.len())
                    ),
                    None => println!("No response within {} ms", timeout_ms),
                }
            }
        }

        Commands::Test => {
            send(&target, &diagnostics::connection_test())?;
            info!("Test sent. If the printer fed paper, the connection works.");
        }

        Commands::BridgeStatus {
            connect,
            disconnect,
        } => {
            let Target::Bridge { url } = &target else {
                return Err(LabelprintError::InvalidInput(
                    "bridge-status needs --bridge URL".into(),
                ));
            };
            let bridge = HttpBridge::new(url)?;
            if connect {
                println!("{}", bridge.connect()?);
            }
            if disconnect {
                println!("{}", bridge.disconnect()?);
            }
            let status = bridge.status()?;
            println!("Wi-Fi:   {} ({})", status.wifi, status.ip);
            println!("Printer: {} ({})", status.printer, status.printer_name);
            println!("Uptime:  {}s", status.uptime);
        }

        Commands::Serve { listen } => {
            let config = ServerConfig {
                target,
                listen_addr: listen,
            };
            tokio::runtime::Runtime::new()?.block_on(server::serve(config))?;
        }
    }

    Ok(())
}

/// PDFs go through `pdftoppm`, anything else is decoded as an image.
fn page_source(file: &Path, dpi: u32) -> Box<dyn PageSource> {
    if pdf::path_is_pdf(file) {
        Box::new(Pdftoppm::new(dpi))
    } else {
        Box::new(ImageFile)
    }
}

fn save_preview(
    source: &dyn PageSource,
    file: &Path,
    options: &PrintOptions,
    png_path: &Path,
) -> Result<(), LabelprintError> {
    let images = source.render_pages(file)?;
    let pages = pipeline::rasterize_pages(&images[..1.min(images.len())], options)?;
    preview::save_png(&pages[0], png_path)?;
    info!(
        "Saved {}x{} preview to {}",
        pages[0].width(),
        pages[0].height(),
        png_path.display()
    );
    Ok(())
}

fn send(target: &Target, commands: &[u8]) -> Result<(), LabelprintError> {
    let mut transport = target.open()?;
    transport.write_all(commands)?;
    info!("Sent {} bytes to {}", commands.len(), target);
    Ok(())
}
