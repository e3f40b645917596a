use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::Parser;
use daqstream::core::config::{DEFAULT_CHANNEL_CAPACITY, MAX_SAMPLING_RATE_HZ, MIN_SAMPLING_RATE_HZ};
use daqstream::core::{AcquisitionConfig, ChannelSet};
use daqstream::engine::{PipelineController, PipelineStatus, SourceFactory};
use daqstream::hal::mock::{SimulatedDriver, SIMULATED_CHANNELS};
use daqstream::hal::{DriverRegistry, TriggerSlope};
use std::path::PathBuf;
use std::time::Duration;

const STATUS_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Continuous analog-input acquisition to CSV
#[derive(Parser, Debug)]
#[command(name = "daqstream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short = 't', long, default_value = "AcquisitionTask")]
    task_name: String,

    /// Analog input to record; repeat for several
    #[arg(
        short = 'c',
        long = "channel",
        value_parser = PossibleValuesParser::new(SIMULATED_CHANNELS),
        required_unless_present_any = ["config", "list_devices"]
    )]
    channels: Vec<String>,

    /// Analog input used as the reference trigger
    #[arg(long, value_parser = PossibleValuesParser::new(SIMULATED_CHANNELS))]
    trigger_channel: Option<String>,

    /// Trigger threshold in volts
    #[arg(long, default_value_t = 0.0)]
    trigger_level: f64,

    /// Edge the trigger fires on: rising or falling
    #[arg(long, default_value = "rising")]
    trigger_slope: TriggerSlope,

    #[arg(
        short = 'r',
        long,
        value_parser = clap::value_parser!(u32).range(MIN_SAMPLING_RATE_HZ as i64..=MAX_SAMPLING_RATE_HZ as i64),
        required_unless_present_any = ["config", "list_devices"]
    )]
    sampling_rate: Option<u32>,

    /// Samples per channel per read; everything buffered when omitted
    #[arg(short = 'n', long)]
    samples_per_read: Option<usize>,

    #[arg(short = 'f', long, default_value = "measurements.csv")]
    filename: String,

    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Acquisition driver; `simulated` needs no hardware
    #[arg(long, default_value = default_driver())]
    driver: String,

    #[arg(long, default_value = "Dev1")]
    device: String,

    /// Blocks that may queue between acquisition and persistence
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// Load the acquisition settings from a JSON file instead of flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the devices every driver can see and exit
    #[arg(long)]
    list_devices: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn default_driver() -> &'static str {
    if cfg!(feature = "nidaqmx") {
        "nidaqmx"
    } else {
        SimulatedDriver::DRIVER_ID
    }
}

impl Cli {
    fn acquisition_config(&self) -> Result<AcquisitionConfig> {
        if let Some(path) = &self.config {
            return AcquisitionConfig::from_json_file(path);
        }

        let channels = ChannelSet::new(self.channels.iter().map(String::as_str))?;
        let rate = self
            .sampling_rate
            .context("--sampling-rate is required without --config")?;

        let mut config = AcquisitionConfig::new(channels, rate)
            .with_task_name(&self.task_name)
            .with_device(&self.device)
            .with_output(self.data_dir.join(&self.filename))
            .with_channel_capacity(self.channel_capacity);
        if let Some(n) = self.samples_per_read {
            config = config.with_samples_per_read(n);
        }
        if let Some(trigger) = &self.trigger_channel {
            config = config
                .with_trigger(trigger, self.trigger_level)
                .with_trigger_slope(self.trigger_slope);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .format_timestamp_millis()
        .init();

    let registry = DriverRegistry::with_defaults();

    if cli.list_devices {
        return list_devices(&registry).await;
    }

    let config = cli.acquisition_config()?;
    let driver = cli.driver.clone();
    registry
        .get(&driver)
        .with_context(|| format!("Available drivers: {}", registry.list_drivers().join(", ")))?;

    let factory: SourceFactory = Box::new(move |config: &AcquisitionConfig| {
        registry.create_source(&driver, &config.device)
    });

    let mut controller = PipelineController::new(config, factory)?;
    controller.start().await?;
    log::info!("Acquiring; press Ctrl-C to stop");

    let mut ticker = tokio::time::interval(STATUS_CHECK_INTERVAL);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                log::info!("Interrupted, stopping acquisition");
                break;
            }
            _ = ticker.tick() => {
                if controller.refresh_status() == PipelineStatus::Offline {
                    break;
                }
            }
        }
    }

    if let Some(report) = controller.shutdown().await? {
        log::info!(
            "Wrote {} rows to '{}'",
            report.rows_written,
            controller.config().output_filename.display()
        );
    }
    println!("{}", controller.monitor().generate_report());

    Ok(())
}

async fn list_devices(registry: &DriverRegistry) -> Result<()> {
    let devices = registry.discover_all().await?;
    if devices.is_empty() {
        println!("No devices found");
        return Ok(());
    }
    for device in devices {
        println!(
            "{} [{}] {}: {}",
            device.id,
            device.driver_id,
            device.name,
            device.analog_inputs.join(", ")
        );
    }
    Ok(())
}
