use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use toneport::{
    audio, read_wav, write_wav, LineCoding, ModemConfig, Transport, DEFAULT_AMPLITUDE,
    DEFAULT_BAUD,
};

#[derive(Parser)]
#[command(name = "toneport")]
#[command(about = "Full-duplex AFSK software modem", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console: each input line is transmitted over the modem
    Console {
        #[arg(long, default_value_t = DEFAULT_BAUD)]
        baud: u32,

        /// Line coding variant
        #[arg(long, value_enum, default_value = "standard")]
        coding: LineCoding,

        /// Output amplitude (0.0 - 1.0]
        #[arg(long, default_value_t = DEFAULT_AMPLITUDE)]
        amplitude: f32,

        /// Use the software loopback instead of the audio device
        #[arg(long)]
        loopback: bool,
    },

    /// Modulate bytes into a WAV file
    WriteWav {
        /// Output file
        path: PathBuf,

        /// Data to encode (if not provided, reads from stdin)
        #[arg(short, long)]
        data: Option<String>,

        #[arg(long, default_value_t = DEFAULT_BAUD)]
        baud: u32,

        #[arg(long, value_enum, default_value = "standard")]
        coding: LineCoding,

        #[arg(long, default_value_t = 1.0)]
        amplitude: f32,
    },

    /// Demodulate a WAV file back into bytes on stdout
    ReadWav {
        /// Input file; must be byte-aligned with no leading silence
        path: PathBuf,

        #[arg(long, default_value_t = DEFAULT_BAUD)]
        baud: u32,

        #[arg(long, value_enum, default_value = "standard")]
        coding: LineCoding,
    },

    /// List available audio devices
    Devices,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Console {
            baud,
            coding,
            amplitude,
            loopback,
        } => {
            let transport = Arc::new(Transport::new(ModemConfig {
                baud,
                coding,
                amplitude,
                loopback,
            })?);
            run_console(transport).await?;
        }

        Commands::WriteWav {
            path,
            data,
            baud,
            coding,
            amplitude,
        } => {
            let input_data = match data {
                Some(d) => d.into_bytes(),
                None => {
                    let mut buffer = Vec::new();
                    io::stdin().read_to_end(&mut buffer)?;
                    buffer
                }
            };
            if input_data.is_empty() {
                eprintln!("Error: No data to encode");
                std::process::exit(1);
            }
            write_wav(&path, &input_data, baud, coding, amplitude)?;
            eprintln!("Wrote {} bytes to {}", input_data.len(), path.display());
        }

        Commands::ReadWav { path, baud, coding } => {
            let data = read_wav(&path, baud, coding)?;
            io::stdout().write_all(&data)?;
            io::stdout().flush()?;
        }

        Commands::Devices => {
            println!("Available audio devices:");
            for device in audio::list_devices() {
                println!("  {}", device);
            }
        }
    }

    Ok(())
}

/// Reads stdin lines on a blocking worker and transmits each one; a line
/// containing "quit" stops the transport and ends the session.
async fn run_console(transport: Arc<Transport>) -> Result<()> {
    let console = {
        let transport = transport.clone();
        tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.contains("quit") {
                    break;
                }
                if transport.write(line.as_bytes()).is_err() {
                    break;
                }
            }
            transport.stop();
        })
    };

    eprintln!("Connected. Type a line to transmit it; \"quit\" exits.");
    let result = transport.connect_and_run_forever().await;
    if !console.is_finished() {
        eprintln!("Transport stopped; press Enter to exit.");
    }
    console.await?;
    Ok(result?)
}
