use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use handlens::classify::GestureThresholds;
use handlens::detect::emotion::EmotionClassifier;
use handlens::detect::hand::OrtHandDetector;
use handlens::detect::ocr::TextRecognizer;
use handlens::runner::{
    self, EmotionProcessor, HandMode, HandProcessor, OcrProcessor, QrProcessor, RunOptions,
};
use handlens::server;

#[derive(Parser)]
#[command(name = "handlens", version, about = "Per-frame classification tools for hands, text, codes and faces")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every frame-processing subcommand.
#[derive(Args, Clone)]
struct IoArgs {
    /// Image/animation path, or a camera index.
    #[arg(short, long)]
    input: String,

    /// Annotated output path (default: output.png, or output.gif for streams).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip writing the annotated image.
    #[arg(short = 'n', long)]
    no_image: bool,

    /// Write the annotation batch as JSON next to the output image.
    #[arg(short, long)]
    json: bool,

    /// Show frames in a window while processing.
    #[arg(short, long)]
    play: bool,
}

impl IoArgs {
    fn into_options(self) -> RunOptions {
        RunOptions {
            input: self.input,
            output: self.output,
            no_image: self.no_image,
            json: self.json,
            play: self.play,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Count extended fingers per detected hand.
    Fingers {
        #[command(flatten)]
        io: IoArgs,
        /// Hand landmark estimator model (ONNX).
        #[arg(long)]
        model: PathBuf,
    },
    /// Recognize word gestures via the rule cascade.
    Gesture {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long)]
        model: PathBuf,
        /// Index displacement threshold for the pointing rules.
        #[arg(short, long, default_value_t = 0.06)]
        threshold: f32,
    },
    /// Detect raised hands.
    Raise {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long)]
        model: PathBuf,
    },
    /// Classify rock/paper/scissors shapes.
    Rps {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long)]
        model: PathBuf,
    },
    /// Recognize text lines.
    Ocr {
        #[command(flatten)]
        io: IoArgs,
        /// Directory holding text-detection.rten and text-recognition.rten
        /// (default: ~/.cache/ocrs).
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
    /// Decode QR codes.
    Qrcode {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Label the dominant facial expression.
    Emotion {
        #[command(flatten)]
        io: IoArgs,
        /// Expression classifier model (ONNX).
        #[arg(long)]
        model: PathBuf,
    },
    /// Run the placeholder HTTP inference endpoint.
    Serve {
        #[arg(long, default_value_t = server::DEFAULT_PORT)]
        port: u16,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Fingers { io, model } => {
            let detector = OrtHandDetector::load(&model)?;
            let opts = io.into_options();
            runner::run(&opts, HandProcessor::new(HandMode::Fingers, detector))?;
        }
        Command::Gesture {
            io,
            model,
            threshold,
        } => {
            let detector = OrtHandDetector::load(&model)?;
            let mode = HandMode::Gesture(GestureThresholds::with_direction(threshold));
            let opts = io.into_options();
            runner::run(&opts, HandProcessor::new(mode, detector))?;
        }
        Command::Raise { io, model } => {
            let detector = OrtHandDetector::load(&model)?;
            let opts = io.into_options();
            runner::run(&opts, HandProcessor::new(HandMode::Raise, detector))?;
        }
        Command::Rps { io, model } => {
            let detector = OrtHandDetector::load(&model)?;
            let opts = io.into_options();
            runner::run(&opts, HandProcessor::new(HandMode::Rps, detector))?;
        }
        Command::Ocr { io, models_dir } => {
            let recognizer = TextRecognizer::load(models_dir.as_deref())?;
            let opts = io.into_options();
            runner::run(&opts, OcrProcessor::new(recognizer))?;
        }
        Command::Qrcode { io } => {
            let opts = io.into_options();
            runner::run(&opts, QrProcessor)?;
        }
        Command::Emotion { io, model } => {
            let classifier = EmotionClassifier::load(&model)?;
            let opts = io.into_options();
            runner::run(&opts, EmotionProcessor::new(classifier))?;
        }
        Command::Serve { port } => server::serve(port)?,
    }

    Ok(())
}
