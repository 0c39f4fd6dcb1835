//! Host speech services.

pub mod console;

pub use console::{
    CommandSynthesizer, ConsoleMicrophone, ConsolePlatform, ConsoleRecognizer, DetectedCommand,
};
