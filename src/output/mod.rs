//! Styled terminal output for the tmirror CLI.
//!
//! Everything here is for the operator. Diagnostics that only matter when
//! debugging a run go through `tracing` instead.

use owo_colors::OwoColorize;

const MUTED: (u8, u8, u8) = (160, 160, 160);
const MINT: (u8, u8, u8) = (152, 225, 152);
const CORAL: (u8, u8, u8) = (255, 160, 160);
const CREAM: (u8, u8, u8) = (255, 230, 160);
const SKY: (u8, u8, u8) = (160, 200, 255);
const LAVENDER: (u8, u8, u8) = (181, 174, 254);

/// Colour family of a labelled line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Nothing to change
    Settled,
    /// Exists, but differs
    Changed,
    /// Will be created
    Added,
    /// Informational only
    Neutral,
}

impl Tone {
    fn rgb(self) -> (u8, u8, u8) {
        match self {
            Tone::Settled => MINT,
            Tone::Changed => CREAM,
            Tone::Added => SKY,
            Tone::Neutral => MUTED,
        }
    }
}

fn paint(text: &str, (r, g, b): (u8, u8, u8)) -> String {
    text.truecolor(r, g, b).to_string()
}

pub fn success(message: &str) {
    println!("{} {}", paint("✓", MINT).bold(), message.bright_white());
}

/// Errors go to stderr so plans piped from stdout stay clean
pub fn error(message: &str) {
    eprintln!("{} {}", paint("✗", CORAL).bold(), message.bright_white());
}

pub fn warning(message: &str) {
    println!("{} {}", paint("⚠", CREAM).bold(), paint(message, CREAM));
}

pub fn info(message: &str) {
    println!("{} {}", paint("ℹ", SKY).bold(), message.bright_white());
}

pub fn section(title: &str) {
    println!("\n{}", paint(title, LAVENDER).bold());
    println!("{}", paint(&"─".repeat(50), MUTED));
}

pub fn subsection(title: &str) {
    println!("\n{}", paint(title, (120, 180, 195)));
}

pub fn key_value(key: &str, value: &str) {
    println!("  {} {}", paint(&format!("{}:", key), MUTED), value.bright_white());
}

/// A line led by a fixed-width coloured label, such as a plan action
pub fn labeled(label: &str, tone: Tone, message: &str) {
    let padded = format!("{:<13}", label);
    println!("  {} {}", paint(&padded, tone.rgb()).bold(), message);
}

pub fn dimmed(message: &str) {
    println!("{}", paint(message, MUTED));
}

pub fn blank() {
    println!();
}
